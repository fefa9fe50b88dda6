//! Overlay configuration files.
//!
//! A config is YAML or JSON (chosen by extension) with three optional
//! sections:
//!
//! ```yaml
//! styles:
//!   weld: { color: "#FF5722", label: "Weld symbol" }
//! layers:
//!   scheme: drawing
//!   mapping: { weld: welding }
//!   hidden: [gdt]
//! render:
//!   show_confidence: true
//! ```
//!
//! Anything missing falls back to the built-in defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OverlayError;
use crate::layers::{LayerScheme, LayerVisibility, SchemeKind};
use crate::plan::RenderOptions;
use crate::style::{StyleSpec, StyleTable};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    /// Per-category style overrides, layered over the built-in table.
    pub styles: BTreeMap<String, StyleSpec>,
    pub layers: LayerConfig,
    pub render: RenderOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayerConfig {
    pub scheme: SchemeKind,
    /// Extra category -> group assignments.
    pub mapping: BTreeMap<String, String>,
    /// Groups hidden at startup.
    pub hidden: Vec<String>,
}

impl OverlayConfig {
    pub fn style_table(&self) -> StyleTable {
        StyleTable::builtin().with_overrides(&self.styles)
    }

    pub fn layer_scheme(&self) -> LayerScheme {
        LayerScheme::builtin(self.layers.scheme).with_mapping(&self.layers.mapping)
    }

    pub fn visibility(&self) -> LayerVisibility {
        let visibility = LayerVisibility::with_hidden(self.layer_scheme(), &self.layers.hidden);
        let hidden = visibility.hidden_groups();
        if !hidden.is_empty() {
            log::debug!("hidden layer groups: {}", hidden.join(", "));
        }
        visibility
    }
}

/// Loads a config file, or the defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<OverlayConfig, OverlayError> {
    let Some(path) = path else {
        return Ok(OverlayConfig::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let parse_error = |message: String| OverlayError::ConfigParse {
        path: path.to_path_buf(),
        message,
    };
    let config = match extension.as_str() {
        "yaml" | "yml" => from_yaml_str(&contents).map_err(|err| parse_error(err.to_string()))?,
        "json" => from_json_str(&contents).map_err(|err| parse_error(err.to_string()))?,
        other => {
            return Err(OverlayError::UnsupportedFormat(format!(
                "config extension '{other}' (expected .yaml, .yml or .json)"
            )))
        }
    };

    log::info!(
        "loaded config {} ({} style overrides, {} hidden layers)",
        path.display(),
        config.styles.len(),
        config.layers.hidden.len()
    );
    Ok(config)
}

pub fn from_yaml_str(yaml: &str) -> Result<OverlayConfig, serde_yaml::Error> {
    // An empty YAML document means "all defaults".
    if yaml.trim().is_empty() {
        return Ok(OverlayConfig::default());
    }
    serde_yaml::from_str(yaml)
}

pub fn from_json_str(json: &str) -> Result<OverlayConfig, serde_json::Error> {
    serde_json::from_str(json)
}
