//! Category style resolution.
//!
//! A [`StyleTable`] is built once at startup (built-in defaults plus optional
//! config overrides) and passed by reference to whatever needs it. Lookups
//! never fail: unknown categories resolve to [`StyleTable::fallback`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Neutral gray used for categories the table does not know.
pub const FALLBACK_COLOR: Color = Color::rgb(0x9E, 0x9E, 0x9E);

/// An opaque sRGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` or `#RGB` (the `#` is optional).
    pub fn from_hex(raw: &str) -> Option<Self> {
        let hex = raw.trim().trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 if hex.is_ascii() => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 if hex.is_ascii() => {
                let expand = |s: &str| channel(s).map(|v| v * 17);
                Some(Self::rgb(
                    expand(&hex[0..1])?,
                    expand(&hex[1..2])?,
                    expand(&hex[2..3])?,
                ))
            }
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Black or white, whichever reads better on top of this color.
    pub fn contrasting_text(&self) -> Color {
        let luma =
            0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b);
        if luma > 160.0 {
            Color::rgb(0, 0, 0)
        } else {
            Color::rgb(0xFF, 0xFF, 0xFF)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Resolved visual style for one category.
#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    /// Stroke (and label background) color.
    pub color: Color,
    /// Box fill color, painted translucent.
    pub fill: Color,
    /// Unscaled dash lengths; empty means solid.
    pub dash: Vec<f64>,
    /// Human-readable name used when an item carries no label of its own.
    pub label: String,
}

impl Style {
    fn solid(color: Color, label: &str) -> Self {
        Self {
            color,
            fill: color,
            dash: Vec::new(),
            label: label.to_string(),
        }
    }

    fn dashed(color: Color, dash: &[f64], label: &str) -> Self {
        Self {
            dash: dash.to_vec(),
            ..Self::solid(color, label)
        }
    }
}

/// Formats dash lengths as a space separated SVG attribute value.
pub fn dash_attr(dash: &[f64]) -> String {
    dash.iter()
        .map(|len| format!("{len:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Partial style as written in a config file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleSpec {
    pub color: Option<String>,
    pub fill: Option<String>,
    pub dash: Option<Vec<f64>>,
    pub label: Option<String>,
}

/// Immutable category → style mapping.
#[derive(Clone, Debug)]
pub struct StyleTable {
    styles: BTreeMap<String, Style>,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StyleTable {
    /// An empty table: every category resolves to the fallback.
    pub fn empty() -> Self {
        Self {
            styles: BTreeMap::new(),
        }
    }

    /// Built-in styles for drawing annotations, diagram symbols and lines.
    pub fn builtin() -> Self {
        const DASHED: &[f64] = &[8.0, 4.0];
        const DOTTED: &[f64] = &[2.0, 4.0];
        const CHAIN: &[f64] = &[12.0, 4.0, 2.0, 4.0];

        let entries = [
            // Drawing dimensions
            ("dimension", Style::solid(Color::rgb(0x21, 0x96, 0xF3), "Dimension")),
            ("linear_dimension", Style::solid(Color::rgb(0x21, 0x96, 0xF3), "Linear dimension")),
            ("angular_dimension", Style::solid(Color::rgb(0x03, 0xA9, 0xF4), "Angular dimension")),
            ("radius", Style::solid(Color::rgb(0x00, 0xBC, 0xD4), "Radius")),
            ("diameter", Style::solid(Color::rgb(0x00, 0x96, 0x88), "Diameter")),
            ("tolerance", Style::solid(Color::rgb(0x67, 0x3A, 0xB7), "Tolerance")),
            // GD&T
            ("gdt", Style::solid(Color::rgb(0xE9, 0x1E, 0x63), "GD&T")),
            (
                "feature_control_frame",
                Style::solid(Color::rgb(0xE9, 0x1E, 0x63), "Feature control frame"),
            ),
            ("datum", Style::solid(Color::rgb(0x9C, 0x27, 0xB0), "Datum")),
            // Other drawing content
            ("surface_finish", Style::solid(Color::rgb(0xFF, 0x98, 0x00), "Surface finish")),
            ("note", Style::solid(Color::rgb(0x79, 0x55, 0x48), "Note")),
            ("title_block", Style::solid(Color::rgb(0x60, 0x7D, 0x8B), "Title block")),
            ("table", Style::solid(Color::rgb(0x8B, 0xC3, 0x4A), "Table")),
            ("text", Style::solid(Color::rgb(0x42, 0x42, 0x42), "Text")),
            // Diagram symbols
            ("symbol", Style::solid(Color::rgb(0xF4, 0x43, 0x36), "Symbol")),
            ("valve", Style::solid(Color::rgb(0xFF, 0x57, 0x22), "Valve")),
            ("pump", Style::solid(Color::rgb(0xFF, 0xC1, 0x07), "Pump")),
            ("instrument", Style::solid(Color::rgb(0x4C, 0xAF, 0x50), "Instrument")),
            ("equipment", Style::solid(Color::rgb(0x3F, 0x51, 0xB5), "Equipment")),
            ("region", Style::dashed(Color::rgb(0x00, 0x89, 0x7B), DASHED, "Region")),
            // Line types
            ("line", Style::solid(Color::rgb(0x60, 0x7D, 0x8B), "Line")),
            ("process", Style::solid(Color::rgb(0x1E, 0x88, 0xE5), "Process line")),
            ("signal", Style::dashed(Color::rgb(0x43, 0xA0, 0x47), DASHED, "Signal line")),
            ("pneumatic", Style::dashed(Color::rgb(0x8E, 0x24, 0xAA), DASHED, "Pneumatic line")),
            ("hydraulic", Style::solid(Color::rgb(0x6D, 0x4C, 0x41), "Hydraulic line")),
            ("electrical", Style::dashed(Color::rgb(0xFD, 0xD8, 0x35), DOTTED, "Electrical line")),
            ("centerline", Style::dashed(Color::rgb(0x54, 0x6E, 0x7A), CHAIN, "Centerline")),
            ("hidden", Style::dashed(Color::rgb(0x90, 0xA4, 0xAE), DASHED, "Hidden line")),
            ("dimension_line", Style::solid(Color::rgb(0x21, 0x96, 0xF3), "Dimension line")),
            ("leader", Style::solid(Color::rgb(0x78, 0x90, 0x9C), "Leader")),
        ];

        Self {
            styles: entries
                .into_iter()
                .map(|(key, style)| (key.to_string(), style))
                .collect(),
        }
    }

    /// Returns a new table with config overrides applied on top.
    ///
    /// Unparseable colors are ignored with a warning; the rest of the entry
    /// still applies.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, StyleSpec>) -> Self {
        for (category, spec) in overrides {
            let key = category_key(category);
            let mut style = self.styles.get(&key).cloned().unwrap_or_else(|| Style {
                label: category.clone(),
                ..Self::fallback_style()
            });

            if let Some(raw) = &spec.color {
                match Color::from_hex(raw) {
                    Some(color) => {
                        style.color = color;
                        style.fill = color;
                    }
                    None => log::warn!("ignoring invalid color '{raw}' for category '{category}'"),
                }
            }
            if let Some(raw) = &spec.fill {
                match Color::from_hex(raw) {
                    Some(color) => style.fill = color,
                    None => log::warn!("ignoring invalid fill '{raw}' for category '{category}'"),
                }
            }
            if let Some(dash) = &spec.dash {
                style.dash = dash
                    .iter()
                    .copied()
                    .filter(|len| len.is_finite() && *len > 0.0)
                    .collect();
            }
            if let Some(label) = &spec.label {
                style.label = label.clone();
            }

            self.styles.insert(key, style);
        }
        self
    }

    /// Resolves the style for a category (case-insensitive).
    pub fn resolve(&self, category: &str) -> Style {
        match self.styles.get(&category_key(category)) {
            Some(style) => style.clone(),
            None => Style {
                label: category.to_string(),
                ..Self::fallback_style()
            },
        }
    }

    /// The style unknown categories get, with an empty label.
    pub fn fallback() -> Style {
        Self::fallback_style()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.styles.contains_key(&category_key(category))
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    fn fallback_style() -> Style {
        Style::solid(FALLBACK_COLOR, "")
    }
}

fn category_key(category: &str) -> String {
    category.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}
