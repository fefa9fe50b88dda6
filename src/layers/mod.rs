//! Layer groups and their visibility flags.
//!
//! A [`LayerScheme`] partitions categories into named groups; the mapping is
//! a pure function with an `other` bucket for anything unmapped. A
//! [`LayerVisibility`] holds one flag per group and filters item sets
//! before a renderer sees them. Filtering copies; the source items are never
//! touched, so toggling a group back on restores exactly what was there.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ir::ItemSet;

/// Group that receives every category the scheme does not map.
pub const OTHER_GROUP: &str = "other";

/// Built-in scheme selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemeKind {
    /// Engineering drawings: `dimensions`, `gdt`, `other`.
    #[default]
    Drawing,
    /// Diagrams: `symbol`, `line`, `region`, `other`.
    Diagram,
}

/// Category → group partition.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerScheme {
    groups: Vec<String>,
    mapping: BTreeMap<String, String>,
}

impl LayerScheme {
    /// Builds a scheme from explicit groups and a category mapping.
    ///
    /// Groups referenced by the mapping but missing from `groups` are
    /// appended, and [`OTHER_GROUP`] is always present.
    pub fn new<G, S>(groups: G, mapping: BTreeMap<String, String>) -> Self
    where
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = Vec::new();
        let mut push = |group: String| {
            if !ordered.contains(&group) {
                ordered.push(group);
            }
        };
        for group in groups {
            push(group.into());
        }
        for group in mapping.values() {
            push(group.clone());
        }
        push(OTHER_GROUP.to_string());

        Self {
            groups: ordered,
            mapping: mapping
                .into_iter()
                .map(|(category, group)| (category_key(&category), group))
                .collect(),
        }
    }

    pub fn builtin(kind: SchemeKind) -> Self {
        match kind {
            SchemeKind::Drawing => Self::drawing(),
            SchemeKind::Diagram => Self::diagram(),
        }
    }

    pub fn drawing() -> Self {
        let dimensions = [
            "dimension",
            "linear_dimension",
            "angular_dimension",
            "radius",
            "diameter",
            "tolerance",
            "dimension_line",
        ];
        let gdt = ["gdt", "feature_control_frame", "datum", "surface_finish"];

        let mapping = dimensions
            .iter()
            .map(|category| (category.to_string(), "dimensions".to_string()))
            .chain(gdt.iter().map(|category| (category.to_string(), "gdt".to_string())))
            .collect();

        Self::new(["dimensions", "gdt"], mapping)
    }

    pub fn diagram() -> Self {
        let symbols = ["symbol", "valve", "pump", "instrument", "equipment"];
        let lines = [
            "line",
            "process",
            "signal",
            "pneumatic",
            "hydraulic",
            "electrical",
            "centerline",
            "hidden",
            "leader",
        ];
        let regions = ["region", "title_block", "table"];

        let mapping = symbols
            .iter()
            .map(|category| (category.to_string(), "symbol".to_string()))
            .chain(lines.iter().map(|category| (category.to_string(), "line".to_string())))
            .chain(regions.iter().map(|category| (category.to_string(), "region".to_string())))
            .collect();

        Self::new(["symbol", "line", "region"], mapping)
    }

    /// Returns a copy with extra category mappings layered on top.
    pub fn with_mapping(&self, extra: &BTreeMap<String, String>) -> Self {
        let mut mapping: BTreeMap<String, String> = self.mapping.clone();
        for (category, group) in extra {
            mapping.insert(category_key(category), group.clone());
        }
        Self::new(self.groups.clone(), mapping)
    }

    /// Group key for a category; unmapped categories land in [`OTHER_GROUP`].
    pub fn group_of(&self, category: &str) -> &str {
        self.mapping
            .get(&category_key(category))
            .map(String::as_str)
            .unwrap_or(OTHER_GROUP)
    }

    /// Group keys in display order.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }
}

impl Default for LayerScheme {
    fn default() -> Self {
        Self::drawing()
    }
}

/// Visibility flags for one view.
#[derive(Clone, Debug)]
pub struct LayerVisibility {
    scheme: LayerScheme,
    flags: BTreeMap<String, bool>,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self::new(LayerScheme::default())
    }
}

impl LayerVisibility {
    /// All groups start visible.
    pub fn new(scheme: LayerScheme) -> Self {
        let flags = scheme
            .groups()
            .iter()
            .map(|group| (group.clone(), true))
            .collect();
        Self { scheme, flags }
    }

    /// Starts with the named groups hidden; unknown names are ignored.
    pub fn with_hidden<S: AsRef<str>>(scheme: LayerScheme, hidden: &[S]) -> Self {
        let mut visibility = Self::new(scheme);
        for group in hidden {
            if !visibility.set(group.as_ref(), false) {
                log::warn!("unknown layer group '{}'", group.as_ref());
            }
        }
        visibility
    }

    pub fn scheme(&self) -> &LayerScheme {
        &self.scheme
    }

    /// Flips one group. Returns false (and changes nothing) for unknown keys.
    pub fn toggle(&mut self, key: &str) -> bool {
        match self.flags.get_mut(key) {
            Some(flag) => {
                *flag = !*flag;
                log::debug!("layer '{key}' is now {}", if *flag { "visible" } else { "hidden" });
                true
            }
            None => false,
        }
    }

    /// Sets one group. Returns false (and changes nothing) for unknown keys.
    pub fn set(&mut self, key: &str, visible: bool) -> bool {
        match self.flags.get_mut(key) {
            Some(flag) => {
                *flag = visible;
                true
            }
            None => false,
        }
    }

    pub fn is_group_visible(&self, key: &str) -> bool {
        self.flags.get(key).copied().unwrap_or(false)
    }

    /// Whether items of this category are currently drawn.
    pub fn is_visible(&self, category: &str) -> bool {
        self.is_group_visible(self.scheme.group_of(category))
    }

    /// Hidden group keys in display order.
    pub fn hidden_groups(&self) -> Vec<&str> {
        self.scheme
            .groups()
            .iter()
            .filter(|group| !self.is_group_visible(group))
            .map(String::as_str)
            .collect()
    }

    /// Copies the items whose category maps to a visible group.
    pub fn filter(&self, items: &ItemSet) -> ItemSet {
        ItemSet {
            detections: items
                .detections
                .iter()
                .filter(|item| self.is_visible(&item.category))
                .cloned()
                .collect(),
            lines: items
                .lines
                .iter()
                .filter(|item| self.is_visible(&item.category))
                .cloned()
                .collect(),
            texts: items
                .texts
                .iter()
                .filter(|item| self.is_visible(&item.category))
                .cloned()
                .collect(),
        }
    }
}

fn category_key(category: &str) -> String {
    category.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}
