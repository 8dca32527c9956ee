// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SPC map service layer catalog.
//!
//! The outlook map service lists its layers as `{ layers: [{id, name}] }`.
//! Layer ids move around between service updates, so they are never
//! hard-coded: callers resolve them by name with [`ServiceCatalog::resolve`].

mod resolver;

pub use resolver::{day_matches, TokenSet};

use serde::Deserialize;
use serde_json::Value;

/// Numeric id of one queryable layer.
pub type LayerId = i64;

/// One entry of the layer listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LayerInfo {
    pub id: LayerId,
    #[serde(default)]
    pub name: String,
}

/// Layer listing of the map service, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCatalog {
    layers: Vec<LayerInfo>,
}

impl ServiceCatalog {
    #[must_use]
    pub fn new(layers: Vec<LayerInfo>) -> Self {
        Self { layers }
    }

    /// Build a catalog from the service's `?f=pjson` document.
    ///
    /// Entries without a usable integer id are skipped; a document with no
    /// `layers` array yields an empty catalog.
    #[must_use]
    pub fn from_json(doc: &Value) -> Self {
        let layers = doc
            .get("layers")
            .and_then(Value::as_array)
            .map(|layers| {
                layers
                    .iter()
                    .filter_map(|layer| LayerInfo::deserialize(layer).ok())
                    .collect()
            })
            .unwrap_or_default();
        Self { layers }
    }

    /// Layers in listing order.
    #[must_use]
    pub fn layers(&self) -> &[LayerInfo] {
        &self.layers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Name of a layer by id.
    #[must_use]
    pub fn name_of(&self, id: LayerId) -> Option<&str> {
        self.layers
            .iter()
            .find(|layer| layer.id == id)
            .map(|layer| layer.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_listing_order() {
        let doc = json!({
            "layers": [
                {"id": 7, "name": "Day 2 Categorical Outlook"},
                {"id": 1, "name": "Day 1 Categorical Outlook"},
            ]
        });
        let catalog = ServiceCatalog::from_json(&doc);
        let ids: Vec<LayerId> = catalog.layers().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![7, 1]);
        assert_eq!(catalog.name_of(1), Some("Day 1 Categorical Outlook"));
    }

    #[test]
    fn test_from_json_skips_bad_entries() {
        let doc = json!({
            "layers": [
                {"id": "x", "name": "broken"},
                {"name": "no id"},
                {"id": 3},
            ]
        });
        let catalog = ServiceCatalog::from_json(&doc);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.name_of(3), Some(""));
    }

    #[test]
    fn test_from_json_without_layers() {
        assert!(ServiceCatalog::from_json(&json!({"error": "x"})).is_empty());
        assert!(ServiceCatalog::from_json(&json!({"layers": null})).is_empty());
    }
}
