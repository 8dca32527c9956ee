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

//! Outlook features parsed from a layer's GeoJSON query result.

use serde_json::Value;

use crate::extract::{extract_label, extract_percent, risk_rank, CategoricalRisk, Properties};
use crate::geometry::Geometry;

/// One polygon or multipolygon outlook record.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    /// `None` when the geometry is missing or not areal.
    pub geometry: Option<Geometry>,
    pub properties: Properties,
}

impl GeoFeature {
    #[must_use]
    pub fn from_json(feature: &Value) -> Self {
        let geometry = feature.get("geometry").and_then(Geometry::from_json);
        let properties = feature
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Self {
            geometry,
            properties,
        }
    }

    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.geometry
            .as_ref()
            .is_some_and(|geometry| geometry.contains(lon, lat))
    }
}

/// All features of one layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlookLayer {
    pub features: Vec<GeoFeature>,
}

impl OutlookLayer {
    /// Parse a GeoJSON `FeatureCollection`. Anything else yields no features.
    #[must_use]
    pub fn from_json(collection: &Value) -> Self {
        let features = collection
            .get("features")
            .and_then(Value::as_array)
            .map(|features| features.iter().map(GeoFeature::from_json).collect())
            .unwrap_or_default();
        Self { features }
    }

    /// Features whose geometry contains the point, in layer order.
    pub fn containing(&self, lat: f64, lon: f64) -> impl Iterator<Item = &GeoFeature> {
        self.features
            .iter()
            .filter(move |feature| feature.contains(lon, lat))
    }

    /// Highest-ranked categorical risk among the features containing the point.
    ///
    /// Unknown labels rank 0 and are never picked; on equal rank the first
    /// feature wins.
    #[must_use]
    pub fn max_category_at(&self, lat: f64, lon: f64) -> Option<CategoricalRisk> {
        let mut best: Option<CategoricalRisk> = None;
        for feature in self.containing(lat, lon) {
            let label = extract_label(&feature.properties);
            if risk_rank(&label) > best.map_or(0, CategoricalRisk::rank) {
                best = CategoricalRisk::from_label(&label);
            }
        }
        best
    }

    /// Highest percent among the features containing the point.
    #[must_use]
    pub fn max_percent_at(&self, lat: f64, lon: f64) -> Option<u8> {
        self.containing(lat, lon)
            .filter_map(|feature| extract_percent(&feature.properties))
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn box_feature(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64, props: Value) -> Value {
        json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [min_lon, min_lat], [max_lon, min_lat], [max_lon, max_lat],
                    [min_lon, max_lat], [min_lon, min_lat]
                ]]
            },
            "properties": props
        })
    }

    #[test]
    fn test_max_category_picks_highest_rank() {
        let layer = OutlookLayer::from_json(&json!({
            "type": "FeatureCollection",
            "features": [
                box_feature(-100.0, 30.0, -90.0, 40.0, json!({"LABEL": "TSTM"})),
                box_feature(-99.0, 33.0, -95.0, 37.0, json!({"LABEL": "ENH"})),
                box_feature(-98.5, 34.0, -96.0, 36.0, json!({"LABEL": "SLGT"})),
                box_feature(-98.0, 34.5, -97.0, 35.5, json!({"LABEL": "SIGN"})),
            ]
        }));
        assert_eq!(layer.max_category_at(35.0, -97.5), Some(CategoricalRisk::Enh));
        assert_eq!(layer.max_category_at(39.0, -91.0), Some(CategoricalRisk::Tstm));
        assert_eq!(layer.max_category_at(45.0, -91.0), None);
    }

    #[test]
    fn test_unknown_labels_alone_give_none() {
        let layer = OutlookLayer::from_json(&json!({
            "features": [box_feature(-1.0, -1.0, 1.0, 1.0, json!({"LABEL": "SIGN"}))]
        }));
        assert_eq!(layer.max_category_at(0.0, 0.0), None);
    }

    #[test]
    fn test_max_percent_skips_features_without_percent() {
        let layer = OutlookLayer::from_json(&json!({
            "features": [
                box_feature(-1.0, -1.0, 1.0, 1.0, json!({"LABEL": "5%"})),
                box_feature(-0.5, -0.5, 0.5, 0.5, json!({"LABEL": "15%"})),
                box_feature(-0.2, -0.2, 0.2, 0.2, json!({"fill": "#000"})),
            ]
        }));
        assert_eq!(layer.max_percent_at(0.0, 0.0), Some(15));
        assert_eq!(layer.max_percent_at(0.8, 0.8), Some(5));
        assert_eq!(layer.max_percent_at(3.0, 3.0), None);
    }

    #[test]
    fn test_features_without_geometry_never_contain() {
        let layer = OutlookLayer::from_json(&json!({
            "features": [{"type": "Feature", "geometry": null, "properties": {"LABEL": "HIGH"}}]
        }));
        assert_eq!(layer.features.len(), 1);
        assert_eq!(layer.max_category_at(0.0, 0.0), None);
    }

    #[test]
    fn test_non_collection_has_no_features() {
        assert!(OutlookLayer::from_json(&json!({"error": {"code": 400}})).features.is_empty());
    }
}
