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

use std::sync::{Arc, Mutex};

use log::{debug, warn};

use super::{
    validate_coordinates, CategoricalSummary, CoordinateError, DayCategory, ForecastDay, Hazard,
    LocationSummary, OutlookLayer,
};
use crate::catalog::{LayerId, ServiceCatalog, TokenSet};
use crate::fetch::{Fetch, UpstreamError};

/// NOAA map service publishing the SPC outlooks.
pub const DEFAULT_SPC_BASE: &str =
    "https://mapservices.weather.noaa.gov/vector/rest/services/outlooks/SPC_wx_outlks/MapServer";

const CATEGORICAL_TOKENS: &[TokenSet<'static>] = &[&["categorical"]];

const PROBABILISTIC_TOKENS: &[TokenSet<'static>] = &[&["probabilistic"], &["probability"], &["prob"]];

const LAYER_QUERY: &[(&str, &str)] = &[
    ("where", "1=1"),
    ("outFields", "*"),
    ("returnGeometry", "true"),
    ("f", "geojson"),
];

/// Outlook lookups against the SPC map service.
///
/// The layer catalog is loaded on first use and kept until
/// [`invalidate_catalog`](Self::invalidate_catalog); a failed load is not
/// kept, so the next lookup retries it.
#[derive(Debug)]
pub struct OutlookService<F> {
    fetcher: F,
    base_url: String,
    catalog: Mutex<Option<Arc<ServiceCatalog>>>,
}

impl<F: Fetch> OutlookService<F> {
    /// Service against the public SPC map service.
    pub fn new(fetcher: F) -> Self {
        Self::with_base_url(fetcher, DEFAULT_SPC_BASE)
    }

    pub fn with_base_url(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            catalog: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Layer catalog, loading it on first call.
    pub fn catalog(&self) -> Result<Arc<ServiceCatalog>, UpstreamError> {
        if let Some(catalog) = self.catalog.lock().ok().and_then(|guard| guard.clone()) {
            return Ok(catalog);
        }

        let doc = self.fetcher.get_json(&self.base_url, &[("f", "pjson")])?;
        let catalog = Arc::new(ServiceCatalog::from_json(&doc));
        debug!("loaded SPC layer catalog: {} layers", catalog.len());

        if let Ok(mut guard) = self.catalog.lock() {
            *guard = Some(Arc::clone(&catalog));
        }
        Ok(catalog)
    }

    /// Drop the cached catalog so the next lookup reloads it.
    pub fn invalidate_catalog(&self) {
        if let Ok(mut guard) = self.catalog.lock() {
            *guard = None;
        }
    }

    /// Resolve a layer id, trying each token set in order.
    ///
    /// A catalog that cannot be loaded resolves nothing.
    pub fn resolve_layer(&self, day: ForecastDay, token_sets: &[TokenSet<'_>]) -> Option<LayerId> {
        match self.catalog() {
            Ok(catalog) => catalog.resolve_any(&day.label(), token_sets),
            Err(e) => {
                warn!("SPC layer catalog unavailable: {}", e);
                None
            }
        }
    }

    /// Fetch and parse one layer's features.
    ///
    /// An ArcGIS error document fails with [`UpstreamError::Service`].
    pub fn layer(&self, layer_id: LayerId) -> Result<OutlookLayer, UpstreamError> {
        let url = format!("{}/{}/query", self.base_url, layer_id);
        let collection = self.fetcher.get_json(&url, LAYER_QUERY)?;
        Ok(OutlookLayer::from_json(&collection))
    }

    /// Resolve and fetch a layer, logging whatever goes wrong.
    fn load_layer(&self, day: ForecastDay, token_sets: &[TokenSet<'_>], what: &str) -> Option<OutlookLayer> {
        let Some(layer_id) = self.resolve_layer(day, token_sets) else {
            debug!("{} {}: no layer", day, what);
            return None;
        };

        match self.layer(layer_id) {
            Ok(layer) => Some(layer),
            Err(e) => {
                warn!("{} {}: layer {} unavailable: {}", day, what, layer_id, e);
                None
            }
        }
    }

    /// Categorical risk for a day 1-3 outlook at the point.
    pub fn point_day_category(&self, lat: f64, lon: f64, day: ForecastDay) -> DayCategory {
        match self.load_layer(day, CATEGORICAL_TOKENS, "categorical") {
            None => DayCategory::Unavailable,
            Some(layer) => layer
                .max_category_at(lat, lon)
                .map_or(DayCategory::NoRisk, DayCategory::Risk),
        }
    }

    /// Highest probabilistic percent for a day outlook at the point.
    pub fn point_day_prob(&self, lat: f64, lon: f64, day: ForecastDay) -> Option<u8> {
        self.load_layer(day, PROBABILISTIC_TOKENS, "probabilistic")?
            .max_percent_at(lat, lon)
    }

    /// Highest percent of one hazard's day 1/2 probability outlook at the point.
    pub fn point_hazard_percent(&self, lat: f64, lon: f64, day: ForecastDay, hazard: Hazard) -> Option<u8> {
        let hz = hazard.token();
        let token_sets: [TokenSet<'_>; 4] = [
            &[hz, "prob"],
            &[hz, "probability"],
            &[hz, "probabilistic"],
            &[hz],
        ];
        self.load_layer(day, &token_sets, hz)?.max_percent_at(lat, lon)
    }

    /// Hazard and probabilistic percentages at a location.
    pub fn summarize_location(&self, lat: f64, lon: f64) -> Result<LocationSummary, CoordinateError> {
        validate_coordinates(lat, lon)?;

        let hazard = |day, hazard| self.point_hazard_percent(lat, lon, day, hazard);
        let prob = |day| ForecastDay::new(day).and_then(|day| self.point_day_prob(lat, lon, day));

        Ok(LocationSummary {
            d1_tor: hazard(ForecastDay::DAY1, Hazard::Tornado),
            d1_wind: hazard(ForecastDay::DAY1, Hazard::Wind),
            d1_hail: hazard(ForecastDay::DAY1, Hazard::Hail),
            d2_tor: hazard(ForecastDay::DAY2, Hazard::Tornado),
            d2_wind: hazard(ForecastDay::DAY2, Hazard::Wind),
            d2_hail: hazard(ForecastDay::DAY2, Hazard::Hail),
            d3_prob: prob(3),
            d4_prob: prob(4),
            d5_prob: prob(5),
            d6_prob: prob(6),
            d7_prob: prob(7),
        })
    }

    /// Categorical days 1-3 and probabilistic days 4-7 at a location.
    pub fn categorical_summary(&self, lat: f64, lon: f64) -> Result<CategoricalSummary, CoordinateError> {
        validate_coordinates(lat, lon)?;

        let prob = |day| ForecastDay::new(day).and_then(|day| self.point_day_prob(lat, lon, day));

        Ok(CategoricalSummary {
            day1_cat: self.point_day_category(lat, lon, ForecastDay::DAY1),
            day2_cat: self.point_day_category(lat, lon, ForecastDay::DAY2),
            day3_cat: self.point_day_category(lat, lon, ForecastDay::DAY3),
            day4_pct: prob(4),
            day5_pct: prob(5),
            day6_pct: prob(6),
            day7_pct: prob(7),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::CategoricalRisk;
    use crate::fetch::testing::FixtureFetcher;
    use serde_json::{json, Value};

    const BASE: &str = "https://spc.test/MapServer";

    fn box_collection(features: &[(f64, f64, f64, f64, Value)]) -> String {
        let features: Vec<Value> = features
            .iter()
            .map(|(min_lon, min_lat, max_lon, max_lat, props)| {
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
            })
            .collect();
        json!({"type": "FeatureCollection", "features": features}).to_string()
    }

    fn catalog(layers: &[(i64, &str)]) -> String {
        let layers: Vec<Value> = layers
            .iter()
            .map(|(id, name)| json!({"id": id, "name": name}))
            .collect();
        json!({ "layers": layers }).to_string()
    }

    fn layer_url(id: i64) -> String {
        format!("{BASE}/{id}/query")
    }

    /// One 1x1 degree box around (35.0, -97.0) labelled 10% on the tornado layer.
    fn tornado_fixture() -> FixtureFetcher {
        FixtureFetcher::new()
            .with(
                BASE,
                catalog(&[(1, "SPC Day1 Categorical Outlook"), (2, "SPC Day1 Tornado Probability")]),
            )
            .with(
                &layer_url(2),
                box_collection(&[(-97.5, 34.5, -96.5, 35.5, json!({"LABEL": "10%"}))]),
            )
    }

    #[test]
    fn test_hazard_percent_inside_box() {
        let service = OutlookService::with_base_url(tornado_fixture(), BASE);
        let pct = service.point_hazard_percent(35.2, -97.1, ForecastDay::DAY1, Hazard::Tornado);
        assert_eq!(pct, Some(10));
    }

    #[test]
    fn test_hazard_percent_outside_box() {
        let service = OutlookService::with_base_url(tornado_fixture(), BASE);
        let pct = service.point_hazard_percent(40.0, -100.0, ForecastDay::DAY1, Hazard::Tornado);
        assert_eq!(pct, None);
    }

    #[test]
    fn test_hazard_fallback_to_bare_hazard_name() {
        let fetcher = FixtureFetcher::new()
            .with(BASE, catalog(&[(5, "Day 2 Hail Outlook")]))
            .with(&layer_url(5), box_collection(&[(-1.0, -1.0, 1.0, 1.0, json!({"dn": 15}))]));
        let service = OutlookService::with_base_url(fetcher, BASE);
        assert_eq!(service.point_hazard_percent(0.0, 0.0, ForecastDay::DAY2, Hazard::Hail), Some(15));
    }

    #[test]
    fn test_categorical_picks_highest_rank() {
        let fetcher = FixtureFetcher::new()
            .with(BASE, catalog(&[(1, "Day 1 Categorical Outlook")]))
            .with(
                &layer_url(1),
                box_collection(&[
                    (-100.0, 30.0, -90.0, 40.0, json!({"LABEL": "TSTM"})),
                    (-99.0, 33.0, -95.0, 37.0, json!({"LABEL": "MRGL"})),
                    (-98.0, 34.0, -96.0, 36.0, json!({"LABEL": "ENH"})),
                    (-97.6, 34.8, -97.2, 35.6, json!({"LABEL": "SLGT"})),
                ]),
            );
        let service = OutlookService::with_base_url(fetcher, BASE);

        assert_eq!(
            service.point_day_category(35.22, -97.44, ForecastDay::DAY1),
            DayCategory::Risk(CategoricalRisk::Enh)
        );
        assert_eq!(
            service.point_day_category(45.0, -80.0, ForecastDay::DAY1),
            DayCategory::NoRisk
        );
        // No Day 2 layer in the catalog.
        assert_eq!(
            service.point_day_category(35.22, -97.44, ForecastDay::DAY2),
            DayCategory::Unavailable
        );
    }

    #[test]
    fn test_day_prob_falls_back_to_probability_naming() {
        let fetcher = FixtureFetcher::new()
            .with(BASE, catalog(&[(20, "Day 4 Probability Outlook")]))
            .with(
                &layer_url(20),
                box_collection(&[
                    (-100.0, 30.0, -90.0, 40.0, json!({"LABEL": "15%"})),
                    (-99.0, 33.0, -95.0, 37.0, json!({"LABEL": "30%"})),
                ]),
            );
        let service = OutlookService::with_base_url(fetcher, BASE);
        let day4 = ForecastDay::new(4).unwrap();
        assert_eq!(service.point_day_prob(35.0, -97.0, day4), Some(30));
        assert_eq!(service.point_day_prob(39.0, -91.0, day4), Some(15));
    }

    #[test]
    fn test_summary_survives_missing_layers_and_fetch_failures() {
        // Wind layer listed but its query fails; everything else is missing.
        let fetcher = tornado_fixture().with(BASE, catalog(&[
            (2, "SPC Day1 Tornado Probability"),
            (3, "SPC Day1 Wind Probability"),
        ]));
        let service = OutlookService::with_base_url(fetcher, BASE);

        let summary = service.summarize_location(35.2, -97.1).unwrap();
        assert_eq!(summary.d1_tor, Some(10));
        assert_eq!(summary.d1_wind, None);
        assert_eq!(summary.d1_hail, None);
        assert_eq!(summary.d7_prob, None);
    }

    #[test]
    fn test_summary_with_catalog_down() {
        let service = OutlookService::with_base_url(FixtureFetcher::new(), BASE);
        let summary = service.summarize_location(35.2, -97.1).unwrap();
        assert_eq!(summary, LocationSummary::default());

        let categorical = service.categorical_summary(35.2, -97.1).unwrap();
        assert_eq!(categorical.day1_cat, DayCategory::Unavailable);
        assert_eq!(categorical.day1_cat.as_str(), "NONE");
        assert_eq!(categorical.day4_pct, None);
    }

    #[test]
    fn test_feature_without_percent_gives_null_field() {
        let fetcher = FixtureFetcher::new()
            .with(BASE, catalog(&[(2, "Day 1 Probabilistic Tornado Outlook")]))
            .with(
                &layer_url(2),
                box_collection(&[(-98.0, 34.0, -96.0, 36.0, json!({"fill": "#ff0000"}))]),
            );
        let service = OutlookService::with_base_url(fetcher, BASE);
        let summary = service.summarize_location(35.0, -97.0).unwrap();
        assert_eq!(summary.d1_tor, None);
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let service = OutlookService::with_base_url(FixtureFetcher::new(), BASE);
        assert!(service.summarize_location(120.0, -97.0).is_err());
        assert!(service.categorical_summary(35.0, f64::NAN).is_err());
    }

    #[test]
    fn test_catalog_loaded_once_until_invalidated() {
        let fetcher = Arc::new(tornado_fixture());
        let service = OutlookService::with_base_url(Arc::clone(&fetcher), BASE);

        service.catalog().unwrap();
        service.catalog().unwrap();
        assert_eq!(fetcher.calls(), 1);

        service.invalidate_catalog();
        service.catalog().unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    const ARCGIS_ERROR: &str = r#"{"error":{"code":500,"message":"Error performing query operation","details":[]}}"#;

    #[test]
    fn test_layer_error_document_reads_unavailable() {
        let fetcher = FixtureFetcher::new()
            .with(BASE, catalog(&[(1, "Day 1 Categorical Outlook")]))
            .with(&layer_url(1), ARCGIS_ERROR);
        let service = OutlookService::with_base_url(fetcher, BASE);

        assert!(matches!(service.layer(1), Err(UpstreamError::Service { code: 500, .. })));
        assert_eq!(
            service.point_day_category(35.0, -97.0, ForecastDay::DAY1),
            DayCategory::Unavailable
        );
    }

    #[test]
    fn test_catalog_error_document_not_kept() {
        let fetcher = Arc::new(FixtureFetcher::new().with(BASE, ARCGIS_ERROR));
        let service = OutlookService::with_base_url(Arc::clone(&fetcher), BASE);

        assert!(matches!(service.catalog(), Err(UpstreamError::Service { .. })));
        assert!(service.catalog().is_err());
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(
            service.point_day_category(35.0, -97.0, ForecastDay::DAY1),
            DayCategory::Unavailable
        );
    }

    #[test]
    fn test_catalog_error_not_cached_by_shared_fetcher() {
        let fixture = FixtureFetcher::new().with(BASE, ARCGIS_ERROR);
        let cached = crate::fetch::CachedFetcher::new(&fixture, &crate::fetch::FetchConfig::default());
        let service = OutlookService::with_base_url(&cached, BASE);

        assert!(service.catalog().is_err());
        assert!(service.catalog().is_err());
        assert_eq!(fixture.calls(), 2);
        assert_eq!(cached.cached_len(), 0);
    }

    #[test]
    fn test_full_categorical_summary() {
        let fetcher = FixtureFetcher::new()
            .with(BASE, catalog(&[
                (1, "Day 1 Categorical Outlook"),
                (9, "Day 2 Categorical Outlook"),
                (17, "Day 3 Categorical Outlook"),
                (25, "Day 5 Probabilistic Outlook"),
            ]))
            .with(&layer_url(1), box_collection(&[(-98.0, 34.0, -96.0, 36.0, json!({"LABEL": "HIGH"}))]))
            .with(&layer_url(9), box_collection(&[(-98.0, 34.0, -96.0, 36.0, json!({"LABEL": "MRGL"}))]))
            .with(&layer_url(17), box_collection(&[(-80.0, 34.0, -76.0, 36.0, json!({"LABEL": "SLGT"}))]))
            .with(&layer_url(25), box_collection(&[(-98.0, 34.0, -96.0, 36.0, json!({"LABEL": "15%"}))]));
        let service = OutlookService::with_base_url(fetcher, BASE);

        let summary = service.categorical_summary(35.0, -97.0).unwrap();
        assert_eq!(summary.day1_cat, DayCategory::Risk(CategoricalRisk::High));
        assert_eq!(summary.day2_cat, DayCategory::Risk(CategoricalRisk::Mrgl));
        assert_eq!(summary.day3_cat, DayCategory::NoRisk);
        assert_eq!(summary.day4_pct, None);
        assert_eq!(summary.day5_pct, Some(15));

        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["day1_cat"], "HIGH");
        assert_eq!(json["day3_cat"], "NONE");
        assert!(json["day6_pct"].is_null());
    }
}
