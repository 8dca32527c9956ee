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

//! Surface observations near a location from the NWS API.
//!
//! The points endpoint maps a location to its radar, nearest city and the
//! list of nearby observing stations. Stations report with varying
//! completeness, so the nearest one is not always the best: candidates are
//! scored on how many fields they report and how fresh the report is.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::Value;

use crate::fetch::{Fetch, UpstreamError};

/// Root of the NWS API.
pub const NWS_API_BASE: &str = "https://api.weather.gov";

/// Nearby stations considered when picking an observation.
const MAX_CANDIDATE_STATIONS: usize = 10;

/// Reports at most this old earn a freshness bonus.
const FRESH_MINUTES: i64 = 90;

/// Reports at least this old are penalized.
const STALE_MINUTES: i64 = 240;

/// Earth radius in statute miles.
const EARTH_RADIUS_MILES: f64 = 3958.8;

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
];

/// Great-circle distance in statute miles.
#[must_use]
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

#[must_use]
pub fn c_to_f(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

#[must_use]
pub fn ms_to_mph(meters_per_second: f64) -> f64 {
    meters_per_second * 2.236_936
}

#[must_use]
pub fn pa_to_mb(pascals: f64) -> f64 {
    pascals / 100.0
}

#[must_use]
pub fn m_to_mi(meters: f64) -> f64 {
    meters / 1609.344
}

/// 16-point compass direction for a bearing in degrees.
#[must_use]
pub fn deg_to_compass(degrees: f64) -> &'static str {
    let sector = (degrees.rem_euclid(360.0) / 22.5 + 0.5).floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "sector is in 0..=16")]
    let index = sector as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

/// `points` endpoint URL for a location, at four decimals.
#[must_use]
pub fn points_url(base: &str, lat: f64, lon: f64) -> String {
    format!("{base}/points/{lat:.4},{lon:.4}")
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |cur, key| cur.get(key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Metadata the NWS keeps for a forecast point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointMetadata {
    /// Nearest WSR-88D, e.g. `KTLX`.
    pub radar_station: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// URL listing nearby observation stations.
    pub observation_stations: Option<String>,
}

impl PointMetadata {
    #[must_use]
    pub fn from_json(doc: &Value) -> Self {
        let owned = |path: &[&str]| str_at(doc, path).map(str::to_string);
        Self {
            radar_station: owned(&["properties", "radarStation"]),
            city: owned(&["properties", "relativeLocation", "properties", "city"]),
            state: owned(&["properties", "relativeLocation", "properties", "state"]),
            observation_stations: owned(&["properties", "observationStations"]),
        }
    }

    /// "City, ST" when both parts are known.
    #[must_use]
    pub fn city_label(&self) -> Option<String> {
        match (&self.city, &self.state) {
            (Some(city), Some(state)) => Some(format!("{city}, {state}")),
            _ => None,
        }
    }
}

/// Read a `{ "value": x, "unitCode": ... }` quantity.
fn quantity(props: &Value, key: &str) -> Option<f64> {
    props.get(key)?.get("value")?.as_f64()
}

/// Read a speed quantity as meters per second; the API reports km/h on most stations.
fn speed_ms(props: &Value, key: &str) -> Option<f64> {
    let value = quantity(props, key)?;
    let unit = props.get(key)?.get("unitCode").and_then(Value::as_str).unwrap_or_default();
    if unit.ends_with("km_h-1") {
        Some(value / 3.6)
    } else {
        Some(value)
    }
}

/// Latest observation of one station, in SI units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub timestamp: Option<DateTime<Utc>>,
    pub temperature_c: Option<f64>,
    pub dewpoint_c: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub wind_gust_ms: Option<f64>,
    pub sea_level_pressure_pa: Option<f64>,
    pub visibility_m: Option<f64>,
    pub text_description: Option<String>,
}

impl Observation {
    /// Parse the `properties` object of an `observations/latest` response.
    #[must_use]
    pub fn from_properties(props: &Value) -> Self {
        Self {
            timestamp: props
                .get("timestamp")
                .and_then(Value::as_str)
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|ts| ts.with_timezone(&Utc)),
            temperature_c: quantity(props, "temperature"),
            dewpoint_c: quantity(props, "dewpoint"),
            relative_humidity: quantity(props, "relativeHumidity"),
            wind_direction_deg: quantity(props, "windDirection"),
            wind_speed_ms: speed_ms(props, "windSpeed"),
            wind_gust_ms: speed_ms(props, "windGust"),
            sea_level_pressure_pa: quantity(props, "seaLevelPressure"),
            visibility_m: quantity(props, "visibility"),
            text_description: str_at(props, &["textDescription"]).map(str::to_string),
        }
    }

    /// How many of the eight scored fields are reported.
    #[must_use]
    pub fn present_fields(&self) -> usize {
        [
            self.temperature_c,
            self.dewpoint_c,
            self.relative_humidity,
            self.wind_direction_deg,
            self.wind_speed_ms,
            self.wind_gust_ms,
            self.sea_level_pressure_pa,
            self.visibility_m,
        ]
        .iter()
        .filter(|field| field.is_some())
        .count()
    }

    /// Completeness plus a freshness adjustment relative to `now`.
    #[must_use]
    pub fn score(&self, now: DateTime<Utc>) -> i64 {
        let mut score = i64::try_from(self.present_fields()).unwrap_or(0);
        if let Some(ts) = self.timestamp {
            let age = (now - ts).num_minutes();
            if age <= FRESH_MINUTES {
                score += 1;
            } else if age >= STALE_MINUTES {
                score -= 2;
            }
        }
        score
    }

    #[must_use]
    pub fn temperature_f(&self) -> Option<f64> {
        self.temperature_c.map(c_to_f)
    }

    #[must_use]
    pub fn dewpoint_f(&self) -> Option<f64> {
        self.dewpoint_c.map(c_to_f)
    }

    #[must_use]
    pub fn wind_speed_mph(&self) -> Option<f64> {
        self.wind_speed_ms.map(ms_to_mph)
    }

    #[must_use]
    pub fn wind_gust_mph(&self) -> Option<f64> {
        self.wind_gust_ms.map(ms_to_mph)
    }

    #[must_use]
    pub fn sea_level_pressure_mb(&self) -> Option<f64> {
        self.sea_level_pressure_pa.map(pa_to_mb)
    }

    #[must_use]
    pub fn visibility_mi(&self) -> Option<f64> {
        self.visibility_m.map(m_to_mi)
    }

    /// Compact wind text, e.g. `SSW (200 deg) 15 mph`.
    #[must_use]
    pub fn wind_text(&self) -> Option<String> {
        let mph = self.wind_speed_mph()?;
        Some(match self.wind_direction_deg {
            Some(deg) => format!("{} ({deg:.0} deg) {mph:.0} mph", deg_to_compass(deg)),
            None => format!("{mph:.0} mph"),
        })
    }
}

/// The observation picked for a location.
#[derive(Debug, Clone, PartialEq)]
pub struct StationObservation {
    pub station_id: String,
    /// Distance from the requested location, when the station has coordinates.
    pub distance_miles: Option<f64>,
    pub observation: Observation,
}

/// At-a-glance conditions. Missing values render as `--`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationGlance {
    pub temperature_f: Option<f64>,
    pub dewpoint_f: Option<f64>,
    pub wind: String,
    pub gust_mph: Option<f64>,
    pub pressure_mb: Option<f64>,
    pub visibility_mi: Option<f64>,
    pub conditions: String,
}

impl Default for ObservationGlance {
    fn default() -> Self {
        Self {
            temperature_f: None,
            dewpoint_f: None,
            wind: "--".to_string(),
            gust_mph: None,
            pressure_mb: None,
            visibility_mi: None,
            conditions: "--".to_string(),
        }
    }
}

impl From<&Observation> for ObservationGlance {
    fn from(obs: &Observation) -> Self {
        Self {
            temperature_f: obs.temperature_f(),
            dewpoint_f: obs.dewpoint_f(),
            wind: obs.wind_text().unwrap_or_else(|| "--".to_string()),
            gust_mph: obs.wind_gust_mph(),
            pressure_mb: obs.sea_level_pressure_mb(),
            visibility_mi: obs.visibility_mi(),
            conditions: obs.text_description.clone().unwrap_or_else(|| "--".to_string()),
        }
    }
}

/// Lookups against the NWS points and stations endpoints.
#[derive(Debug)]
pub struct ObservationService<F> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetch> ObservationService<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_base_url(fetcher, NWS_API_BASE)
    }

    pub fn with_base_url(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn point_metadata(&self, lat: f64, lon: f64) -> Result<PointMetadata, UpstreamError> {
        let doc = self.fetcher.get_json(&points_url(&self.base_url, lat, lon), &[])?;
        Ok(PointMetadata::from_json(&doc))
    }

    /// "City, ST" of the nearest place, or the coordinates when unknown.
    pub fn nearest_city_label(&self, lat: f64, lon: f64) -> String {
        match self.point_metadata(lat, lon) {
            Ok(meta) => meta.city_label(),
            Err(e) => {
                warn!("points lookup for {lat:.4},{lon:.4} failed: {}", e);
                None
            }
        }
        .unwrap_or_else(|| format!("{lat:.3}, {lon:.3}"))
    }

    /// Radar serving the location, e.g. `KTLX`.
    pub fn nearest_radar_id(&self, lat: f64, lon: f64) -> Option<String> {
        self.point_metadata(lat, lon).ok()?.radar_station
    }

    /// Best-scoring latest observation among the stations near a location.
    ///
    /// Stations whose latest report cannot be fetched are skipped. Equal
    /// scores go to the closer station.
    pub fn latest_observation_near(&self, lat: f64, lon: f64, now: DateTime<Utc>) -> Option<StationObservation> {
        let meta = match self.point_metadata(lat, lon) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("points lookup for {lat:.4},{lon:.4} failed: {}", e);
                return None;
            }
        };
        let stations_url = meta.observation_stations?;
        let stations = match self.fetcher.get_json(&stations_url, &[]) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("station list unavailable: {}", e);
                return None;
            }
        };

        let mut best: Option<(i64, f64, StationObservation)> = None;
        let features = stations.get("features").and_then(Value::as_array)?;
        for feature in features.iter().take(MAX_CANDIDATE_STATIONS) {
            let Some(station_id) = str_at(feature, &["properties", "stationIdentifier"]) else {
                continue;
            };

            let distance_miles = feature
                .get("geometry")
                .and_then(|g| g.get("coordinates"))
                .and_then(Value::as_array)
                .and_then(|c| Some((c.first()?.as_f64()?, c.get(1)?.as_f64()?)))
                .map(|(st_lon, st_lat)| haversine_miles(lat, lon, st_lat, st_lon));

            let latest_url = format!("{}/stations/{}/observations/latest", self.base_url, station_id);
            let props = match self.fetcher.get_json(&latest_url, &[]) {
                Ok(doc) => doc.get("properties").cloned().unwrap_or(Value::Null),
                Err(e) => {
                    debug!("skipping station {}: {}", station_id, e);
                    continue;
                }
            };
            if !props.as_object().is_some_and(|p| !p.is_empty()) {
                continue;
            }

            let observation = Observation::from_properties(&props);
            let score = observation.score(now);
            let tie_distance = distance_miles.unwrap_or(f64::MAX);

            let better = best
                .as_ref()
                .is_none_or(|(best_score, best_distance, _)| {
                    score > *best_score || (score == *best_score && tie_distance < *best_distance)
                });
            if better {
                best = Some((
                    score,
                    tie_distance,
                    StationObservation {
                        station_id: station_id.to_string(),
                        distance_miles,
                        observation,
                    },
                ));
            }
        }

        let picked = best.map(|(_, _, picked)| picked);
        if let Some(picked) = &picked {
            debug!("picked station {} for {lat:.4},{lon:.4}", picked.station_id);
        }
        picked
    }

    /// Temperature, dewpoint, wind and conditions at a location.
    pub fn glance(&self, lat: f64, lon: f64, now: DateTime<Utc>) -> ObservationGlance {
        self.latest_observation_near(lat, lon, now)
            .map(|picked| ObservationGlance::from(&picked.observation))
            .unwrap_or_default()
    }
}
