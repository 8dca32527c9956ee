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

//! SPC convective outlook lookups for a single location.
//!
//! [`OutlookService`] resolves layers, fetches their GeoJSON, filters to the
//! features containing the location and reduces them to one value per
//! day and hazard. Upstream failures blank the affected field only; the
//! summaries always come back complete.

mod feature;
mod service;

pub use feature::{GeoFeature, OutlookLayer};
pub use service::{OutlookService, DEFAULT_SPC_BASE};

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::extract::CategoricalRisk;

/// Rejected input coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// Check that `(lat, lon)` is a finite point on the globe.
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), CoordinateError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(CoordinateError::Latitude(lat));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(CoordinateError::Longitude(lon));
    }
    Ok(())
}

/// Outlook forecast day, 1 through 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForecastDay(u8);

impl ForecastDay {
    pub const DAY1: Self = Self(1);
    pub const DAY2: Self = Self(2);
    pub const DAY3: Self = Self(3);

    /// `None` outside 1..=8.
    #[must_use]
    pub fn new(day: u8) -> Option<Self> {
        (1..=8).contains(&day).then_some(Self(day))
    }

    #[must_use]
    pub fn number(self) -> u8 {
        self.0
    }

    /// Label used to look the day up in the layer catalog, e.g. "Day 4".
    #[must_use]
    pub fn label(self) -> String {
        format!("Day {}", self.0)
    }
}

impl fmt::Display for ForecastDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {}", self.0)
    }
}

/// Severe hazard with its own Day 1/2 probability layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hazard {
    Tornado,
    Wind,
    Hail,
}

impl Hazard {
    pub const ALL: [Self; 3] = [Self::Tornado, Self::Wind, Self::Hail];

    /// Token that appears in the hazard's layer names.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Tornado => "tornado",
            Self::Wind => "wind",
            Self::Hail => "hail",
        }
    }

    /// Short column label, e.g. "TOR".
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Tornado => "TOR",
            Self::Wind => "WIND",
            Self::Hail => "HAIL",
        }
    }
}

/// Categorical outlook value of one day at a location.
///
/// `NoRisk` means the layer was read and no ranked polygon covers the
/// point. `Unavailable` means the layer could not be resolved or fetched.
/// Both serialize as the `"NONE"` marker; only `Display` tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCategory {
    Risk(CategoricalRisk),
    NoRisk,
    Unavailable,
}

impl DayCategory {
    pub const NONE_MARKER: &'static str = "NONE";

    /// Value handed to the UI: the risk abbreviation or `"NONE"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Risk(risk) => risk.as_str(),
            Self::NoRisk | Self::Unavailable => Self::NONE_MARKER,
        }
    }

    #[must_use]
    pub fn risk(self) -> Option<CategoricalRisk> {
        match self {
            Self::Risk(risk) => Some(risk),
            Self::NoRisk | Self::Unavailable => None,
        }
    }

    #[must_use]
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

impl fmt::Display for DayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("—"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl Serialize for DayCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Per-hazard and probabilistic percentages at a location.
///
/// Every key is always present; `None` means no polygon covers the point
/// or the layer was unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocationSummary {
    pub d1_tor: Option<u8>,
    pub d1_wind: Option<u8>,
    pub d1_hail: Option<u8>,
    pub d2_tor: Option<u8>,
    pub d2_wind: Option<u8>,
    pub d2_hail: Option<u8>,
    pub d3_prob: Option<u8>,
    pub d4_prob: Option<u8>,
    pub d5_prob: Option<u8>,
    pub d6_prob: Option<u8>,
    pub d7_prob: Option<u8>,
}

impl LocationSummary {
    /// Every field with its key, in display order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, Option<u8>); 11] {
        [
            ("d1_tor", self.d1_tor),
            ("d1_wind", self.d1_wind),
            ("d1_hail", self.d1_hail),
            ("d2_tor", self.d2_tor),
            ("d2_wind", self.d2_wind),
            ("d2_hail", self.d2_hail),
            ("d3_prob", self.d3_prob),
            ("d4_prob", self.d4_prob),
            ("d5_prob", self.d5_prob),
            ("d6_prob", self.d6_prob),
            ("d7_prob", self.d7_prob),
        ]
    }

    /// Look a field up by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Option<u8>> {
        self.entries()
            .into_iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value)
    }

    /// Hazard percent for day 1 or 2.
    #[must_use]
    pub fn hazard(&self, day: ForecastDay, hazard: Hazard) -> Option<u8> {
        match (day.number(), hazard) {
            (1, Hazard::Tornado) => self.d1_tor,
            (1, Hazard::Wind) => self.d1_wind,
            (1, Hazard::Hail) => self.d1_hail,
            (2, Hazard::Tornado) => self.d2_tor,
            (2, Hazard::Wind) => self.d2_wind,
            (2, Hazard::Hail) => self.d2_hail,
            _ => None,
        }
    }
}

/// Categorical days 1-3 and probabilistic days 4-7 at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoricalSummary {
    pub day1_cat: DayCategory,
    pub day2_cat: DayCategory,
    pub day3_cat: DayCategory,
    pub day4_pct: Option<u8>,
    pub day5_pct: Option<u8>,
    pub day6_pct: Option<u8>,
    pub day7_pct: Option<u8>,
}

/// SPC outlook graphic for a day, 1 through 7.
#[must_use]
pub fn graphic_url(day: ForecastDay) -> Option<String> {
    match day.number() {
        n @ 1..=3 => Some(format!("https://www.spc.noaa.gov/products/outlook/day{n}otlk.gif")),
        n @ 4..=7 => Some(format!("https://www.spc.noaa.gov/products/exper/day4-8/day{n}prob.gif")),
        _ => None,
    }
}
