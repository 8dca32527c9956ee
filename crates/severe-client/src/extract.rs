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

//! Label and percent extraction from outlook feature properties.
//!
//! The map service has renamed its attribute fields several times, so
//! properties are read as a free-form JSON object and searched through
//! ordered fallback lists instead of a fixed record type.
//!
//! Percent extraction is best-effort: its last fallback scans property
//! values in the order the service listed them.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Property bag of one feature.
pub type Properties = Map<String, Value>;

/// Candidate label fields, most specific first. Matched case-insensitively.
const LABEL_FIELDS: &[&str] = &["label", "cat", "risk", "name"];

/// Fields that usually carry the percent as a plain number.
const PERCENT_FIELDS: &[&str] = &["dn", "percent", "prob", "probability"];

lazy_static! {
    static ref LEADING_NUMBER: Regex = Regex::new(r"(\d+)\s*%?").expect("valid regex");
}

/// Categorical convective risk, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoricalRisk {
    Tstm = 1,
    Mrgl = 2,
    Slgt = 3,
    Enh = 4,
    Mdt = 5,
    High = 6,
}

impl CategoricalRisk {
    pub const ALL: [Self; 6] = [Self::Tstm, Self::Mrgl, Self::Slgt, Self::Enh, Self::Mdt, Self::High];

    /// Severity rank, 1 (TSTM) through 6 (HIGH).
    #[must_use]
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Abbreviation used on SPC products.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tstm => "TSTM",
            Self::Mrgl => "MRGL",
            Self::Slgt => "SLGT",
            Self::Enh => "ENH",
            Self::Mdt => "MDT",
            Self::High => "HIGH",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Tstm => "General Thunderstorms",
            Self::Mrgl => "Marginal",
            Self::Slgt => "Slight",
            Self::Enh => "Enhanced",
            Self::Mdt => "Moderate",
            Self::High => "High",
        }
    }

    /// Parse an abbreviation, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|risk| risk.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for CategoricalRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoricalRisk {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("unknown categorical risk '{s}'"))
    }
}

/// Rank of a raw label; unknown labels rank 0.
#[must_use]
pub fn risk_rank(label: &str) -> u8 {
    CategoricalRisk::from_label(label).map_or(0, CategoricalRisk::rank)
}

/// Case-insensitive property lookup. An exact-case key wins over other spellings.
fn property<'a>(properties: &'a Properties, field: &str) -> Option<&'a Value> {
    properties.get(field).or_else(|| {
        properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(field))
            .map(|(_, value)| value)
    })
}

/// Render a scalar property as trimmed text; empty and non-scalar values yield `None`.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// First non-empty label among the known label fields, or an empty string.
#[must_use]
pub fn extract_label(properties: &Properties) -> String {
    LABEL_FIELDS
        .iter()
        .find_map(|field| property(properties, field).and_then(scalar_text))
        .unwrap_or_default()
}

fn valid_percent(value: u64) -> Option<u8> {
    u8::try_from(value).ok().filter(|p| (1..=100).contains(p))
}

/// Percent carried directly by a JSON value: a number or a numeric string
/// with an optional trailing `%`.
fn value_percent(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => {
            if let Some(int) = n.as_u64() {
                return valid_percent(int);
            }
            let float = n.as_f64()?;
            if float > 0.0 && float <= 100.0 {
                // Truncation is intended: 15.0 and 15.7 both read as 15.
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "range checked above")]
                let truncated = float.trunc() as u64;
                valid_percent(truncated)
            } else {
                None
            }
        }
        Value::String(s) => {
            let digits = s.trim().trim_end_matches('%').trim_end();
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse().ok().and_then(valid_percent)
        }
        _ => None,
    }
}

fn is_identifier_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    matches!(key.as_str(), "objectid" | "fid" | "id") || key.starts_with("shape_")
}

/// Percent value of a feature, in (0, 100].
///
/// Tried in order: the leading number of the label ("15%" reads as 15),
/// the well-known percent fields, then every other property value in
/// listing order. Zero and values above 100 are treated as absent.
#[must_use]
pub fn extract_percent(properties: &Properties) -> Option<u8> {
    let label = extract_label(properties);
    let from_label = LEADING_NUMBER
        .captures(&label)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse::<u64>().ok())
        .and_then(valid_percent);
    if from_label.is_some() {
        return from_label;
    }

    if let Some(pct) = PERCENT_FIELDS
        .iter()
        .find_map(|field| property(properties, field).and_then(value_percent))
    {
        return Some(pct);
    }

    properties
        .iter()
        .filter(|(key, _)| !is_identifier_key(key))
        .find_map(|(_, value)| value_percent(value))
}
