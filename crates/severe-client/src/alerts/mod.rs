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

//! Nationwide severe watch and warning feed.
//!
//! The NWS active-alerts feed carries every product type. [`normalize_features`]
//! keeps the four severe watch/warning events, drops test and exercise
//! messages, removes duplicates and renders a one-line display string per
//! alert. [`MockFeed`] replays canned outbreak frames through the same path.

mod mock;

pub use mock::MockFeed;

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::America::Chicago;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::fetch::{Fetch, UpstreamError};

/// Active alerts endpoint of the NWS API.
pub const NWS_ALERTS_URL: &str = "https://api.weather.gov/alerts/active";

/// Headline phrase marking a particularly dangerous situation.
pub const PDS_PHRASE: &str = "PARTICULARLY DANGEROUS SITUATION";

/// Longest area description shown before truncation.
const MAX_AREA_CHARS: usize = 120;

/// The four event types the dashboard tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertEvent {
    #[serde(rename = "Tornado Warning")]
    TornadoWarning,
    #[serde(rename = "Severe Thunderstorm Warning")]
    SevereThunderstormWarning,
    #[serde(rename = "Tornado Watch")]
    TornadoWatch,
    #[serde(rename = "Severe Thunderstorm Watch")]
    SevereThunderstormWatch,
}

impl AlertEvent {
    pub const ALL: [Self; 4] = [
        Self::TornadoWarning,
        Self::SevereThunderstormWarning,
        Self::TornadoWatch,
        Self::SevereThunderstormWatch,
    ];

    /// Event name exactly as the feed spells it.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TornadoWarning => "Tornado Warning",
            Self::SevereThunderstormWarning => "Severe Thunderstorm Warning",
            Self::TornadoWatch => "Tornado Watch",
            Self::SevereThunderstormWatch => "Severe Thunderstorm Watch",
        }
    }

    /// Exact, case-sensitive match against the allow-list.
    #[must_use]
    pub fn from_event(event: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == event)
    }

    /// Upper-case ticker name.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::TornadoWarning => "TORNADO WARNING",
            Self::SevereThunderstormWarning => "SEVERE TSTM WARNING",
            Self::TornadoWatch => "TORNADO WATCH",
            Self::SevereThunderstormWatch => "SEVERE TSTM WATCH",
        }
    }

    #[must_use]
    pub fn is_watch(self) -> bool {
        matches!(self, Self::TornadoWatch | Self::SevereThunderstormWatch)
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized severe alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SevereAlert {
    pub event: AlertEvent,
    #[serde(rename = "areaDesc")]
    pub area_desc: String,
    /// End of validity, taken from `ends` or else `expires`.
    pub ends: Option<DateTime<Utc>>,
    /// Feed identifier; alerts without one are never deduplicated.
    pub id: Option<String>,
    pub pds: bool,
    pub display_text: String,
}

/// Alerts of one fetch, with whether the feed could be read at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertPayload {
    pub alerts: Vec<SevereAlert>,
    pub had_error: bool,
}

/// Parse an RFC 3339 timestamp such as `2024-05-06T21:45:00-05:00`.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Wall-clock time in Central time, e.g. `4:05 PM CT`.
#[must_use]
pub fn format_central_time(at: DateTime<Utc>) -> String {
    let text = at.with_timezone(&Chicago).format("%I:%M %p CT").to_string();
    match text.strip_prefix('0') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Area description trimmed for the ticker. Empty areas read "U.S.".
#[must_use]
pub fn short_area(area_desc: &str) -> String {
    let text = area_desc.trim();
    if text.is_empty() {
        return "U.S.".to_string();
    }
    if text.chars().count() <= MAX_AREA_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_AREA_CHARS - 1).collect();
    format!("{}...", head.trim_end())
}

/// One-line ticker text: event, area and, when known, the end time.
#[must_use]
pub fn display_text(event: AlertEvent, area_desc: &str, ends: Option<DateTime<Utc>>) -> String {
    let area = short_area(area_desc);
    match ends {
        None => format!("{} - {}", event.short_name(), area),
        Some(at) => {
            let tail = if event.is_watch() { "Until" } else { "Expires" };
            format!("{} - {} - {} {}", event.short_name(), area, tail, format_central_time(at))
        }
    }
}

fn text_field<'a>(properties: &'a Value, key: &str) -> &'a str {
    properties.get(key).and_then(Value::as_str).map_or("", str::trim)
}

fn is_pds(properties: &Value) -> bool {
    ["headline", "description"].iter().any(|key| {
        text_field(properties, key)
            .to_uppercase()
            .contains(PDS_PHRASE)
    })
}

/// Normalize raw feed features into severe alerts, in feed order.
///
/// Keeps only the four tracked events, drops entries whose `status` is
/// present and not `Actual`, and keeps the first of several entries
/// sharing an `id` (or `@id`).
#[must_use]
pub fn normalize_features(features: &[Value]) -> Vec<SevereAlert> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut alerts = Vec::new();

    for feature in features {
        let Some(properties) = feature.get("properties").filter(|p| p.is_object()) else {
            continue;
        };

        let Some(event) = AlertEvent::from_event(text_field(properties, "event")) else {
            continue;
        };

        let status = text_field(properties, "status");
        if !status.is_empty() && status != "Actual" {
            debug!("dropping {} with status {}", event, status);
            continue;
        }

        let id = Some(text_field(properties, "id"))
            .filter(|id| !id.is_empty())
            .or_else(|| Some(text_field(properties, "@id")).filter(|id| !id.is_empty()));
        if let Some(id) = id {
            if !seen.insert(id) {
                continue;
            }
        }

        let area_desc = text_field(properties, "areaDesc").to_string();
        let end_raw = Some(text_field(properties, "ends"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| text_field(properties, "expires"));
        let ends = parse_timestamp(end_raw);

        alerts.push(SevereAlert {
            event,
            display_text: display_text(event, &area_desc, ends),
            area_desc,
            ends,
            id: id.map(str::to_string),
            pds: is_pds(properties),
        });
    }

    alerts
}

/// Normalize a whole feed document. A document without `features` has no alerts.
#[must_use]
pub fn normalize_collection(doc: &Value) -> Vec<SevereAlert> {
    doc.get("features")
        .and_then(Value::as_array)
        .map(|features| normalize_features(features))
        .unwrap_or_default()
}

/// Live severe-alert feed.
#[derive(Debug)]
pub struct AlertFeed<F> {
    fetcher: F,
    url: String,
}

impl<F: Fetch> AlertFeed<F> {
    /// Feed against the public NWS endpoint.
    pub fn new(fetcher: F) -> Self {
        Self::with_url(fetcher, NWS_ALERTS_URL)
    }

    pub fn with_url(fetcher: F, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }

    /// Fetch and normalize the active alerts.
    pub fn fetch_active_alerts(&self) -> Result<Vec<SevereAlert>, UpstreamError> {
        let doc = self.fetcher.get_json(&self.url, &[])?;
        let alerts = normalize_collection(&doc);
        debug!("{} active severe alerts", alerts.len());
        Ok(alerts)
    }

    /// Active alerts, with a feed failure reported as `had_error` instead of an error.
    pub fn alert_payload(&self) -> AlertPayload {
        match self.fetch_active_alerts() {
            Ok(alerts) => AlertPayload {
                alerts,
                had_error: false,
            },
            Err(e) => {
                warn!("alert feed unavailable: {}", e);
                AlertPayload {
                    alerts: Vec::new(),
                    had_error: true,
                }
            }
        }
    }
}
