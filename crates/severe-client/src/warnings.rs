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

//! Year-to-date national warning counts from the Iowa Environmental Mesonet.
//!
//! Tornado warnings are counted from the VTEC archive CSV as unique events;
//! severe thunderstorm warnings come from the Cow verification summary.
//! Both are unofficial tallies.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value;
use thiserror::Error;

use crate::fetch::{Fetch, UpstreamError};

/// IEM watch/warning archive export.
pub const IEM_WATCHWARN_URL: &str = "https://mesonet.agron.iastate.edu/cgi-bin/request/gis/watchwarn.py";

/// IEM Cow storm-based warning verification API.
pub const IEM_COW_URL: &str = "https://mesonet.agron.iastate.edu/api/1/cow.json";

const WFO_COLUMNS: &[&str] = &["wfo", "office", "wfo_id"];
const ETN_COLUMNS: &[&str] = &["etn", "eventid", "event_id"];
const PHENOMENA_COLUMNS: &[&str] = &["phenomena", "phen"];
const SIGNIFICANCE_COLUMNS: &[&str] = &["significance", "sig"];
const YEAR_COLUMNS: &[&str] = &["year"];

/// Errors raised while counting warnings.
#[derive(Debug, Error)]
pub enum CountError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unexpected response schema: {0}")]
    Schema(String),
}

/// Index of the first header matching one of `aliases`, ignoring case.
fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(alias))
    })
}

/// Count distinct warning events in a watchwarn CSV export.
///
/// An event is identified by office and event tracking number, plus year,
/// phenomena and significance when those columns exist.
pub fn count_unique_events(csv_text: &str) -> Result<usize, CountError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers = reader.headers()?.clone();
    let wfo = find_column(&headers, WFO_COLUMNS);
    let etn = find_column(&headers, ETN_COLUMNS);
    let (Some(wfo), Some(etn)) = (wfo, etn) else {
        let columns: Vec<&str> = headers.iter().collect();
        return Err(CountError::Schema(format!("missing WFO/ETN columns in {columns:?}")));
    };

    let mut key_columns = vec![wfo, etn];
    key_columns.extend(
        [YEAR_COLUMNS, PHENOMENA_COLUMNS, SIGNIFICANCE_COLUMNS]
            .iter()
            .filter_map(|aliases| find_column(&headers, aliases)),
    );

    let mut events: HashSet<Vec<String>> = HashSet::new();
    for record in reader.records() {
        let record = record?;
        let key = key_columns
            .iter()
            .map(|&col| record.get(col).unwrap_or_default().trim().to_string())
            .collect();
        events.insert(key);
    }

    Ok(events.len())
}

/// Tornado warning events issued nationally in `year`.
pub fn fetch_tor_warning_count_ytd<F: Fetch>(fetcher: &F, year: i32) -> Result<usize, CountError> {
    let sts = format!("{year}-01-01T00:00Z");
    let ets = format!("{}-01-01T00:00Z", year + 1);
    let query = [
        ("accept", "csv"),
        ("sts", sts.as_str()),
        ("ets", ets.as_str()),
        ("limitps", "yes"),
        ("phenomena", "TO"),
        ("significance", "W"),
    ];

    let body = fetcher.get_text(IEM_WATCHWARN_URL, &query)?;
    let count = count_unique_events(&body)?;
    debug!("{} tornado warnings so far in {}", count, year);
    Ok(count)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "checked finite and non-negative")]
fn whole_count(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.trunc() as u64)
}

/// `stats.events_total` of a Cow response.
pub fn cow_events_total(doc: &Value) -> Result<u64, CountError> {
    let total = doc
        .get("stats")
        .and_then(|stats| stats.get("events_total"))
        .ok_or_else(|| CountError::Schema("missing stats.events_total".to_string()))?;

    total
        .as_u64()
        .or_else(|| total.as_f64().and_then(whole_count))
        .ok_or_else(|| CountError::Schema(format!("stats.events_total is not a count: {total}")))
}

/// Severe thunderstorm warnings issued nationally from the start of `year` until `now`.
pub fn fetch_svr_warning_count_ytd<F: Fetch>(
    fetcher: &F,
    year: i32,
    now: DateTime<Utc>,
) -> Result<u64, CountError> {
    let begin = format!("{year}-01-01T00:00Z");
    let end = now.format("%Y-%m-%dT%H:%MZ").to_string();
    let query = [
        ("phenomena", "SV"),
        ("begints", begin.as_str()),
        ("endts", end.as_str()),
    ];

    let doc = fetcher.get_json(IEM_COW_URL, &query)?;
    let total = cow_events_total(&doc)?;
    debug!("{} severe thunderstorm warnings so far in {}", total, year);
    Ok(total)
}
