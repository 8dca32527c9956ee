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

//! Plain-text rendering of summaries for the terminal.

use severe_client::{
    CategoricalSummary, ForecastDay, Hazard, LocationSummary, ObservationGlance, Product, Satellite,
    SatelliteView, Sector, SevereAlert,
};

const MISSING: &str = "--";

/// Percent cell; a missing value reads as 0%.
pub fn percent(value: Option<u8>) -> String {
    format!("{}%", value.unwrap_or(0))
}

fn reading(value: Option<f64>, unit: &str, precision: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.precision$}{unit}"))
}

fn temperature(value: Option<f64>) -> String {
    reading(value, "°F", 0)
}

fn join_lines(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Outlook table for one location.
pub fn render_outlook(label: &str, categorical: &CategoricalSummary, summary: &LocationSummary) -> String {
    let mut lines = vec![format!("SPC outlook for {label}"), String::new()];

    let days = [
        (ForecastDay::DAY1, categorical.day1_cat),
        (ForecastDay::DAY2, categorical.day2_cat),
        (ForecastDay::DAY3, categorical.day3_cat),
    ];
    for (day, category) in days {
        let category = category.to_string();
        let mut line = format!("{day}  {category:<5}");
        if day == ForecastDay::DAY3 {
            line.push_str(&format!("  ANY {:>4}", percent(summary.d3_prob)));
        } else {
            for hazard in Hazard::ALL {
                line.push_str(&format!("  {} {:>4}", hazard.short_name(), percent(summary.hazard(day, hazard))));
            }
        }
        lines.push(line);
    }

    let extended = [
        (4, categorical.day4_pct),
        (5, categorical.day5_pct),
        (6, categorical.day6_pct),
        (7, categorical.day7_pct),
    ];
    lines.extend(extended.map(|(day, pct)| format!("Day {day}  ANY {:>4}", percent(pct))));

    if let Some(risk) = categorical.day1_cat.risk() {
        lines.push(format!("Today: {} risk", risk.display_name()));
    }
    join_lines(&lines)
}

/// One line per alert, or a note when there are none.
pub fn render_alerts(alerts: &[SevereAlert], had_error: bool) -> String {
    if had_error {
        return "Alert feed unavailable.\n".to_string();
    }
    if alerts.is_empty() {
        return "No active severe watches or warnings.\n".to_string();
    }

    let lines: Vec<String> = alerts
        .iter()
        .map(|alert| {
            let marker = if alert.pds { "PDS " } else { "" };
            format!("{marker}{}", alert.display_text)
        })
        .collect();
    join_lines(&lines)
}

/// Latest conditions near the location.
pub fn render_glance(label: &str, glance: &ObservationGlance) -> String {
    format!(
        "Conditions near {label}\n  Temp {}  Dewpoint {}\n  Wind {}  Gust {}\n  Pressure {}  Visibility {}\n  {}\n",
        temperature(glance.temperature_f),
        temperature(glance.dewpoint_f),
        glance.wind,
        reading(glance.gust_mph, " mph", 0),
        reading(glance.pressure_mb, " mb", 1),
        reading(glance.visibility_mi, " mi", 1),
        glance.conditions,
    )
}

/// Year-to-date national warning counts; a failed count shows `--`.
pub fn render_counts(year: i32, tornado: Option<usize>, severe: Option<u64>) -> String {
    let show = |value: Option<String>| value.unwrap_or_else(|| MISSING.to_string());
    format!(
        "{year} warnings to date\n  Tornado {}\n  Severe thunderstorm {}\n",
        show(tornado.map(|n| n.to_string())),
        show(severe.map(|n| n.to_string())),
    )
}

/// Satellite view, its image URL and whether the image is being served.
pub fn render_satellite(view: SatelliteView, url: &str, available: bool) -> String {
    let status = if available {
        "available"
    } else {
        "not responding, try again or switch product/sector"
    };
    join_lines(&[view.to_string(), format!("  {url}"), format!("  {status}")])
}

/// Every satellite, sector and product as `CODE  Label`.
pub fn render_satellite_choices() -> String {
    let mut lines = vec!["Satellites".to_string()];
    lines.extend(Satellite::ALL.map(|s| format!("  {:<14}{}", s.code(), s.label())));
    lines.push("Sectors".to_string());
    lines.extend(Sector::ALL.map(|s| format!("  {:<14}{}", s.code(), s.label())));
    lines.push("Products".to_string());
    lines.extend(Product::ALL.map(|p| format!("  {:<14}{}", p.code(), p.label())));
    join_lines(&lines)
}
