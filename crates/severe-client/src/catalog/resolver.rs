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

//! Layer resolution by fuzzy name matching.
//!
//! A layer matches a query when its lowercased name mentions the forecast
//! day and contains every required token as a substring. The first match
//! in listing order wins. Upstream has used both "Day 1" and "Day1" in
//! layer names, so the day check accepts either spelling.

use log::{debug, warn};

use super::{LayerId, ServiceCatalog};

/// Ordered list of required name tokens.
pub type TokenSet<'a> = &'a [&'a str];

/// Extract the day number from a label such as "Day 3" or "day3".
fn day_number(day_label: &str) -> Option<u32> {
    let lower = day_label.to_lowercase();
    let digits: String = lower
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Whether a lowercased layer name mentions the given forecast day.
///
/// Accepts `day` followed by optional whitespace, `_` or `-`, then the
/// number, which must not run on into another digit ("day 1" never matches
/// "day 10").
#[must_use]
pub fn day_matches(name: &str, day: u32) -> bool {
    let wanted = day.to_string();
    let lower = name.to_lowercase();

    lower.match_indices("day").any(|(idx, _)| {
        let rest = lower[idx + 3..].trim_start_matches(|c: char| c.is_whitespace() || c == '_' || c == '-');
        rest.strip_prefix(wanted.as_str())
            .is_some_and(|tail| !tail.starts_with(|c: char| c.is_ascii_digit()))
    })
}

fn name_matches(name: &str, day: u32, tokens: TokenSet<'_>) -> bool {
    let lower = name.to_lowercase();
    day_matches(&lower, day) && tokens.iter().all(|token| lower.contains(&token.to_lowercase()))
}

impl ServiceCatalog {
    /// Resolve one layer for `day_label` whose name contains every token.
    ///
    /// Returns `None` when nothing matches or the day label carries no
    /// number. When several layers match, the first in listing order is
    /// returned and the ambiguity is logged.
    #[must_use]
    pub fn resolve(&self, day_label: &str, tokens: TokenSet<'_>) -> Option<LayerId> {
        let day = day_number(day_label)?;

        let mut matches = self
            .layers()
            .iter()
            .filter(|layer| name_matches(&layer.name, day, tokens));

        let first = matches.next()?;
        let others: Vec<&str> = matches.map(|layer| layer.name.as_str()).collect();
        if !others.is_empty() {
            warn!(
                "{} {:?}: picked layer {} ({:?}) over {:?}",
                day_label, tokens, first.id, first.name, others
            );
        }

        debug!("{} {:?} -> layer {}", day_label, tokens, first.id);
        Some(first.id)
    }

    /// Try each token set in order and return the first layer that resolves.
    #[must_use]
    pub fn resolve_any(&self, day_label: &str, token_sets: &[TokenSet<'_>]) -> Option<LayerId> {
        let found = token_sets
            .iter()
            .find_map(|tokens| self.resolve(day_label, tokens));
        if found.is_none() {
            debug!("{} {:?}: no matching layer", day_label, token_sets);
        }
        found
    }
}
