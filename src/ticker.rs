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

//! Nationwide severe alert ticker.

use severe_client::{AlertEvent, AlertPayload};

pub const FEED_DOWN_TEXT: &str = "NWS alert feed temporarily unavailable. Please stand by.";
pub const NO_ALERTS_TEXT: &str = "No active Tornado/Severe Thunderstorm watches or warnings nationwide.";

const MIN_SCROLL_SECS: usize = 35;
const MAX_SCROLL_SECS: usize = 140;
const EMPTY_SCROLL_SECS: usize = 55;

/// Characters scrolled per second.
const CHARS_PER_SECOND: usize = 7;

const ITEM_SEPARATOR: &str = "   ";
const ANSI_RESET: &str = "\x1b[0m";

/// Color scheme of one ticker item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PillStyle {
    TornadoWarning,
    SevereWarning,
    TornadoWatch,
    SevereWatch,
    Fallback,
}

impl PillStyle {
    fn for_event(event: AlertEvent) -> Self {
        match event {
            AlertEvent::TornadoWarning => Self::TornadoWarning,
            AlertEvent::SevereThunderstormWarning => Self::SevereWarning,
            AlertEvent::TornadoWatch => Self::TornadoWatch,
            AlertEvent::SevereThunderstormWatch => Self::SevereWatch,
        }
    }

    /// ANSI foreground/background pair.
    fn ansi(self) -> &'static str {
        match self {
            Self::TornadoWarning => "\x1b[1;97;41m",
            Self::SevereWarning => "\x1b[1;30;43m",
            Self::TornadoWatch => "\x1b[1;97;45m",
            Self::SevereWatch => "\x1b[1;30;103m",
            Self::Fallback => "\x1b[1;97;100m",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerItem {
    pub style: PillStyle,
    pub text: String,
    pub pds: bool,
}

impl TickerItem {
    fn fallback(text: &str) -> Self {
        Self {
            style: PillStyle::Fallback,
            text: text.to_string(),
            pds: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    pub items: Vec<TickerItem>,
    /// Time for one full scroll of the items.
    pub duration_secs: usize,
}

/// Scroll time for a run of items: longer runs scroll longer, within bounds.
pub fn scroll_duration_secs(items: &[TickerItem]) -> usize {
    let total_chars: usize = items.iter().map(|item| item.text.chars().count()).sum();
    if total_chars == 0 {
        return EMPTY_SCROLL_SECS;
    }
    (total_chars / CHARS_PER_SECOND).clamp(MIN_SCROLL_SECS, MAX_SCROLL_SECS)
}

/// Ticker for an alert payload, with a fallback line when the feed is down or quiet.
pub fn build_ticker(payload: &AlertPayload) -> Ticker {
    let items = if payload.had_error {
        vec![TickerItem::fallback(FEED_DOWN_TEXT)]
    } else if payload.alerts.is_empty() {
        vec![TickerItem::fallback(NO_ALERTS_TEXT)]
    } else {
        payload
            .alerts
            .iter()
            .map(|alert| TickerItem {
                style: PillStyle::for_event(alert.event),
                text: alert.display_text.clone(),
                pds: alert.pds,
            })
            .collect()
    };

    Ticker {
        duration_secs: scroll_duration_secs(&items),
        items,
    }
}

impl Ticker {
    /// One line of pills. PDS items are marked and colors are optional.
    pub fn render_line(&self, color: bool) -> String {
        self.items
            .iter()
            .map(|item| {
                let text = if item.pds {
                    format!("PDS {}", item.text)
                } else {
                    item.text.clone()
                };
                if color {
                    format!("{} {} {}", item.style.ansi(), text, ANSI_RESET)
                } else {
                    format!("[ {text} ]")
                }
            })
            .collect::<Vec<_>>()
            .join(ITEM_SEPARATOR)
    }
}
