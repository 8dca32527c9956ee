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

//! Canned central Oklahoma outbreak for demos and offline runs.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use super::{normalize_features, SevereAlert};

/// One scripted feed entry: id, event, area, minutes until it ends, PDS headline.
type Scripted = (&'static str, &'static str, &'static str, i64, bool);

const WATCH_201: Scripted = (
    "mock-watch-201",
    "Tornado Watch",
    "Caddo, OK; Canadian, OK; Cleveland, OK; Grady, OK; Kingfisher, OK; Logan, OK; McClain, OK; Oklahoma, OK",
    360,
    true,
);

const WATCH_202: Scripted = (
    "mock-watch-202",
    "Severe Thunderstorm Watch",
    "Carter, OK; Garvin, OK; Love, OK; Murray, OK; Cooke, TX; Grayson, TX",
    300,
    false,
);

const WATCH_203: Scripted = (
    "mock-watch-203",
    "Tornado Watch",
    "Creek, OK; Lincoln, OK; Okfuskee, OK; Pottawatomie, OK; Seminole, OK; Tulsa, OK",
    420,
    false,
);

/// Outbreak frames in replay order.
const FRAMES: &[&[Scripted]] = &[
    &[WATCH_201, WATCH_202],
    &[
        ("mock-tor-1", "Tornado Warning", "Caddo, OK; Grady, OK", 45, false),
        ("mock-svr-1", "Severe Thunderstorm Warning", "Kingfisher, OK", 40, false),
        WATCH_201,
        WATCH_202,
    ],
    &[
        ("mock-tor-2", "Tornado Warning", "Grady, OK; McClain, OK", 50, true),
        ("mock-tor-3", "Tornado Warning", "Canadian, OK", 35, false),
        ("mock-svr-2", "Severe Thunderstorm Warning", "Logan, OK", 45, false),
        // The feed repeats updated products; the normalizer keeps the first copy.
        ("mock-tor-2", "Tornado Warning", "Grady, OK; McClain, OK", 55, true),
        WATCH_201,
        WATCH_202,
    ],
    &[
        ("mock-tor-4", "Tornado Warning", "Cleveland, OK; Oklahoma, OK", 40, true),
        ("mock-tor-5", "Tornado Warning", "Lincoln, OK", 45, false),
        ("mock-svr-3", "Severe Thunderstorm Warning", "Pottawatomie, OK; Seminole, OK", 45, false),
        WATCH_201,
        WATCH_203,
        WATCH_202,
    ],
    &[
        ("mock-tor-6", "Tornado Warning", "Okfuskee, OK; Creek, OK", 40, false),
        ("mock-svr-4", "Severe Thunderstorm Warning", "Tulsa, OK", 45, false),
        WATCH_203,
    ],
];

/// Deterministic replay of the scripted outbreak.
///
/// The frame shown is `step % frame_count`, and every end time is an offset
/// from `seed_time`, so equal inputs always give equal alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFeed {
    pub step: u64,
    pub seed_time: DateTime<Utc>,
}

impl MockFeed {
    #[must_use]
    pub fn new(step: u64, seed_time: DateTime<Utc>) -> Self {
        Self { step, seed_time }
    }

    #[must_use]
    pub fn frame_count() -> usize {
        FRAMES.len()
    }

    /// Index of the frame this step replays.
    #[must_use]
    pub fn frame_index(&self) -> usize {
        let count = FRAMES.len() as u64;
        // The remainder is below the frame count, which is a usize.
        usize::try_from(self.step % count).unwrap_or(0)
    }

    /// Raw feed features of the current frame, shaped like the live feed.
    #[must_use]
    pub fn features(&self) -> Vec<Value> {
        FRAMES[self.frame_index()]
            .iter()
            .map(|&(id, event, area, minutes, pds)| {
                let ends = self.seed_time + Duration::minutes(minutes);
                let headline = if pds {
                    format!("{event} - THIS IS A PARTICULARLY DANGEROUS SITUATION")
                } else {
                    event.to_string()
                };
                json!({
                    "type": "Feature",
                    "properties": {
                        "id": id,
                        "event": event,
                        "status": "Actual",
                        "areaDesc": area,
                        "headline": headline,
                        "ends": ends.to_rfc3339(),
                    }
                })
            })
            .collect()
    }

    /// Alerts of the current frame, normalized like the live feed.
    #[must_use]
    pub fn alerts(&self) -> Vec<SevereAlert> {
        normalize_features(&self.features())
    }

    /// The same replay one step later.
    #[must_use]
    pub fn next_step(self) -> Self {
        Self {
            step: self.step.wrapping_add(1),
            ..self
        }
    }
}
