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

//! Severe weather client library for SPC outlooks and NWS alert feeds.
//!
//! This library answers "what is the severe risk here?" for a single
//! location, and "what severe watches and warnings are active?" nationwide.
//! It is organized in layers that can be used independently:
//!
//! - **Fetch layer**: blocking HTTP behind the [`Fetch`] trait, with a
//!   bounded time-to-live cache
//! - **Catalog layer**: the SPC map service layer listing and name-based
//!   layer resolution
//! - **Geometry and extraction**: point-in-polygon tests and label/percent
//!   reading from free-form feature properties
//! - **Outlook layer**: per-day and per-hazard point summaries
//! - **Alerts layer**: severe watch/warning normalization, plus a scripted
//!   mock feed
//! - **Imagery**: GOES satellite image URLs with an availability check, and
//!   the SPC mesoanalysis link
//!
//! # Quick Start
//!
//! Use the [`Client`] type for full-stack operation:
//!
//! ```no_run
//! use severe_client::{Client, ClientConfig};
//!
//! let client = Client::new(ClientConfig::default()).expect("http client");
//!
//! let summary = client.outlooks().summarize_location(35.2226, -97.4395).expect("valid point");
//! println!("Day 1 tornado: {:?}", summary.d1_tor);
//!
//! for alert in client.alerts().alert_payload().alerts {
//!     println!("{}", alert.display_text);
//! }
//! ```
//!
//! # Using Individual Layers
//!
//! ## Geometry Only
//!
//! ```
//! use severe_client::geometry::point_in_polygon;
//!
//! let ring = vec![[-98.0, 35.0], [-97.0, 35.0], [-97.0, 36.0], [-98.0, 36.0], [-98.0, 35.0]];
//! // Longitude first.
//! assert!(point_in_polygon(-97.44, 35.22, &[ring]));
//! ```
//!
//! ## Extraction Only
//!
//! ```
//! use severe_client::extract::{extract_percent, Properties};
//!
//! let mut properties = Properties::new();
//! properties.insert("LABEL".to_string(), "15%".into());
//! assert_eq!(extract_percent(&properties), Some(15));
//! ```

pub mod alerts;
pub mod catalog;
pub mod extract;
pub mod fetch;
pub mod geometry;
pub mod observations;
pub mod outlook;
pub mod satellite;
pub mod warnings;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use alerts::{AlertEvent, AlertFeed, AlertPayload, MockFeed, SevereAlert, NWS_ALERTS_URL};
pub use catalog::{LayerId, LayerInfo, ServiceCatalog};
pub use extract::CategoricalRisk;
pub use fetch::{CachedFetcher, Fetch, FetchConfig, HttpFetcher, TtlCache, UpstreamError};
pub use observations::{ObservationGlance, ObservationService, PointMetadata, NWS_API_BASE};
pub use outlook::{
    graphic_url, CategoricalSummary, CoordinateError, DayCategory, ForecastDay, Hazard,
    LocationSummary, OutlookService, DEFAULT_SPC_BASE,
};
pub use satellite::{
    latest_image_url, mesoanalysis_url, Product, Satellite, SatelliteService, SatelliteView, Sector,
    GOES_BASE, MESOANALYSIS_URL,
};
pub use warnings::CountError;

/// Fetcher shared by every service of a [`Client`].
pub type SharedFetcher = Arc<CachedFetcher<HttpFetcher>>;

/// Configuration for the full-stack client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// SPC outlook map service root.
    pub spc_base: String,
    /// NWS active alerts endpoint.
    pub alerts_url: String,
    /// NWS API root for points and stations.
    pub nws_api_base: String,
    /// GOES imagery content server.
    pub goes_base: String,
    /// Outbound HTTP settings.
    pub fetch: FetchConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            spc_base: DEFAULT_SPC_BASE.to_string(),
            alerts_url: NWS_ALERTS_URL.to_string(),
            nws_api_base: NWS_API_BASE.to_string(),
            goes_base: GOES_BASE.to_string(),
            fetch: FetchConfig::default(),
        }
    }
}

/// Full-stack client that wires every service to one cached HTTP fetcher.
///
/// The response cache and the layer catalog are shared by all lookups made
/// through the client.
#[derive(Debug)]
pub struct Client {
    fetcher: SharedFetcher,
    outlooks: OutlookService<SharedFetcher>,
    alerts: AlertFeed<SharedFetcher>,
    observations: ObservationService<SharedFetcher>,
    satellite: SatelliteService<SharedFetcher>,
}

impl Client {
    /// Build the HTTP stack and the services on top of it.
    pub fn new(config: ClientConfig) -> Result<Self, UpstreamError> {
        let http = HttpFetcher::new(&config.fetch)?;
        let fetcher: SharedFetcher = Arc::new(CachedFetcher::new(http, &config.fetch));

        Ok(Self {
            outlooks: OutlookService::with_base_url(Arc::clone(&fetcher), config.spc_base),
            alerts: AlertFeed::with_url(Arc::clone(&fetcher), config.alerts_url),
            observations: ObservationService::with_base_url(Arc::clone(&fetcher), config.nws_api_base),
            satellite: SatelliteService::with_base_url(Arc::clone(&fetcher), config.goes_base),
            fetcher,
        })
    }

    #[must_use]
    pub fn outlooks(&self) -> &OutlookService<SharedFetcher> {
        &self.outlooks
    }

    #[must_use]
    pub fn alerts(&self) -> &AlertFeed<SharedFetcher> {
        &self.alerts
    }

    #[must_use]
    pub fn observations(&self) -> &ObservationService<SharedFetcher> {
        &self.observations
    }

    #[must_use]
    pub fn satellite(&self) -> &SatelliteService<SharedFetcher> {
        &self.satellite
    }

    /// National tornado warning events so far in `year`.
    pub fn tor_warning_count_ytd(&self, year: i32) -> Result<usize, CountError> {
        warnings::fetch_tor_warning_count_ytd(&self.fetcher, year)
    }

    /// National severe thunderstorm warnings from the start of `year` until `now`.
    pub fn svr_warning_count_ytd(&self, year: i32, now: DateTime<Utc>) -> Result<u64, CountError> {
        warnings::fetch_svr_warning_count_ytd(&self.fetcher, year, now)
    }

    /// Number of response bodies currently cached.
    #[must_use]
    pub fn cached_responses(&self) -> usize {
        self.fetcher.cached_len()
    }

    /// Drop cached responses and the layer catalog.
    pub fn clear_cache(&self) {
        self.fetcher.invalidate();
        self.outlooks.invalidate_catalog();
    }
}
