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

//! GOES satellite imagery and the SPC mesoanalysis page.
//!
//! NESDIS publishes the newest ABI image of every satellite, sector and
//! product at a fixed `latest.jpg` path, so a view is just a URL. Whether
//! that image is currently being served is checked with a HEAD request.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use thiserror::Error;

use crate::fetch::Fetch;

/// NESDIS STAR content server.
pub const GOES_BASE: &str = "https://cdn.star.nesdis.noaa.gov";

/// SPC mesoanalysis page, national sector, sea level pressure.
pub const MESOANALYSIS_URL: &str = "https://www.spc.noaa.gov/exper/mesoanalysis/new/viewsector.php?sector=19&parm=pmsl";

const MESOANALYSIS_PAGE: &str = "https://www.spc.noaa.gov/exper/mesoanalysis/new/viewsector.php";

/// A satellite, sector or product name that matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}

fn choice_matches(input: &str, code: &str, label: &str) -> bool {
    input.eq_ignore_ascii_case(code) || input.eq_ignore_ascii_case(label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Satellite {
    GoesEast,
    GoesWest,
}

impl Satellite {
    pub const ALL: [Self; 2] = [Self::GoesEast, Self::GoesWest];

    /// Path segment on the content server.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::GoesEast => "GOES16",
            Self::GoesWest => "GOES18",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::GoesEast => "GOES-East (16)",
            Self::GoesWest => "GOES-West (18)",
        }
    }

    fn short_name(self) -> &'static str {
        match self {
            Self::GoesEast => "east",
            Self::GoesWest => "west",
        }
    }
}

impl FromStr for Satellite {
    type Err = UnknownChoice;

    /// Accepts the code, the label or `east`/`west`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|sat| choice_matches(s, sat.code(), sat.label()) || s.eq_ignore_ascii_case(sat.short_name()))
            .ok_or_else(|| UnknownChoice {
                kind: "satellite",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sector {
    Conus,
    FullDisk,
    Mesoscale1,
    Mesoscale2,
}

impl Sector {
    pub const ALL: [Self; 4] = [Self::Conus, Self::FullDisk, Self::Mesoscale1, Self::Mesoscale2];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Conus => "CONUS",
            Self::FullDisk => "FD",
            Self::Mesoscale1 => "M1",
            Self::Mesoscale2 => "M2",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Conus => "CONUS",
            Self::FullDisk => "Full Disk",
            Self::Mesoscale1 => "Mesoscale 1 (M1)",
            Self::Mesoscale2 => "Mesoscale 2 (M2)",
        }
    }
}

impl FromStr for Sector {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|sector| choice_matches(s, sector.code(), sector.label()))
            .ok_or_else(|| UnknownChoice {
                kind: "sector",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// ABI imagery products: the composite RGBs plus the sixteen bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    GeoColor,
    AirMass,
    CleanIr,
    WaterVapor,
    Band01,
    Band02,
    Band03,
    Band04,
    Band05,
    Band06,
    Band07,
    Band08,
    Band09,
    Band10,
    Band11,
    Band12,
    Band13,
    Band14,
    Band15,
    Band16,
    DayCloudPhase,
    NighttimeMicrophysics,
    Dust,
    So2,
    FireTemperature,
}

impl Product {
    pub const ALL: [Self; 25] = [
        Self::GeoColor,
        Self::AirMass,
        Self::CleanIr,
        Self::WaterVapor,
        Self::Band01,
        Self::Band02,
        Self::Band03,
        Self::Band04,
        Self::Band05,
        Self::Band06,
        Self::Band07,
        Self::Band08,
        Self::Band09,
        Self::Band10,
        Self::Band11,
        Self::Band12,
        Self::Band13,
        Self::Band14,
        Self::Band15,
        Self::Band16,
        Self::DayCloudPhase,
        Self::NighttimeMicrophysics,
        Self::Dust,
        Self::So2,
        Self::FireTemperature,
    ];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::GeoColor => "GEOCOLOR",
            Self::AirMass => "AIRMASS",
            Self::CleanIr => "CLEANIR",
            Self::WaterVapor => "WV",
            Self::Band01 => "BAND01",
            Self::Band02 => "BAND02",
            Self::Band03 => "BAND03",
            Self::Band04 => "BAND04",
            Self::Band05 => "BAND05",
            Self::Band06 => "BAND06",
            Self::Band07 => "BAND07",
            Self::Band08 => "BAND08",
            Self::Band09 => "BAND09",
            Self::Band10 => "BAND10",
            Self::Band11 => "BAND11",
            Self::Band12 => "BAND12",
            Self::Band13 => "BAND13",
            Self::Band14 => "BAND14",
            Self::Band15 => "BAND15",
            Self::Band16 => "BAND16",
            Self::DayCloudPhase => "DAYCLOUDPHASE",
            Self::NighttimeMicrophysics => "NTMIC",
            Self::Dust => "DUST",
            Self::So2 => "SO2",
            Self::FireTemperature => "FIRETEMP",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::GeoColor => "GeoColor",
            Self::AirMass => "Air Mass RGB",
            Self::CleanIr => "Clean IR (B13)",
            Self::WaterVapor => "Water Vapor (WV)",
            Self::Band01 => "Blue Visible (B01)",
            Self::Band02 => "Red Visible (B02)",
            Self::Band03 => "Veggie Near-IR (B03)",
            Self::Band04 => "Cirrus (B04)",
            Self::Band05 => "Snow/Ice (B05)",
            Self::Band06 => "Cloud Particle Size (B06)",
            Self::Band07 => "Shortwave Window (B07)",
            Self::Band08 => "Upper-Level WV (B08)",
            Self::Band09 => "Mid-Level WV (B09)",
            Self::Band10 => "Low-Level WV (B10)",
            Self::Band11 => "Cloud-Top Phase (B11)",
            Self::Band12 => "Ozone (B12)",
            Self::Band13 => "IR Window (B13)",
            Self::Band14 => "IR Longwave (B14)",
            Self::Band15 => "Dirty IR Window (B15)",
            Self::Band16 => "CO2 Longwave IR (B16)",
            Self::DayCloudPhase => "Day Cloud Phase RGB",
            Self::NighttimeMicrophysics => "Nighttime Microphysics RGB",
            Self::Dust => "Dust RGB",
            Self::So2 => "SO2 RGB",
            Self::FireTemperature => "Fire Temperature RGB",
        }
    }
}

impl FromStr for Product {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|product| choice_matches(s, product.code(), product.label()))
            .ok_or_else(|| UnknownChoice {
                kind: "product",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One satellite view: which satellite, which sector, which product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SatelliteView {
    pub satellite: Satellite,
    pub sector: Sector,
    pub product: Product,
}

impl Default for SatelliteView {
    fn default() -> Self {
        Self {
            satellite: Satellite::GoesEast,
            sector: Sector::Conus,
            product: Product::GeoColor,
        }
    }
}

impl fmt::Display for SatelliteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} • {} • {}", self.satellite, self.sector, self.product)
    }
}

/// URL of the newest image for `view` under `base`.
#[must_use]
pub fn latest_image_url(base: &str, view: SatelliteView) -> String {
    format!(
        "{}/{}/ABI/{}/{}/latest.jpg",
        base.trim_end_matches('/'),
        view.satellite.code(),
        view.sector.code(),
        view.product.code()
    )
}

/// SPC mesoanalysis page for a sector number and parameter code.
#[must_use]
pub fn mesoanalysis_url(sector: u32, parameter: &str) -> String {
    format!("{MESOANALYSIS_PAGE}?sector={sector}&parm={parameter}")
}

/// Satellite image lookups.
#[derive(Debug)]
pub struct SatelliteService<F> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetch> SatelliteService<F> {
    /// Service against the public NESDIS content server.
    pub fn new(fetcher: F) -> Self {
        Self::with_base_url(fetcher, GOES_BASE)
    }

    pub fn with_base_url(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn latest_image_url(&self, view: SatelliteView) -> String {
        latest_image_url(&self.base_url, view)
    }

    /// Whether the server currently answers 2xx for `url`.
    pub fn image_available(&self, url: &str) -> bool {
        match self.fetcher.head(url) {
            Ok(()) => {
                debug!("satellite image available: {}", url);
                true
            }
            Err(e) => {
                warn!("satellite image unavailable: {}", e);
                false
            }
        }
    }
}
