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

//! The location every lookup of a session runs against.

use severe_client::outlook::validate_coordinates;
use severe_client::CoordinateError;

use crate::config::AppConfig;

/// Result of selecting a preset city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetOutcome {
    Applied,
    /// The preset is already the current location.
    Unchanged,
    Unknown,
}

/// Current location label and coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationState {
    label: String,
    latitude: f64,
    longitude: f64,
}

impl LocationState {
    /// Start from the location saved in the configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            label: config.city_key.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `(lat, lon)` of the current location.
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Switch to a preset city. Unknown names leave the location alone.
    pub fn apply_preset(&mut self, config: &AppConfig, name: &str) -> PresetOutcome {
        let Some(preset) = config.preset(name) else {
            return PresetOutcome::Unknown;
        };
        if preset.name == self.label {
            return PresetOutcome::Unchanged;
        }
        self.label.clone_from(&preset.name);
        self.latitude = preset.latitude;
        self.longitude = preset.longitude;
        PresetOutcome::Applied
    }

    /// Use an arbitrary point, labelled for display.
    pub fn set_custom(&mut self, label: impl Into<String>, latitude: f64, longitude: f64) -> Result<(), CoordinateError> {
        validate_coordinates(latitude, longitude)?;
        self.label = label.into();
        self.latitude = latitude;
        self.longitude = longitude;
        Ok(())
    }

    /// Write the location back into the configuration.
    pub fn store(&self, config: &mut AppConfig) {
        config.city_key.clone_from(&self.label);
        config.latitude = self.latitude;
        config.longitude = self.longitude;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_from_config() {
        let state = LocationState::from_config(&AppConfig::default());
        assert_eq!(state.label(), "Norman, OK");
        assert_eq!(state.coordinates(), (35.2226, -97.4395));
    }

    #[test]
    fn test_apply_preset() {
        let config = AppConfig::default();
        let mut state = LocationState::from_config(&config);

        assert_eq!(state.apply_preset(&config, "Norman, OK"), PresetOutcome::Unchanged);
        assert_eq!(state.apply_preset(&config, "Atlantis"), PresetOutcome::Unknown);
        assert_eq!(state.label(), "Norman, OK");

        assert_eq!(state.apply_preset(&config, "dallas, tx"), PresetOutcome::Applied);
        assert_eq!(state.label(), "Dallas, TX");
        assert_eq!(state.coordinates(), (32.7767, -96.7970));
    }

    #[test]
    fn test_set_custom_validates() {
        let mut state = LocationState::from_config(&AppConfig::default());
        assert!(state.set_custom("Nowhere", 95.0, 0.0).is_err());
        assert_eq!(state.label(), "Norman, OK");

        state.set_custom("Moore, OK", 35.3395, -97.4867).unwrap();
        assert_eq!(state.label(), "Moore, OK");
    }

    #[test]
    fn test_store_round_trips_through_config() {
        let mut config = AppConfig::default();
        let mut state = LocationState::from_config(&config);
        state.set_custom("Moore, OK", 35.3395, -97.4867).unwrap();
        state.store(&mut config);

        assert_eq!(config.city_key, "Moore, OK");
        assert_eq!(LocationState::from_config(&config), state);
    }
}
