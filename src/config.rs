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

//! Application configuration management.
//!
//! This module handles persistent configuration storage using TOML format:
//! the selected location, the city presets, the contact string sent to the
//! NWS, and the HTTP timeout and cache settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use severe_client::fetch::DEFAULT_USER_AGENT;
use severe_client::{ClientConfig, FetchConfig};

/// Name under which confy stores the configuration.
pub const APP_NAME: &str = "severe-dashboard";

const CONFIG_NAME: &str = "config";

/// Environment variable overriding the configured contact.
pub const CONTACT_ENV_VAR: &str = "SEVERE_DASH_CONTACT";

/// City selected on first run.
pub const DEFAULT_CITY_KEY: &str = "Norman, OK";

/// A named location the user can switch to.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CityPreset {
    /// Display name, e.g. "Norman, OK"
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl CityPreset {
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            latitude,
            longitude,
        }
    }
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Label of the selected location
    #[serde(default = "default_city_key")]
    pub city_key: String,

    /// Latitude of the selected location
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    /// Longitude of the selected location
    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// Locations offered by `cities` and `use`
    #[serde(default = "default_city_presets")]
    pub city_presets: Vec<CityPreset>,

    /// Contact appended to the user agent (env var takes precedence)
    #[serde(default)]
    pub contact: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long fetched responses stay cached, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached responses
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Replay the scripted outbreak instead of the live alert feed
    #[serde(default)]
    pub mock_alerts: bool,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1 // Current schema version
}

fn default_city_key() -> String {
    DEFAULT_CITY_KEY.to_string()
}

fn default_latitude() -> f64 {
    35.2226
}

fn default_longitude() -> f64 {
    -97.4395
}

fn default_city_presets() -> Vec<CityPreset> {
    vec![
        CityPreset::new("Norman, OK", 35.2226, -97.4395),
        CityPreset::new("Dallas, TX", 32.7767, -96.7970),
    ]
}

fn default_request_timeout_secs() -> u64 {
    25
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_capacity() -> usize {
    128
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            city_key: default_city_key(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            city_presets: default_city_presets(),
            contact: None,
            request_timeout_secs: default_request_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            mock_alerts: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating the default file on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        let mut config: AppConfig = confy::load(APP_NAME, CONFIG_NAME)?;

        if config.config_version < default_config_version() {
            log::info!(
                "upgrading configuration from version {} to {}",
                config.config_version,
                default_config_version()
            );
            config.config_version = default_config_version();
            config.save()?;
        }

        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Find a preset by name, ignoring case
    pub fn preset(&self, name: &str) -> Option<&CityPreset> {
        let name = name.trim();
        self.city_presets
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
    }

    /// Contact string, with the environment variable winning over the file
    pub fn effective_contact(&self) -> Option<String> {
        Self::resolve_contact(std::env::var(CONTACT_ENV_VAR).ok(), self.contact.as_deref())
    }

    fn resolve_contact(env: Option<String>, configured: Option<&str>) -> Option<String> {
        env.map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| {
                configured
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            })
    }

    /// User agent sent to the upstream services
    pub fn user_agent(&self) -> String {
        Self::user_agent_for(self.effective_contact().as_deref())
    }

    fn user_agent_for(contact: Option<&str>) -> String {
        match contact {
            Some(contact) => format!("{DEFAULT_USER_AGENT} (contact: {contact})"),
            None => DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Library configuration derived from these settings
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            fetch: FetchConfig {
                user_agent: self.user_agent(),
                timeout: Duration::from_secs(self.request_timeout_secs),
                cache_ttl: Duration::from_secs(self.cache_ttl_secs),
                cache_capacity: self.cache_capacity,
            },
            ..ClientConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.city_key, "Norman, OK");
        assert_eq!(config.city_presets.len(), 2);
        assert_eq!(config.request_timeout_secs, 25);
        assert_eq!(config.cache_ttl_secs, 300);
        assert!(!config.mock_alerts);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"city_key": "Dallas, TX", "mock_alerts": true}"#).unwrap();
        assert_eq!(config.city_key, "Dallas, TX");
        assert!(config.mock_alerts);
        assert_eq!(config.cache_capacity, 128);
        assert_eq!(config.city_presets, default_city_presets());
    }

    #[test]
    fn test_preset_lookup_ignores_case() {
        let config = AppConfig::default();
        let dallas = config.preset("dallas, tx").unwrap();
        assert!((dallas.latitude - 32.7767).abs() < 1e-9);
        assert!(config.preset("Tulsa, OK").is_none());
    }

    #[test]
    fn test_env_contact_wins() {
        assert_eq!(
            AppConfig::resolve_contact(Some("env@example.com".to_string()), Some("file@example.com")),
            Some("env@example.com".to_string())
        );
        assert_eq!(
            AppConfig::resolve_contact(Some("  ".to_string()), Some("file@example.com")),
            Some("file@example.com".to_string())
        );
        assert_eq!(AppConfig::resolve_contact(None, Some("")), None);
    }

    #[test]
    fn test_user_agent_carries_contact() {
        assert_eq!(AppConfig::user_agent_for(None), DEFAULT_USER_AGENT);
        assert!(AppConfig::user_agent_for(Some("me@example.com")).ends_with("(contact: me@example.com)"));
    }

    #[test]
    fn test_client_config_uses_settings() {
        let config = AppConfig {
            request_timeout_secs: 5,
            cache_capacity: 0,
            ..AppConfig::default()
        };
        let client = config.client_config();
        assert_eq!(client.fetch.timeout, Duration::from_secs(5));
        assert_eq!(client.fetch.cache_capacity, 0);
        assert_eq!(client.spc_base, severe_client::DEFAULT_SPC_BASE);
    }
}
