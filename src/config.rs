//! Layered configuration: built-in defaults, optionally merged with a TOML
//! file, then with `TSNCTL_`-prefixed environment variables. See
//! SPEC_FULL.md §4.7.

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

use crate::delay::ClassDelayMap;

const ENV_PREFIX: &str = "TSNCTL_";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to parse configuration file: {0}")]
    Toml(String),
    #[error("link_speed_bps must be positive, got {0}")]
    NonPositiveLinkSpeed(u64),
    #[error("invalid value for {key}: {value}")]
    InvalidEnvValue { key: String, value: String },
}

/// The recognized options of SPEC_FULL.md §4.7, as a typed, validated
/// struct. Mirrors the constant block at the top of the reference
/// controller, turned into something `serde` can deserialize and an
/// operator can override without recompiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub switch_ip_address: String,
    pub switch_username: String,
    pub qos_flow_list_name: String,
    pub link_speed_bps: u64,
    #[serde(skip)]
    pub class_delay_map: ClassDelayMapConfig,
    pub max_hops_in_network: u32,
}

/// A serde-friendly mirror of [`ClassDelayMap`]; not consulted by the
/// admission engine (which always builds [`ClassDelayMap::standard`]), but
/// carried on `Config` so the table is visible and overridable in a
/// configuration file, per SPEC_FULL.md §4.7.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDelayMapConfig(pub HashMap<u32, u32>);

impl Default for ClassDelayMapConfig {
    fn default() -> Self {
        let ClassDelayMap(map) = ClassDelayMap::standard();
        ClassDelayMapConfig(map)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            switch_ip_address: "192.168.179.2".to_string(),
            switch_username: "operator".to_string(),
            qos_flow_list_name: "TSN".to_string(),
            link_speed_bps: 100_000_000,
            class_delay_map: ClassDelayMapConfig::default(),
            max_hops_in_network: 2,
        }
    }
}

impl Config {
    /// Built-in defaults, matching the reference controller's constants.
    pub fn from_defaults() -> Self {
        Config::default()
    }

    /// Merges a TOML document's recognized fields over `self`.
    pub fn merge_toml(mut self, document: &str) -> Result<Self, ConfigError> {
        let parsed: Config = toml::from_str(document).map_err(|e| ConfigError::Toml(e.to_string()))?;
        self = parsed;
        self.validate()?;
        Ok(self)
    }

    /// Applies `TSNCTL_`-prefixed environment variable overrides, then
    /// validates. Unrecognized `TSNCTL_*` variables are ignored.
    pub fn merge_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = env::var(format!("{ENV_PREFIX}SWITCH_IP_ADDRESS")) {
            self.switch_ip_address = v;
        }
        if let Ok(v) = env::var(format!("{ENV_PREFIX}SWITCH_USERNAME")) {
            self.switch_username = v;
        }
        if let Ok(v) = env::var(format!("{ENV_PREFIX}QOS_FLOW_LIST_NAME")) {
            self.qos_flow_list_name = v;
        }
        if let Ok(v) = env::var(format!("{ENV_PREFIX}LINK_SPEED_BPS")) {
            self.link_speed_bps = v.parse().map_err(|_| ConfigError::InvalidEnvValue {
                key: "LINK_SPEED_BPS".to_string(),
                value: v,
            })?;
        }
        if let Ok(v) = env::var(format!("{ENV_PREFIX}MAX_HOPS_IN_NETWORK")) {
            self.max_hops_in_network = v.parse().map_err(|_| ConfigError::InvalidEnvValue {
                key: "MAX_HOPS_IN_NETWORK".to_string(),
                value: v,
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.link_speed_bps == 0 {
            return Err(ConfigError::NonPositiveLinkSpeed(self.link_speed_bps));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_controller_constants() {
        let c = Config::from_defaults();
        assert_eq!(c.switch_ip_address, "192.168.179.2");
        assert_eq!(c.switch_username, "operator");
        assert_eq!(c.qos_flow_list_name, "TSN");
        assert_eq!(c.link_speed_bps, 100_000_000);
        assert_eq!(c.max_hops_in_network, 2);
    }

    #[test]
    fn toml_merge_round_trips_every_recognized_option() {
        let document = r#"
            switch_ip_address = "10.0.0.9"
            switch_username = "admin"
            qos_flow_list_name = "RT"
            link_speed_bps = 1000000000
            max_hops_in_network = 4
        "#;
        let c = Config::from_defaults().merge_toml(document).unwrap();
        assert_eq!(c.switch_ip_address, "10.0.0.9");
        assert_eq!(c.switch_username, "admin");
        assert_eq!(c.qos_flow_list_name, "RT");
        assert_eq!(c.link_speed_bps, 1_000_000_000);
        assert_eq!(c.max_hops_in_network, 4);
    }

    #[test]
    fn rejects_zero_link_speed() {
        let document = r#"link_speed_bps = 0"#;
        assert_eq!(
            Config::from_defaults().merge_toml(document),
            Err(ConfigError::NonPositiveLinkSpeed(0))
        );
    }
}
