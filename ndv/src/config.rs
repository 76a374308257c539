//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Router configuration (§6 "Configuration", §9 "Per-router state").
//!
//! [`RawConfig`] is the `serde`-deserialized shape loaded from TOML, mirroring
//! the daemon-wide config pattern in `holo-daemon`'s `Config`. [`Config`] is
//! the frozen, validated result of [`RawConfig::build`]: derived names are
//! computed once during parsing rather than recomputed on every access, per
//! the design note in §9 ("compute them once during a *build* step and
//! expose by a frozen record; the config parser is the builder, and
//! subsequent reads are immutable").

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::name::{Component, Name};

/// A statically configured neighbor face (§6 `neighbors`).
///
/// The source config schema lists only `{ uri, mtu }` per neighbor (§6);
/// resolving which router sits on the other end of a directly configured
/// face is left unspecified (§9 "Open questions"). This implementation
/// resolves it by requiring the router name up front, alongside the face
/// URI, rather than inferring it opportunistically from sync traffic — see
/// `DESIGN.md`.
#[derive(Clone, Debug, Deserialize)]
pub struct NeighborConfig {
    pub uri: String,
    #[serde(default)]
    pub mtu: Option<u32>,
    pub router: String,
}

/// A [`NeighborConfig`] with its router name parsed and its link cost
/// assigned. The option table (§6) has no per-neighbor cost field, so
/// every directly configured neighbor gets the minimum unit cost; see
/// `DESIGN.md`.
#[derive(Clone, Debug)]
pub struct ResolvedNeighbor {
    pub uri: String,
    pub mtu: Option<u32>,
    pub router_name: Name,
    pub cost: crate::rib::Cost,
}

/// The `serde`-deserialized configuration shape, matching the option table
/// in §6 field-for-field.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub network: String,
    pub router: String,
    pub advertise_interval: u64,
    pub router_dead_interval: u64,
    pub keychain: String,
    pub trust_anchors: Vec<String>,
    pub prefix_injection_schema: String,
    pub prefix_injection_keychain: String,
    pub prefix_injection_trust_anchors: Vec<String>,
    pub neighbors: Vec<NeighborConfig>,
}

impl Default for RawConfig {
    fn default() -> RawConfig {
        RawConfig {
            network: String::new(),
            router: String::new(),
            advertise_interval: 60_000,
            router_dead_interval: 180_000,
            keychain: String::new(),
            trust_anchors: Vec::new(),
            prefix_injection_schema: "insecure".to_owned(),
            prefix_injection_keychain: "insecure".to_owned(),
            prefix_injection_trust_anchors: Vec::new(),
            neighbors: Vec::new(),
        }
    }
}

impl RawConfig {
    pub fn load(config_file: Option<&str>) -> RawConfig {
        let Some(config_file) = config_file else {
            return RawConfig::default();
        };
        match std::fs::read_to_string(config_file) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(error) => {
                    eprintln!(
                        "failed to parse configuration file '{config_file}': \
                         {error}, using defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(error) => {
                eprintln!(
                    "failed to read configuration file '{config_file}': \
                     {error}, using defaults"
                );
                RawConfig::default()
            }
        }
    }
}

/// The validated configuration with every name this process will ever need
/// precomputed (§6 "Derived names").
#[derive(Clone, Debug)]
pub struct Config {
    pub network: Name,
    pub router: Name,
    pub advertise_interval: Duration,
    pub router_dead_interval: Duration,
    pub keychain: String,
    pub trust_anchors: Vec<Name>,
    pub prefix_injection_schema: String,
    pub prefix_injection_keychain: String,
    pub prefix_injection_trust_anchors: Vec<Name>,
    pub neighbors: Vec<ResolvedNeighbor>,

    // Derived names, computed once here rather than on every access.
    pub adv_sync_prefix: Name,
    pub adv_sync_active_prefix: Name,
    pub adv_sync_passive_prefix: Name,
    pub adv_data_prefix: Name,
    pub prefix_sync_prefix: Name,
    pub router_data_prefix: Name,
    pub prefix_data_prefix: Name,
    pub mgmt_prefix: Name,
}

impl Config {
    /// Validates `raw` and builds the frozen [`Config`], matching the
    /// checks performed by the original Go `Parse()` method: network name
    /// length, router-extends-network, and interval bounds (§6, §9 "Open
    /// questions": unlike the embedded `DefaultConfig()`, an empty network
    /// or router name is rejected here rather than left for the caller to
    /// notice later).
    pub fn build(raw: RawConfig) -> Result<Config, ConfigError> {
        if raw.network.trim_matches('/').is_empty() {
            return Err(ConfigError::EmptyNetworkName);
        }
        if raw.router.trim_matches('/').is_empty() {
            return Err(ConfigError::EmptyRouterName);
        }

        let network = Name::from_str_generic(&raw.network);
        if network.len() > 3 {
            return Err(ConfigError::NetworkNameTooLong(network.len()));
        }

        let router = Name::from_str_generic(&raw.router);
        if router.len() != network.len() + 1 || !network.is_prefix_of(&router)
        {
            return Err(ConfigError::RouterNotExtendingNetwork);
        }

        if raw.advertise_interval < 1000 {
            return Err(ConfigError::AdvertiseIntervalTooShort(
                raw.advertise_interval,
            ));
        }
        if raw.router_dead_interval < 2 * raw.advertise_interval {
            return Err(ConfigError::RouterDeadIntervalTooShort(
                raw.router_dead_interval,
                raw.advertise_interval,
            ));
        }

        let trust_anchors = raw
            .trust_anchors
            .iter()
            .map(|s| Name::from_str_generic(s))
            .collect();
        let prefix_injection_trust_anchors = raw
            .prefix_injection_trust_anchors
            .iter()
            .map(|s| Name::from_str_generic(s))
            .collect();
        let neighbors = raw
            .neighbors
            .iter()
            .map(|n| ResolvedNeighbor {
                uri: n.uri.clone(),
                mtu: n.mtu,
                router_name: Name::from_str_generic(&n.router),
                cost: crate::rib::Cost::new(1).unwrap(),
            })
            .collect();

        let localhop = Name::from_str_generic("/localhop");
        let adv_sync_prefix = localhop
            .append(network.components().iter().cloned())
            .append_one(Component::keyword("DV"))
            .append_one(Component::keyword("ADS"));
        let adv_sync_active_prefix =
            adv_sync_prefix.append_one(Component::keyword("ACT"));
        let adv_sync_passive_prefix =
            adv_sync_prefix.append_one(Component::keyword("PSV"));
        let adv_data_prefix = localhop
            .append(router.components().iter().cloned())
            .append_one(Component::keyword("DV"))
            .append_one(Component::keyword("ADV"));
        let prefix_sync_prefix = network
            .append_one(Component::keyword("DV"))
            .append_one(Component::keyword("PFS"));
        let router_data_prefix =
            router.append_one(Component::keyword("DV"));
        let prefix_data_prefix =
            router_data_prefix.append_one(Component::keyword("PFX"));
        let mgmt_prefix = Name::from_str_generic("/localhost/nlsr");

        Ok(Config {
            network,
            router,
            advertise_interval: Duration::from_millis(
                raw.advertise_interval,
            ),
            router_dead_interval: Duration::from_millis(
                raw.router_dead_interval,
            ),
            keychain: raw.keychain,
            trust_anchors,
            prefix_injection_schema: raw.prefix_injection_schema,
            prefix_injection_keychain: raw.prefix_injection_keychain,
            prefix_injection_trust_anchors,
            neighbors,
            adv_sync_prefix,
            adv_sync_active_prefix,
            adv_sync_passive_prefix,
            adv_data_prefix,
            prefix_sync_prefix,
            router_data_prefix,
            prefix_data_prefix,
            mgmt_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_raw() -> RawConfig {
        RawConfig {
            network: "/net".to_owned(),
            router: "/net/a".to_owned(),
            ..RawConfig::default()
        }
    }

    #[test]
    fn builds_derived_names() {
        let config = Config::build(valid_raw()).unwrap();
        assert_eq!(config.adv_sync_prefix.to_string(), "/localhop/net/DV/ADS");
        assert_eq!(
            config.adv_sync_active_prefix.to_string(),
            "/localhop/net/DV/ADS/ACT"
        );
        assert_eq!(
            config.adv_data_prefix.to_string(),
            "/localhop/net/a/DV/ADV"
        );
        assert_eq!(config.prefix_sync_prefix.to_string(), "/net/DV/PFS");
        assert_eq!(config.prefix_data_prefix.to_string(), "/net/a/DV/PFX");
        assert_eq!(config.mgmt_prefix.to_string(), "/localhost/nlsr");
    }

    #[test]
    fn rejects_empty_network() {
        let raw = RawConfig {
            network: String::new(),
            ..valid_raw()
        };
        assert!(matches!(
            Config::build(raw),
            Err(ConfigError::EmptyNetworkName)
        ));
    }

    #[test]
    fn rejects_router_not_extending_network() {
        let raw = RawConfig {
            router: "/other/a".to_owned(),
            ..valid_raw()
        };
        assert!(matches!(
            Config::build(raw),
            Err(ConfigError::RouterNotExtendingNetwork)
        ));
    }

    #[test]
    fn rejects_short_dead_interval() {
        let raw = RawConfig {
            advertise_interval: 1000,
            router_dead_interval: 1500,
            ..valid_raw()
        };
        assert!(matches!(
            Config::build(raw),
            Err(ConfigError::RouterDeadIntervalTooShort(..))
        ));
    }
}
