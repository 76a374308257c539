//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Neighbor faces configured for this router (§3 "Neighbor").
//!
//! A neighbor is declared statically in configuration (`config::
//! ResolvedNeighbor`: uri, mtu, and — per this implementation's resolution
//! of an open question, see `DESIGN.md` — the router name on the other end
//! of the face). It becomes *alive* once the first advertisement sync
//! Interest is delivered over its face, and *dead* if none arrives for
//! `router_dead_interval` (§4.H, §8 invariants 5/6).

use std::collections::{BTreeMap, btree_map};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ndv_utils::Sender;
use ndv_utils::task::TimeoutTask;

use crate::config::ResolvedNeighbor;
use crate::debug::Debug;
use crate::name::Name;
use crate::rib::Cost;
use crate::tasks;
use crate::tasks::messages::input::NbrTimeoutMsg;

/// A configured neighbor face and its liveness state.
#[derive(Debug)]
pub struct Neighbor {
    pub uri: String,
    pub mtu: Option<u32>,
    pub router_name: Name,
    pub cost: Cost,
    /// Face ID assigned by the forwarder once the face is created.
    pub face_id: Option<u64>,
    /// Whether this process created the face (and must destroy it on
    /// teardown) rather than reusing one that already existed.
    pub created_by_us: bool,
    pub alive: bool,
    pub last_update: DateTime<Utc>,
    dead_task: TimeoutTask,
}

// ===== impl Neighbor =====

impl Neighbor {
    fn new(
        config: &ResolvedNeighbor,
        dead_interval: Duration,
        nbr_timeoutp: &Sender<NbrTimeoutMsg>,
    ) -> Neighbor {
        let dead_task = tasks::nbr_timeout(
            config.uri.clone(),
            dead_interval,
            nbr_timeoutp,
        );

        Neighbor {
            uri: config.uri.clone(),
            mtu: config.mtu,
            router_name: config.router_name.clone(),
            cost: config.cost,
            face_id: None,
            created_by_us: false,
            alive: false,
            last_update: Utc::now(),
            dead_task,
        }
    }

    /// Marks the neighbor alive and resets its dead timer (§8 invariant 5).
    pub fn mark_alive(&mut self, dead_interval: Duration) {
        let was_alive = self.alive;
        self.alive = true;
        self.last_update = Utc::now();
        self.dead_task.reset(Some(dead_interval));
        if !was_alive {
            Debug::NeighborAlive(&self.router_name).log();
        }
    }

    /// Marks the neighbor dead (§8 invariant 6).
    pub fn mark_dead(&mut self) {
        if self.alive {
            Debug::NeighborDead(&self.router_name).log();
        }
        self.alive = false;
    }
}

// ===== global functions =====

/// Builds the neighbor table from configuration, keyed by URI.
pub fn build(
    configured: &[ResolvedNeighbor],
    dead_interval: Duration,
    nbr_timeoutp: &Sender<NbrTimeoutMsg>,
) -> BTreeMap<String, Neighbor> {
    configured
        .iter()
        .map(|config| {
            let nbr = Neighbor::new(config, dead_interval, nbr_timeoutp);
            (config.uri.clone(), nbr)
        })
        .collect()
}

/// Marks the neighbor keyed by `uri` alive, if it's a configured neighbor.
/// Unconfigured URIs are ignored: only statically declared neighbors are
/// supported (§1 "dynamically [discovered neighbors are] out of scope").
pub fn touch<'a>(
    neighbors: &'a mut BTreeMap<String, Neighbor>,
    uri: &str,
    dead_interval: Duration,
) -> Option<&'a mut Neighbor> {
    match neighbors.entry(uri.to_owned()) {
        btree_map::Entry::Occupied(o) => {
            let nbr = o.into_mut();
            nbr.mark_alive(dead_interval);
            Some(nbr)
        }
        btree_map::Entry::Vacant(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResolvedNeighbor {
        ResolvedNeighbor {
            uri: "udp4://192.0.2.1:6363".to_owned(),
            mtu: None,
            router_name: Name::from_str_generic("/net/b"),
            cost: Cost::new(1).unwrap(),
        }
    }

    #[test]
    fn mark_alive_then_dead() {
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let mut nbr = Neighbor::new(&config(), Duration::from_secs(10), &tx);
        assert!(!nbr.alive);
        nbr.mark_alive(Duration::from_secs(10));
        assert!(nbr.alive);
        nbr.mark_dead();
        assert!(!nbr.alive);
    }

    #[test]
    fn touch_ignores_unconfigured_uri() {
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let mut neighbors = build(
            std::slice::from_ref(&config()),
            Duration::from_secs(10),
            &tx,
        );
        assert!(touch(&mut neighbors, "udp4://203.0.113.1:6363", Duration::from_secs(10)).is_none());
        assert!(touch(&mut neighbors, &config().uri, Duration::from_secs(10)).is_some());
    }
}
