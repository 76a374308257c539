//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The controller (§4.H): owns the overall lifecycle and wires every other
//! component together behind a single event loop (§5 "Scheduling" — every
//! method here runs to completion on the control thread before the next
//! event is processed, since the `&mut self` borrow rules out concurrent
//! mutation).

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use ndv_utils::Sender;
use ndv_utils::task::IntervalTask;

use crate::advert::{Advertisement, AdvertFetcher};
use crate::config::Config;
use crate::debug::Debug;
use crate::error::Error;
use crate::forwarder::{FaceId, Forwarder, Persistency};
use crate::name::{Component, Name};
use crate::neighbor::{self, Neighbor};
use crate::prefixtable::{PrefixChange, PrefixLog, PrefixOp, PrefixTable};
use crate::rib::{Rib, RibChange};
use crate::sync::SyncGroup;
use crate::tasks;
use crate::tasks::messages::input::{
    AdvertFetchRetryMsg, AdvertFetchTimeoutMsg, AdvertiseTickMsg,
    NbrTimeoutMsg, PrefixFetchRetryMsg, PrefixFetchTimeoutMsg,
};
use crate::trust::{KeyCache, TrustSchema};

/// Default Interest lifetime for advertisement/prefix-table fetches (§5
/// "Timeouts").
pub const DEFAULT_FETCH_LIFETIME: Duration = Duration::from_secs(4);

/// Sender handles for every inter-task message the controller's timers
/// produce, bundled the way `holo-rip`'s per-message channels are grouped
/// when constructing an `Instance`.
#[derive(Clone)]
pub struct ControllerChannels {
    pub advertise_tick: Sender<AdvertiseTickMsg>,
    pub nbr_timeout: Sender<NbrTimeoutMsg>,
    pub advert_fetch_retry: Sender<AdvertFetchRetryMsg>,
    pub advert_fetch_timeout: Sender<AdvertFetchTimeoutMsg>,
    pub prefix_fetch_retry: Sender<PrefixFetchRetryMsg>,
    pub prefix_fetch_timeout: Sender<PrefixFetchTimeoutMsg>,
}

pub struct Controller<F: Forwarder> {
    pub config: Config,
    forwarder: F,
    channels: ControllerChannels,

    rib: Rib,
    neighbors: BTreeMap<String, Neighbor>,

    adv_sync: SyncGroup,
    adv_fetcher: AdvertFetcher,
    adv_trust: TrustSchema,
    adv_key_cache: KeyCache,

    prefix_sync: SyncGroup,
    prefix_fetcher: AdvertFetcher,
    prefix_table: PrefixTable,
    prefix_trust: TrustSchema,
    prefix_key_cache: KeyCache,

    /// Every name currently registered in the forwarder with an active
    /// next-hop, and the face it was installed against — the only record
    /// of what's actually in the FIB, needed to undo `add_next_hop` on
    /// `RibChange::Removed`/`PrefixChange::Deactivated` (§8 invariant 4).
    installed: BTreeMap<Name, FaceId>,

    advertise_timer: Option<IntervalTask>,
}

impl<F: Forwarder> Controller<F> {
    pub fn new(
        config: Config,
        forwarder: F,
        channels: ControllerChannels,
    ) -> Controller<F> {
        let neighbors = neighbor::build(
            &config.neighbors,
            config.router_dead_interval,
            &channels.nbr_timeout,
        );

        let adv_trust = if config.trust_anchors.is_empty() {
            TrustSchema::insecure()
        } else {
            TrustSchema::new(Vec::new(), config.trust_anchors.clone())
        };
        let prefix_trust = if config.prefix_injection_schema == "insecure" {
            TrustSchema::insecure()
        } else {
            TrustSchema::new(
                Vec::new(),
                config.prefix_injection_trust_anchors.clone(),
            )
        };

        Controller {
            rib: Rib::new(config.router.clone()),
            adv_sync: SyncGroup::new(config.router.clone()),
            prefix_sync: SyncGroup::new(config.router.clone()),
            neighbors,
            adv_fetcher: AdvertFetcher::new(),
            adv_trust,
            adv_key_cache: KeyCache::new(),
            prefix_fetcher: AdvertFetcher::new(),
            prefix_table: PrefixTable::new(),
            prefix_trust,
            prefix_key_cache: KeyCache::new(),
            installed: BTreeMap::new(),
            advertise_timer: None,
            config,
            forwarder,
            channels,
        }
    }

    pub fn rib(&self) -> &Rib {
        &self.rib
    }

    pub fn prefix_table(&self) -> &PrefixTable {
        &self.prefix_table
    }

    /// Startup sequence (§4.H "Startup"): create permanent neighbor faces,
    /// register local sync prefixes, set the multicast strategy on them,
    /// and start the advertisement emit timer. The liveness (dead) timers
    /// are already running per neighbor since `Neighbor::new` starts them.
    pub async fn start(&mut self) -> Result<(), Error> {
        Debug::ControllerStart.log();

        for nbr in self.neighbors.values_mut() {
            let face_id = self
                .forwarder
                .create_face(&nbr.uri, nbr.mtu, Persistency::Permanent)
                .await
                .map_err(Error::Forwarder)?;
            nbr.face_id = Some(face_id);
            nbr.created_by_us = true;
        }

        for prefix in [
            &self.config.adv_sync_passive_prefix,
            &self.config.prefix_sync_prefix,
            &self.config.adv_data_prefix,
            &self.config.prefix_data_prefix,
        ] {
            self.forwarder
                .register_prefix(prefix)
                .await
                .map_err(Error::Forwarder)?;
        }
        self.forwarder
            .set_multicast_strategy(&self.config.adv_sync_prefix)
            .await
            .map_err(Error::Forwarder)?;
        self.forwarder
            .set_multicast_strategy(&self.config.prefix_sync_prefix)
            .await
            .map_err(Error::Forwarder)?;

        self.advertise_timer = Some(tasks::advertise_interval(
            self.config.advertise_interval,
            &self.channels.advertise_tick,
        ));

        Ok(())
    }

    /// Shutdown sequence (§4.H "Shutdown").
    pub async fn stop(&mut self) -> Result<(), Error> {
        Debug::ControllerStop.log();
        self.advertise_timer = None;

        for prefix in [
            &self.config.adv_sync_passive_prefix,
            &self.config.prefix_sync_prefix,
            &self.config.adv_data_prefix,
            &self.config.prefix_data_prefix,
        ] {
            self.forwarder
                .unregister_prefix(prefix)
                .await
                .map_err(Error::Forwarder)?;
        }

        for nbr in self.neighbors.values() {
            if nbr.created_by_us
                && let Some(face_id) = nbr.face_id
            {
                self.forwarder
                    .destroy_face(face_id)
                    .await
                    .map_err(Error::Forwarder)?;
            }
        }

        Ok(())
    }

    /// Returns the `(neighbor_uri, active_interest_name)` pairs to emit on
    /// an advertise tick, one per currently alive neighbor face (§4.D
    /// "Algorithm" step 1).
    pub fn on_advertise_tick(
        &mut self,
        _msg: AdvertiseTickMsg,
    ) -> Vec<(String, Name)> {
        let encoded = self.adv_sync.vector().encode();
        let name = self
            .config
            .adv_sync_active_prefix
            .append_one(Component::generic(encoded.to_vec()));
        self.neighbors
            .values()
            .filter(|nbr| nbr.alive || nbr.face_id.is_some())
            .map(|nbr| (nbr.uri.clone(), name.clone()))
            .collect()
    }

    /// Reception of an advertisement-sync Interest (Active or Passive),
    /// from the neighbor whose face is `from_uri`, carrying `vector`
    /// (§4.D "Algorithm" step 2).
    pub fn on_adv_sync_received(
        &mut self,
        from_uri: &str,
        vector: crate::sync::StateVector,
    ) -> Vec<RibChange> {
        let Some(nbr) = neighbor::touch(
            &mut self.neighbors,
            from_uri,
            self.config.router_dead_interval,
        ) else {
            return Vec::new();
        };
        let router_name = nbr.router_name.clone();
        let cost = nbr.cost;
        self.rib.set_alive(&router_name, true);
        self.rib.set_local_edge(router_name, cost);

        let advances = self.adv_sync.merge(&vector);
        Debug::SyncVectorMerge("adv", advances.len()).log();
        for (router, old, new) in advances {
            Debug::SyncPeerAdvance("adv", &router, old.unwrap_or(0), new)
                .log();
            self.adv_fetcher.start(
                router,
                new,
                DEFAULT_FETCH_LIFETIME,
                &self.channels.advert_fetch_timeout,
            );
        }

        self.rib.recompute()
    }

    /// A validated advertisement was fetched for `router` at `seq` (§4.E
    /// "Output"). `signer` is the key name the trust schema must permit.
    pub fn on_advert_fetched(
        &mut self,
        router: Name,
        seq: u64,
        advert: Advertisement,
        signer: &Name,
    ) -> Vec<RibChange> {
        if !self.adv_fetcher.is_current(&router, seq) {
            return Vec::new();
        }
        let data_name = self
            .config
            .adv_data_prefix
            .clone();
        if let Err(e) = self.adv_trust.verify(
            &data_name,
            signer,
            &self.adv_key_cache,
            Utc::now(),
        ) {
            crate::error::Error::Trust(e).log();
            self.adv_fetcher.cancel(&router);
            return Vec::new();
        }

        self.adv_fetcher.complete(&router);
        Debug::AdvertApplied(&router, seq).log();
        let edges = advert.entries.into_iter().collect();
        self.rib.set_remote_edges(router, edges);
        self.rib.recompute()
    }

    /// An advertisement fetch's Interest timed out; back off and retry
    /// (§4.E "Retries").
    pub fn on_advert_fetch_timeout(&mut self, router: Name, seq: u64) {
        self.adv_fetcher.retry(
            &router,
            seq,
            self.config.advertise_interval,
            &self.channels.advert_fetch_retry,
        );
    }

    /// The retry backoff for an advertisement fetch elapsed; returns
    /// whether the caller should re-issue the Interest (it might not be
    /// current anymore, e.g. cancelled by a newer advance).
    pub fn on_advert_fetch_retry_due(
        &mut self,
        router: &Name,
        seq: u64,
    ) -> bool {
        if !self.adv_fetcher.is_current(router, seq) {
            return false;
        }
        self.adv_fetcher.restart_timeout(
            router,
            seq,
            DEFAULT_FETCH_LIFETIME,
            &self.channels.advert_fetch_timeout,
        );
        true
    }

    /// A neighbor's dead timer fired with no Interest received in time
    /// (§8 invariant 6).
    pub fn on_nbr_timeout(&mut self, uri: &str) -> Vec<RibChange> {
        let Some(nbr) = self.neighbors.get_mut(uri) else {
            return Vec::new();
        };
        nbr.mark_dead();
        let router_name = nbr.router_name.clone();
        self.rib.set_alive(&router_name, false);
        self.rib.remove_local_edge(&router_name);
        self.rib.remove_remote_edges(&router_name);
        self.rib.recompute()
    }

    /// Reception of a prefix-table sync Interest (§4.G "Structure", same
    /// pattern as §4.D).
    pub fn on_prefix_sync_received(
        &mut self,
        from_uri: &str,
        vector: crate::sync::StateVector,
    ) {
        if neighbor::touch(
            &mut self.neighbors,
            from_uri,
            self.config.router_dead_interval,
        )
        .is_none()
        {
            return;
        }
        let advances = self.prefix_sync.merge(&vector);
        Debug::SyncVectorMerge("prefix", advances.len()).log();
        for (router, old, new) in advances {
            Debug::SyncPeerAdvance(
                "prefix",
                &router,
                old.unwrap_or(0),
                new,
            )
            .log();
            self.prefix_fetcher.start(
                router,
                new,
                DEFAULT_FETCH_LIFETIME,
                &self.channels.prefix_fetch_timeout,
            );
        }
    }

    /// A prefix-table log was fetched for `router` at `seq`. Authorizes
    /// each op through the prefix-injection trust schema (§4.G
    /// "Authorization") before applying it, then reconciles the FIB.
    pub async fn on_prefix_log_fetched(
        &mut self,
        router: Name,
        seq: u64,
        log: PrefixLog,
        signer: &Name,
    ) -> Result<(), Error> {
        if !self.prefix_fetcher.is_current(&router, seq) {
            return Ok(());
        }
        self.prefix_fetcher.complete(&router);

        let mut changes = Vec::new();
        for (op, name) in log.ops {
            match self.prefix_trust.verify(
                &name,
                signer,
                &self.prefix_key_cache,
                Utc::now(),
            ) {
                Ok(()) => {
                    if let Some(change) =
                        self.prefix_table.apply(log.owner.clone(), name, op)
                    {
                        changes.push(change);
                    }
                }
                Err(e) => {
                    Debug::PrefixDropped(
                        match op {
                            PrefixOp::Add => "add",
                            PrefixOp::Remove => "remove",
                        },
                        &log.owner,
                        &name,
                    )
                    .log();
                    crate::error::Error::Trust(e).log();
                }
            }
        }

        self.apply_prefix_changes(changes).await
    }

    pub fn on_prefix_fetch_timeout(&mut self, router: Name, seq: u64) {
        self.prefix_fetcher.retry(
            &router,
            seq,
            self.config.advertise_interval,
            &self.channels.prefix_fetch_retry,
        );
    }

    pub fn on_prefix_fetch_retry_due(
        &mut self,
        router: &Name,
        seq: u64,
    ) -> bool {
        if !self.prefix_fetcher.is_current(router, seq) {
            return false;
        }
        self.prefix_fetcher.restart_timeout(
            router,
            seq,
            DEFAULT_FETCH_LIFETIME,
            &self.channels.prefix_fetch_timeout,
        );
        true
    }

    /// Applies RIB changes by installing/removing next-hops for every
    /// active prefix owned by the affected router (§4.F "Change
    /// notification" -> §4.C).
    pub async fn apply_rib_changes(
        &mut self,
        changes: Vec<RibChange>,
    ) -> Result<(), Error> {
        for change in changes {
            match change {
                RibChange::Installed(dest, entry) => {
                    let Some(face_id) = self.face_for_next_hop(&entry.next_hop)
                    else {
                        continue;
                    };
                    for name in self.prefix_table.names_owned_by(&dest) {
                        self.forwarder
                            .register_prefix(&name)
                            .await
                            .map_err(Error::Forwarder)?;
                        self.forwarder
                            .add_next_hop(
                                &name,
                                face_id,
                                entry.cost.get() as u64,
                            )
                            .await
                            .map_err(Error::Forwarder)?;
                        self.installed.insert(name.clone(), face_id);
                        Debug::PrefixApplied("add", &dest, &name).log();
                    }
                }
                RibChange::Removed(dest) => {
                    for name in self.prefix_table.names_owned_by(&dest) {
                        if let Some(face_id) = self.installed.remove(&name) {
                            self.forwarder
                                .remove_next_hop(&name, face_id)
                                .await
                                .map_err(Error::Forwarder)?;
                        }
                        self.forwarder
                            .unregister_prefix(&name)
                            .await
                            .map_err(Error::Forwarder)?;
                        Debug::PrefixDropped("remove", &dest, &name).log();
                    }
                }
            }
        }
        Ok(())
    }

    /// Applies prefix-table changes by installing/removing next-hops
    /// according to the owner's current RIB reachability (§4.G
    /// "Installation").
    async fn apply_prefix_changes(
        &mut self,
        changes: Vec<PrefixChange>,
    ) -> Result<(), Error> {
        for change in changes {
            match change {
                PrefixChange::Activated(owner, name) => {
                    let Some(entry) = self.rib.entry(&owner) else {
                        continue;
                    };
                    let Some(face_id) =
                        self.face_for_next_hop(&entry.next_hop)
                    else {
                        continue;
                    };
                    self.forwarder
                        .register_prefix(&name)
                        .await
                        .map_err(Error::Forwarder)?;
                    self.forwarder
                        .add_next_hop(&name, face_id, entry.cost.get() as u64)
                        .await
                        .map_err(Error::Forwarder)?;
                    self.installed.insert(name.clone(), face_id);
                    Debug::PrefixApplied("add", &owner, &name).log();
                }
                PrefixChange::Deactivated(owner, name) => {
                    if let Some(face_id) = self.installed.remove(&name) {
                        self.forwarder
                            .remove_next_hop(&name, face_id)
                            .await
                            .map_err(Error::Forwarder)?;
                    }
                    self.forwarder
                        .unregister_prefix(&name)
                        .await
                        .map_err(Error::Forwarder)?;
                    Debug::PrefixDropped("remove", &owner, &name).log();
                }
            }
        }
        Ok(())
    }

    fn face_for_next_hop(&self, next_hop: &Name) -> Option<u64> {
        self.neighbors
            .values()
            .find(|nbr| &nbr.router_name == next_hop)
            .and_then(|nbr| nbr.face_id)
    }

    /// Bumps the local advertisement sequence number, e.g. after a
    /// neighbor cost change, and returns the new advertisement to publish
    /// at `/<router>/DV/ADV/<seq>` (§3 "Advertisement").
    pub fn originate_advertisement(&mut self) -> Advertisement {
        let seq = self.adv_sync.bump_local();
        let entries = self
            .neighbors
            .values()
            .filter(|nbr| nbr.alive)
            .map(|nbr| (nbr.router_name.clone(), nbr.cost))
            .collect();
        Advertisement {
            router_name: self.config.router.clone(),
            sequence_number: seq,
            entries,
        }
    }

    /// Originates a prefix-table op, bumping the local prefix-table
    /// sequence number (§3 "Prefix entry").
    pub fn originate_prefix_op(
        &mut self,
        name: Name,
        op: PrefixOp,
    ) -> PrefixLog {
        let seq = self.prefix_sync.bump_local();
        self.prefix_table.apply(self.config.router.clone(), name.clone(), op);
        PrefixLog {
            owner: self.config.router.clone(),
            sequence_number: seq,
            ops: vec![(op, name)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RawConfig};
    use crate::forwarder::test::MockForwarder;

    fn channels() -> (ControllerChannels, ()) {
        let (advertise_tick, _a) = tokio::sync::mpsc::channel(4);
        let (nbr_timeout, _b) = tokio::sync::mpsc::channel(4);
        let (advert_fetch_retry, _c) = tokio::sync::mpsc::channel(4);
        let (advert_fetch_timeout, _d) = tokio::sync::mpsc::channel(4);
        let (prefix_fetch_retry, _e) = tokio::sync::mpsc::channel(4);
        let (prefix_fetch_timeout, _f) = tokio::sync::mpsc::channel(4);
        (
            ControllerChannels {
                advertise_tick,
                nbr_timeout,
                advert_fetch_retry,
                advert_fetch_timeout,
                prefix_fetch_retry,
                prefix_fetch_timeout,
            },
            (),
        )
    }

    fn test_config() -> Config {
        let raw = RawConfig {
            network: "/n".to_owned(),
            router: "/n/a".to_owned(),
            ..RawConfig::default()
        };
        Config::build(raw).unwrap()
    }

    #[tokio::test]
    async fn two_node_sync_converges_rib() {
        let (channels, _guard) = channels();
        let mut config = test_config();
        config.neighbors.push(crate::config::ResolvedNeighbor {
            uri: "udp4://192.0.2.2:6363".to_owned(),
            mtu: None,
            router_name: Name::from_str_generic("/n/b"),
            cost: crate::rib::Cost::new(1).unwrap(),
        });
        let mut controller =
            Controller::new(config, MockForwarder::default(), channels);

        let mut remote_vector = crate::sync::StateVector::new();
        remote_vector.advance(Name::from_str_generic("/n/b"), 1);
        let changes = controller
            .on_adv_sync_received("udp4://192.0.2.2:6363", remote_vector);
        // The neighbor is now alive with a direct edge, but /n/b's own
        // advertisement hasn't been fetched yet, so no RIB entry for it
        // beyond the direct edge itself.
        assert!(changes.iter().any(|c| matches!(
            c,
            RibChange::Installed(dest, _) if dest == &Name::from_str_generic("/n/b")
        )));
    }

    #[tokio::test]
    async fn nbr_timeout_removes_rib_entry() {
        let (channels, _guard) = channels();
        let mut config = test_config();
        config.neighbors.push(crate::config::ResolvedNeighbor {
            uri: "udp4://192.0.2.2:6363".to_owned(),
            mtu: None,
            router_name: Name::from_str_generic("/n/b"),
            cost: crate::rib::Cost::new(1).unwrap(),
        });
        let mut controller =
            Controller::new(config, MockForwarder::default(), channels);

        let mut remote_vector = crate::sync::StateVector::new();
        remote_vector.advance(Name::from_str_generic("/n/b"), 1);
        controller
            .on_adv_sync_received("udp4://192.0.2.2:6363", remote_vector);
        assert!(controller.rib().entry(&Name::from_str_generic("/n/b")).is_some());

        let changes =
            controller.on_nbr_timeout("udp4://192.0.2.2:6363");
        assert!(changes.iter().any(|c| matches!(
            c,
            RibChange::Removed(dest) if dest == &Name::from_str_generic("/n/b")
        )));
        assert!(controller.rib().entry(&Name::from_str_generic("/n/b")).is_none());
    }

    #[tokio::test]
    async fn nbr_timeout_removes_fib_next_hop() {
        let (channels, _guard) = channels();
        let mut config = test_config();
        config.neighbors.push(crate::config::ResolvedNeighbor {
            uri: "udp4://192.0.2.2:6363".to_owned(),
            mtu: None,
            router_name: Name::from_str_generic("/n/b"),
            cost: crate::rib::Cost::new(1).unwrap(),
        });
        let mut controller =
            Controller::new(config, MockForwarder::default(), channels);

        let owner = Name::from_str_generic("/n/b");
        controller.prefix_table.apply(
            owner.clone(),
            Name::from_str_generic("/n/b/app"),
            PrefixOp::Add,
        );

        let mut remote_vector = crate::sync::StateVector::new();
        remote_vector.advance(owner.clone(), 1);
        let changes = controller
            .on_adv_sync_received("udp4://192.0.2.2:6363", remote_vector);
        controller.apply_rib_changes(changes).await.unwrap();
        assert_eq!(controller.forwarder.next_hops.lock().unwrap().len(), 1);

        let removed = controller.on_nbr_timeout("udp4://192.0.2.2:6363");
        controller.apply_rib_changes(removed).await.unwrap();
        assert!(controller.forwarder.next_hops.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prefix_deactivation_removes_fib_next_hop() {
        let (channels, _guard) = channels();
        let mut config = test_config();
        config.neighbors.push(crate::config::ResolvedNeighbor {
            uri: "udp4://192.0.2.2:6363".to_owned(),
            mtu: None,
            router_name: Name::from_str_generic("/n/b"),
            cost: crate::rib::Cost::new(1).unwrap(),
        });
        let mut controller =
            Controller::new(config, MockForwarder::default(), channels);

        let owner = Name::from_str_generic("/n/b");
        let mut remote_vector = crate::sync::StateVector::new();
        remote_vector.advance(owner.clone(), 1);
        let changes = controller
            .on_adv_sync_received("udp4://192.0.2.2:6363", remote_vector);
        controller.apply_rib_changes(changes).await.unwrap();

        let prefix = Name::from_str_generic("/n/b/app");
        let activated = controller.prefix_table.apply(
            owner.clone(),
            prefix.clone(),
            PrefixOp::Add,
        );
        controller
            .apply_prefix_changes(activated.into_iter().collect())
            .await
            .unwrap();
        assert_eq!(controller.forwarder.next_hops.lock().unwrap().len(), 1);

        let deactivated = controller.prefix_table.apply(
            owner.clone(),
            prefix.clone(),
            PrefixOp::Remove,
        );
        controller
            .apply_prefix_changes(deactivated.into_iter().collect())
            .await
            .unwrap();
        assert!(controller.forwarder.next_hops.lock().unwrap().is_empty());
    }
}
