//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::debug;

use crate::name::Name;
use crate::rib::Cost;

/// DV debug messages, logged through the `tracing` API (§10).
#[derive(Debug)]
pub enum Debug<'a> {
    ControllerStart,
    ControllerStop,
    NeighborAlive(&'a Name),
    NeighborDead(&'a Name),
    SyncVectorMerge(&'a str, usize),
    SyncPeerAdvance(&'a str, &'a Name, u64, u64),
    AdvertFetchStart(&'a Name, u64),
    AdvertFetchRetry(&'a Name, u64, u32),
    AdvertFetchDrop(&'a Name, u64),
    AdvertApplied(&'a Name, u64),
    RibRecompute(usize),
    RibChanged(&'a Name, Option<Cost>, Option<Cost>),
    PrefixApplied(&'a str, &'a Name, &'a Name),
    PrefixDropped(&'a str, &'a Name, &'a Name),
}

impl<'a> Debug<'a> {
    pub fn log(&self) {
        match self {
            Debug::ControllerStart | Debug::ControllerStop => {
                debug!("{self}");
            }
            Debug::NeighborAlive(name) | Debug::NeighborDead(name) => {
                debug!(router = %name, "{self}");
            }
            Debug::SyncVectorMerge(group, advanced) => {
                debug!(group = %group, advanced, "{self}");
            }
            Debug::SyncPeerAdvance(group, router, old_seq, new_seq) => {
                debug!(group = %group, %router, old_seq, new_seq, "{self}");
            }
            Debug::AdvertFetchStart(router, seq) => {
                debug!(%router, seq, "{self}");
            }
            Debug::AdvertFetchRetry(router, seq, attempt) => {
                debug!(%router, seq, attempt, "{self}");
            }
            Debug::AdvertFetchDrop(router, seq) => {
                debug!(%router, seq, "{self}");
            }
            Debug::AdvertApplied(router, seq) => {
                debug!(%router, seq, "{self}");
            }
            Debug::RibRecompute(reachable) => {
                debug!(reachable, "{self}");
            }
            Debug::RibChanged(dest, old_cost, new_cost) => {
                debug!(%dest, ?old_cost, ?new_cost, "{self}");
            }
            Debug::PrefixApplied(op, owner, name)
            | Debug::PrefixDropped(op, owner, name) => {
                debug!(op = %op, %owner, %name, "{self}");
            }
        }
    }
}

impl<'a> std::fmt::Display for Debug<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::ControllerStart => write!(f, "controller starting"),
            Debug::ControllerStop => write!(f, "controller stopping"),
            Debug::NeighborAlive(..) => write!(f, "neighbor alive"),
            Debug::NeighborDead(..) => write!(f, "neighbor dead"),
            Debug::SyncVectorMerge(..) => write!(f, "state vector merged"),
            Debug::SyncPeerAdvance(..) => write!(f, "peer sequence advanced"),
            Debug::AdvertFetchStart(..) => {
                write!(f, "fetching advertisement")
            }
            Debug::AdvertFetchRetry(..) => {
                write!(f, "retrying advertisement fetch")
            }
            Debug::AdvertFetchDrop(..) => {
                write!(f, "giving up on advertisement fetch")
            }
            Debug::AdvertApplied(..) => write!(f, "advertisement applied"),
            Debug::RibRecompute(..) => write!(f, "RIB recomputed"),
            Debug::RibChanged(..) => write!(f, "RIB entry changed"),
            Debug::PrefixApplied(..) => write!(f, "prefix op applied"),
            Debug::PrefixDropped(..) => write!(f, "prefix op dropped"),
        }
    }
}
