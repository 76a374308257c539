//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! State-vector synchronization (§4.D, §4.G).
//!
//! Both the advertisement sync group and the prefix-table sync group are
//! instances of the same pattern: a `router_name -> sequence_number` map,
//! merged pointwise-max on reception, with peer advances surfaced to the
//! caller. The two groups differ only in their name prefixes and in what a
//! sequence advance triggers downstream (an advertisement fetch vs. a
//! prefix-table fetch), so a single [`StateVector`] type serves both.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ndv_utils::bytes::{BytesExt, BytesMutExt};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::name::Name;

/// A `router_name -> sequence_number` mapping (§3 "Sync state vector").
///
/// The backing `BTreeMap` keeps entries sorted by name, which is both the
/// canonical encoding order (§4.D "a state vector is TLV-encoded as an
/// ordered list...sorted by router name") and how equality/iteration order
/// is defined.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct StateVector(BTreeMap<Name, u64>);

impl StateVector {
    pub fn new() -> StateVector {
        StateVector(BTreeMap::new())
    }

    pub fn get(&self, router: &Name) -> Option<u64> {
        self.0.get(router).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Name, u64)> {
        self.0.iter().map(|(n, s)| (n, *s))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sets `router`'s sequence number, but only if it is strictly greater
    /// than what's already recorded (§3 "a received smaller or equal
    /// sequence is ignored", §8 invariant 1).
    ///
    /// Returns the previous sequence number if the update was applied.
    pub fn advance(&mut self, router: Name, seq: u64) -> Option<Option<u64>> {
        match self.0.get(&router).copied() {
            Some(cur) if seq <= cur => None,
            prev => {
                self.0.insert(router, seq);
                Some(prev)
            }
        }
    }

    /// Merges `other` into `self`, taking the pointwise maximum (§3
    /// "`merge(other)` takes the pointwise maximum"). Returns the list of
    /// `(router, old_seq, new_seq)` triples for routers whose sequence
    /// advanced as a result; `old_seq` is `None` if the router was
    /// previously unknown.
    ///
    /// Merging is commutative and idempotent: re-delivering the same vector
    /// (or merging in either order) produces the same resulting state and
    /// an empty advance list on repeat (§4.D "Ordering").
    pub fn merge(&mut self, other: &StateVector) -> Vec<(Name, Option<u64>, u64)> {
        let mut advances = Vec::new();
        for (router, &seq) in &other.0 {
            if let Some(old) = self.advance(router.clone(), seq) {
                advances.push((router.clone(), old, seq));
            }
        }
        advances
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u32(self.0.len() as u32);
        for (router, seq) in &self.0 {
            let name = router.encode();
            buf.put_blob(&name);
            buf.put_u64(*seq);
        }
        buf.freeze()
    }

    pub fn decode(mut data: Bytes) -> Result<StateVector, CodecError> {
        let count = data.try_get_u32()?;
        let mut map = BTreeMap::new();
        let mut last: Option<Name> = None;
        for _ in 0..count {
            let name_bytes = data.try_get_blob()?;
            let router = Name::decode(name_bytes)?;
            let seq = data.try_get_u64()?;
            if let Some(last) = &last
                && *last >= router
            {
                return Err(CodecError::NonMonotonicStateVector);
            }
            last = Some(router.clone());
            map.insert(router, seq);
        }
        Ok(StateVector(map))
    }
}

/// One side (either the advertisement group or the prefix-table group) of
/// the sync pattern described in §4.D, scoped to this router's own view.
#[derive(Debug)]
pub struct SyncGroup {
    local_router: Name,
    vector: StateVector,
}

impl SyncGroup {
    pub fn new(local_router: Name) -> SyncGroup {
        let mut vector = StateVector::new();
        vector.advance(local_router.clone(), 0);
        SyncGroup {
            local_router,
            vector,
        }
    }

    pub fn vector(&self) -> &StateVector {
        &self.vector
    }

    pub fn local_seq(&self) -> u64 {
        self.vector.get(&self.local_router).unwrap_or(0)
    }

    /// Increments the local router's sequence number, e.g. on a local
    /// topology or prefix-set change, and returns the new value.
    pub fn bump_local(&mut self) -> u64 {
        let next = self.local_seq() + 1;
        self.vector.advance(self.local_router.clone(), next);
        next
    }

    /// Merges an incoming vector and returns the peer advances. The local
    /// router's own entry is never taken from a peer — it only ever
    /// advances via [`Self::bump_local`] — so a peer's (possibly stale or
    /// replayed) view of our own sequence number can't clobber it.
    pub fn merge(
        &mut self,
        incoming: &StateVector,
    ) -> Vec<(Name, Option<u64>, u64)> {
        let foreign: StateVector = StateVector(
            incoming
                .0
                .iter()
                .filter(|(router, _)| **router != self.local_router)
                .map(|(router, seq)| (router.clone(), *seq))
                .collect(),
        );
        self.vector.merge(&foreign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(name: &str) -> Name {
        Name::from_str_generic(name)
    }

    #[test]
    fn merge_is_pointwise_max() {
        let mut a = StateVector::new();
        a.advance(router("/n/a"), 3);
        a.advance(router("/n/b"), 1);
        let mut b = StateVector::new();
        b.advance(router("/n/a"), 2);
        b.advance(router("/n/b"), 5);

        let advances = a.merge(&b);
        assert_eq!(a.get(&router("/n/a")), Some(3));
        assert_eq!(a.get(&router("/n/b")), Some(5));
        assert_eq!(advances, vec![(router("/n/b"), Some(1), 5)]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = StateVector::new();
        a.advance(router("/n/a"), 3);
        let b = a.clone();
        let advances = a.merge(&b);
        assert!(advances.is_empty());
    }

    #[test]
    fn replayed_lower_sequence_is_ignored() {
        let mut a = StateVector::new();
        a.advance(router("/n/b"), 7);
        let mut replay = StateVector::new();
        replay.advance(router("/n/b"), 5);
        let advances = a.merge(&replay);
        assert!(advances.is_empty());
        assert_eq!(a.get(&router("/n/b")), Some(7));
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut v = StateVector::new();
        v.advance(router("/n/a"), 3);
        v.advance(router("/n/b"), 9);
        let encoded = v.encode();
        let decoded = StateVector::decode(encoded).unwrap();
        assert_eq!(v, decoded);
    }

    #[test]
    fn sync_group_excludes_local_router_from_advances() {
        let local = router("/n/a");
        let mut group = SyncGroup::new(local.clone());
        group.bump_local();
        let mut incoming = StateVector::new();
        incoming.advance(local, 99);
        incoming.advance(router("/n/b"), 1);
        let advances = group.merge(&incoming);
        assert_eq!(advances, vec![(router("/n/b"), None, 1)]);
    }
}
