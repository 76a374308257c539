//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The network-wide prefix table (§4.G).
//!
//! Distributed over a second state-vector sync group (`sync::SyncGroup`,
//! shared with §4.D's advertisement group by type, distinguished by name
//! prefix). Each router publishes an append-only log of `(op, name)` pairs
//! at `/<router>/DV/PFX/<seq>`; readers fold the log into a `(owner, name)
//! -> latest op` map, since later entries supersede earlier ones for the
//! same name (§4.G "Structure").
//!
//! Trust-schema authorization (§4.G "Authorization") is the caller's
//! responsibility: [`PrefixTable::apply`] has no opinion on who's allowed to
//! originate what, it only folds ops that have already been accepted.
//! Whether a prefix is *active* additionally depends on the owner's
//! reachability in the RIB (§3 "Prefix entry"), which this table also
//! doesn't track — combine [`PrefixTable::names_owned_by`] with
//! `Rib::entry` at the call site.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ndv_utils::bytes::{BytesExt, BytesMutExt};

use crate::error::CodecError;
use crate::name::Name;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrefixOp {
    Add,
    Remove,
}

/// A published log of prefix operations for one sequence fetch (§4.G
/// "the payload...is a totally-ordered log of operations...since the
/// prior snapshot").
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrefixLog {
    pub owner: Name,
    pub sequence_number: u64,
    pub ops: Vec<(PrefixOp, Name)>,
}

impl PrefixLog {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_blob(&self.owner.encode());
        buf.put_u64(self.sequence_number);
        buf.put_u32(self.ops.len() as u32);
        for (op, name) in &self.ops {
            buf.put_u8(match op {
                PrefixOp::Add => 0,
                PrefixOp::Remove => 1,
            });
            buf.put_blob(&name.encode());
        }
        buf.freeze()
    }

    pub fn decode(mut data: Bytes) -> Result<PrefixLog, CodecError> {
        let owner = Name::decode(data.try_get_blob()?)?;
        let sequence_number = data.try_get_u64()?;
        let count = data.try_get_u32()?;
        let mut ops = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let op = match data.try_get_u8()? {
                0 => PrefixOp::Add,
                1 => PrefixOp::Remove,
                _ => return Err(CodecError::Truncated),
            };
            let name = Name::decode(data.try_get_blob()?)?;
            ops.push((op, name));
        }
        Ok(PrefixLog {
            owner,
            sequence_number,
            ops,
        })
    }
}

/// A change to the latest-op map, reported so the controller can re-derive
/// which prefixes should be installed (§4.G "Installation").
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PrefixChange {
    Activated(Name, Name),
    Deactivated(Name, Name),
}

/// The folded `(owner, name) -> latest op` view (§3 "Prefix entry").
#[derive(Debug, Default)]
pub struct PrefixTable {
    state: BTreeMap<(Name, Name), PrefixOp>,
}

impl PrefixTable {
    pub fn new() -> PrefixTable {
        PrefixTable::default()
    }

    /// Applies a single already-authorized op. Returns a change if the
    /// prefix's active/inactive status flipped; applying the same op
    /// again (or an older op, since the sync layer guarantees sequences
    /// only move forward) is a no-op (§8 "Round-trip laws": same log vs.
    /// duplicates yields the same active set).
    pub fn apply(
        &mut self,
        owner: Name,
        name: Name,
        op: PrefixOp,
    ) -> Option<PrefixChange> {
        let key = (owner.clone(), name.clone());
        let was_active =
            matches!(self.state.get(&key), Some(PrefixOp::Add));
        let now_active = matches!(op, PrefixOp::Add);
        self.state.insert(key, op);
        match (was_active, now_active) {
            (false, true) => Some(PrefixChange::Activated(owner, name)),
            (true, false) => Some(PrefixChange::Deactivated(owner, name)),
            _ => None,
        }
    }

    /// Applies an entire log in order, as delivered by a fetch.
    pub fn apply_log(
        &mut self,
        log: &PrefixLog,
    ) -> Vec<PrefixChange> {
        log.ops
            .iter()
            .filter_map(|(op, name)| {
                self.apply(log.owner.clone(), name.clone(), *op)
            })
            .collect()
    }

    /// Names with their latest op `Add`, owned by `owner`, regardless of
    /// the owner's current reachability.
    pub fn names_owned_by(&self, owner: &Name) -> Vec<Name> {
        self.state
            .iter()
            .filter(|((o, _), op)| o == owner && matches!(op, PrefixOp::Add))
            .map(|((_, name), _)| name.clone())
            .collect()
    }

    pub fn is_active(&self, owner: &Name, name: &Name) -> bool {
        matches!(
            self.state.get(&(owner.clone(), name.clone())),
            Some(PrefixOp::Add)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::from_str_generic(s)
    }

    #[test]
    fn encode_decode_round_trip() {
        let log = PrefixLog {
            owner: name("/n/a"),
            sequence_number: 3,
            ops: vec![
                (PrefixOp::Add, name("/p/1")),
                (PrefixOp::Remove, name("/p/2")),
            ],
        };
        let encoded = log.encode();
        let decoded = PrefixLog::decode(encoded).unwrap();
        assert_eq!(log, decoded);
    }

    #[test]
    fn later_op_supersedes_earlier_for_same_name() {
        let mut table = PrefixTable::new();
        let owner = name("/n/a");
        let log = PrefixLog {
            owner: owner.clone(),
            sequence_number: 1,
            ops: vec![
                (PrefixOp::Add, name("/p/1")),
                (PrefixOp::Remove, name("/p/1")),
            ],
        };
        table.apply_log(&log);
        assert!(!table.is_active(&owner, &name("/p/1")));
    }

    #[test]
    fn duplicate_application_yields_same_active_set() {
        let owner = name("/n/a");
        let log = PrefixLog {
            owner: owner.clone(),
            sequence_number: 1,
            ops: vec![(PrefixOp::Add, name("/p/1"))],
        };

        let mut once = PrefixTable::new();
        once.apply_log(&log);

        let mut twice = PrefixTable::new();
        twice.apply_log(&log);
        twice.apply_log(&log);

        assert_eq!(
            once.names_owned_by(&owner),
            twice.names_owned_by(&owner)
        );
    }
}
