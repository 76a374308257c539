//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Trust schema evaluation (§4.B).
//!
//! Actual signature verification (the cryptographic primitive itself) is an
//! explicit non-goal (§1) — it's consumed via an external key-chain. What
//! lives here is the *policy*: given a data name and the name of the key
//! that (purportedly, per the external verifier) signed it, decide whether
//! the signer is permitted to speak for that name, and whether its
//! certificate chain terminates at a configured anchor.
//!
//! Two independent schemas are configured in practice (§6): one gates DV
//! sync traffic, the other gates prefix injection (§4.G "Authorization").
//! Both are instances of this same [`TrustSchema`] type with different
//! rule/anchor sets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::TrustError;
use crate::name::Name;

/// A single permit rule: a signer whose name is prefixed by `signer_prefix`
/// may sign data whose name is prefixed by `data_prefix`.
#[derive(Clone, Debug)]
pub struct PermitRule {
    pub data_prefix: Name,
    pub signer_prefix: Name,
}

impl PermitRule {
    pub fn new(data_prefix: Name, signer_prefix: Name) -> PermitRule {
        PermitRule {
            data_prefix,
            signer_prefix,
        }
    }

    fn matches(&self, data_name: &Name, signer_name: &Name) -> bool {
        self.data_prefix.is_prefix_of(data_name)
            && self.signer_prefix.is_prefix_of(signer_name)
    }
}

/// A cached certificate: who signed it (its own key-locator, which is
/// walked one step further up the chain) and when it expires.
#[derive(Clone, Debug)]
pub struct Certificate {
    pub name: Name,
    pub issuer: Name,
    pub valid_until: DateTime<Utc>,
}

/// Certificates keyed by name, with expiry-aware lookup (§4.B "Caching").
#[derive(Debug, Default)]
pub struct KeyCache {
    entries: BTreeMap<Name, Certificate>,
}

impl KeyCache {
    pub fn new() -> KeyCache {
        KeyCache::default()
    }

    /// Returns the cached certificate if present and not expired at `now`.
    pub fn get(&self, name: &Name, now: DateTime<Utc>) -> Option<&Certificate> {
        self.entries
            .get(name)
            .filter(|cert| cert.valid_until > now)
    }

    pub fn insert(&mut self, cert: Certificate) {
        self.entries.insert(cert.name.clone(), cert);
    }
}

/// A declarative policy relating data names to permitted signer names, plus
/// a set of trust anchors the chain must terminate at (§3 "Trust anchors").
#[derive(Debug)]
pub struct TrustSchema {
    /// `prefix_injection_schema: "insecure"` / `prefix_injection_keychain:
    /// "insecure"` (§6): skip all checks and permit everything.
    insecure: bool,
    rules: Vec<PermitRule>,
    anchors: Vec<Name>,
}

/// A chain longer than this can't legitimately terminate at an anchor and
/// indicates either a misconfiguration or a cycle; bail out rather than
/// loop forever.
const MAX_CHAIN_DEPTH: usize = 8;

impl TrustSchema {
    pub fn new(rules: Vec<PermitRule>, anchors: Vec<Name>) -> TrustSchema {
        TrustSchema {
            insecure: false,
            rules,
            anchors,
        }
    }

    pub fn insecure() -> TrustSchema {
        TrustSchema {
            insecure: true,
            rules: Vec::new(),
            anchors: Vec::new(),
        }
    }

    fn is_anchor(&self, name: &Name) -> bool {
        self.anchors.iter().any(|anchor| anchor == name)
    }

    fn permits(&self, data_name: &Name, signer_name: &Name) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.matches(data_name, signer_name))
    }

    /// Verifies that `signer_name` is permitted by a rule to sign
    /// `data_name`, then walks the certificate chain from `signer_name`
    /// until it reaches a configured anchor (§4.B "Contract").
    ///
    /// `now` is passed in explicitly rather than read from the clock so
    /// that expiry checks are deterministic in tests.
    pub fn verify(
        &self,
        data_name: &Name,
        signer_name: &Name,
        cache: &KeyCache,
        now: DateTime<Utc>,
    ) -> Result<(), TrustError> {
        if self.insecure {
            return Ok(());
        }

        if !self.permits(data_name, signer_name) {
            return Err(TrustError::NoPermitRule(
                data_name.clone(),
                signer_name.clone(),
            ));
        }

        let mut current = signer_name.clone();
        for _ in 0..MAX_CHAIN_DEPTH {
            if self.is_anchor(&current) {
                return Ok(());
            }
            let cert = cache
                .get(&current, now)
                .ok_or_else(|| TrustError::UnresolvedKey(current.clone()))?;
            current = cert.issuer.clone();
        }
        Err(TrustError::AnchorMismatch(signer_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::from_str_generic(s)
    }

    #[test]
    fn insecure_schema_permits_everything() {
        let schema = TrustSchema::insecure();
        let cache = KeyCache::new();
        assert!(schema
            .verify(&name("/foo"), &name("/whoever"), &cache, Utc::now())
            .is_ok());
    }

    #[test]
    fn unpermitted_signer_is_rejected() {
        let schema = TrustSchema::new(
            vec![PermitRule::new(name("/net"), name("/net/a"))],
            vec![name("/net/anchor")],
        );
        let cache = KeyCache::new();
        let err = schema
            .verify(&name("/net/foo"), &name("/net/b"), &cache, Utc::now())
            .unwrap_err();
        assert!(matches!(err, TrustError::NoPermitRule(..)));
    }

    #[test]
    fn chain_terminating_at_anchor_is_accepted() {
        let anchor = name("/net/anchor");
        let signer = name("/net/a/KEY/1");
        let schema = TrustSchema::new(
            vec![PermitRule::new(name("/net"), name("/net/a"))],
            vec![anchor.clone()],
        );
        let mut cache = KeyCache::new();
        cache.insert(Certificate {
            name: signer.clone(),
            issuer: anchor.clone(),
            valid_until: Utc::now() + chrono::Duration::days(1),
        });
        assert!(schema
            .verify(&name("/net/foo"), &signer, &cache, Utc::now())
            .is_ok());
    }

    #[test]
    fn unresolved_intermediate_key_is_rejected() {
        let signer = name("/net/a/KEY/1");
        let schema = TrustSchema::new(
            vec![PermitRule::new(name("/net"), name("/net/a"))],
            vec![name("/net/anchor")],
        );
        let cache = KeyCache::new();
        let err = schema
            .verify(&name("/net/foo"), &signer, &cache, Utc::now())
            .unwrap_err();
        assert!(matches!(err, TrustError::UnresolvedKey(_)));
    }
}
