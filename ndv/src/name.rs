//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Canonical NDN names.
//!
//! A [`Name`] is an ordered sequence of typed, opaque [`Component`]s.
//! Equality and the prefix relation are defined component-wise, and the
//! canonical (`Ord`) order used for deterministic sorting (e.g. state
//! vectors, §4.D) is the component type tag followed by the raw bytes.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut, TryGetError};
use ndv_utils::bytes::{BytesExt, BytesMutExt};
use serde::{Deserialize, Serialize};

/// A single NDN name component.
///
/// Only the component types the DV protocol actually produces or consumes
/// are modeled; anything else decodes into [`Component::Other`] so that
/// unrecognized but well-formed names still round-trip.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
#[derive(Deserialize, Serialize)]
pub enum Component {
    /// Generic name component (NDN type 8).
    Generic(#[serde(with = "serde_bytes_vec")] Vec<u8>),
    /// Keyword component (NDN type 32), used for the `DV`, `ADS`, `ACT`,
    /// `PSV`, `ADV`, `PFS`, `PFX` path segments.
    Keyword(#[serde(with = "serde_bytes_vec")] Vec<u8>),
    /// Sequence-number component (NDN type 58), used for the advertisement
    /// and prefix-table sequence numbers in `.../ADV/<seq>`.
    Sequence(u64),
    /// Implicit SHA-256 digest component (NDN type 1), used to pin a
    /// specific Data version when needed.
    ImplicitSha256Digest([u8; 32]),
    /// Any other component type, kept opaque.
    Other(u16, #[serde(with = "serde_bytes_vec")] Vec<u8>),
}

mod serde_bytes_vec {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(v: &[u8], s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde::Serialize::serialize(&hex_encode(v), s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = serde::Deserialize::deserialize(d)?;
        hex_decode(&s).map_err(serde::de::Error::custom)
    }

    fn hex_encode(v: &[u8]) -> String {
        v.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
        if s.len() % 2 != 0 {
            return Err("odd-length hex string".to_owned());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&s[i..i + 2], 16)
                    .map_err(|e| e.to_string())
            })
            .collect()
    }
}

// Component type codes (subset of the NDN TLV type registry).
const TYPE_IMPLICIT_SHA256: u16 = 1;
const TYPE_GENERIC: u16 = 8;
const TYPE_KEYWORD: u16 = 32;
const TYPE_SEQUENCE: u16 = 58;

#[derive(Debug, Eq, PartialEq)]
pub enum ComponentDecodeError {
    Truncated,
    InvalidSha256Length(usize),
}

impl fmt::Display for ComponentDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentDecodeError::Truncated => {
                write!(f, "truncated name component")
            }
            ComponentDecodeError::InvalidSha256Length(len) => {
                write!(f, "invalid digest length ({len})")
            }
        }
    }
}

impl std::error::Error for ComponentDecodeError {}

impl From<TryGetError> for ComponentDecodeError {
    fn from(_: TryGetError) -> Self {
        ComponentDecodeError::Truncated
    }
}

// ===== impl Component =====

impl Component {
    pub fn generic(value: impl Into<Vec<u8>>) -> Component {
        Component::Generic(value.into())
    }

    pub fn keyword(value: impl Into<String>) -> Component {
        Component::Keyword(value.into().into_bytes())
    }

    pub fn sequence(seq: u64) -> Component {
        Component::Sequence(seq)
    }

    fn type_code(&self) -> u16 {
        match self {
            Component::ImplicitSha256Digest(..) => TYPE_IMPLICIT_SHA256,
            Component::Generic(..) => TYPE_GENERIC,
            Component::Keyword(..) => TYPE_KEYWORD,
            Component::Sequence(..) => TYPE_SEQUENCE,
            Component::Other(t, ..) => *t,
        }
    }

    /// Returns the component's textual value for display and as a
    /// `generic`/`keyword`-style identifier; sequence numbers render as
    /// decimal digits as NDN convention dictates (`seq=<n>`).
    pub fn as_text(&self) -> String {
        match self {
            Component::Generic(v) | Component::Keyword(v) => {
                String::from_utf8_lossy(v).into_owned()
            }
            Component::Sequence(seq) => format!("seq={seq}"),
            Component::ImplicitSha256Digest(digest) => {
                digest.iter().map(|b| format!("{b:02x}")).collect()
            }
            Component::Other(_, v) => String::from_utf8_lossy(v).into_owned(),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.type_code());
        match self {
            Component::Generic(v) | Component::Keyword(v) => {
                buf.put_blob(v);
            }
            Component::Sequence(seq) => {
                buf.put_u16(8);
                buf.put_u64(*seq);
            }
            Component::ImplicitSha256Digest(digest) => {
                buf.put_blob(digest);
            }
            Component::Other(_, v) => {
                buf.put_blob(v);
            }
        }
    }

    pub fn decode(
        buf: &mut Bytes,
    ) -> Result<Component, ComponentDecodeError> {
        let type_code = buf.try_get_u16()?;
        match type_code {
            TYPE_SEQUENCE => {
                let len = buf.try_get_u16()?;
                if len != 8 {
                    return Err(ComponentDecodeError::Truncated);
                }
                Ok(Component::Sequence(buf.try_get_u64()?))
            }
            TYPE_IMPLICIT_SHA256 => {
                let blob = buf.try_get_blob()?;
                let digest: [u8; 32] = blob
                    .as_ref()
                    .try_into()
                    .map_err(|_| {
                        ComponentDecodeError::InvalidSha256Length(blob.len())
                    })?;
                Ok(Component::ImplicitSha256Digest(digest))
            }
            TYPE_GENERIC => {
                Ok(Component::Generic(buf.try_get_blob()?.to_vec()))
            }
            TYPE_KEYWORD => {
                Ok(Component::Keyword(buf.try_get_blob()?.to_vec()))
            }
            other => {
                Ok(Component::Other(other, buf.try_get_blob()?.to_vec()))
            }
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// A canonical NDN name: an ordered sequence of [`Component`]s.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
#[derive(Deserialize, Serialize)]
pub struct Name(Vec<Component>);

impl Name {
    pub fn new() -> Name {
        Name(Vec::new())
    }

    pub fn from_components(
        components: impl IntoIterator<Item = Component>,
    ) -> Name {
        Name(components.into_iter().collect())
    }

    /// Parses the slash-separated textual representation used in
    /// configuration (`/net/router`), treating every segment as a generic
    /// component.
    ///
    /// This is a convenience parser for configuration-supplied names; it
    /// doesn't attempt to recover typed components (keywords, sequence
    /// numbers) from text, since those are only ever produced internally.
    pub fn from_str_generic(s: &str) -> Name {
        let mut components = Vec::new();
        for segment in s.split('/') {
            if segment.is_empty() {
                continue;
            }
            components.push(Component::generic(segment.as_bytes()));
        }
        Name(components)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.0
    }

    /// Returns a new name with `other`'s components appended.
    pub fn append(&self, other: impl IntoIterator<Item = Component>) -> Name {
        let mut components = self.0.clone();
        components.extend(other);
        Name(components)
    }

    pub fn append_one(&self, component: Component) -> Name {
        self.append(std::iter::once(component))
    }

    /// Returns whether `self` is a prefix of `other` (§3: `len(N) <=
    /// len(M)` and components agree pairwise).
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.0.len() <= other.0.len()
            && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for component in &self.0 {
            component.encode(&mut buf);
        }
        buf.freeze()
    }

    pub fn decode(mut data: Bytes) -> Result<Name, ComponentDecodeError> {
        let mut components = Vec::new();
        while data.has_remaining() {
            components.push(Component::decode(&mut data)?);
        }
        Ok(Name(components))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for component in &self.0 {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl FromIterator<Component> for Name {
    fn from_iter<T: IntoIterator<Item = Component>>(iter: T) -> Self {
        Name(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_relation() {
        let net = Name::from_str_generic("/net");
        let router = net.append_one(Component::generic("a"));
        assert!(net.is_prefix_of(&router));
        assert!(!router.is_prefix_of(&net));
        assert!(router.is_prefix_of(&router));
    }

    #[test]
    fn name_round_trip() {
        let name = Name::from_str_generic("/net/a")
            .append_one(Component::keyword("DV"))
            .append_one(Component::keyword("ADV"))
            .append_one(Component::sequence(42));
        let encoded = name.encode();
        let decoded = Name::decode(encoded).unwrap();
        assert_eq!(name, decoded);
    }

    #[test]
    fn ordering_is_deterministic() {
        let a = Name::from_str_generic("/net/a");
        let b = Name::from_str_generic("/net/b");
        assert!(a < b);
    }

    #[test]
    fn display_round_trip_for_generic_names() {
        let name = Name::from_str_generic("/net/a/b");
        assert_eq!(name.to_string(), "/net/a/b");
    }
}
