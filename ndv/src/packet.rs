//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The generic NDN packet envelope (§2 row A "Interest/Data encode/decode,
//! signature coverage regions").
//!
//! [`Advertisement`](crate::advert::Advertisement) and
//! [`PrefixLog`](crate::prefixtable::PrefixLog) are this daemon's own
//! Content payloads; this module is the envelope they (and the sync-group
//! state vectors) travel in once handed to a real forwarder client —
//! [`Interest`] for every outbound retrieval (§4.D "Active"/"Passive", §4.E,
//! §4.G), [`Data`] for every response an external key-chain has signed.
//!
//! A [`Data`]'s *signature coverage region* is the TLV-VALUE of every field
//! that precedes `SignatureValue` — `Name`, `Content`, `SignatureInfo`, in
//! that order. That's the exact byte range an external key-chain hashes and
//! signs, and the range a verifier must reproduce byte-for-byte before
//! checking `SignatureValue` against it; [`Data::signed_portion`]
//! reproduces it so nothing downstream has to re-derive it from the wire
//! encoding by hand.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ndv_utils::bytes::{BytesExt, BytesMutExt};

use crate::error::CodecError;
use crate::name::Name;

// Packet and field type codes (subset of the NDN TLV type registry).
const TYPE_INTEREST: u16 = 5;
const TYPE_DATA: u16 = 6;
const TYPE_NAME: u16 = 7;
const TYPE_NONCE: u16 = 10;
const TYPE_INTEREST_LIFETIME: u16 = 12;
const TYPE_CONTENT: u16 = 21;
const TYPE_SIGNATURE_INFO: u16 = 22;
const TYPE_SIGNATURE_VALUE: u16 = 23;
const TYPE_SIGNATURE_TYPE: u16 = 27;
const TYPE_KEY_LOCATOR: u16 = 28;

/// Signature algorithm tag carried in `SignatureInfo` (§4.B). The
/// cryptographic primitive itself stays a non-goal (§1); only the tag and
/// the key-locator name the trust schema chain-walks are modeled here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureType {
    Sha256WithRsa,
    Sha256WithEcdsa,
    HmacWithSha256,
}

impl SignatureType {
    fn code(self) -> u8 {
        match self {
            SignatureType::Sha256WithRsa => 1,
            SignatureType::Sha256WithEcdsa => 3,
            SignatureType::HmacWithSha256 => 4,
        }
    }

    fn from_code(code: u8) -> Result<SignatureType, CodecError> {
        match code {
            1 => Ok(SignatureType::Sha256WithRsa),
            3 => Ok(SignatureType::Sha256WithEcdsa),
            4 => Ok(SignatureType::HmacWithSha256),
            _ => Err(CodecError::Truncated),
        }
    }
}

/// `SignatureInfo`: the signature type plus the key-locator name —
/// [`TrustSchema::verify`](crate::trust::TrustSchema::verify) walks the
/// certificate chain starting from this name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignatureInfo {
    pub signature_type: SignatureType,
    pub key_locator: Name,
}

impl SignatureInfo {
    pub fn new(signature_type: SignatureType, key_locator: Name) -> SignatureInfo {
        SignatureInfo {
            signature_type,
            key_locator,
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        let mut inner = BytesMut::new();
        inner.put_u16(TYPE_SIGNATURE_TYPE);
        inner.put_u16(1);
        inner.put_u8(self.signature_type.code());
        inner.put_u16(TYPE_KEY_LOCATOR);
        inner.put_blob(&self.key_locator.encode());
        buf.put_u16(TYPE_SIGNATURE_INFO);
        buf.put_blob(&inner);
    }

    fn decode(mut data: Bytes) -> Result<SignatureInfo, CodecError> {
        if data.try_get_u16()? != TYPE_SIGNATURE_TYPE {
            return Err(CodecError::Truncated);
        }
        let len = data.try_get_u16()?;
        if len != 1 {
            return Err(CodecError::Truncated);
        }
        let signature_type = SignatureType::from_code(data.try_get_u8()?)?;
        if data.try_get_u16()? != TYPE_KEY_LOCATOR {
            return Err(CodecError::Truncated);
        }
        let key_locator = Name::decode(data.try_get_blob()?)?;
        Ok(SignatureInfo {
            signature_type,
            key_locator,
        })
    }
}

/// An Interest packet: every `/localhop/.../ACT/<vector>` emission (§4.D)
/// and every `.../ADV/<seq>` / `.../PFS/<seq>` fetch (§4.E, §4.G) travels
/// as one of these.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Interest {
    pub name: Name,
    pub nonce: u32,
    pub lifetime_ms: u32,
}

impl Interest {
    pub fn new(name: Name, nonce: u32, lifetime_ms: u32) -> Interest {
        Interest {
            name,
            nonce,
            lifetime_ms,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut inner = BytesMut::new();
        inner.put_u16(TYPE_NAME);
        inner.put_blob(&self.name.encode());
        inner.put_u16(TYPE_NONCE);
        inner.put_u16(4);
        inner.put_u32(self.nonce);
        inner.put_u16(TYPE_INTEREST_LIFETIME);
        inner.put_u16(4);
        inner.put_u32(self.lifetime_ms);

        let mut buf = BytesMut::new();
        buf.put_u16(TYPE_INTEREST);
        buf.put_blob(&inner);
        buf.freeze()
    }

    pub fn decode(mut data: Bytes) -> Result<Interest, CodecError> {
        if data.try_get_u16()? != TYPE_INTEREST {
            return Err(CodecError::Truncated);
        }
        let mut body = data.try_get_blob()?;

        if body.try_get_u16()? != TYPE_NAME {
            return Err(CodecError::Truncated);
        }
        let name = Name::decode(body.try_get_blob()?)?;

        if body.try_get_u16()? != TYPE_NONCE {
            return Err(CodecError::Truncated);
        }
        if body.try_get_u16()? != 4 {
            return Err(CodecError::Truncated);
        }
        let nonce = body.try_get_u32()?;

        if body.try_get_u16()? != TYPE_INTEREST_LIFETIME {
            return Err(CodecError::Truncated);
        }
        if body.try_get_u16()? != 4 {
            return Err(CodecError::Truncated);
        }
        let lifetime_ms = body.try_get_u32()?;

        Ok(Interest {
            name,
            nonce,
            lifetime_ms,
        })
    }
}

/// A Data packet carrying a DV payload (an encoded `Advertisement` or
/// `PrefixLog`, or a sync-group state vector) plus the `SignatureInfo` /
/// `SignatureValue` pair an external key-chain produced over
/// [`signed_portion`](Data::signed_portion) (§4.E "Validates the returned
/// Data's signature").
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Data {
    pub name: Name,
    pub content: Bytes,
    pub signature_info: SignatureInfo,
    pub signature_value: Bytes,
}

impl Data {
    pub fn new(
        name: Name,
        content: Bytes,
        signature_info: SignatureInfo,
        signature_value: Bytes,
    ) -> Data {
        Data {
            name,
            content,
            signature_info,
            signature_value,
        }
    }

    /// The key-locator name a caller should hand to
    /// [`TrustSchema::verify`](crate::trust::TrustSchema::verify) as the
    /// signer.
    pub fn signer(&self) -> &Name {
        &self.signature_info.key_locator
    }

    /// The signature coverage region: `Name` + `Content` + `SignatureInfo`,
    /// excluding `SignatureValue` — the exact byte range the signature in
    /// this packet covers.
    pub fn signed_portion(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u16(TYPE_NAME);
        buf.put_blob(&self.name.encode());
        buf.put_u16(TYPE_CONTENT);
        buf.put_blob(&self.content);
        self.signature_info.encode(&mut buf);
        buf.freeze()
    }

    pub fn encode(&self) -> Bytes {
        let mut inner = BytesMut::new();
        inner.put_slice(&self.signed_portion());
        inner.put_u16(TYPE_SIGNATURE_VALUE);
        inner.put_blob(&self.signature_value);

        let mut buf = BytesMut::new();
        buf.put_u16(TYPE_DATA);
        buf.put_blob(&inner);
        buf.freeze()
    }

    pub fn decode(mut data: Bytes) -> Result<Data, CodecError> {
        if data.try_get_u16()? != TYPE_DATA {
            return Err(CodecError::Truncated);
        }
        let mut body = data.try_get_blob()?;

        if body.try_get_u16()? != TYPE_NAME {
            return Err(CodecError::Truncated);
        }
        let name = Name::decode(body.try_get_blob()?)?;

        if body.try_get_u16()? != TYPE_CONTENT {
            return Err(CodecError::Truncated);
        }
        let content = body.try_get_blob()?;

        if body.try_get_u16()? != TYPE_SIGNATURE_INFO {
            return Err(CodecError::Truncated);
        }
        let signature_info = SignatureInfo::decode(body.try_get_blob()?)?;

        if body.try_get_u16()? != TYPE_SIGNATURE_VALUE {
            return Err(CodecError::Truncated);
        }
        let signature_value = body.try_get_blob()?;

        Ok(Data {
            name,
            content,
            signature_info,
            signature_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Component;

    fn name(s: &str) -> Name {
        Name::from_str_generic(s)
    }

    #[test]
    fn interest_round_trip() {
        let interest = Interest::new(
            name("/n/DV/ADS/ACT").append_one(Component::generic("vec")),
            0xdead_beef,
            4000,
        );
        let encoded = interest.encode();
        let decoded = Interest::decode(encoded).unwrap();
        assert_eq!(interest, decoded);
    }

    #[test]
    fn data_round_trip_preserves_signer() {
        let data = Data::new(
            name("/n/a/DV/ADV").append_one(Component::sequence(3)),
            Bytes::from_static(b"advertisement-bytes"),
            SignatureInfo::new(
                SignatureType::Sha256WithEcdsa,
                name("/n/a/KEY/1"),
            ),
            Bytes::from_static(b"signature-bytes"),
        );
        let encoded = data.encode();
        let decoded = Data::decode(encoded).unwrap();
        assert_eq!(data, decoded);
        assert_eq!(decoded.signer(), &name("/n/a/KEY/1"));
    }

    #[test]
    fn signed_portion_excludes_signature_value() {
        let mut data = Data::new(
            name("/n/a/DV/ADV").append_one(Component::sequence(3)),
            Bytes::from_static(b"content"),
            SignatureInfo::new(SignatureType::Sha256WithRsa, name("/n/a/KEY/1")),
            Bytes::from_static(b"sig-a"),
        );
        let covered = data.signed_portion();
        // Changing only the signature value must not change what's covered.
        data.signature_value = Bytes::from_static(b"a-completely-different-sig");
        assert_eq!(covered, data.signed_portion());
    }

    #[test]
    fn signed_portion_changes_with_content() {
        let info = SignatureInfo::new(SignatureType::Sha256WithRsa, name("/n/a/KEY/1"));
        let a = Data::new(
            name("/n/a/DV/ADV"),
            Bytes::from_static(b"one"),
            info.clone(),
            Bytes::new(),
        );
        let b = Data::new(
            name("/n/a/DV/ADV"),
            Bytes::from_static(b"two"),
            info,
            Bytes::new(),
        );
        assert_ne!(a.signed_portion(), b.signed_portion());
    }
}
