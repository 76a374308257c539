//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The face/forwarder management client (§4.C).
//!
//! The DV core never speaks the forwarder's management protocol directly;
//! it's consumed through this trait, which stands in for the NFD-style
//! management dataset (`/localhost/nfd/...`) described in §6. Production
//! code talks to a real forwarder over a management face; tests substitute
//! an in-memory [`Forwarder`] implementation (§13).
//!
//! All operations are modeled as synchronous request/response exchanges
//! (§4.C "All calls are synchronous, return `ok` or a typed error") even
//! though the trait methods are `async fn` — the asynchrony is in waiting
//! for the management Data to come back, not in pipelining multiple
//! outstanding requests.

use crate::error::ForwarderError;
use crate::name::Name;

/// The route-origin code point this daemon registers all of its routes
/// under, chosen to interoperate with NLSR at the same code point (§6
/// "Wire compatibility", §9 glossary "NLSR origin").
pub const DV_ORIGIN: u64 = 128;

/// Face persistency, mirrored from the NFD management dataset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Persistency {
    Persistent,
    Permanent,
    OnDemand,
}

pub type FaceId = u64;

/// The capability set every face transport (unicast UDP, multicast UDP,
/// TCP, Unix) shares, abstracted rather than modeled as a class hierarchy
/// (§9 "Polymorphic transports").
pub trait Forwarder {
    /// Registers a name prefix as a local receive route.
    async fn register_prefix(
        &self,
        name: &Name,
    ) -> Result<(), ForwarderError>;

    /// Removes a previously registered local receive route.
    async fn unregister_prefix(
        &self,
        name: &Name,
    ) -> Result<(), ForwarderError>;

    /// Creates (or, if one already exists for `uri`, returns) a face.
    /// Idempotent (§4.C).
    async fn create_face(
        &self,
        uri: &str,
        mtu: Option<u32>,
        persistency: Persistency,
    ) -> Result<FaceId, ForwarderError>;

    async fn destroy_face(
        &self,
        face_id: FaceId,
    ) -> Result<(), ForwarderError>;

    /// Installs a next-hop for `name` over `face_id` at the given cost,
    /// under [`DV_ORIGIN`].
    async fn add_next_hop(
        &self,
        name: &Name,
        face_id: FaceId,
        cost: u64,
    ) -> Result<(), ForwarderError>;

    async fn remove_next_hop(
        &self,
        name: &Name,
        face_id: FaceId,
    ) -> Result<(), ForwarderError>;

    /// Sets the forwarding strategy for `name` to multicast, as required
    /// for the sync-group Active/Passive prefixes (§6 "the multicast
    /// strategy at `/localhost/nfd/strategy/multicast`").
    async fn set_multicast_strategy(
        &self,
        name: &Name,
    ) -> Result<(), ForwarderError>;
}

#[cfg(test)]
pub mod test {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    /// An in-memory forwarder stand-in used by controller/RIB-integration
    /// tests (§13): records every call instead of talking to a real
    /// forwarder.
    #[derive(Default)]
    pub struct MockForwarder {
        pub registered: Mutex<Vec<Name>>,
        pub faces: Mutex<BTreeMap<String, FaceId>>,
        pub next_hops: Mutex<Vec<(Name, FaceId)>>,
        next_face_id: Mutex<FaceId>,
    }

    impl Forwarder for MockForwarder {
        async fn register_prefix(
            &self,
            name: &Name,
        ) -> Result<(), ForwarderError> {
            self.registered.lock().unwrap().push(name.clone());
            Ok(())
        }

        async fn unregister_prefix(
            &self,
            name: &Name,
        ) -> Result<(), ForwarderError> {
            self.registered.lock().unwrap().retain(|n| n != name);
            Ok(())
        }

        async fn create_face(
            &self,
            uri: &str,
            _mtu: Option<u32>,
            _persistency: Persistency,
        ) -> Result<FaceId, ForwarderError> {
            let mut faces = self.faces.lock().unwrap();
            if let Some(&id) = faces.get(uri) {
                return Ok(id);
            }
            let mut next_id = self.next_face_id.lock().unwrap();
            *next_id += 1;
            faces.insert(uri.to_owned(), *next_id);
            Ok(*next_id)
        }

        async fn destroy_face(
            &self,
            face_id: FaceId,
        ) -> Result<(), ForwarderError> {
            self.faces.lock().unwrap().retain(|_, id| *id != face_id);
            Ok(())
        }

        async fn add_next_hop(
            &self,
            name: &Name,
            face_id: FaceId,
            _cost: u64,
        ) -> Result<(), ForwarderError> {
            self.next_hops.lock().unwrap().push((name.clone(), face_id));
            Ok(())
        }

        async fn remove_next_hop(
            &self,
            name: &Name,
            face_id: FaceId,
        ) -> Result<(), ForwarderError> {
            self.next_hops
                .lock()
                .unwrap()
                .retain(|(n, f)| !(n == name && *f == face_id));
            Ok(())
        }

        async fn set_multicast_strategy(
            &self,
            _name: &Name,
        ) -> Result<(), ForwarderError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn create_face_is_idempotent() {
        let fwd = MockForwarder::default();
        let a = fwd
            .create_face("udp4://192.0.2.1:6363", None, Persistency::Permanent)
            .await
            .unwrap();
        let b = fwd
            .create_face("udp4://192.0.2.1:6363", None, Persistency::Permanent)
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
