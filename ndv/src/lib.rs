//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Core control plane of an NDN distance-vector routing daemon.
//!
//! See `controller` for the overall lifecycle; the other modules are the
//! components it wires together.

pub mod advert;
pub mod config;
pub mod controller;
pub mod debug;
pub mod error;
pub mod forwarder;
pub mod name;
pub mod neighbor;
pub mod packet;
pub mod prefixtable;
pub mod rib;
pub mod sync;
pub mod tasks;
pub mod trust;
