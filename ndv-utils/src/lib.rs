//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod bytes;
pub mod task;

pub use tokio::sync::mpsc::Sender;
