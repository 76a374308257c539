//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Inter-task message types and the timer/task constructors that produce
//! them, following the controller's single-event-loop model (§5).
//!
//! Every asynchronous boundary in the DV core — advertisement emission,
//! neighbor liveness, fetch retry/timeout — is a timer that, on firing, sends
//! a message back to the controller rather than mutating shared state
//! directly. This keeps all RIB/sync/prefix-table mutation on the control
//! thread (§5 "Scheduling").

use std::time::Duration;

use ndv_utils::Sender;
use ndv_utils::task::{IntervalTask, TimeoutTask};

use crate::name::Name;

pub mod messages {
    use super::*;

    pub mod input {
        use super::*;

        #[derive(Debug)]
        pub enum ProtocolMsg {
            AdvertiseTick(AdvertiseTickMsg),
            NbrTimeout(NbrTimeoutMsg),
            AdvertFetchRetry(AdvertFetchRetryMsg),
            AdvertFetchTimeout(AdvertFetchTimeoutMsg),
            PrefixFetchRetry(PrefixFetchRetryMsg),
            PrefixFetchTimeout(PrefixFetchTimeoutMsg),
        }

        #[derive(Debug)]
        pub struct AdvertiseTickMsg {}

        #[derive(Debug)]
        pub struct NbrTimeoutMsg {
            pub uri: String,
        }

        #[derive(Debug)]
        pub struct AdvertFetchRetryMsg {
            pub router: Name,
            pub seq: u64,
        }

        #[derive(Debug)]
        pub struct AdvertFetchTimeoutMsg {
            pub router: Name,
            pub seq: u64,
        }

        #[derive(Debug)]
        pub struct PrefixFetchRetryMsg {
            pub router: Name,
            pub seq: u64,
        }

        #[derive(Debug)]
        pub struct PrefixFetchTimeoutMsg {
            pub router: Name,
            pub seq: u64,
        }
    }
}

use messages::input::{
    AdvertFetchRetryMsg, AdvertFetchTimeoutMsg, AdvertiseTickMsg,
    NbrTimeoutMsg, PrefixFetchRetryMsg, PrefixFetchTimeoutMsg,
};

// Advertisement sync-group emit interval (§4.D "Algorithm" step 1).
pub(crate) fn advertise_interval(
    interval: Duration,
    advertise_tickp: &Sender<AdvertiseTickMsg>,
) -> IntervalTask {
    let advertise_tickp = advertise_tickp.clone();
    IntervalTask::new(interval, true, move || {
        let advertise_tickp = advertise_tickp.clone();
        async move {
            let _ = advertise_tickp.send(AdvertiseTickMsg {}).await;
        }
    })
}

// Neighbor dead timer (§3 "Neighbor" lifecycle, §8 invariant 6).
pub(crate) fn nbr_timeout(
    uri: String,
    timeout: Duration,
    nbr_timeoutp: &Sender<NbrTimeoutMsg>,
) -> TimeoutTask {
    let nbr_timeoutp = nbr_timeoutp.clone();
    TimeoutTask::new(timeout, move || async move {
        let msg = NbrTimeoutMsg { uri };
        let _ = nbr_timeoutp.send(msg).await;
    })
}

// Advertisement fetch retry backoff (§4.E "Retries").
pub(crate) fn advert_fetch_retry(
    router: Name,
    seq: u64,
    backoff: Duration,
    retryp: &Sender<AdvertFetchRetryMsg>,
) -> TimeoutTask {
    let retryp = retryp.clone();
    TimeoutTask::new(backoff, move || async move {
        let msg = AdvertFetchRetryMsg { router, seq };
        let _ = retryp.send(msg).await;
    })
}

// Advertisement fetch Interest lifetime (§5 "Timeouts", default 4s).
pub(crate) fn advert_fetch_timeout(
    router: Name,
    seq: u64,
    lifetime: Duration,
    timeoutp: &Sender<AdvertFetchTimeoutMsg>,
) -> TimeoutTask {
    let timeoutp = timeoutp.clone();
    TimeoutTask::new(lifetime, move || async move {
        let msg = AdvertFetchTimeoutMsg { router, seq };
        let _ = timeoutp.send(msg).await;
    })
}

// Prefix-table fetch retry backoff (shared pattern with §4.E, used by §4.G).
pub(crate) fn prefix_fetch_retry(
    router: Name,
    seq: u64,
    backoff: Duration,
    retryp: &Sender<PrefixFetchRetryMsg>,
) -> TimeoutTask {
    let retryp = retryp.clone();
    TimeoutTask::new(backoff, move || async move {
        let msg = PrefixFetchRetryMsg { router, seq };
        let _ = retryp.send(msg).await;
    })
}

// Prefix-table fetch Interest lifetime.
pub(crate) fn prefix_fetch_timeout(
    router: Name,
    seq: u64,
    lifetime: Duration,
    timeoutp: &Sender<PrefixFetchTimeoutMsg>,
) -> TimeoutTask {
    let timeoutp = timeoutp.clone();
    TimeoutTask::new(lifetime, move || async move {
        let msg = PrefixFetchTimeoutMsg { router, seq };
        let _ = timeoutp.send(msg).await;
    })
}
