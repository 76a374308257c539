//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Advertisements and the per-router fetcher (§4.E).

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ndv_utils::Sender;
use ndv_utils::bytes::{BytesExt, BytesMutExt};
use ndv_utils::task::TimeoutTask;

use crate::debug::Debug;
use crate::error::CodecError;
use crate::name::Name;
use crate::rib::Cost;
use crate::tasks;
use crate::tasks::messages::input::{
    AdvertFetchRetryMsg, AdvertFetchTimeoutMsg,
};

/// A router's published neighbor list with link costs (§3 "Advertisement").
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Advertisement {
    pub router_name: Name,
    pub sequence_number: u64,
    pub entries: Vec<(Name, Cost)>,
}

impl Advertisement {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_blob(&self.router_name.encode());
        buf.put_u64(self.sequence_number);
        buf.put_u32(self.entries.len() as u32);
        for (neighbor, cost) in &self.entries {
            buf.put_blob(&neighbor.encode());
            buf.put_u8(cost.get());
        }
        buf.freeze()
    }

    pub fn decode(mut data: Bytes) -> Result<Advertisement, CodecError> {
        let router_name = Name::decode(data.try_get_blob()?)?;
        let sequence_number = data.try_get_u64()?;
        let count = data.try_get_u32()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let neighbor = Name::decode(data.try_get_blob()?)?;
            let cost = Cost::new(data.try_get_u8()?)
                .ok_or(CodecError::Truncated)?;
            entries.push((neighbor, cost));
        }
        Ok(Advertisement {
            router_name,
            sequence_number,
            entries,
        })
    }
}

/// After this many failed attempts for the same `(router, seq)`, the
/// fetcher gives up; the next sequence advance for that router starts
/// over (§4.E "Retries").
const MAX_FETCH_ATTEMPTS: u32 = 5;

struct PendingFetch {
    seq: u64,
    attempt: u32,
    // Held only to keep the timers alive; dropping either cancels it.
    _timeout: TimeoutTask,
    _retry: Option<TimeoutTask>,
}

/// Tracks at most one in-flight fetch per router (§4.E "Deduplication").
#[derive(Default)]
pub struct AdvertFetcher {
    pending: BTreeMap<Name, PendingFetch>,
}

impl AdvertFetcher {
    pub fn new() -> AdvertFetcher {
        AdvertFetcher::default()
    }

    /// Starts fetching `router`'s advertisement at `seq`, canceling any
    /// fetch already in flight for `router` (§4.E "A newer advance for `R`
    /// cancels outstanding fetches for older sequences").
    pub fn start(
        &mut self,
        router: Name,
        seq: u64,
        lifetime: Duration,
        timeoutp: &Sender<AdvertFetchTimeoutMsg>,
    ) {
        Debug::AdvertFetchStart(&router, seq).log();
        let timeout_task = tasks::advert_fetch_timeout(
            router.clone(),
            seq,
            lifetime,
            timeoutp,
        );
        self.pending.insert(router, PendingFetch {
            seq,
            attempt: 0,
            _timeout: timeout_task,
            _retry: None,
        });
    }

    /// Returns whether `(router, seq)` is still the fetch currently being
    /// waited for; a response for a superseded sequence is ignored.
    pub fn is_current(&self, router: &Name, seq: u64) -> bool {
        self.pending.get(router).is_some_and(|p| p.seq == seq)
    }

    /// Fetch succeeded: the advertisement was retrieved, validated, and
    /// can be applied. Clears the pending entry.
    pub fn complete(&mut self, router: &Name) {
        self.pending.remove(router);
    }

    /// Fetch failed (timeout or NACK). Reschedules with exponential
    /// backoff capped at `backoff_cap`, or gives up if the attempt count
    /// exceeds [`MAX_FETCH_ATTEMPTS`] (§4.E "Retries").
    pub fn retry(
        &mut self,
        router: &Name,
        seq: u64,
        backoff_cap: Duration,
        retryp: &Sender<AdvertFetchRetryMsg>,
    ) {
        let Some(pending) = self.pending.get_mut(router) else {
            return;
        };
        if pending.seq != seq {
            return;
        }
        if pending.attempt >= MAX_FETCH_ATTEMPTS {
            Debug::AdvertFetchDrop(router, seq).log();
            self.pending.remove(router);
            return;
        }
        pending.attempt += 1;
        Debug::AdvertFetchRetry(router, seq, pending.attempt).log();

        let backoff = backoff_for_attempt(pending.attempt, backoff_cap);
        let retry_task = tasks::advert_fetch_retry(
            router.clone(),
            seq,
            backoff,
            retryp,
        );
        pending._retry = Some(retry_task);
    }

    /// Called when a retry timer fires: restarts the Interest-timeout
    /// clock for the current attempt.
    pub fn restart_timeout(
        &mut self,
        router: &Name,
        seq: u64,
        lifetime: Duration,
        timeoutp: &Sender<AdvertFetchTimeoutMsg>,
    ) {
        let Some(pending) = self.pending.get_mut(router) else {
            return;
        };
        if pending.seq != seq {
            return;
        }
        pending._timeout = tasks::advert_fetch_timeout(
            router.clone(),
            seq,
            lifetime,
            timeoutp,
        );
    }

    pub fn cancel(&mut self, router: &Name) {
        self.pending.remove(router);
    }
}

fn backoff_for_attempt(attempt: u32, cap: Duration) -> Duration {
    let millis = 250u64.saturating_mul(1u64 << attempt.min(10));
    Duration::from_millis(millis).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(name: &str) -> Name {
        Name::from_str_generic(name)
    }

    #[test]
    fn encode_decode_round_trip() {
        let advert = Advertisement {
            router_name: router("/n/a"),
            sequence_number: 7,
            entries: vec![
                (router("/n/b"), Cost::new(1).unwrap()),
                (router("/n/c"), Cost::new(2).unwrap()),
            ],
        };
        let encoded = advert.encode();
        let decoded = Advertisement::decode(encoded).unwrap();
        assert_eq!(advert, decoded);
    }

    #[tokio::test]
    async fn newer_advance_supersedes_older_fetch() {
        let (timeoutp, _rx) = tokio::sync::mpsc::channel(4);
        let mut fetcher = AdvertFetcher::new();
        let router_a = router("/n/a");
        fetcher.start(
            router_a.clone(),
            5,
            Duration::from_secs(4),
            &timeoutp,
        );
        assert!(fetcher.is_current(&router_a, 5));
        fetcher.start(
            router_a.clone(),
            6,
            Duration::from_secs(4),
            &timeoutp,
        );
        assert!(!fetcher.is_current(&router_a, 5));
        assert!(fetcher.is_current(&router_a, 6));
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let (timeoutp, _rx1) = tokio::sync::mpsc::channel(16);
        let (retryp, _rx2) = tokio::sync::mpsc::channel(16);
        let mut fetcher = AdvertFetcher::new();
        let router_a = router("/n/a");
        fetcher.start(
            router_a.clone(),
            1,
            Duration::from_secs(4),
            &timeoutp,
        );
        for _ in 0..MAX_FETCH_ATTEMPTS {
            fetcher.retry(&router_a, 1, Duration::from_secs(4), &retryp);
        }
        assert!(!fetcher.is_current(&router_a, 1));
    }
}
