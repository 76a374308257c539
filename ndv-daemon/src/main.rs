//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

#![warn(rust_2018_idioms)]

use clap::{App, Arg};
use ndv::config::{Config, RawConfig};
use ndv::controller::{Controller, ControllerChannels};
use ndv::forwarder::{FaceId, Forwarder, Persistency};
use ndv::error::ForwarderError;
use ndv::name::Name;
use tracing::{error, info};

/// Stands in for a real NFD management client. Talking to an actual
/// forwarder is out of scope for this daemon (forwarder internals are a
/// non-goal); this adapter just logs every call and reports success so the
/// rest of the control plane can run end to end.
struct LoggingForwarder {
    next_face_id: std::sync::atomic::AtomicU64,
}

impl LoggingForwarder {
    fn new() -> LoggingForwarder {
        LoggingForwarder {
            next_face_id: std::sync::atomic::AtomicU64::new(1),
        }
    }
}

impl Forwarder for LoggingForwarder {
    async fn register_prefix(&self, name: &Name) -> Result<(), ForwarderError> {
        info!(%name, "register prefix");
        Ok(())
    }

    async fn unregister_prefix(
        &self,
        name: &Name,
    ) -> Result<(), ForwarderError> {
        info!(%name, "unregister prefix");
        Ok(())
    }

    async fn create_face(
        &self,
        uri: &str,
        mtu: Option<u32>,
        persistency: Persistency,
    ) -> Result<FaceId, ForwarderError> {
        let id = self
            .next_face_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        info!(uri, ?mtu, ?persistency, face_id = id, "create face");
        Ok(id)
    }

    async fn destroy_face(&self, face_id: FaceId) -> Result<(), ForwarderError> {
        info!(face_id, "destroy face");
        Ok(())
    }

    async fn add_next_hop(
        &self,
        name: &Name,
        face_id: FaceId,
        cost: u64,
    ) -> Result<(), ForwarderError> {
        info!(%name, face_id, cost, "add next hop");
        Ok(())
    }

    async fn remove_next_hop(
        &self,
        name: &Name,
        face_id: FaceId,
    ) -> Result<(), ForwarderError> {
        info!(%name, face_id, "remove next hop");
        Ok(())
    }

    async fn set_multicast_strategy(
        &self,
        name: &Name,
    ) -> Result<(), ForwarderError> {
        info!(%name, "set multicast strategy");
        Ok(())
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("ndv=debug".parse().unwrap())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

async fn run(config: Config) {
    let (advertise_tick, mut advertise_tick_rx) = tokio::sync::mpsc::channel(16);
    let (nbr_timeout, mut nbr_timeout_rx) = tokio::sync::mpsc::channel(16);
    let (advert_fetch_retry, mut advert_fetch_retry_rx) =
        tokio::sync::mpsc::channel(16);
    let (advert_fetch_timeout, mut advert_fetch_timeout_rx) =
        tokio::sync::mpsc::channel(16);
    let (prefix_fetch_retry, mut prefix_fetch_retry_rx) =
        tokio::sync::mpsc::channel(16);
    let (prefix_fetch_timeout, mut prefix_fetch_timeout_rx) =
        tokio::sync::mpsc::channel(16);

    let channels = ControllerChannels {
        advertise_tick,
        nbr_timeout,
        advert_fetch_retry,
        advert_fetch_timeout,
        prefix_fetch_retry,
        prefix_fetch_timeout,
    };

    let mut controller = Controller::new(config, LoggingForwarder::new(), channels);
    if let Err(error) = controller.start().await {
        error.log();
        std::process::exit(1);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            Some(msg) = advertise_tick_rx.recv() => {
                for (uri, name) in controller.on_advertise_tick(msg) {
                    // Actually sending the Interest over the neighbor's face
                    // is forwarder-internals, a non-goal; logged here
                    // instead of transmitted.
                    info!(neighbor = %uri, interest = %name, "emit active-sync interest");
                }
            }
            Some(msg) = nbr_timeout_rx.recv() => {
                let changes = controller.on_nbr_timeout(&msg.uri);
                if let Err(error) = controller.apply_rib_changes(changes).await {
                    error.log();
                }
            }
            Some(msg) = advert_fetch_timeout_rx.recv() => {
                controller.on_advert_fetch_timeout(msg.router, msg.seq);
            }
            Some(msg) = advert_fetch_retry_rx.recv() => {
                let _ = controller.on_advert_fetch_retry_due(&msg.router, msg.seq);
            }
            Some(msg) = prefix_fetch_timeout_rx.recv() => {
                controller.on_prefix_fetch_timeout(msg.router, msg.seq);
            }
            Some(msg) = prefix_fetch_retry_rx.recv() => {
                let _ = controller.on_prefix_fetch_retry_due(&msg.router, msg.seq);
            }
            else => break,
        }
    }

    if let Err(error) = controller.stop().await {
        error.log();
    }
}

fn main() {
    let matches = App::new("NDN distance-vector routing daemon")
        .version(clap::crate_version!())
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .get_matches();

    init_tracing();

    let config_file = matches.value_of("config");
    let raw = RawConfig::load(config_file);
    let config = match Config::build(raw) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "invalid configuration");
            std::process::exit(1);
        }
    };

    info!(router = %config.router, "starting up");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(run(config));
}
