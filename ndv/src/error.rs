//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::{error, warn};

use crate::name::{ComponentDecodeError, Name};

/// Top-level error taxonomy for the DV core (§7).
#[derive(Debug)]
pub enum Error {
    Config(ConfigError),
    Codec(CodecError),
    Trust(TrustError),
    Io(IoError),
    Forwarder(ForwarderError),
    /// A recomputation detected a state that should be impossible if every
    /// invariant in §8 holds. Fatal.
    Invariant(String),
}

/// Configuration errors (§7: fatal at startup).
#[derive(Debug)]
pub enum ConfigError {
    EmptyNetworkName,
    EmptyRouterName,
    NetworkNameTooLong(usize),
    RouterNotExtendingNetwork,
    AdvertiseIntervalTooShort(u64),
    RouterDeadIntervalTooShort(u64, u64),
    InvalidName(ComponentDecodeError),
}

/// Codec errors (§7: non-fatal, drop and log).
#[derive(Debug)]
pub enum CodecError {
    Truncated,
    NonMonotonicStateVector,
    InvalidComponent(ComponentDecodeError),
}

/// Trust/signature errors (§7: non-fatal, drop signed object).
#[derive(Debug)]
pub enum TrustError {
    UnresolvedKey(Name),
    NoPermitRule(Name, Name),
    AnchorMismatch(Name),
    InvalidSignature,
}

/// Transient I/O errors (§7: retried with backoff by the caller).
#[derive(Debug)]
pub enum IoError {
    InterestTimeout(Name),
    Nack(Name),
    SendFailed(String),
}

/// Forwarder-management errors (§7: logged, may mark a neighbor failed).
#[derive(Debug)]
pub enum ForwarderError {
    RegisterFailed(Name),
    FaceCreateFailed(String),
    NextHopRefused(Name),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::Config(e) => error!(error = %e, "configuration error"),
            Error::Codec(e) => warn!(error = %e, "codec error"),
            Error::Trust(e) => warn!(error = %e, "trust error"),
            Error::Io(e) => warn!(error = %e, "transient I/O error"),
            Error::Forwarder(e) => error!(error = %e, "forwarder error"),
            Error::Invariant(msg) => {
                error!(%msg, "invariant violation, terminating")
            }
        }
    }

    /// Whether this error should halt the process (§7).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Invariant(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(e) => e.fmt(f),
            Error::Codec(e) => e.fmt(f),
            Error::Trust(e) => e.fmt(f),
            Error::Io(e) => e.fmt(f),
            Error::Forwarder(e) => e.fmt(f),
            Error::Invariant(msg) => write!(f, "invariant violation: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Error {
        Error::Config(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Error {
        Error::Codec(e)
    }
}

impl From<TrustError> for Error {
    fn from(e: TrustError) -> Error {
        Error::Trust(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Error {
        Error::Io(e)
    }
}

impl From<ForwarderError> for Error {
    fn from(e: ForwarderError) -> Error {
        Error::Forwarder(e)
    }
}

// ===== impl ConfigError =====

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyNetworkName => {
                write!(f, "network name must not be empty")
            }
            ConfigError::EmptyRouterName => {
                write!(f, "router name must not be empty")
            }
            ConfigError::NetworkNameTooLong(len) => {
                write!(f, "network name has {len} components, max is 3")
            }
            ConfigError::RouterNotExtendingNetwork => {
                write!(
                    f,
                    "router name must extend the network name by exactly \
                     one component"
                )
            }
            ConfigError::AdvertiseIntervalTooShort(ms) => {
                write!(f, "advertise_interval ({ms}ms) must be >= 1000ms")
            }
            ConfigError::RouterDeadIntervalTooShort(dead, advertise) => {
                write!(
                    f,
                    "router_dead_interval ({dead}ms) must be >= 2x \
                     advertise_interval ({advertise}ms)"
                )
            }
            ConfigError::InvalidName(e) => write!(f, "invalid name: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ===== impl CodecError =====

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Truncated => write!(f, "truncated TLV payload"),
            CodecError::NonMonotonicStateVector => {
                write!(f, "state vector entries are not sorted by name")
            }
            CodecError::InvalidComponent(e) => {
                write!(f, "invalid name component: {e}")
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl From<ComponentDecodeError> for CodecError {
    fn from(e: ComponentDecodeError) -> CodecError {
        CodecError::InvalidComponent(e)
    }
}

impl From<bytes::TryGetError> for CodecError {
    fn from(_: bytes::TryGetError) -> CodecError {
        CodecError::Truncated
    }
}

// ===== impl TrustError =====

impl std::fmt::Display for TrustError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustError::UnresolvedKey(name) => {
                write!(f, "unable to resolve signing key {name}")
            }
            TrustError::NoPermitRule(data_name, signer) => {
                write!(
                    f,
                    "no permit rule allows {signer} to sign {data_name}"
                )
            }
            TrustError::AnchorMismatch(name) => {
                write!(f, "certificate chain for {name} doesn't terminate at a trust anchor")
            }
            TrustError::InvalidSignature => {
                write!(f, "signature verification failed")
            }
        }
    }
}

impl std::error::Error for TrustError {}

// ===== impl IoError =====

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::InterestTimeout(name) => {
                write!(f, "interest for {name} timed out")
            }
            IoError::Nack(name) => write!(f, "interest for {name} NACKed"),
            IoError::SendFailed(reason) => {
                write!(f, "failed to send interest: {reason}")
            }
        }
    }
}

impl std::error::Error for IoError {}

// ===== impl ForwarderError =====

impl std::fmt::Display for ForwarderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForwarderError::RegisterFailed(name) => {
                write!(f, "failed to register prefix {name}")
            }
            ForwarderError::FaceCreateFailed(uri) => {
                write!(f, "failed to create face for {uri}")
            }
            ForwarderError::NextHopRefused(name) => {
                write!(f, "forwarder refused next-hop for {name}")
            }
        }
    }
}

impl std::error::Error for ForwarderError {}
