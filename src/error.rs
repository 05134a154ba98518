use std::io;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the certificate collection engine.
///
/// Input errors are raised before any network work starts. Per-target
/// errors carry the address (or host) that failed, and a single one of
/// them aborts the whole batch.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid address \"{address}\": {reason}")]
    InvalidAddress {
        address: String,
        reason: &'static str,
    },

    #[error("invalid port \"{port}\" in address \"{address}\"")]
    InvalidPort { address: String, port: String },

    #[error("cannot load timezone \"{0}\"")]
    InvalidTimezone(String),

    #[error("cannot connect to \"{address}\": {source}")]
    Dial {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("connection to \"{address}\" is not TLS: {source}")]
    Protocol {
        address: String,
        #[source]
        source: rustls::Error,
    },

    #[error("cannot find cert for \"{host}\"")]
    NoCertificate { host: String },

    #[error("cannot parse cert for \"{host}\": {reason}")]
    Certificate { host: String, reason: String },

    #[error("failed to build TLS client configuration: {0}")]
    TlsConfig(#[from] rustls::Error),

    #[error("certificate collection was cancelled")]
    Cancelled,

    #[error("certificate worker failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// True for errors detected while validating input, before dialing.
    #[must_use]
    pub const fn is_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress { .. } | Self::InvalidPort { .. } | Self::InvalidTimezone(_)
        )
    }
}
