//! TLS certificate inspection module
//!
//! This module dials targets over TLS, keeps sessions and resolved
//! addresses around for reuse, and turns the peer's leaf certificate into a
//! [`CertificateRecord`].
//!
//! # Module Organization
//!
//! - `address` - `host[:port]` normalization
//! - `cache` - Host to IP address caching
//! - `config` - Verification modes and client configuration
//! - `metadata` - Certificate record and leaf extraction
//! - `pool` - Idle TLS connection pool
//! - `probe` - Per-target connector
//! - `verifier` - Certificate verifier for insecure mode
//!
//! # Example
//!
//! ```rust,ignore
//! use tlspulse::tls::{Address, ConnPool, Connector, IpCache, VerifyMode, client_config};
//!
//! let pool = Arc::new(ConnPool::new());
//! let cache = IpCache::new();
//! let mode = VerifyMode::Verify;
//!
//! let mut conn = Connector::new(
//!     Address::parse("example.com")?,
//!     Duration::from_secs(5),
//!     mode,
//!     Zone::Local,
//!     client_config(mode)?,
//! );
//! conn.connect(&pool).await?;
//! conn.lookup_ip(&cache).await;
//! let record = conn.server_cert()?;
//! conn.release();
//! ```

pub mod address;
pub mod cache;
pub mod config;
pub mod metadata;
pub mod pool;
pub mod probe;
pub mod verifier;

// Re-export commonly used types
pub use address::{Address, DEFAULT_PORT};
pub use cache::IpCache;
pub use config::{VerifyMode, client_config, crypto_provider};
pub use metadata::{CertificateRecord, days_left};
pub use pool::{ConnPool, PoolKey, PooledConn, TlsConn, is_alive};
pub use probe::Connector;
