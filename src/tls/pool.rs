use super::{Address, VerifyMode};
use futures::FutureExt;
use rustls::pki_types::CertificateDer;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};
use tokio::{io::AsyncReadExt, net::TcpStream};
use tokio_rustls::client::TlsStream;
use tracing::debug;

pub type TlsConn = TlsStream<TcpStream>;

// upper bound on records drained by a single liveness probe
const PROBE_READS: usize = 8;

/// Pool key: the normalized address and the verification mode it was dialed with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    address: String,
    mode: VerifyMode,
}

impl PoolKey {
    #[must_use]
    pub fn new(address: &Address, mode: VerifyMode) -> Self {
        Self {
            address: address.to_string(),
            mode,
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.mode)
    }
}

/// Idle TLS connections kept for reuse, one freelist per [`PoolKey`].
///
/// A connection is removed from the pool before anyone probes it, so the
/// same connection is never handed to two workers.
#[derive(Default)]
pub struct ConnPool {
    idle: Mutex<HashMap<PoolKey, Vec<TlsConn>>>,
}

impl fmt::Debug for ConnPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let idle = self
            .idle
            .lock()
            .map(|idle| idle.values().map(Vec::len).sum::<usize>())
            .unwrap_or_default();
        f.debug_struct("ConnPool").field("idle", &idle).finish()
    }
}

impl ConnPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an idle connection for `key`, if any.
    ///
    /// The caller owns the connection and must probe it with [`is_alive`]
    /// before use.
    pub fn acquire(&self, key: &PoolKey) -> Option<TlsConn> {
        let mut idle = self.idle.lock().ok()?;
        let conns = idle.get_mut(key)?;
        let conn = conns.pop();
        if conns.is_empty() {
            idle.remove(key);
        }
        conn
    }

    /// Return a connection to the pool.
    ///
    /// The connection is probed first; a broken one is closed instead.
    /// Returns whether the connection was pooled.
    pub fn release(&self, key: &PoolKey, mut conn: TlsConn) -> bool {
        if !is_alive(&mut conn) {
            debug!(%key, "closing broken connection");
            return false;
        }

        let Ok(mut idle) = self.idle.lock() else {
            return false;
        };
        idle.entry(key.clone()).or_default().push(conn);
        true
    }

    /// Number of idle connections held for `key`
    #[must_use]
    pub fn idle_count(&self, key: &PoolKey) -> usize {
        self.idle
            .lock()
            .ok()
            .and_then(|idle| idle.get(key).map(Vec::len))
            .unwrap_or_default()
    }
}

/// Liveness probe for an idle connection.
///
/// Polls the session once without waiting: pending session tickets or
/// stray records are drained, while a close notify, EOF or socket error
/// marks the connection dead.
///
/// Application data read here is discarded, so pooled sessions are only
/// fit for certificate inspection.
pub fn is_alive(conn: &mut TlsConn) -> bool {
    if conn.get_ref().1.is_handshaking() {
        return false;
    }

    let mut buf = [0u8; 1024];
    for _ in 0..PROBE_READS {
        match conn.read(&mut buf).now_or_never() {
            None => return true,
            Some(Ok(0) | Err(_)) => return false,
            Some(Ok(_)) => {}
        }
    }
    true
}

/// A connection borrowed from a [`ConnPool`].
///
/// Dropping the guard probes the connection and returns it to the pool
/// when healthy, closing it otherwise.
pub struct PooledConn {
    key: PoolKey,
    conn: Option<TlsConn>,
    pool: Arc<ConnPool>,
}

impl fmt::Debug for PooledConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConn")
            .field("key", &self.key)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl PooledConn {
    #[must_use]
    pub const fn new(key: PoolKey, conn: TlsConn, pool: Arc<ConnPool>) -> Self {
        Self {
            key,
            conn: Some(conn),
            pool,
        }
    }

    /// Certificate chain presented by the peer, leaf first
    #[must_use]
    pub fn peer_certificates(&self) -> Option<&[CertificateDer<'static>]> {
        self.conn.as_ref()?.get_ref().1.peer_certificates()
    }
}

impl Drop for PooledConn {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(&self.key, conn);
        }
    }
}
