use super::{
    Address, CertificateRecord, ConnPool, IpCache, PoolKey, PooledConn, TlsConn, VerifyMode,
    pool::is_alive,
};
use crate::{
    error::{Error, Result},
    zone::Zone,
};
use chrono::{DateTime, Utc};
use rustls::{ClientConfig, pki_types::ServerName};
use std::{io, net::IpAddr, sync::Arc, time::Duration};
use tokio::{net::TcpStream, time};
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Per-target connection state.
///
/// A connector is owned by the single worker inspecting its target. The
/// TLS session it holds is borrowed from the [`ConnPool`] and goes back to
/// it when the connector is released or dropped.
#[derive(Debug)]
pub struct Connector {
    address: Address,
    ips: Vec<IpAddr>,
    timeout: Duration,
    zone: Zone,
    config: Arc<ClientConfig>,
    key: PoolKey,
    conn: Option<PooledConn>,
}

impl Connector {
    #[must_use]
    pub fn new(
        address: Address,
        timeout: Duration,
        mode: VerifyMode,
        zone: Zone,
        config: Arc<ClientConfig>,
    ) -> Self {
        let key = PoolKey::new(&address, mode);
        Self {
            address,
            ips: Vec::new(),
            timeout,
            zone,
            config,
            key,
            conn: None,
        }
    }

    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// Obtain a TLS session, reusing a pooled one when it passes the
    /// liveness probe and dialing otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dial`] if the TCP connection or TLS handshake fails
    /// or times out, and [`Error::Protocol`] if the peer does not speak TLS.
    pub async fn connect(&mut self, pool: &Arc<ConnPool>) -> Result<()> {
        while let Some(mut conn) = pool.acquire(&self.key) {
            if is_alive(&mut conn) {
                debug!(
                    address = %self.address,
                    idle = pool.idle_count(&self.key),
                    "reusing pooled connection"
                );
                self.conn = Some(PooledConn::new(self.key.clone(), conn, Arc::clone(pool)));
                return Ok(());
            }
            debug!(address = %self.address, "discarding stale pooled connection");
        }

        let conn = self.dial().await?;
        self.conn = Some(PooledConn::new(self.key.clone(), conn, Arc::clone(pool)));
        Ok(())
    }

    /// Best-effort IP lookup; failures leave the address list empty
    pub async fn lookup_ip(&mut self, cache: &IpCache) {
        self.ips = cache.lookup(self.address.host(), self.timeout).await;
    }

    /// Build the certificate record from the peer's leaf certificate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCertificate`] if the peer presented no certificate
    /// and [`Error::Certificate`] if the leaf cannot be parsed.
    pub fn server_cert(&self) -> Result<CertificateRecord> {
        self.server_cert_at(Utc::now())
    }

    fn server_cert_at(&self, now: DateTime<Utc>) -> Result<CertificateRecord> {
        let leaf = self
            .conn
            .as_ref()
            .and_then(PooledConn::peer_certificates)
            .and_then(|certs| certs.first())
            .ok_or_else(|| Error::NoCertificate {
                host: self.address.host().to_string(),
            })?;

        CertificateRecord::from_der(&self.address, self.ips.clone(), leaf.as_ref(), now, self.zone)
    }

    /// Hand the session back to the pool (or close it if it is broken)
    pub fn release(&mut self) {
        self.conn.take();
    }

    async fn dial(&self) -> Result<TlsConn> {
        let address = self.address.to_string();
        let host = self.address.host();
        let server_name = server_name_from_host(host).ok_or_else(|| Error::InvalidAddress {
            address: address.clone(),
            reason: "invalid server name",
        })?;

        let connector = TlsConnector::from(Arc::clone(&self.config));
        let handshake = async {
            let stream = TcpStream::connect((host, self.address.port())).await?;
            connector.connect(server_name, stream).await
        };

        match time::timeout(self.timeout, handshake).await {
            Ok(Ok(conn)) => {
                debug!(%address, "TLS handshake completed");
                Ok(conn)
            }
            Ok(Err(source)) => Err(classify_dial_error(address, source)),
            Err(_) => Err(Error::Dial {
                address,
                source: io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("timed out after {:?}", self.timeout),
                ),
            }),
        }
    }
}

fn classify_dial_error(address: String, source: io::Error) -> Error {
    let tls = source
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>());

    match tls {
        Some(
            err @ (rustls::Error::InvalidMessage(_)
            | rustls::Error::InappropriateMessage { .. }
            | rustls::Error::InappropriateHandshakeMessage { .. }),
        ) => Error::Protocol {
            address,
            source: err.clone(),
        },
        _ => Error::Dial { address, source },
    }
}

fn server_name_from_host(host: &str) -> Option<ServerName<'static>> {
    host.parse::<IpAddr>().map_or_else(
        |_| ServerName::try_from(host.to_string()).ok(),
        |ip| Some(ServerName::from(ip)),
    )
}
