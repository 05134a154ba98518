#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use rustls::{
    ServerConfig,
    pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tlspulse::tls::crypto_provider;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
    time::{Duration, sleep},
};
use tokio_rustls::TlsAcceptor;

pub const TEST_CA: &str = "local test CA";

/// Connection counters shared by every listener of a [`TestServer`]
#[derive(Debug, Default)]
pub struct Stats {
    accepted: AtomicUsize,
    in_progress: AtomicUsize,
    max_in_progress: AtomicUsize,
}

impl Stats {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn max_in_progress(&self) -> usize {
        self.max_in_progress.load(Ordering::SeqCst)
    }

    fn begin(&self) {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        let now = self.in_progress.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_progress.fetch_max(now, Ordering::SeqCst);
    }

    fn end(&self) {
        self.in_progress.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub common_name: String,
    pub sans: Vec<String>,
    pub not_before: (i32, u8, u8),
    pub not_after: (i32, u8, u8),
    /// Wait this long after accepting TCP before answering the handshake
    pub handshake_delay: Option<Duration>,
    /// Send close notify right after the handshake
    pub close_after_handshake: bool,
    pub listeners: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            common_name: TEST_CA.to_string(),
            sans: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            not_before: (2024, 1, 1),
            not_after: (2099, 1, 1),
            handshake_delay: None,
            close_after_handshake: false,
            listeners: 1,
        }
    }
}

/// In-process TLS server presenting a self-signed certificate
pub struct TestServer {
    ports: Vec<u16>,
    stats: Arc<Stats>,
    handles: Vec<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::with_options(ServerOptions::default()).await
    }

    pub async fn with_options(options: ServerOptions) -> Self {
        let acceptor = TlsAcceptor::from(server_config(&options));
        let stats = Arc::new(Stats::default());
        let mut ports = Vec::new();
        let mut handles = Vec::new();

        for _ in 0..options.listeners.max(1) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            ports.push(listener.local_addr().unwrap().port());
            handles.push(tokio::spawn(serve(
                listener,
                acceptor.clone(),
                Arc::clone(&stats),
                options.clone(),
            )));
        }

        Self {
            ports,
            stats,
            handles,
        }
    }

    pub fn port(&self) -> u16 {
        self.ports[0]
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// A local port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn server_config(options: &ServerOptions) -> Arc<ServerConfig> {
    let mut params = CertificateParams::new(options.sans.clone()).unwrap();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, options.common_name.as_str());
    params.distinguished_name = dn;
    let (y, m, d) = options.not_before;
    params.not_before = rcgen::date_time_ymd(y, m, d);
    let (y, m, d) = options.not_after;
    params.not_after = rcgen::date_time_ymd(y, m, d);

    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    let cert_der: CertificateDer<'static> = cert.der().clone();
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der()));

    let config = ServerConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert_der], key_der)
        .unwrap();
    Arc::new(config)
}

async fn serve(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    stats: Arc<Stats>,
    options: ServerOptions,
) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            continue;
        };
        let acceptor = acceptor.clone();
        let stats = Arc::clone(&stats);
        let options = options.clone();

        tokio::spawn(async move {
            // counted until the server starts answering, so a client cannot
            // finish its handshake while still counted here
            stats.begin();
            if let Some(delay) = options.handshake_delay {
                sleep(delay).await;
            }
            stats.end();

            let Ok(mut tls) = acceptor.accept(stream).await else {
                return;
            };

            if options.close_after_handshake {
                let _ = tls.shutdown().await;
                return;
            }

            // hold the session open until the client goes away
            let mut buf = [0u8; 1024];
            while let Ok(n) = tls.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
        });
    }
}
