use crate::{
    error::{Error, Result},
    tls::{Address, CertificateRecord, ConnPool, Connector, IpCache, VerifyMode, client_config},
    zone::Zone,
};
use std::{num::NonZeroUsize, sync::Arc, thread, time::Duration};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{Instrument, debug, debug_span};

/// Concurrent certificate collector.
///
/// The IP cache and connection pool are shared by every call to
/// [`Collector::collect`], so repeated collections reuse resolved addresses
/// and idle sessions.
#[derive(Debug)]
pub struct Collector {
    ip_cache: Arc<IpCache>,
    pool: Arc<ConnPool>,
    concurrency: usize,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(Arc::new(IpCache::new()), Arc::new(ConnPool::new()))
    }
}

impl Collector {
    /// Create a collector over the given caches, limited to one in-flight
    /// target per logical CPU.
    #[must_use]
    pub fn new(ip_cache: Arc<IpCache>, pool: Arc<ConnPool>) -> Self {
        Self {
            ip_cache,
            pool,
            concurrency: default_concurrency(),
        }
    }

    /// Override the number of targets inspected at once (at least one)
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub const fn ip_cache(&self) -> &Arc<IpCache> {
        &self.ip_cache
    }

    #[must_use]
    pub const fn pool(&self) -> &Arc<ConnPool> {
        &self.pool
    }

    /// Fetch the leaf certificate of every target.
    ///
    /// `result[i]` describes `targets[i]`. Every target is validated before
    /// any connection is attempted. The first per-target failure cancels
    /// the remaining work and is returned alone, without partial results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] or [`Error::InvalidPort`] for a
    /// malformed target, and the first [`Error::Dial`], [`Error::Protocol`],
    /// [`Error::NoCertificate`] or [`Error::Certificate`] raised by a worker.
    pub async fn collect<S: AsRef<str>>(
        &self,
        targets: &[S],
        timeout: Duration,
        insecure: bool,
        zone: Zone,
    ) -> Result<Vec<CertificateRecord>> {
        let addresses = targets
            .iter()
            .map(|target| Address::parse(target.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let mode = VerifyMode::from_insecure(insecure);
        let config = client_config(mode)?;
        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, address) in addresses.into_iter().enumerate() {
            let connector = Connector::new(address, timeout, mode, zone, Arc::clone(&config));
            let span = debug_span!("inspect", address = %connector.address());
            let limiter = Arc::clone(&limiter);
            let pool = Arc::clone(&self.pool);
            let ip_cache = Arc::clone(&self.ip_cache);

            tasks.spawn(
                async move {
                    let Ok(_permit) = limiter.acquire_owned().await else {
                        return (index, Err(Error::Cancelled));
                    };
                    (index, inspect(connector, &pool, &ip_cache).await)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<CertificateRecord>> = vec![None; targets.len()];
        let mut failure: Option<Error> = None;

        while let Some(joined) = tasks.join_next().await {
            let err = match joined {
                Ok((index, Ok(record))) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(record);
                    }
                    continue;
                }
                Ok((_, Err(err))) => err,
                Err(err) if err.is_cancelled() => continue,
                Err(err) => Error::Task(err),
            };

            if failure.is_none() {
                debug!(error = %err, "aborting remaining targets");
                limiter.close();
                tasks.abort_all();
                failure = Some(err);
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }

        slots
            .into_iter()
            .map(|slot| slot.ok_or(Error::Cancelled))
            .collect()
    }
}

async fn inspect(
    mut connector: Connector,
    pool: &Arc<ConnPool>,
    ip_cache: &IpCache,
) -> Result<CertificateRecord> {
    connector.connect(pool).await?;
    connector.lookup_ip(ip_cache).await;
    let record = connector.server_cert();
    connector.release();
    record
}

fn default_concurrency() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
