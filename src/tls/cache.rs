use futures::{FutureExt, future::BoxFuture};
use std::{
    collections::{HashMap, hash_map::Entry},
    fmt, io,
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{net::lookup_host, sync::RwLock, time};
use tracing::debug;

type Resolver = Arc<dyn Fn(String) -> BoxFuture<'static, io::Result<Vec<IpAddr>>> + Send + Sync>;

/// Host to resolved IP addresses cache.
///
/// Entries live for the lifetime of the cache unless a TTL is configured.
/// A failed lookup is stored as an empty list and is not retried.
pub struct IpCache {
    data: Arc<RwLock<HashMap<String, (Vec<IpAddr>, Instant)>>>,
    ttl: Option<Duration>,
    resolver: Resolver,
}

impl fmt::Debug for IpCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Default for IpCache {
    fn default() -> Self {
        Self::new()
    }
}

impl IpCache {
    /// Create a cache backed by the system resolver
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver(system_lookup)
    }

    /// Create a cache backed by a custom resolver
    #[must_use]
    pub fn with_resolver<F, Fut>(resolver: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = io::Result<Vec<IpAddr>>> + Send + 'static,
    {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            ttl: None,
            resolver: Arc::new(move |host| resolver(host).boxed()),
        }
    }

    /// Expire entries after `ttl` instead of keeping them forever
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn is_fresh(&self, stored: Instant) -> bool {
        self.ttl.is_none_or(|ttl| stored.elapsed() < ttl)
    }

    /// Get cached addresses for `host` if present and not expired
    pub async fn get(&self, host: &str) -> Option<Vec<IpAddr>> {
        let cache = self.data.read().await;
        if let Some((ips, stored)) = cache.get(host)
            && self.is_fresh(*stored)
        {
            return Some(ips.clone());
        }
        drop(cache);
        None
    }

    /// Resolve `host`, consulting the cache first.
    ///
    /// The lookup is best effort: resolver errors and timeouts produce an
    /// empty list, which is cached like any other result. When two lookups
    /// for the same host race, the first stored result wins and both
    /// callers get it.
    pub async fn lookup(&self, host: &str, timeout: Duration) -> Vec<IpAddr> {
        if let Some(ips) = self.get(host).await {
            debug!(host, "IP cache hit");
            return ips;
        }

        let ips = match time::timeout(timeout, (self.resolver)(host.to_string())).await {
            Ok(Ok(mut ips)) => {
                ips.sort_unstable();
                ips.dedup();
                ips
            }
            Ok(Err(err)) => {
                debug!(host, error = %err, "IP lookup failed");
                Vec::new()
            }
            Err(_) => {
                debug!(host, ?timeout, "IP lookup timed out");
                Vec::new()
            }
        };

        let mut cache = self.data.write().await;
        match cache.entry(host.to_string()) {
            Entry::Occupied(entry) if self.is_fresh(entry.get().1) => entry.get().0.clone(),
            Entry::Occupied(mut entry) => {
                entry.insert((ips.clone(), Instant::now()));
                ips
            }
            Entry::Vacant(entry) => {
                entry.insert((ips.clone(), Instant::now()));
                ips
            }
        }
    }

    /// Clear expired entries from cache
    pub async fn cleanup(&self) {
        let Some(ttl) = self.ttl else {
            return;
        };
        let mut cache = self.data.write().await;
        cache.retain(|_, (_, stored)| stored.elapsed() < ttl);
    }

    /// Number of cached hosts
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

fn system_lookup(host: String) -> impl Future<Output = io::Result<Vec<IpAddr>>> + Send {
    async move {
        let addrs = lookup_host((host.as_str(), 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}
