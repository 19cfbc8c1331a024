use crate::{Connection, Context, Driver, Error, ErrorKind, Result};
use std::{
    fmt::{self, Debug, Formatter},
    ops::{Deref, DerefMut},
    str::FromStr,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Connections opened eagerly by [`Pool::connect`]
    pub min_connections: usize,
    /// Maximum number of connections allowed
    pub max_connections: usize,
    /// Maximum time to wait for a free connection before failing
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 0,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    pub fn new(max_connections: usize) -> Self {
        Self {
            max_connections,
            ..Default::default()
        }
    }

    pub fn min_connections(mut self, n: usize) -> Self {
        self.min_connections = n;
        self
    }

    pub fn max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Read the pool keys from the query string of a connection URL.
    ///
    /// Recognized keys are `min_connections`, `max_connections` and
    /// `acquire_timeout_ms`; the others belong to the driver and are ignored.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid connection URL `{url}`"))?;
        let mut result = Self::default();
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "min_connections" => result.min_connections = parse_key(&key, &value)?,
                "max_connections" => result.max_connections = parse_key(&key, &value)?,
                "acquire_timeout_ms" => {
                    result.acquire_timeout = Duration::from_millis(parse_key(&key, &value)?)
                }
                _ => {}
            }
        }
        Ok(result)
    }
}

fn parse_key<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value `{value}` for `{key}`"))
}

/// Snapshot of the pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Open connections, idle and leased
    pub size: usize,
    /// Connections waiting in the pool
    pub idle: usize,
    /// Connections currently leased
    pub in_use: usize,
    pub max_connections: usize,
}

struct Shared<D: Driver> {
    driver: D,
    config: PoolConfig,
    idle: Mutex<Vec<D::Connection>>,
    permits: Arc<Semaphore>,
    size: AtomicUsize,
    leases: AtomicU64,
}

impl<D: Driver> Shared<D> {
    fn idle(&self) -> MutexGuard<'_, Vec<D::Connection>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bounded set of connections to one backend, shared by cloning.
///
/// Capacity is enforced by a semaphore whose permits travel with the leased
/// [`PoolConnection`]s; the idle set sits behind a mutex that is never held
/// across an await point.
pub struct Pool<D: Driver> {
    shared: Arc<Shared<D>>,
}

impl<D: Driver> Clone for Pool<D> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<D: Driver> Debug for Pool<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("driver", &D::NAME)
            .field("status", &self.status())
            .finish()
    }
}

impl<D: Driver> Pool<D> {
    /// Create a pool that opens connections on demand.
    pub fn new(driver: D, config: PoolConfig) -> Self {
        let permits = config.max_connections.max(1);
        Self {
            shared: Arc::new(Shared {
                driver,
                config,
                idle: Mutex::new(Vec::new()),
                permits: Arc::new(Semaphore::new(permits)),
                size: AtomicUsize::new(0),
                leases: AtomicU64::new(0),
            }),
        }
    }

    /// Create a pool and open `min_connections` right away.
    pub async fn connect(driver: D, config: PoolConfig) -> Result<Self> {
        let pool = Self::new(driver, config);
        let count = pool
            .shared
            .config
            .min_connections
            .min(pool.shared.config.max_connections);
        let mut opened = Vec::with_capacity(count);
        for _ in 0..count {
            opened.push(pool.open().await?);
        }
        pool.shared.idle().extend(opened);
        Ok(pool)
    }

    pub fn driver(&self) -> &D {
        &self.shared.driver
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    pub fn status(&self) -> PoolStatus {
        let max_connections = self.shared.config.max_connections.max(1);
        PoolStatus {
            size: self.shared.size.load(Ordering::Relaxed),
            idle: self.shared.idle().len(),
            in_use: max_connections - self.shared.permits.available_permits(),
            max_connections,
        }
    }

    async fn open(&self) -> Result<D::Connection> {
        match self.shared.driver.connect().await {
            Ok(connection) => {
                let size = self.shared.size.fetch_add(1, Ordering::Relaxed) + 1;
                log::debug!("Opened a {} connection ({} open)", D::NAME, size);
                Ok(connection)
            }
            Err(e) => {
                let error = ErrorKind::Connection
                    .wrap(e.context(format!("Could not open a {} connection", D::NAME)));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    /// Lease a connection, waiting at most `acquire_timeout` for one to be free.
    pub async fn acquire(&self) -> Result<PoolConnection<D>> {
        let timeout = self.shared.config.acquire_timeout;
        let permit = match tokio::time::timeout(timeout, self.shared.permits.clone().acquire_owned())
            .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(e)) => return Err(ErrorKind::ResourceExhausted.wrap(Error::new(e))),
            Err(..) => {
                let error = ErrorKind::ResourceExhausted.msg(format!(
                    "All {} {} connections are still in use after {:?}",
                    self.shared.config.max_connections.max(1),
                    D::NAME,
                    timeout
                ));
                log::error!("{:#}", error);
                return Err(error);
            }
        };
        let idle = self.shared.idle().pop();
        let connection = match idle {
            Some(connection) => connection,
            None => self.open().await?,
        };
        let id = self.shared.leases.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!("Leased {} connection #{}", D::NAME, id);
        Ok(PoolConnection {
            connection: Some(connection),
            shared: self.shared.clone(),
            _permit: permit,
            id,
            needs_rollback: false,
        })
    }

    /// Give a leased connection back. Same as dropping it.
    pub fn release(&self, connection: PoolConnection<D>) {
        if !Arc::ptr_eq(&self.shared, &connection.shared) {
            log::warn!(
                "Connection #{} is released through a pool it does not belong to",
                connection.id
            );
        }
        drop(connection);
    }

    /// Run `task` on one leased connection, then release it whatever the outcome.
    ///
    /// ```rust,ignore
    /// pool.with_connection(async |connection: &mut PoolConnection<_>| {
    ///     animals.save(first, Options::new().using(connection)).await?;
    ///     animals.save(second, Options::new().using(connection)).await
    /// })
    /// .await?;
    /// ```
    pub async fn with_connection<T, F>(&self, task: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut PoolConnection<D>) -> Result<T>,
    {
        let mut connection = self.acquire().await?;
        let result = task(&mut connection).await;
        self.release(connection);
        result
    }
}

/// Exclusive lease on a pooled connection, returned to the pool when dropped.
///
/// A connection dropped while a transaction is still open on it is closed
/// instead of being returned.
pub struct PoolConnection<D: Driver> {
    connection: Option<D::Connection>,
    shared: Arc<Shared<D>>,
    _permit: OwnedSemaphorePermit,
    id: u64,
    needs_rollback: bool,
}

impl<D: Driver> PoolConnection<D> {
    /// Lease number, unique within the pool.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn release(self) {
        drop(self);
    }

    /// Whether a transaction was left open on this connection.
    pub fn needs_rollback(&self) -> bool {
        self.needs_rollback
    }

    pub(crate) fn set_needs_rollback(&mut self, value: bool) {
        self.needs_rollback = value;
    }

    /// Roll back a transaction abandoned on this connection, if any.
    pub async fn recover(&mut self) -> Result<()> {
        if !self.needs_rollback {
            return Ok(());
        }
        log::warn!(
            "Connection #{} was left inside a transaction, rolling it back",
            self.id
        );
        Connection::rollback(&mut **self)
            .await
            .map_err(|e| ErrorKind::Storage.wrap(e))?;
        self.needs_rollback = false;
        Ok(())
    }
}

impl<D: Driver> Deref for PoolConnection<D> {
    type Target = D::Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("The connection is present until the lease is dropped")
    }
}

impl<D: Driver> DerefMut for PoolConnection<D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("The connection is present until the lease is dropped")
    }
}

impl<D: Driver> Debug for PoolConnection<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConnection")
            .field("driver", &D::NAME)
            .field("id", &self.id)
            .field("needs_rollback", &self.needs_rollback)
            .finish()
    }
}

impl<D: Driver> Drop for PoolConnection<D> {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        if self.needs_rollback {
            log::warn!(
                "Discarding {} connection #{} released with a transaction still open",
                D::NAME,
                self.id
            );
            self.shared.size.fetch_sub(1, Ordering::Relaxed);
            drop(connection);
        } else {
            self.shared.idle().push(connection);
            log::trace!("Released {} connection #{}", D::NAME, self.id);
        }
    }
}
