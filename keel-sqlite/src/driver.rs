use crate::SqliteConnection;
use keel_core::{Context, Driver, Error, Result};
use rusqlite::OpenFlags;
use std::{sync::Arc, time::Duration};
use tokio::task::spawn_blocking;

/// Opens connections to one SQLite database file.
///
/// ```rust
/// use keel_sqlite::SqliteDriver;
/// let driver = SqliteDriver::from_url("sqlite://zoo.sqlite?mode=rwc&max_connections=4")
///     .unwrap()
///     .with_init("CREATE TABLE IF NOT EXISTS animals (id INTEGER PRIMARY KEY, name TEXT);");
/// assert_eq!(driver.path(), "zoo.sqlite");
/// ```
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    path: String,
    flags: OpenFlags,
    busy_timeout: Duration,
    init: Option<Arc<str>>,
}

impl SqliteDriver {
    /// Read-write access, the file is created when missing.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            flags: OpenFlags::default(),
            busy_timeout: Duration::from_secs(5),
            init: None,
        }
    }

    /// Parse `sqlite://<path>?mode=<ro|rw|rwc>&busy_timeout_ms=<n>`.
    ///
    /// The other query keys (for example the pool ones) are ignored.
    pub fn from_url(url: &str) -> Result<Self> {
        let prefix = format!("{}://", <Self as Driver>::NAME);
        let Some(rest) = url.strip_prefix(&prefix) else {
            return Err(Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                prefix
            )));
        };
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let path = urlencoding::decode(path)
            .with_context(|| format!("Error while decoding connection URL: `{}`", url))?;
        let mut result = Self::new(path.into_owned());
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "mode" => {
                    result.flags = Self::flags(&value).ok_or_else(|| {
                        Error::msg(format!("Unknown sqlite mode `{}` in `{}`", value, url))
                    })?
                }
                "busy_timeout_ms" => {
                    result.busy_timeout = Duration::from_millis(
                        value
                            .parse()
                            .with_context(|| format!("Invalid busy_timeout_ms `{}`", value))?,
                    )
                }
                _ => {}
            }
        }
        Ok(result)
    }

    fn flags(mode: &str) -> Option<OpenFlags> {
        let common = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Some(match mode {
            "ro" => OpenFlags::SQLITE_OPEN_READ_ONLY | common,
            "rw" => OpenFlags::SQLITE_OPEN_READ_WRITE | common,
            "rwc" => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | common,
            _ => return None,
        })
    }

    /// SQL batch run on every new connection, typically `CREATE TABLE IF NOT EXISTS`.
    pub fn with_init(mut self, sql: impl Into<Arc<str>>) -> Self {
        self.init = Some(sql.into());
        self
    }

    /// How long a statement waits for a lock held by another connection.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    const NAME: &'static str = "sqlite";

    async fn connect(&self) -> Result<SqliteConnection> {
        let path = self.path.clone();
        let flags = self.flags;
        let busy_timeout = self.busy_timeout;
        let init = self.init.clone();
        let connection = spawn_blocking(move || -> Result<rusqlite::Connection> {
            let connection = rusqlite::Connection::open_with_flags(&path, flags)
                .with_context(|| format!("Could not open the database `{}`", path))?;
            connection.busy_timeout(busy_timeout)?;
            if let Some(init) = init {
                connection
                    .execute_batch(&init)
                    .context("The initialization script failed")?;
            }
            Ok(connection)
        })
        .await??;
        Ok(SqliteConnection::new(connection))
    }
}
