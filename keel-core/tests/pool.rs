#[cfg(test)]
mod tests {
    use keel_core::{
        Connection, Driver, Error, ErrorKind, Insert, Pool, PoolConfig, PoolConnection, Query,
        QueryResult, Result, RowsAffected, Statement, TableRef, Transaction, TransactionState,
        future, stream::{self, Stream},
    };
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        time::Duration,
    };
    use tokio::sync::oneshot;

    #[derive(Default)]
    struct Journal {
        entries: Mutex<Vec<&'static str>>,
        connects: AtomicUsize,
        refuse: AtomicBool,
    }

    impl Journal {
        fn entries(&self) -> Vec<&'static str> {
            self.entries.lock().unwrap().clone()
        }
        fn push(&self, entry: &'static str) {
            self.entries.lock().unwrap().push(entry);
        }
    }

    struct StubDriver(Arc<Journal>);

    struct StubConnection(Arc<Journal>);

    impl Driver for StubDriver {
        type Connection = StubConnection;

        const NAME: &'static str = "stub";

        async fn connect(&self) -> Result<StubConnection> {
            if self.0.refuse.load(Ordering::Relaxed) {
                return Err(Error::msg("connection refused"));
            }
            self.0.connects.fetch_add(1, Ordering::Relaxed);
            Ok(StubConnection(self.0.clone()))
        }
    }

    impl Connection for StubConnection {
        fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
            let rejected = matches!(
                &query.statement,
                Statement::Insert(v) if v.columns.iter().any(|c| c == "rejected")
            );
            self.0.push(if rejected { "rejected" } else { "write" });
            stream::once(future::ready(if rejected {
                Err(Error::msg("constraint violated"))
            } else {
                Ok(QueryResult::Affected(RowsAffected {
                    rows_affected: 1,
                    last_affected_id: Some(1),
                }))
            }))
        }

        async fn begin(&mut self) -> Result<()> {
            self.0.push("begin");
            Ok(())
        }

        async fn commit(&mut self) -> Result<()> {
            self.0.push("commit");
            Ok(())
        }

        async fn rollback(&mut self) -> Result<()> {
            self.0.push("rollback");
            Ok(())
        }
    }

    fn pool(max_connections: usize) -> (Pool<StubDriver>, Arc<Journal>) {
        let journal = Arc::new(Journal::default());
        let pool = Pool::new(
            StubDriver(journal.clone()),
            PoolConfig::new(max_connections).acquire_timeout(Duration::from_millis(50)),
        );
        (pool, journal)
    }

    fn insert(column: &str) -> Query {
        Query::new(
            Statement::Insert(Insert {
                table: TableRef::new("animals"),
                columns: vec![column.into()],
            }),
            vec![1.into()],
        )
    }

    #[tokio::test]
    async fn reuse_idle_connections() {
        let (pool, journal) = pool(2);
        let first = pool.acquire().await.unwrap();
        let first_id = first.id();
        first.release();
        let second = pool.acquire().await.unwrap();
        assert_ne!(second.id(), first_id);
        assert_eq!(journal.connects.load(Ordering::Relaxed), 1);
        let status = pool.status();
        assert_eq!(status.size, 1);
        assert_eq!(status.in_use, 1);
        assert_eq!(status.idle, 0);
        drop(second);
        assert_eq!(pool.status().idle, 1);
        assert_eq!(pool.status().in_use, 0);
    }

    #[tokio::test]
    async fn acquire_times_out_at_capacity() {
        let (pool, _) = pool(2);
        let first = pool.acquire().await.unwrap();
        let _second = pool.acquire().await.unwrap();
        let error = pool.acquire().await.unwrap_err();
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::ResourceExhausted));
        pool.release(first);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn connect_failure() {
        let (pool, journal) = pool(1);
        journal.refuse.store(true, Ordering::Relaxed);
        for _ in 0..3 {
            let error = pool.acquire().await.unwrap_err();
            assert_eq!(ErrorKind::of(&error), Some(ErrorKind::Connection));
        }
        assert_eq!(pool.status().size, 0);
        assert_eq!(pool.status().in_use, 0);
        journal.refuse.store(false, Ordering::Relaxed);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn connect_eagerly() {
        let journal = Arc::new(Journal::default());
        let pool = Pool::connect(
            StubDriver(journal.clone()),
            PoolConfig::new(4).min_connections(2),
        )
        .await
        .unwrap();
        assert_eq!(journal.connects.load(Ordering::Relaxed), 2);
        assert_eq!(pool.status().idle, 2);
    }

    #[tokio::test]
    async fn with_connection_releases() {
        let (pool, _) = pool(1);
        let value = pool
            .with_connection(async |connection: &mut PoolConnection<StubDriver>| {
                connection.execute(insert("kind")).await?;
                Ok(5)
            })
            .await
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(pool.status().in_use, 0);
        let result = pool
            .with_connection(async |connection: &mut PoolConnection<StubDriver>| {
                connection.execute(insert("rejected")).await
            })
            .await;
        assert!(result.is_err());
        assert_eq!(pool.status().in_use, 0);
        assert_eq!(pool.status().idle, 1);
    }

    #[tokio::test]
    async fn concurrent_leases_stay_within_capacity() {
        let journal = Arc::new(Journal::default());
        let pool = Pool::new(
            StubDriver(journal.clone()),
            PoolConfig::new(3).acquire_timeout(Duration::from_secs(10)),
        );
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let pool = pool.clone();
                let active = active.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    let connection = pool.acquire().await.unwrap();
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    drop(connection);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(journal.connects.load(Ordering::Relaxed) <= 3);
        assert_eq!(pool.status().in_use, 0);
    }

    #[tokio::test]
    async fn transaction_commit() {
        let (pool, journal) = pool(1);
        let mut connection = pool.acquire().await.unwrap();
        let mut transaction = Transaction::new(&mut connection);
        assert_eq!(transaction.state(), TransactionState::Idle);
        assert!(transaction.execute(insert("kind")).await.is_err());
        transaction.begin().await.unwrap();
        assert_eq!(transaction.state(), TransactionState::Open);
        transaction.execute(insert("kind")).await.unwrap();
        transaction.execute(insert("name")).await.unwrap();
        transaction.commit().await.unwrap();
        assert_eq!(transaction.state(), TransactionState::Committed);
        assert!(transaction.commit().await.is_err());
        drop(transaction);
        assert!(!connection.needs_rollback());
        assert_eq!(journal.entries(), ["begin", "write", "write", "commit"]);
    }

    #[tokio::test]
    async fn transaction_aborts_on_failure() {
        let (pool, journal) = pool(1);
        let mut connection = pool.acquire().await.unwrap();
        let mut transaction = Transaction::new(&mut connection);
        transaction.begin().await.unwrap();
        transaction.execute(insert("kind")).await.unwrap();
        let error = transaction.execute(insert("rejected")).await.unwrap_err();
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::TransactionAborted));
        assert!(format!("{error:#}").contains("constraint violated"));
        assert_eq!(transaction.state(), TransactionState::RolledBack);
        drop(transaction);
        assert!(!connection.needs_rollback());
        assert_eq!(
            journal.entries(),
            ["begin", "write", "rejected", "rollback"]
        );
        drop(connection);
        assert_eq!(pool.status().idle, 1);
    }

    #[tokio::test]
    async fn abandoned_transaction_is_recovered() {
        let (pool, journal) = pool(1);
        let mut connection = pool.acquire().await.unwrap();
        let mut transaction = Transaction::new(&mut connection);
        transaction.begin().await.unwrap();
        drop(transaction);
        assert!(connection.needs_rollback());
        connection.recover().await.unwrap();
        assert!(!connection.needs_rollback());
        assert_eq!(journal.entries(), ["begin", "rollback"]);
        drop(connection);
        assert_eq!(pool.status().idle, 1);
    }

    #[tokio::test]
    async fn cancelled_transaction_discards_connection() {
        let (pool, journal) = pool(1);
        let (started, wait_started) = oneshot::channel();
        let task = {
            let pool = pool.clone();
            tokio::spawn(async move {
                let mut connection = pool.acquire().await?;
                let mut transaction = Transaction::new(&mut connection);
                transaction.begin().await?;
                let _ = started.send(());
                future::pending::<()>().await;
                transaction.commit().await
            })
        };
        wait_started.await.unwrap();
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        let status = pool.status();
        assert_eq!(status.in_use, 0);
        assert_eq!(status.size, 0);
        assert_eq!(status.idle, 0);
        assert!(pool.acquire().await.is_ok());
        assert_eq!(journal.connects.load(Ordering::Relaxed), 2);
        assert_eq!(journal.entries(), ["begin"]);
    }

    #[test]
    fn config_from_url() {
        let config = PoolConfig::from_url(
            "sqlite://zoo.sqlite?mode=rwc&max_connections=4&min_connections=1&acquire_timeout_ms=250",
        )
        .unwrap();
        assert_eq!(
            config,
            PoolConfig::new(4)
                .min_connections(1)
                .acquire_timeout(Duration::from_millis(250))
        );
        assert_eq!(
            PoolConfig::from_url("memory://zoo").unwrap(),
            PoolConfig::default()
        );
        assert!(PoolConfig::from_url("sqlite://zoo?max_connections=many").is_err());
        assert!(PoolConfig::from_url("not a url").is_err());
    }
}
