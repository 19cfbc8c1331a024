use crate::{
    Connection, Driver, Error, ErrorKind, PoolConnection, Query, Result, RowLabeled, RowsAffected,
    stream::TryStreamExt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Open,
    Committed,
    RolledBack,
}

/// Begin/commit/rollback envelope around writes on one leased connection.
///
/// `Idle → Open → {Committed, RolledBack}`, the last two are terminal. A
/// failing write while `Open` rolls everything back before the error is
/// returned, tagged [`ErrorKind::TransactionAborted`]. The transaction borrows
/// the connection mutably, so nothing else can run on it (and no other
/// transaction can start on it) while it lives.
///
/// Dropping an `Open` transaction leaves the connection flagged: the pool
/// closes it on release and [`PoolConnection::recover`] rolls it back.
pub struct Transaction<'c, D: Driver> {
    connection: &'c mut PoolConnection<D>,
    state: TransactionState,
}

impl<'c, D: Driver> Transaction<'c, D> {
    pub fn new(connection: &'c mut PoolConnection<D>) -> Self {
        Self {
            connection,
            state: TransactionState::Idle,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    fn expect_state(&self, expected: TransactionState, action: &str) -> Result<()> {
        if self.state != expected {
            let error = Error::msg(format!(
                "Cannot {action} a transaction in state {:?}",
                self.state
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(())
    }

    pub async fn begin(&mut self) -> Result<()> {
        self.expect_state(TransactionState::Idle, "begin")?;
        self.connection.recover().await?;
        Connection::begin(&mut **self.connection)
            .await
            .map_err(|e| {
                let error = ErrorKind::Storage.wrap(e.context("Could not begin a transaction"));
                log::error!("{:#}", error);
                error
            })?;
        self.connection.set_needs_rollback(true);
        self.state = TransactionState::Open;
        log::debug!("Transaction opened on connection #{}", self.connection.id());
        Ok(())
    }

    /// Run a write, rolling back the whole transaction if it fails.
    pub async fn execute(&mut self, query: Query) -> Result<RowsAffected> {
        self.expect_state(TransactionState::Open, "execute in")?;
        log::debug!("{}", query);
        let result = self.connection.execute(query).await;
        match result {
            Ok(affected) => Ok(affected),
            Err(e) => Err(self.abort(ErrorKind::Storage.wrap(e)).await),
        }
    }

    /// Read inside the transaction, sees its own uncommitted writes.
    pub async fn fetch(&mut self, query: Query) -> Result<Vec<RowLabeled>> {
        self.expect_state(TransactionState::Open, "fetch in")?;
        log::debug!("{}", query);
        let result = self.connection.fetch(query).try_collect::<Vec<_>>().await;
        match result {
            Ok(rows) => Ok(rows),
            Err(e) => Err(self.abort(ErrorKind::Storage.wrap(e)).await),
        }
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.expect_state(TransactionState::Open, "commit")?;
        let result = Connection::commit(&mut **self.connection).await;
        match result {
            Ok(()) => {
                self.connection.set_needs_rollback(false);
                self.state = TransactionState::Committed;
                log::debug!("Transaction committed on connection #{}", self.connection.id());
                Ok(())
            }
            Err(e) => Err(self.abort(ErrorKind::Storage.wrap(e)).await),
        }
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.expect_state(TransactionState::Open, "rollback")?;
        Connection::rollback(&mut **self.connection)
            .await
            .map_err(|e| {
                let error = ErrorKind::Storage.wrap(e.context("Could not rollback the transaction"));
                log::error!("{:#}", error);
                error
            })?;
        self.connection.set_needs_rollback(false);
        self.state = TransactionState::RolledBack;
        log::debug!("Transaction rolled back on connection #{}", self.connection.id());
        Ok(())
    }

    /// Roll back after `cause` and return it tagged as an aborted transaction.
    async fn abort(&mut self, cause: Error) -> Error {
        let mut error = ErrorKind::TransactionAborted.wrap(cause);
        if let Err(e) = self.rollback().await {
            error = error.context(format!("The rollback failed as well: {:#}", e));
        }
        log::error!("{:#}", error);
        error
    }
}

impl<'c, D: Driver> Drop for Transaction<'c, D> {
    fn drop(&mut self) {
        if self.state == TransactionState::Open {
            log::warn!(
                "Transaction dropped while open on connection #{}, it will be rolled back",
                self.connection.id()
            );
        }
    }
}
