use crate::store::{Store, Undo};
use async_stream::try_stream;
use keel_core::{Connection, Error, Query, QueryResult, Result, Statement, stream::Stream};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Session on the tables of a [`MemoryDriver`](crate::MemoryDriver).
///
/// Statements outside a transaction lock the tables only while they run. A
/// transaction holds the lock from begin to commit or rollback, so
/// transactions on different connections are serialized. Writes made inside
/// it are journaled and undone in reverse order on rollback, also when the
/// connection is dropped with the transaction still open.
pub struct MemoryConnection {
    id: u64,
    store: Arc<Mutex<Store>>,
    transaction: Option<OwnedMutexGuard<Store>>,
    journal: Vec<Undo>,
}

impl MemoryConnection {
    pub(crate) fn new(id: u64, store: Arc<Mutex<Store>>) -> Self {
        Self {
            id,
            store,
            transaction: None,
            journal: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    async fn apply(&mut self, query: Query) -> Result<Vec<QueryResult>> {
        let mut autocommit;
        let store: &mut Store = match &mut self.transaction {
            Some(guard) => guard,
            None => {
                autocommit = self.store.lock().await;
                &mut autocommit
            }
        };
        let (result, undo): (Vec<QueryResult>, Option<Undo>) = match &query.statement {
            Statement::Insert(insert) => {
                let (affected, undo) = store.insert(insert, &query.params)?;
                (vec![affected.into()], Some(undo))
            }
            Statement::Delete(delete) => {
                let (affected, undo) = store.delete(delete, &query.params)?;
                (vec![affected.into()], Some(undo))
            }
            Statement::Select(select) => (
                store
                    .select(select, &query.params)?
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                None,
            ),
        };
        if let (Some(undo), true) = (undo, self.transaction.is_some()) {
            self.journal.push(undo);
        }
        Ok(result)
    }

    fn undo_all(&mut self) -> bool {
        let Some(mut store) = self.transaction.take() else {
            return false;
        };
        let count = self.journal.len();
        while let Some(undo) = self.journal.pop() {
            store.undo(undo);
        }
        log::debug!("Memory connection #{} undid {} writes", self.id, count);
        true
    }
}

impl Connection for MemoryConnection {
    fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        try_stream! {
            let results = self.apply(query).await.map_err(|e| {
                log::debug!("{:#}", e);
                e
            })?;
            for result in results {
                yield result;
            }
        }
    }

    async fn begin(&mut self) -> Result<()> {
        if self.transaction.is_some() {
            return Err(Error::msg("cannot start a transaction within a transaction"));
        }
        self.transaction = Some(self.store.clone().lock_owned().await);
        self.journal.clear();
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if self.transaction.take().is_none() {
            return Err(Error::msg("cannot commit - no transaction is active"));
        }
        self.journal.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if !self.undo_all() {
            return Err(Error::msg("cannot rollback - no transaction is active"));
        }
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if self.undo_all() {
            log::warn!(
                "Memory connection #{} closed inside a transaction, rolled back",
                self.id
            );
        }
    }
}
