use crate::{MemoryConnection, TableDef, store::Store};
use keel_core::{Driver, Error, Result};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::Mutex;

/// Driver keeping every table in process memory.
///
/// All the connections opened by one driver share its tables.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    store: Arc<Mutex<Store>>,
    connections: AtomicU64,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Default::default()
    }

    /// Declare a table, fails once a connection shares the tables.
    pub fn table(mut self, table: TableDef) -> Result<Self> {
        let Some(store) = Arc::get_mut(&mut self.store) else {
            let error = Error::msg(format!(
                "Table `{}` must be declared before any connection is opened",
                table.name()
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        store.get_mut().define(table);
        Ok(self)
    }
}

impl Driver for MemoryDriver {
    type Connection = MemoryConnection;

    const NAME: &'static str = "memory";

    async fn connect(&self) -> Result<MemoryConnection> {
        let id = self.connections.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(MemoryConnection::new(id, self.store.clone()))
    }
}
