use crate::{
    SqliteSqlWriter,
    extract::{bind_value, extract_value},
};
use async_stream::try_stream;
use keel_core::{
    Connection, Context, Query, QueryResult, Result, Row, RowLabeled, RowNames, RowsAffected,
    SqlWriter, Statement, stream::Stream, truncate_long,
};
use rusqlite::params_from_iter;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::spawn_blocking;

/// One SQLite session. Statements run on the blocking thread pool.
pub struct SqliteConnection {
    connection: Arc<Mutex<rusqlite::Connection>>,
    writer: SqliteSqlWriter,
}

impl SqliteConnection {
    pub(crate) fn new(connection: rusqlite::Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
            writer: SqliteSqlWriter {},
        }
    }

    /// Whether a transaction is open on this session.
    pub fn in_transaction(&self) -> bool {
        !self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_autocommit()
    }

    async fn run_batch(&mut self, sql: String) -> Result<()> {
        let connection = self.connection.clone();
        spawn_blocking(move || {
            connection
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .execute_batch(&sql)
                .with_context(|| format!("While executing `{}`", sql))
        })
        .await?
    }
}

fn execute(
    connection: &Mutex<rusqlite::Connection>,
    sql: &str,
    query: &Query,
) -> Result<Vec<QueryResult>> {
    let connection = connection.lock().unwrap_or_else(PoisonError::into_inner);
    let mut statement = connection
        .prepare_cached(sql)
        .with_context(|| format!("While preparing the query:\n{}", truncate_long!(sql)))?;
    let params = query
        .params
        .iter()
        .map(bind_value)
        .collect::<Result<Vec<_>>>()?;
    if query.statement.is_write() {
        let rows = statement.execute(params_from_iter(params))?;
        let last_affected_id = match query.statement {
            Statement::Insert(..) => Some(connection.last_insert_rowid()),
            _ => None,
        };
        return Ok(vec![
            RowsAffected {
                rows_affected: rows as u64,
                last_affected_id,
            }
            .into(),
        ]);
    }
    let labels: RowNames = statement
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let count = labels.len();
    let mut rows = statement.query(params_from_iter(params))?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..count)
            .map(|i| extract_value(row.get_ref(i)?))
            .collect::<Result<Row>>()?;
        result.push(RowLabeled::new(labels.clone(), values).into());
    }
    Ok(result)
}

impl Connection for SqliteConnection {
    fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        let connection = self.connection.clone();
        let mut sql = String::with_capacity(128);
        self.writer.write_statement(&mut sql, &query.statement);
        try_stream! {
            let results = spawn_blocking(move || {
                execute(&connection, &sql, &query).map_err(|e| {
                    log::debug!("{:#}", e);
                    e
                })
            })
            .await??;
            for result in results {
                yield result;
            }
        }
    }

    async fn begin(&mut self) -> Result<()> {
        let mut sql = String::new();
        self.writer.write_transaction_begin(&mut sql);
        self.run_batch(sql).await
    }

    async fn commit(&mut self) -> Result<()> {
        let mut sql = String::new();
        self.writer.write_transaction_commit(&mut sql);
        self.run_batch(sql).await
    }

    async fn rollback(&mut self) -> Result<()> {
        let mut sql = String::new();
        self.writer.write_transaction_rollback(&mut sql);
        self.run_batch(sql).await
    }
}
