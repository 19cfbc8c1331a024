use keel_core::SqlWriter;

/// SQLite dialect. Transactions take the write lock when they begin, so two
/// open transactions never deadlock upgrading a read lock.
#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN IMMEDIATE;");
    }
}
