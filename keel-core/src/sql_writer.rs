use crate::{Delete, Insert, Restriction, Select, Statement, TableRef, possibly_parenthesized, separated_by};
use std::fmt::Write;

const PRECEDENCE_OR: i32 = 1;
const PRECEDENCE_AND: i32 = 2;

/// Renders statements to SQL text with positional placeholders.
///
/// Every method has a default suited to SQLite / standard SQL. Drivers override
/// the pieces their dialect spells differently, typically `write_placeholder`.
pub trait SqlWriter {
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    fn write_table_ref(&self, out: &mut String, value: &TableRef) {
        self.write_identifier_quoted(out, &value.name);
    }

    /// Placeholder of the parameter at `index` (from 0).
    fn write_placeholder(&self, out: &mut String, index: usize) {
        let _ = write!(out, "?{}", index + 1);
    }

    fn write_restriction(&self, out: &mut String, value: &Restriction) {
        self.write_restriction_nested(out, value, 0);
    }

    fn write_restriction_nested(&self, out: &mut String, value: &Restriction, parent: i32) {
        match value {
            Restriction::Always => out.push_str("TRUE"),
            Restriction::Never => out.push_str("FALSE"),
            Restriction::Equals { column, param } => {
                self.write_identifier_quoted(out, column);
                out.push_str(" = ");
                self.write_placeholder(out, *param);
            }
            Restriction::IsNull { column } => {
                self.write_identifier_quoted(out, column);
                out.push_str(" IS NULL");
            }
            Restriction::And(terms) => {
                possibly_parenthesized!(
                    out,
                    parent > PRECEDENCE_AND,
                    separated_by(
                        out,
                        terms,
                        |out, v| self.write_restriction_nested(out, v, PRECEDENCE_AND),
                        " AND ",
                    )
                );
            }
            Restriction::Or(terms) => {
                possibly_parenthesized!(
                    out,
                    parent > PRECEDENCE_OR,
                    separated_by(
                        out,
                        terms,
                        |out, v| self.write_restriction_nested(out, v, PRECEDENCE_OR),
                        " OR ",
                    )
                );
            }
        }
    }

    fn write_select(&self, out: &mut String, value: &Select) {
        out.push_str("SELECT ");
        match &value.columns {
            Some(columns) => separated_by(
                out,
                columns,
                |out, v| self.write_identifier_quoted(out, v),
                ", ",
            ),
            None => out.push('*'),
        }
        out.push_str("\nFROM ");
        self.write_table_ref(out, &value.table);
        out.push_str("\nWHERE ");
        self.write_restriction(out, &value.restriction);
        if let Some(limit) = value.limit {
            let _ = write!(out, "\nLIMIT {}", limit);
        }
        out.push(';');
    }

    fn write_insert(&self, out: &mut String, value: &Insert) {
        out.push_str("INSERT INTO ");
        self.write_table_ref(out, &value.table);
        if value.columns.is_empty() {
            out.push_str(" DEFAULT VALUES;");
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            &value.columns,
            |out, v| self.write_identifier_quoted(out, v),
            ", ",
        );
        out.push_str(") VALUES (");
        separated_by(
            out,
            0..value.columns.len(),
            |out, i| self.write_placeholder(out, i),
            ", ",
        );
        out.push_str(");");
    }

    fn write_delete(&self, out: &mut String, value: &Delete) {
        out.push_str("DELETE FROM ");
        self.write_table_ref(out, &value.table);
        out.push_str("\nWHERE ");
        self.write_restriction(out, &value.restriction);
        out.push(';');
    }

    fn write_statement(&self, out: &mut String, value: &Statement) {
        match value {
            Statement::Insert(v) => self.write_insert(out, v),
            Statement::Select(v) => self.write_select(out, v),
            Statement::Delete(v) => self.write_delete(out, v),
        }
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN;");
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT;");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK;");
    }
}

/// Writer using only the defaults of [`SqlWriter`], used to display statements.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter {}

impl GenericSqlWriter {
    pub const fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {}
