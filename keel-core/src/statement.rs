use crate::{GenericSqlWriter, SqlWriter};
use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
};

/// Backend collection a statement targets.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: Cow<'static, str>,
}

impl TableRef {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }
}

/// Row restriction a backend evaluates, equality terms refer to bound parameters by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    Always,
    Never,
    Equals { column: String, param: usize },
    IsNull { column: String },
    And(Vec<Restriction>),
    Or(Vec<Restriction>),
}

impl Restriction {
    pub fn columns(&self) -> Vec<&str> {
        let mut result = Vec::new();
        self.collect_columns(&mut result);
        result
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Restriction::Always | Restriction::Never => {}
            Restriction::Equals { column, .. } | Restriction::IsNull { column } => {
                out.push(column)
            }
            Restriction::And(v) | Restriction::Or(v) => {
                v.iter().for_each(|v| v.collect_columns(out))
            }
        }
    }
}

/// Insert one row, parameters hold the values in `columns` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: TableRef,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: TableRef,
    /// `None` selects every column.
    pub columns: Option<Vec<String>>,
    pub restriction: Restriction,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: TableRef,
    pub restriction: Restriction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(Insert),
    Select(Select),
    Delete(Delete),
}

impl Statement {
    pub fn is_write(&self) -> bool {
        !matches!(self, Statement::Select(..))
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(128);
        GenericSqlWriter::new().write_statement(&mut out, self);
        f.write_str(&out)
    }
}
