use keel_core::{
    AsValue, Delete, Error, Insert, Restriction, Result, RowLabeled, RowNames, RowsAffected,
    Select, Value,
};
use std::{collections::HashMap, mem};

/// Declaration of an in-memory table.
///
/// ```rust
/// use keel_memory::TableDef;
/// let animals = TableDef::new("animals")
///     .identity("id")
///     .column("kind")
///     .unique("name")
///     .column("age");
/// assert_eq!(animals.columns(), ["id", "kind", "name", "age"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    name: String,
    columns: Vec<String>,
    identity: Option<String>,
    unique: Vec<String>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            identity: None,
            unique: Vec::new(),
        }
    }

    /// Integer key, assigned on insert when missing.
    pub fn identity(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.add_column(&name);
        self.identity = Some(name);
        self
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.add_column(&name.into());
        self
    }

    /// Column where two rows cannot hold the same non NULL value.
    pub fn unique(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.add_column(&name);
        if !self.unique.contains(&name) {
            self.unique.push(name);
        }
        self
    }

    fn add_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_owned());
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StoredRow {
    rowid: i64,
    values: Vec<Value>,
}

/// Reverse of one write, applied when a transaction rolls back.
#[derive(Debug)]
pub(crate) enum Undo {
    Inserted {
        table: String,
        rowid: i64,
    },
    Deleted {
        table: String,
        rows: Vec<(usize, StoredRow)>,
    },
}

#[derive(Debug)]
struct Table {
    def: TableDef,
    rows: Vec<StoredRow>,
    next_rowid: i64,
}

impl Table {
    fn column(&self, name: &str) -> Result<usize> {
        self.def
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::msg(format!("no such column: {}.{}", self.def.name, name)))
    }

    fn matches(&self, restriction: &Restriction, row: &[Value], params: &[Value]) -> Result<bool> {
        Ok(match restriction {
            Restriction::Always => true,
            Restriction::Never => false,
            Restriction::Equals { column, param } => {
                let param = params.get(*param).ok_or_else(|| {
                    Error::msg(format!("Missing the value of parameter ?{}", param + 1))
                })?;
                row[self.column(column)?].equals(param)
            }
            Restriction::IsNull { column } => row[self.column(column)?].is_null(),
            Restriction::And(terms) => {
                for term in terms {
                    if !self.matches(term, row, params)? {
                        return Ok(false);
                    }
                }
                true
            }
            Restriction::Or(terms) => {
                for term in terms {
                    if self.matches(term, row, params)? {
                        return Ok(true);
                    }
                }
                false
            }
        })
    }

    fn check_unique(&self, values: &[Value]) -> Result<()> {
        let keys = self.def.identity.iter().chain(self.def.unique.iter());
        for key in keys {
            let index = self.column(key)?;
            let value = &values[index];
            if self.rows.iter().any(|r| r.values[index].equals(value)) {
                return Err(Error::msg(format!(
                    "UNIQUE constraint failed: {}.{}",
                    self.def.name, key
                )));
            }
        }
        Ok(())
    }
}

/// Tables shared by all the connections of a driver.
#[derive(Debug, Default)]
pub(crate) struct Store {
    tables: HashMap<String, Table>,
}

impl Store {
    pub(crate) fn define(&mut self, def: TableDef) {
        log::debug!("Defined memory table `{}`", def.name);
        self.tables.insert(
            def.name.clone(),
            Table {
                def,
                rows: Vec::new(),
                next_rowid: 1,
            },
        );
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::msg(format!("no such table: {}", name)))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::msg(format!("no such table: {}", name)))
    }

    pub(crate) fn insert(&mut self, insert: &Insert, params: &[Value]) -> Result<(RowsAffected, Undo)> {
        let table = self.table_mut(&insert.table.name)?;
        if insert.columns.len() != params.len() {
            return Err(Error::msg(format!(
                "{} values for {} columns",
                params.len(),
                insert.columns.len()
            )));
        }
        let mut values = vec![Value::Null; table.def.columns.len()];
        for (column, value) in insert.columns.iter().zip(params) {
            let index = table.column(column).map_err(|_| {
                Error::msg(format!(
                    "table {} has no column named {}",
                    table.def.name, column
                ))
            })?;
            values[index] = value.clone();
        }
        let identity = match &table.def.identity {
            Some(identity) => Some(table.column(identity)?),
            None => None,
        };
        let rowid = match identity.map(|i| mem::take(&mut values[i])) {
            Some(value) if !value.is_null() => {
                i64::try_from_value(value).map_err(|_| Error::msg("datatype mismatch"))?
            }
            _ => table.next_rowid,
        };
        if let Some(i) = identity {
            values[i] = Value::Int64(Some(rowid));
        }
        table.check_unique(&values)?;
        table.next_rowid = table.next_rowid.max(rowid + 1);
        table.rows.push(StoredRow { rowid, values });
        Ok((
            RowsAffected {
                rows_affected: 1,
                last_affected_id: Some(rowid),
            },
            Undo::Inserted {
                table: table.def.name.clone(),
                rowid,
            },
        ))
    }

    pub(crate) fn select(&self, select: &Select, params: &[Value]) -> Result<Vec<RowLabeled>> {
        let table = self.table(&select.table.name)?;
        let projection = match &select.columns {
            Some(columns) => columns
                .iter()
                .map(|c| table.column(c))
                .collect::<Result<Vec<_>>>()?,
            None => (0..table.def.columns.len()).collect(),
        };
        let labels: RowNames = projection
            .iter()
            .map(|i| table.def.columns[*i].clone())
            .collect();
        let limit = select.limit.map_or(usize::MAX, |v| v as usize);
        let mut result = Vec::new();
        for row in &table.rows {
            if result.len() >= limit {
                break;
            }
            if table.matches(&select.restriction, &row.values, params)? {
                result.push(RowLabeled::new(
                    labels.clone(),
                    projection.iter().map(|i| row.values[*i].clone()).collect(),
                ));
            }
        }
        Ok(result)
    }

    pub(crate) fn delete(&mut self, delete: &Delete, params: &[Value]) -> Result<(RowsAffected, Undo)> {
        let table = self.table_mut(&delete.table.name)?;
        let matched = table
            .rows
            .iter()
            .map(|r| table.matches(&delete.restriction, &r.values, params))
            .collect::<Result<Vec<_>>>()?;
        let mut removed = Vec::new();
        for (i, row) in mem::take(&mut table.rows).into_iter().enumerate() {
            if matched[i] {
                removed.push((i, row));
            } else {
                table.rows.push(row);
            }
        }
        Ok((
            RowsAffected {
                rows_affected: removed.len() as u64,
                last_affected_id: None,
            },
            Undo::Deleted {
                table: table.def.name.clone(),
                rows: removed,
            },
        ))
    }

    pub(crate) fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::Inserted { table, rowid } => {
                if let Ok(table) = self.table_mut(&table) {
                    table.rows.retain(|r| r.rowid != rowid);
                }
            }
            Undo::Deleted { table, rows } => {
                if let Ok(table) = self.table_mut(&table) {
                    for (i, row) in rows {
                        let i = i.min(table.rows.len());
                        table.rows.insert(i, row);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Store, TableDef};
    use keel_core::{
        Delete, Insert, Predicate, Restriction, Select, TableRef, Value,
    };

    fn store() -> Store {
        let mut store = Store::default();
        store.define(
            TableDef::new("animals")
                .identity("id")
                .column("kind")
                .unique("name")
                .column("age"),
        );
        store
    }

    fn insert(store: &mut Store, kind: &str, name: &str) -> keel_core::Result<i64> {
        let (affected, _) = store.insert(
            &Insert {
                table: TableRef::new("animals"),
                columns: vec!["kind".into(), "name".into()],
            },
            &[kind.into(), name.into()],
        )?;
        Ok(affected.last_affected_id.unwrap())
    }

    fn select_all(store: &Store, predicate: Predicate) -> Vec<Vec<Value>> {
        let translation = predicate.translate();
        store
            .select(
                &Select {
                    table: TableRef::new("animals"),
                    columns: Some(vec!["name".into()]),
                    restriction: translation.restriction,
                    limit: None,
                },
                &translation.params,
            )
            .unwrap()
            .into_iter()
            .map(|r| r.values.into_vec())
            .collect()
    }

    #[test]
    fn assigns_identities() {
        let mut store = store();
        assert_eq!(insert(&mut store, "lion", "Simba").unwrap(), 1);
        assert_eq!(insert(&mut store, "lion", "Nala").unwrap(), 2);
        let (affected, _) = store
            .insert(
                &Insert {
                    table: TableRef::new("animals"),
                    columns: vec!["id".into(), "name".into()],
                },
                &[10.into(), "Mufasa".into()],
            )
            .unwrap();
        assert_eq!(affected.last_affected_id, Some(10));
        assert_eq!(insert(&mut store, "lion", "Kiara").unwrap(), 11);
    }

    #[test]
    fn unique_constraint() {
        let mut store = store();
        insert(&mut store, "fish", "Nemo").unwrap();
        let error = insert(&mut store, "fish", "Nemo").unwrap_err();
        assert_eq!(error.to_string(), "UNIQUE constraint failed: animals.name");
        insert(&mut store, "fish", "Dory").unwrap();
        let (_, _) = store
            .insert(
                &Insert {
                    table: TableRef::new("animals"),
                    columns: vec!["kind".into()],
                },
                &["fish".into()],
            )
            .unwrap();
        let (_, _) = store
            .insert(
                &Insert {
                    table: TableRef::new("animals"),
                    columns: vec!["kind".into()],
                },
                &["fish".into()],
            )
            .unwrap();
        assert_eq!(select_all(&store, Predicate::eq("kind", "fish")).len(), 4);
    }

    #[test]
    fn unknown_names() {
        let mut store = store();
        assert!(
            store
                .insert(
                    &Insert {
                        table: TableRef::new("animals"),
                        columns: vec!["wings".into()],
                    },
                    &[2.into()],
                )
                .is_err()
        );
        assert!(
            store
                .select(
                    &Select {
                        table: TableRef::new("plants"),
                        columns: None,
                        restriction: Restriction::Always,
                        limit: None,
                    },
                    &[],
                )
                .is_err()
        );
        insert(&mut store, "lion", "Simba").unwrap();
        assert!(
            store
                .select(
                    &Select {
                        table: TableRef::new("animals"),
                        columns: None,
                        restriction: Predicate::eq("wings", 2).translate().restriction,
                        limit: None,
                    },
                    &[2.into()],
                )
                .is_err()
        );
    }

    #[test]
    fn delete_and_undo_keep_order() {
        let mut store = store();
        for (kind, name) in [
            ("hyena", "Shenzi"),
            ("lion", "Simba"),
            ("hyena", "Banzai"),
            ("hyena", "Ed"),
            ("warthog", "Pumbaa"),
        ] {
            insert(&mut store, kind, name).unwrap();
        }
        let translation = Predicate::eq("kind", "hyena").translate();
        let (affected, undo) = store
            .delete(
                &Delete {
                    table: TableRef::new("animals"),
                    restriction: translation.restriction,
                },
                &translation.params,
            )
            .unwrap();
        assert_eq!(affected.rows_affected, 3);
        assert_eq!(
            select_all(&store, Predicate::all()),
            [vec![Value::from("Simba")], vec![Value::from("Pumbaa")]]
        );
        store.undo(undo);
        assert_eq!(
            select_all(&store, Predicate::all()),
            ["Shenzi", "Simba", "Banzai", "Ed", "Pumbaa"]
                .map(|v| vec![Value::from(v)])
        );
    }

    #[test]
    fn null_never_matches_equality() {
        let mut store = store();
        store
            .insert(
                &Insert {
                    table: TableRef::new("animals"),
                    columns: vec!["kind".into()],
                },
                &["bird".into()],
            )
            .unwrap();
        assert!(select_all(&store, Predicate::eq("name", "Zazu")).is_empty());
        assert_eq!(
            select_all(&store, Predicate::eq("name", Value::Null)),
            [vec![Value::Null]]
        );
    }
}
