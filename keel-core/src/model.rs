use crate::{
    Connection, Context, Delete, Driver, Error, ErrorKind, Insert, IntoPredicate, IntoRecord,
    ModelInstance, Pool, PoolConnection, Predicate, Query, Record, Result, RowLabeled,
    RowsAffected, Schema, Select, Statement, TableRef, Transaction, Value,
    stream::TryStreamExt,
};
use std::{
    borrow::Cow,
    fmt::{self, Debug, Formatter},
    ops::{Deref, DerefMut},
    sync::Arc,
};

/// Recognized options of the model operations.
pub struct Options<'a, D: Driver> {
    /// Run on this caller-held connection instead of leasing one from the pool.
    /// The caller stays responsible for releasing it.
    pub using: Option<&'a mut PoolConnection<D>>,
    /// `save_many` only: insert the whole batch atomically inside a transaction.
    pub multiple: bool,
    /// `all` and `at` only: select just these fields.
    pub attributes: Option<Vec<String>>,
}

impl<'a, D: Driver> Default for Options<'a, D> {
    fn default() -> Self {
        Self {
            using: None,
            multiple: false,
            attributes: None,
        }
    }
}

impl<'a, D: Driver> Options<'a, D> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn using(mut self, connection: &'a mut PoolConnection<D>) -> Self {
        self.using = Some(connection);
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }
}

/// Outcome of `save_many`, one entry per input record in input order.
#[derive(Debug)]
pub struct Batch {
    results: Vec<Result<ModelInstance>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[Result<ModelInstance>] {
        &self.results
    }

    /// Number of records that were not saved.
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|v| v.is_err()).count()
    }

    pub fn into_results(self) -> Vec<Result<ModelInstance>> {
        self.results
    }

    /// All the instances, or the first failure.
    pub fn into_instances(self) -> Result<Vec<ModelInstance>> {
        let total = self.results.len();
        let mut result = Vec::with_capacity(total);
        for (i, v) in self.results.into_iter().enumerate() {
            result.push(v.with_context(|| format!("Record {} of {} was not saved", i + 1, total))?);
        }
        Ok(result)
    }
}

enum Lease<'a, D: Driver> {
    Borrowed(&'a mut PoolConnection<D>),
    Pooled(PoolConnection<D>),
}

impl<'a, D: Driver> Deref for Lease<'a, D> {
    type Target = PoolConnection<D>;

    fn deref(&self) -> &Self::Target {
        match self {
            Lease::Borrowed(v) => v,
            Lease::Pooled(v) => v,
        }
    }
}

impl<'a, D: Driver> DerefMut for Lease<'a, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Lease::Borrowed(v) => v,
            Lease::Pooled(v) => v,
        }
    }
}

/// Insert waiting for its result: every field in instance order, `None` marks
/// the identity the backend assigns.
struct PendingInsert {
    fields: Vec<(String, Option<Value>)>,
}

impl PendingInsert {
    fn query(&self, table: &TableRef) -> Query {
        let (columns, params) = self
            .fields
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
            .unzip();
        Query::new(
            Statement::Insert(Insert {
                table: table.clone(),
                columns,
            }),
            params,
        )
    }

    fn into_instance(self, model: Arc<str>, affected: RowsAffected) -> ModelInstance {
        let (labels, values): (Vec<_>, Vec<_>) = self
            .fields
            .into_iter()
            .map(|(k, v)| {
                let v = v.unwrap_or_else(|| {
                    affected
                        .last_affected_id
                        .map_or(Value::Null, |id| Value::Int64(Some(id)))
                });
                (k, v)
            })
            .unzip();
        ModelInstance::new(model, RowLabeled::new(labels.into(), values.into()))
    }
}

/// Named entity definition bound to one backend collection.
///
/// Cheap to clone, all the clones share the schema and the pool.
pub struct Model<D: Driver> {
    name: Arc<str>,
    table: TableRef,
    schema: Arc<Schema>,
    pool: Pool<D>,
}

impl<D: Driver> Clone for Model<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            table: self.table.clone(),
            schema: self.schema.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl<D: Driver> Debug for Model<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish()
    }
}

impl<D: Driver> Model<D> {
    pub fn define(pool: &Pool<D>, name: impl Into<Cow<'static, str>>, schema: Schema) -> Self {
        let table = TableRef::new(name);
        Self {
            name: Arc::from(table.name.as_ref()),
            table,
            schema: Arc::new(schema),
            pool: pool.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn pool(&self) -> &Pool<D> {
        &self.pool
    }

    async fn lease<'a>(&self, using: Option<&'a mut PoolConnection<D>>) -> Result<Lease<'a, D>> {
        Ok(match using {
            Some(connection) => {
                connection.recover().await?;
                Lease::Borrowed(connection)
            }
            None => Lease::Pooled(self.pool.acquire().await?),
        })
    }

    fn storage_error(&self, error: Error, action: &str) -> Error {
        let error =
            ErrorKind::Storage.wrap(error.context(format!("Could not {action} `{}`", self.name)));
        log::error!("{:#}", error);
        error
    }

    /// Schema fields first (defaults applied), then the extra fields of the record.
    /// A NULL identity is left to the backend.
    fn prepare_insert(&self, record: Record) -> PendingInsert {
        let mut fields = Vec::with_capacity(self.schema.fields().len() + record.len());
        for field in self.schema.fields() {
            let value = match record.get(field.name()) {
                Some(v) if field.identity && v.is_null() => None,
                Some(v) => Some(v.clone()),
                None if field.identity => None,
                None => Some(field.default.clone()),
            };
            fields.push((field.name().to_owned(), value));
        }
        fields.extend(
            record
                .into_iter()
                .filter(|(k, _)| self.schema.get(k).is_none())
                .map(|(k, v)| (k, Some(v))),
        );
        PendingInsert { fields }
    }

    async fn insert(
        &self,
        connection: &mut PoolConnection<D>,
        pending: PendingInsert,
    ) -> Result<ModelInstance> {
        let query = pending.query(&self.table);
        log::debug!("{}", query);
        let affected = connection
            .execute(query)
            .await
            .map_err(|e| self.storage_error(e, "save into"))?;
        Ok(pending.into_instance(self.name.clone(), affected))
    }

    /// Insert one record, fields it omits get their schema default.
    pub async fn save(
        &self,
        record: impl IntoRecord,
        options: Options<'_, D>,
    ) -> Result<ModelInstance> {
        let pending = self.prepare_insert(record.into_record()?);
        let mut connection = self.lease(options.using).await?;
        self.insert(&mut connection, pending).await
    }

    /// Insert several records on one connection, in order.
    ///
    /// Without `multiple` each record succeeds or fails on its own and the
    /// [`Batch`] reports every outcome. With `multiple` the inserts share a
    /// transaction: the first failure rolls back the batch and the call fails
    /// with [`ErrorKind::TransactionAborted`].
    pub async fn save_many<I>(&self, records: I, options: Options<'_, D>) -> Result<Batch>
    where
        I: IntoIterator,
        I::Item: IntoRecord,
    {
        let Options {
            using, multiple, ..
        } = options;
        if multiple {
            let pending = records
                .into_iter()
                .map(|v| v.into_record().map(|v| self.prepare_insert(v)))
                .collect::<Result<Vec<_>>>()?;
            let mut connection = self.lease(using).await?;
            let mut transaction = Transaction::new(&mut *connection);
            transaction.begin().await?;
            let mut results = Vec::with_capacity(pending.len());
            for pending in pending {
                let affected = transaction.execute(pending.query(&self.table)).await?;
                results.push(Ok(pending.into_instance(self.name.clone(), affected)));
            }
            transaction.commit().await?;
            Ok(Batch { results })
        } else {
            let records: Vec<_> = records.into_iter().map(IntoRecord::into_record).collect();
            let mut connection = self.lease(using).await?;
            let mut results = Vec::with_capacity(records.len());
            for record in records {
                results.push(match record {
                    Ok(v) => self.insert(&mut connection, self.prepare_insert(v)).await,
                    Err(e) => Err(e),
                });
            }
            let batch = Batch { results };
            if batch.failures() > 0 {
                log::warn!(
                    "{} of {} records were not saved into `{}`",
                    batch.failures(),
                    batch.len(),
                    self.name
                );
            }
            Ok(batch)
        }
    }

    /// Delete every matching row.
    pub async fn remove(
        &self,
        predicate: impl IntoPredicate,
        options: Options<'_, D>,
    ) -> Result<RowsAffected> {
        let translation = predicate.into_predicate()?.translate();
        let query = Query::new(
            Statement::Delete(Delete {
                table: self.table.clone(),
                restriction: translation.restriction,
            }),
            translation.params,
        );
        let mut connection = self.lease(options.using).await?;
        log::debug!("{}", query);
        connection
            .execute(query)
            .await
            .map_err(|e| self.storage_error(e, "remove from"))
    }

    /// The first matching row, if any.
    ///
    /// The predicate is expected to identify one row. When several match,
    /// which one is returned depends on the backend.
    pub async fn at(
        &self,
        predicate: impl IntoPredicate,
        options: Options<'_, D>,
    ) -> Result<Option<ModelInstance>> {
        let query = self.select(predicate.into_predicate()?, options.attributes, Some(1))?;
        let instances = self.fetch_instances(query, options.using).await?;
        Ok(instances.into_iter().next())
    }

    /// Every matching row, in the backend order.
    pub async fn all(
        &self,
        predicate: impl IntoPredicate,
        options: Options<'_, D>,
    ) -> Result<Vec<ModelInstance>> {
        let query = self.select(predicate.into_predicate()?, options.attributes, None)?;
        self.fetch_instances(query, options.using).await
    }

    fn select(
        &self,
        predicate: Predicate,
        attributes: Option<Vec<String>>,
        limit: Option<u32>,
    ) -> Result<Query> {
        if attributes.as_ref().is_some_and(Vec::is_empty) {
            let error = ErrorKind::InvalidPredicate.msg(format!(
                "The attributes of a `{}` query cannot be an empty list",
                self.name
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        let translation = predicate.translate();
        Ok(Query::new(
            Statement::Select(Select {
                table: self.table.clone(),
                columns: attributes,
                restriction: translation.restriction,
                limit,
            }),
            translation.params,
        ))
    }

    async fn fetch_instances(
        &self,
        query: Query,
        using: Option<&mut PoolConnection<D>>,
    ) -> Result<Vec<ModelInstance>> {
        let mut connection = self.lease(using).await?;
        log::debug!("{}", query);
        let rows = connection
            .fetch(query)
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| self.storage_error(e, "read from"))?;
        Ok(rows
            .into_iter()
            .map(|row| ModelInstance::new(self.name.clone(), row))
            .collect())
    }
}
