use crate::{AsValue, Error, Result, RowLabeled, Value};
use std::sync::Arc;

/// One saved or fetched record of a model.
///
/// The instance owns its values. After a write every schema field is present;
/// after a projected read only the selected fields are.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    model: Arc<str>,
    row: RowLabeled,
}

impl ModelInstance {
    pub fn new(model: Arc<str>, row: RowLabeled) -> Self {
        Self { model, row }
    }

    /// Name of the model (collection) this record belongs to.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.row.get_column(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Typed access, fails when the field is absent or has another type.
    ///
    /// Use an `Option<T>` target for fields that can hold NULL.
    pub fn try_get<T: AsValue>(&self, field: &str) -> Result<T> {
        let value = self.get(field).ok_or_else(|| {
            Error::msg(format!(
                "Field `{}` is not present in this `{}` instance",
                field, self.model
            ))
        })?;
        T::try_from_value(value.clone())
    }

    pub fn raw(&self) -> &RowLabeled {
        &self.row
    }

    pub fn into_raw(self) -> RowLabeled {
        self.row
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.row.iter()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.row
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_json()))
                .collect(),
        )
    }
}
