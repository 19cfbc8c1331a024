use keel_core::{AsValue, Context, Result, TIMESTAMP_FORMAT, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};

/// Bind a value using the SQLite storage classes.
pub(crate) fn bind_value(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        _ if value.is_null() => SqlValue::Null,
        Value::Boolean(Some(v)) => SqlValue::Integer(*v as i64),
        Value::Int64(Some(v)) => SqlValue::Integer(*v),
        Value::Float64(Some(v)) => SqlValue::Real(*v),
        Value::Decimal(Some(v)) => SqlValue::Text(v.to_string()),
        Value::Varchar(Some(v)) => SqlValue::Text(v.clone()),
        Value::Blob(Some(v)) => SqlValue::Blob(v.to_vec()),
        Value::Timestamp(Some(v)) => SqlValue::Text(
            v.format(TIMESTAMP_FORMAT)
                .with_context(|| format!("Could not format the timestamp {v}"))?,
        ),
        Value::Uuid(Some(v)) => SqlValue::Text(v.to_string()),
        _ => SqlValue::Null,
    })
}

pub(crate) fn extract_value(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => v.as_value(),
        ValueRef::Real(v) => v.as_value(),
        ValueRef::Text(v) => std::str::from_utf8(v)
            .context("The text column is not valid UTF-8")?
            .to_owned()
            .as_value(),
        ValueRef::Blob(v) => Value::Blob(Some(v.into())),
    })
}

#[cfg(test)]
mod tests {
    use super::{bind_value, extract_value};
    use keel_core::Value;
    use rusqlite::types::{Value as SqlValue, ValueRef};
    use time::macros::datetime;

    #[test]
    fn bind_storage_classes() {
        assert_eq!(bind_value(&Value::Boolean(Some(true))).unwrap(), SqlValue::Integer(1));
        assert_eq!(bind_value(&Value::Int64(None)).unwrap(), SqlValue::Null);
        assert_eq!(
            bind_value(&Value::Timestamp(Some(datetime!(2024-02-29 23:59:59.5)))).unwrap(),
            SqlValue::Text("2024-02-29 23:59:59.5".into())
        );
        assert_eq!(
            bind_value(&Value::Varchar(Some("Nemo".into()))).unwrap(),
            SqlValue::Text("Nemo".into())
        );
    }

    #[test]
    fn extract_storage_classes() {
        assert_eq!(extract_value(ValueRef::Null).unwrap(), Value::Null);
        assert_eq!(extract_value(ValueRef::Integer(7)).unwrap(), Value::Int64(Some(7)));
        assert_eq!(extract_value(ValueRef::Real(0.5)).unwrap(), Value::Float64(Some(0.5)));
        assert_eq!(
            extract_value(ValueRef::Text(b"Dory")).unwrap(),
            Value::Varchar(Some("Dory".into()))
        );
        assert!(extract_value(ValueRef::Text(&[0xff, 0xfe])).is_err());
    }
}
