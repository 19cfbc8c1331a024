use crate::{Error, Result};
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use serde_json::Number;
use time::{PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description};
use uuid::Uuid;

/// Text form of timestamps for backends without a native type.
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);

/// Dynamically typed scalar exchanged with the storage backend.
///
/// Typed variants carry an `Option` so a NULL can still remember its type, for
/// example the default of a nullable integer field is `Int64(None)`.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int64(Option<i64>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Timestamp(Option<PrimitiveDateTime>),
    Uuid(Option<Uuid>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Decimal(l), Self::Decimal(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Boolean(None)
                | Value::Int64(None)
                | Value::Float64(None)
                | Value::Decimal(None)
                | Value::Varchar(None)
                | Value::Blob(None)
                | Value::Timestamp(None)
                | Value::Uuid(None)
        )
    }

    /// Equality used when a backend evaluates a restriction itself.
    ///
    /// NULL never equals anything, numbers compare by magnitude across
    /// integer, float and decimal variants, everything else must have the same
    /// variant and payload.
    pub fn equals(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        match (self.as_decimal(), other.as_decimal()) {
            (Some(l), Some(r)) => l == r,
            _ => self == other,
        }
    }

    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int64(Some(v)) => Some(Decimal::from(*v)),
            Value::Float64(Some(v)) => Decimal::from_f64(*v),
            Value::Decimal(Some(v)) => Some(*v),
            _ => None,
        }
    }

    /// Convert a JSON scalar. Arrays and objects are not scalars and fail.
    pub fn from_json(value: &serde_json::Value) -> Result<Value> {
        Ok(match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Boolean(Some(*v)),
            serde_json::Value::Number(v) => {
                if let Some(v) = v.as_i64() {
                    Value::Int64(Some(v))
                } else if let Some(v) = v.as_f64() {
                    Value::Float64(Some(v))
                } else {
                    return Err(Error::msg(format!("Number {v} is not representable")));
                }
            }
            serde_json::Value::String(v) => Value::Varchar(Some(v.clone())),
            serde_json::Value::Array(..) | serde_json::Value::Object(..) => {
                return Err(Error::msg(format!("Expected a scalar, found `{value}`")));
            }
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            _ if self.is_null() => Json::Null,
            Value::Boolean(Some(v)) => Json::Bool(*v),
            Value::Int64(Some(v)) => Json::Number((*v).into()),
            Value::Float64(Some(v)) => Number::from_f64(*v).map_or(Json::Null, Json::Number),
            Value::Decimal(Some(v)) => v
                .to_i64()
                .filter(|_| v.fract().is_zero())
                .map_or_else(|| Json::String(v.to_string()), |v| Json::Number(v.into())),
            Value::Varchar(Some(v)) => Json::String(v.clone()),
            Value::Blob(Some(v)) => Json::Array(v.iter().map(|b| Json::Number((*b).into())).collect()),
            Value::Timestamp(Some(v)) => v
                .format(TIMESTAMP_FORMAT)
                .map_or(Json::Null, Json::String),
            Value::Uuid(Some(v)) => Json::String(v.to_string()),
            _ => Json::Null,
        }
    }
}
