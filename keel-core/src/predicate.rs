use crate::{ErrorKind, Restriction, Result, Value};

/// Key of an object that ORs the objects listed under it.
pub const OR_KEY: &str = "$or";
/// Key of an object that ANDs the objects listed under it.
pub const AND_KEY: &str = "$and";

/// Filter over the fields of a model.
///
/// Usually parsed from a JSON object where every key is a field compared for
/// equality and all the keys must hold, with `$or` (and `$and`) introducing a
/// list of nested objects:
///
/// ```rust
/// use keel_core::Predicate;
/// use serde_json::json;
/// let predicate = Predicate::parse(&json!({
///     "$or": [{ "kind": "lion" }, { "age": 3, "kind": "shark" }]
/// }))
/// .unwrap();
/// assert_eq!(
///     predicate,
///     Predicate::or([
///         Predicate::eq("kind", "lion"),
///         Predicate::and([Predicate::eq("age", 3), Predicate::eq("kind", "shark")]),
///     ])
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(String, Value),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Matches every row.
    pub fn all() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Equals(field.into(), value.into())
    }

    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(predicates.into_iter().collect())
    }

    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(predicates.into_iter().collect())
    }

    pub fn parse(input: &serde_json::Value) -> Result<Predicate> {
        let serde_json::Value::Object(map) = input else {
            return Err(invalid(format!("Expected an object, found `{input}`")));
        };
        let mut terms = Vec::with_capacity(map.len());
        for (key, value) in map {
            terms.push(match key.as_str() {
                OR_KEY => Predicate::Or(Self::parse_group(key, value)?),
                AND_KEY => Predicate::And(Self::parse_group(key, value)?),
                "" => return Err(invalid("Empty field name")),
                _ if key.starts_with('$') => {
                    return Err(invalid(format!("Unknown operator `{key}`")));
                }
                _ => Predicate::Equals(
                    key.clone(),
                    Value::from_json(value).map_err(|_| {
                        invalid(format!(
                            "Field `{key}` must be compared with a scalar, found `{value}`"
                        ))
                    })?,
                ),
            });
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Predicate::And(terms)
        })
    }

    fn parse_group(key: &str, value: &serde_json::Value) -> Result<Vec<Predicate>> {
        let serde_json::Value::Array(members) = value else {
            return Err(invalid(format!(
                "`{key}` expects a list of objects, found `{value}`"
            )));
        };
        if key == OR_KEY && members.is_empty() {
            return Err(invalid(format!("`{key}` expects at least one member")));
        }
        members
            .iter()
            .map(|v| match v {
                serde_json::Value::Object(..) => Self::parse(v),
                _ => Err(invalid(format!(
                    "`{key}` members must be objects, found `{v}`"
                ))),
            })
            .collect()
    }

    /// Translate into a backend restriction plus the parameters it binds, in order.
    pub fn translate(&self) -> Translation {
        let mut params = Vec::new();
        let restriction = self.translate_into(&mut params);
        Translation {
            restriction,
            params,
        }
    }

    fn translate_into(&self, params: &mut Vec<Value>) -> Restriction {
        match self {
            Predicate::Equals(field, value) if value.is_null() => Restriction::IsNull {
                column: field.clone(),
            },
            Predicate::Equals(field, value) => {
                params.push(value.clone());
                Restriction::Equals {
                    column: field.clone(),
                    param: params.len() - 1,
                }
            }
            Predicate::And(v) => {
                let mut terms: Vec<_> = v.iter().map(|p| p.translate_into(params)).collect();
                match terms.len() {
                    0 => Restriction::Always,
                    1 => terms.remove(0),
                    _ => Restriction::And(terms),
                }
            }
            Predicate::Or(v) => {
                let mut terms: Vec<_> = v.iter().map(|p| p.translate_into(params)).collect();
                match terms.len() {
                    0 => Restriction::Never,
                    1 => terms.remove(0),
                    _ => Restriction::Or(terms),
                }
            }
        }
    }
}

fn invalid(message: impl Into<String>) -> crate::Error {
    let error = ErrorKind::InvalidPredicate.msg(message.into());
    log::error!("{:#}", error);
    error
}

/// Output of [`Predicate::translate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub restriction: Restriction,
    pub params: Vec<Value>,
}

/// Anything a model operation accepts as a filter.
pub trait IntoPredicate {
    fn into_predicate(self) -> Result<Predicate>;
}

impl IntoPredicate for Predicate {
    fn into_predicate(self) -> Result<Predicate> {
        Ok(self)
    }
}

impl IntoPredicate for &Predicate {
    fn into_predicate(self) -> Result<Predicate> {
        Ok(self.clone())
    }
}

impl IntoPredicate for serde_json::Value {
    fn into_predicate(self) -> Result<Predicate> {
        Predicate::parse(&self)
    }
}

impl IntoPredicate for &serde_json::Value {
    fn into_predicate(self) -> Result<Predicate> {
        Predicate::parse(self)
    }
}
