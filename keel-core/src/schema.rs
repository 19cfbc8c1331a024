use crate::Value;
use std::borrow::Cow;

#[derive(Default, Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: Cow<'static, str>,
    /// Written when a record omits the field.
    pub default: Value,
    /// Assigned by the backend on insert.
    pub identity: bool,
}

impl FieldDef {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Fields of a model, in declaration order.
///
/// ```rust
/// use keel_core::Schema;
/// let schema = Schema::new()
///     .identity("id")
///     .field("kind")
///     .field("name")
///     .field_with_default("age", 0);
/// assert_eq!(schema.identity_field().map(|f| f.name()), Some("id"));
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new() -> Self {
        Default::default()
    }

    /// Backend-assigned key, at most one per schema. Declaring it again moves the role.
    pub fn identity(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.fields.iter_mut().for_each(|f| f.identity = false);
        self.push(FieldDef {
            name: name.into(),
            default: Value::Null,
            identity: true,
        });
        self
    }

    /// Field without a declared default, omitted values are written as NULL.
    pub fn field(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.field_with_default(name, Value::Null)
    }

    pub fn field_with_default(
        mut self,
        name: impl Into<Cow<'static, str>>,
        default: impl Into<Value>,
    ) -> Self {
        self.push(FieldDef {
            name: name.into(),
            default: default.into(),
            identity: false,
        });
        self
    }

    fn push(&mut self, field: FieldDef) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn identity_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.identity)
    }
}
