use crate::{Context, Error, Result, Value};

/// Field values given to a write, in declaration order.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set `name`, replacing any previous value while keeping its position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(field) => field.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Record> {
        let serde_json::Value::Object(map) = value else {
            return Err(Error::msg(format!(
                "A record must be a JSON object, found `{value}`"
            )));
        };
        Self::from_json_map(map)
    }

    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Result<Record> {
        map.iter()
            .map(|(k, v)| {
                Value::from_json(v)
                    .with_context(|| format!("Field `{k}` does not hold a storable value"))
                    .map(|v| (k.clone(), v))
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut result = Record::new();
        for (k, v) in iter {
            result.set(k, v);
        }
        result
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;
    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Anything `Model::save` accepts as a record.
pub trait IntoRecord {
    fn into_record(self) -> Result<Record>;
}

impl IntoRecord for Record {
    fn into_record(self) -> Result<Record> {
        Ok(self)
    }
}

impl IntoRecord for &Record {
    fn into_record(self) -> Result<Record> {
        Ok(self.clone())
    }
}

impl IntoRecord for serde_json::Value {
    fn into_record(self) -> Result<Record> {
        Record::from_json(&self)
    }
}

impl IntoRecord for &serde_json::Value {
    fn into_record(self) -> Result<Record> {
        Record::from_json(self)
    }
}

impl IntoRecord for serde_json::Map<String, serde_json::Value> {
    fn into_record(self) -> Result<Record> {
        Record::from_json_map(&self)
    }
}
