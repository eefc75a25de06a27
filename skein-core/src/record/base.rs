//! Base implementation of records.
use crate::error::CoreError;
use std::collections::{
    hash_map::{Iter, Keys},
    HashMap,
};

/// Represents possible types of values in a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordValue {
    /// Scalar, e.g., a metric of an episode.
    Scalar(f32),

    /// 1-dimensional array, e.g., a rolling window snapshot.
    Array1(Vec<f32>),

    /// String, e.g., a label of an experiment.
    String(String),
}

/// Represents a record, a collection of named metric values.
#[derive(Debug)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Construct an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Create a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Returns keys of the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets the value of the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Gets scalar value.
    pub fn get_scalar(&self, k: &str) -> Result<f32, CoreError> {
        if let Some(v) = self.0.get(k) {
            match v {
                RecordValue::Scalar(v) => Ok(*v),
                _ => Err(CoreError::RecordValueTypeError("Scalar".to_string())),
            }
        } else {
            Err(CoreError::RecordKeyError(k.to_string()))
        }
    }

    /// Gets a 1-dimensional array.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, CoreError> {
        if let Some(v) = self.0.get(k) {
            match v {
                RecordValue::Array1(v) => Ok(v.clone()),
                _ => Err(CoreError::RecordValueTypeError("Array1".to_string())),
            }
        } else {
            Err(CoreError::RecordKeyError(k.to_string()))
        }
    }

    /// Gets a string value.
    pub fn get_string(&self, k: &str) -> Result<String, CoreError> {
        if let Some(v) = self.0.get(k) {
            match v {
                RecordValue::String(s) => Ok(s.clone()),
                _ => Err(CoreError::RecordValueTypeError("String".to_string())),
            }
        } else {
            Err(CoreError::RecordKeyError(k.to_string()))
        }
    }

    /// Returns `true` if the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, RecordValue};
    use crate::error::CoreError;

    #[test]
    fn typed_getters() {
        let mut record = Record::from_scalar("reward", 5.0);
        record.insert("window", RecordValue::Array1(vec![1.0, 2.0]));

        assert_eq!(record.get_scalar("reward").unwrap(), 5.0);
        assert_eq!(record.get_array1("window").unwrap(), vec![1.0, 2.0]);
        assert!(matches!(
            record.get_scalar("window"),
            Err(CoreError::RecordValueTypeError(_))
        ));
        assert!(matches!(
            record.get_scalar("missing"),
            Err(CoreError::RecordKeyError(_))
        ));
    }
}
