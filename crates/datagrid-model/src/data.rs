use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised when writing into a raw row of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowDataError {
    #[error("positional write at {index} into a keyed row")]
    PositionalWriteIntoKeyed { index: usize },
    #[error("keyed write of '{key}' into a positional row")]
    KeyedWriteIntoPositional { key: String },
}

/// Owner-supplied raw data for one row: an ordered sequence of values or a
/// keyed mapping.
///
/// Reads of absent fields yield `None` rather than erroring; the engine maps
/// absent data to a column's configured default content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowData {
    Positional(Vec<Value>),
    Keyed(BTreeMap<String, Value>),
}

impl RowData {
    /// Value at a positional slot. `None` for keyed rows or out-of-range slots.
    pub fn position(&self, index: usize) -> Option<&Value> {
        match self {
            RowData::Positional(values) => values.get(index),
            RowData::Keyed(_) => None,
        }
    }

    /// Value under a key. `None` for positional rows or absent keys.
    pub fn key(&self, key: &str) -> Option<&Value> {
        match self {
            RowData::Positional(_) => None,
            RowData::Keyed(map) => map.get(key),
        }
    }

    /// Write a value into a positional slot, growing the row with nulls if the
    /// slot is past the end.
    pub fn set_position(&mut self, index: usize, value: Value) -> Result<(), RowDataError> {
        match self {
            RowData::Positional(values) => {
                if index >= values.len() {
                    values.resize(index + 1, Value::Null);
                }
                values[index] = value;
                Ok(())
            }
            RowData::Keyed(_) => Err(RowDataError::PositionalWriteIntoKeyed { index }),
        }
    }

    /// Write a value under a key.
    pub fn set_key(&mut self, key: &str, value: Value) -> Result<(), RowDataError> {
        match self {
            RowData::Positional(_) => Err(RowDataError::KeyedWriteIntoPositional {
                key: key.to_string(),
            }),
            RowData::Keyed(map) => {
                map.insert(key.to_string(), value);
                Ok(())
            }
        }
    }
}

impl From<Vec<Value>> for RowData {
    fn from(values: Vec<Value>) -> Self {
        RowData::Positional(values)
    }
}

impl From<BTreeMap<String, Value>> for RowData {
    fn from(map: BTreeMap<String, Value>) -> Self {
        RowData::Keyed(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absent_fields_read_as_none() {
        let row = RowData::Positional(vec![Value::from(1), Value::from("a")]);
        assert_eq!(row.position(5), None);
        assert_eq!(row.key("name"), None);
    }

    #[test]
    fn positional_write_grows_with_nulls() {
        let mut row = RowData::Positional(vec![]);
        row.set_position(2, Value::from("x")).unwrap();
        assert_eq!(
            row,
            RowData::Positional(vec![Value::Null, Value::Null, Value::from("x")])
        );
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let mut row = RowData::Keyed(BTreeMap::new());
        assert_eq!(
            row.set_position(0, Value::Null),
            Err(RowDataError::PositionalWriteIntoKeyed { index: 0 })
        );
    }

    #[test]
    fn keyed_rows_round_trip_as_plain_json_objects() {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), Value::from("Ashton Cox"));
        let row = RowData::Keyed(map);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(serde_json::from_str::<RowData>(&json).unwrap(), row);
    }
}
