use serde_json::Value;

use crate::errors::FmpError;

/// A decoded response reshaped as columns and rows.
///
/// FMP endpoints return either an array of flat JSON objects or a single
/// object; this is the structural mapping of that shape to a table. Column
/// order follows first appearance across the records; fields missing from
/// a record become `null` in its row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTable {
    /// Column names, in first-seen order.
    pub columns: Vec<String>,
    /// One row per record, aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
}

impl DataTable {
    /// Build a table from a decoded response body.
    ///
    /// Accepts an array of objects or a single object (treated as a
    /// one-row array). Anything else is an [`FmpError::InvalidArgument`].
    pub fn from_records(value: &Value) -> Result<Self, FmpError> {
        let records: Vec<&serde_json::Map<String, Value>> = match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object().ok_or_else(|| {
                        FmpError::InvalidArgument(
                            "table conversion expects an array of objects".to_string(),
                        )
                    })
                })
                .collect::<Result<_, _>>()?,
            Value::Object(record) => vec![record],
            _ => {
                return Err(FmpError::InvalidArgument(
                    "data must be an object or an array of objects for table conversion"
                        .to_string(),
                ))
            }
        };

        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.iter().any(|existing| existing == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_of_objects() {
        let value = json!([
            {"symbol": "AAPL", "price": 175.5},
            {"symbol": "NVDA", "price": 900.0}
        ]);
        let table = DataTable::from_records(&value).unwrap();
        assert_eq!(table.columns, vec!["price", "symbol"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][1], json!("AAPL"));
        assert_eq!(table.rows[1][0], json!(900.0));
    }

    #[test]
    fn test_single_object_becomes_one_row() {
        let value = json!({"symbol": "AAPL", "price": 175.5});
        let table = DataTable::from_records(&value).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.columns.len(), 2);
    }

    #[test]
    fn test_missing_fields_become_null() {
        let value = json!([
            {"symbol": "AAPL", "price": 175.5},
            {"symbol": "NVDA", "volume": 123}
        ]);
        let table = DataTable::from_records(&value).unwrap();
        // union of keys, first-seen order
        assert_eq!(table.columns, vec!["price", "symbol", "volume"]);
        assert_eq!(table.rows[0][2], Value::Null);
        assert_eq!(table.rows[1][0], Value::Null);
    }

    #[test]
    fn test_empty_array_is_empty_table() {
        let table = DataTable::from_records(&json!([])).unwrap();
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
    }

    #[test]
    fn test_scalar_input_is_rejected() {
        assert!(matches!(
            DataTable::from_records(&json!(42)),
            Err(FmpError::InvalidArgument(_))
        ));
        assert!(matches!(
            DataTable::from_records(&json!(["a", "b"])),
            Err(FmpError::InvalidArgument(_))
        ));
    }
}
