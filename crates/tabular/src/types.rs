//! Core data types: cell values, ordered rows, parsed tables, and the stored
//! dataset record.
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single scalar cell.
///
/// Serialized untagged: text as a JSON string, numbers as JSON numbers, and
/// [`CellValue::Empty`] as the empty string `""`, which is the sentinel for a
/// missing cell. `null` deserializes to `Empty` as well.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    #[default]
    Empty,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Collapse values that carry no data into the empty sentinel.
    pub fn normalized(self) -> Self {
        match self {
            CellValue::Text(s) if s.is_empty() => CellValue::Empty,
            CellValue::Float(f) if !f.is_finite() => CellValue::Empty,
            other => other,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Float(f) => serializer.serialize_f64(*f),
            CellValue::Empty => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CellVisitor;

        impl<'de> Visitor<'de> for CellVisitor {
            type Value = CellValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, a number, or null")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CellValue, E> {
                Ok(CellValue::Text(v.to_string()).normalized())
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<CellValue, E> {
                Ok(CellValue::Text(v).normalized())
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellValue, E> {
                Ok(CellValue::Integer(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellValue, E> {
                Ok(i64::try_from(v)
                    .map(CellValue::Integer)
                    .unwrap_or(CellValue::Float(v as f64)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<CellValue, E> {
                Ok(CellValue::Float(v).normalized())
            }

            fn visit_unit<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Empty)
            }

            fn visit_none<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Empty)
            }
        }

        deserializer.deserialize_any(CellVisitor)
    }
}

/// One table row: column name to cell, in column order.
///
/// Serialized as a JSON object whose keys keep insertion order. Equality is
/// order-sensitive.
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: IndexMap<String, CellValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: IndexMap::with_capacity(capacity),
        }
    }

    /// Set `column` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.cells.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Remove `column`, keeping the order of the remaining cells.
    pub fn remove(&mut self, column: &str) -> Option<CellValue> {
        self.cells.shift_remove(column)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut CellValue> {
        self.cells.values_mut()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.cells.len() == other.cells.len() && self.cells.iter().eq(other.cells.iter())
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(column, value)| (column.into(), value))
                .collect(),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column names to cell values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
                let mut row = Row::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, CellValue>()? {
                    row.insert(name, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// The value type inferred for a whole column.
///
/// Ordered by generality: a column takes the most general kind any of its
/// non-missing cells needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// No non-missing cells at all.
    Empty,
    Integer,
    Float,
    Text,
}

/// Parser output: column names in source order plus typed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub columns: Vec<String>,
    pub kinds: Vec<ColumnKind>,
    pub rows: Vec<Row>,
}

impl ParsedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// The stored representation of one uploaded tabular file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: String,
    pub filename: String,
    pub columns: Vec<String>,
    pub data: Vec<Row>,
    pub created_at: DateTime<Utc>,
}

impl DatasetRecord {
    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// The first `n` rows, or all of them when there are fewer.
    pub fn preview(&self, n: usize) -> &[Row] {
        &self.data[..n.min(self.data.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_json_forms() {
        assert_eq!(serde_json::to_value(CellValue::text("a")).unwrap(), json!("a"));
        assert_eq!(serde_json::to_value(CellValue::Integer(25)).unwrap(), json!(25));
        assert_eq!(serde_json::to_value(CellValue::Float(2.5)).unwrap(), json!(2.5));
        assert_eq!(serde_json::to_value(CellValue::Empty).unwrap(), json!(""));
    }

    #[test]
    fn cell_from_json() {
        let cells: Vec<CellValue> =
            serde_json::from_value(json!(["x", "", null, 7, -3, 1.5])).unwrap();
        assert_eq!(
            cells,
            vec![
                CellValue::text("x"),
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Integer(7),
                CellValue::Integer(-3),
                CellValue::Float(1.5),
            ]
        );
    }

    #[test]
    fn normalized_collapses_blank_values() {
        assert_eq!(CellValue::text("").normalized(), CellValue::Empty);
        assert_eq!(CellValue::Float(f64::NAN).normalized(), CellValue::Empty);
        assert_eq!(CellValue::text(" ").normalized(), CellValue::text(" "));
    }

    #[test]
    fn row_keeps_column_order() {
        let row: Row = [
            ("Zeta", CellValue::Integer(1)),
            ("Alpha", CellValue::text("a")),
        ]
        .into_iter()
        .collect();

        let encoded = serde_json::to_string(&row).unwrap();
        assert_eq!(encoded, r#"{"Zeta":1,"Alpha":"a"}"#);

        let decoded: Row = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn row_insert_replaces_in_place() {
        let mut row = Row::new();
        row.insert("a", CellValue::Integer(1));
        row.insert("b", CellValue::Integer(2));
        row.insert("a", CellValue::Integer(3));
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("a"), Some(&CellValue::Integer(3)));
        assert_eq!(row.remove("a"), Some(CellValue::Integer(3)));
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn row_equality_respects_order() {
        let ab: Row = [("a", CellValue::Integer(1)), ("b", CellValue::Integer(2))]
            .into_iter()
            .collect();
        let ba: Row = [("b", CellValue::Integer(2)), ("a", CellValue::Integer(1))]
            .into_iter()
            .collect();
        assert_ne!(ab, ba);
        assert_eq!(ab, ab.clone());
    }

    #[test]
    fn wide_row_lookups() {
        let row: Row = (0..5000)
            .map(|i| (format!("c{i}"), CellValue::Integer(i)))
            .collect();
        assert_eq!(row.len(), 5000);
        assert_eq!(row.get("c4999"), Some(&CellValue::Integer(4999)));
        assert_eq!(row.keys().nth(1234), Some("c1234"));
    }

    #[test]
    fn preview_is_bounded() {
        let record = DatasetRecord {
            id: "id".into(),
            filename: "f.csv".into(),
            columns: vec!["a".into()],
            data: vec![Row::new(); 3],
            created_at: Utc::now(),
        };
        assert_eq!(record.preview(5).len(), 3);
        assert_eq!(record.preview(2).len(), 2);
        assert_eq!(record.row_count(), 3);
    }
}
