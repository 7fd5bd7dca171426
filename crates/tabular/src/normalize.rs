//! Turning a [`ParsedTable`] into a storable [`DatasetRecord`].
//!
//! Every row is rebuilt in column order. Keys the row lacks are filled with
//! [`CellValue::Empty`], keys that are not columns are dropped, and blank
//! values collapse to the empty sentinel. The record gets its identifier and
//! timestamp from a [`RecordStamper`], so tests can pin both.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{CellValue, DatasetRecord, ParsedTable, Row};

/// Source of record identifiers and creation timestamps.
pub trait RecordStamper: Send + Sync {
    fn next_id(&self) -> String;
    fn now(&self) -> DateTime<Utc>;
}

/// Random v4 UUIDs and the wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStamper;

impl RecordStamper for SystemStamper {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Build a dataset record with a fresh id and the current time.
pub fn normalize(table: ParsedTable, filename: impl Into<String>) -> DatasetRecord {
    normalize_with(table, filename, &SystemStamper)
}

pub fn normalize_with(
    table: ParsedTable,
    filename: impl Into<String>,
    stamper: &dyn RecordStamper,
) -> DatasetRecord {
    let ParsedTable { columns, rows, .. } = table;
    let data = rows
        .into_iter()
        .map(|row| conform_row(&columns, row))
        .collect();

    DatasetRecord {
        id: stamper.next_id(),
        filename: filename.into(),
        columns,
        data,
        created_at: stamper.now(),
    }
}

/// Reshape `row` so its keys are exactly `columns`, in that order.
pub fn conform_row(columns: &[String], mut row: Row) -> Row {
    // Parser output already has exactly these keys in order.
    if row.len() == columns.len() && row.keys().zip(columns).all(|(key, column)| key == column)
    {
        for value in row.values_mut() {
            *value = std::mem::take(value).normalized();
        }
        return row;
    }

    let mut conformed = Row::with_capacity(columns.len());
    for column in columns {
        let value = row
            .remove(column)
            .map(CellValue::normalized)
            .unwrap_or(CellValue::Empty);
        conformed.insert(column.clone(), value);
    }
    conformed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnKind;
    use chrono::TimeZone;

    struct FixedStamper;

    impl RecordStamper for FixedStamper {
        fn next_id(&self) -> String {
            "fixed-id".to_string()
        }

        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        }
    }

    fn table(columns: &[&str], rows: Vec<Row>) -> ParsedTable {
        ParsedTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            kinds: vec![ColumnKind::Text; columns.len()],
            rows,
        }
    }

    #[test]
    fn fills_missing_and_drops_extra_keys() {
        let ragged: Row = [
            ("extra", CellValue::Integer(9)),
            ("b", CellValue::text("")),
            ("a", CellValue::Integer(1)),
        ]
        .into_iter()
        .collect();

        let record = normalize_with(table(&["a", "b", "c"], vec![ragged]), "t.csv", &FixedStamper);

        let row = &record.data[0];
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(row.get("a"), Some(&CellValue::Integer(1)));
        assert_eq!(row.get("b"), Some(&CellValue::Empty));
        assert_eq!(row.get("c"), Some(&CellValue::Empty));
        assert!(row.get("extra").is_none());
    }

    #[test]
    fn conforming_keeps_matching_rows_in_place() {
        let row: Row = [("a", CellValue::text("")), ("b", CellValue::Integer(2))]
            .into_iter()
            .collect();
        let columns = vec!["a".to_string(), "b".to_string()];
        let conformed = conform_row(&columns, row);
        assert_eq!(conformed.get("a"), Some(&CellValue::Empty));
        assert_eq!(conformed.get("b"), Some(&CellValue::Integer(2)));

        let swapped: Row = [("b", CellValue::Integer(2)), ("a", CellValue::Integer(1))]
            .into_iter()
            .collect();
        let conformed = conform_row(&columns, swapped);
        assert_eq!(conformed.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn wide_table_normalizes_every_column() {
        let columns: Vec<String> = (0..3000).map(|i| format!("c{i}")).collect();
        let rows: Vec<Row> = (0..20)
            .map(|r| {
                columns
                    .iter()
                    .map(|c| (c.clone(), CellValue::Integer(r)))
                    .collect()
            })
            .collect();
        let table = ParsedTable {
            kinds: vec![ColumnKind::Integer; columns.len()],
            columns: columns.clone(),
            rows,
        };

        let record = normalize_with(table, "wide.csv", &FixedStamper);
        assert_eq!(record.row_count(), 20);
        assert!(record
            .data
            .iter()
            .all(|row| row.keys().eq(columns.iter().map(String::as_str))));
        assert_eq!(record.data[19].get("c2999"), Some(&CellValue::Integer(19)));
    }

    #[test]
    fn deterministic_with_fixed_stamper() {
        let rows: Vec<Row> = vec![
            [("x", CellValue::Integer(1))].into_iter().collect(),
            [("x", CellValue::Integer(2))].into_iter().collect(),
        ];
        let a = normalize_with(table(&["x"], rows.clone()), "x.csv", &FixedStamper);
        let b = normalize_with(table(&["x"], rows), "x.csv", &FixedStamper);
        assert_eq!(a, b);
        assert_eq!(a.id, "fixed-id");
        assert_eq!(a.filename, "x.csv");
        assert_eq!(a.data[1].get("x"), Some(&CellValue::Integer(2)));
    }

    #[test]
    fn system_stamper_ids_are_unique() {
        let a = normalize(table(&["x"], vec![]), "x.csv");
        let b = normalize(table(&["x"], vec![]), "x.csv");
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
        assert!(a.data.is_empty());
    }
}
