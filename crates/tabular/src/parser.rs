//! Delimited-text parsing and per-column type inference.
//!
//! Tokenizing (quoting, escaped quotes, CRLF) is left to the `csv` crate.
//! This module decodes the bytes, names the columns, checks row widths, and
//! decides a [`ColumnKind`] for every column:
//!
//! 1. Missing cells (empty or a configured marker) are ignored.
//! 2. A column whose remaining cells all read as integers is `Integer`.
//! 3. Otherwise, if they all read as integers or finite floats, it is `Float`.
//! 4. Anything else is `Text`, and its cells are kept verbatim.
//!
//! Numbers with a redundant leading zero (`007`, `00.5`) are not numbers here,
//! so identifier-like columns such as zip codes stay text.
use std::collections::HashSet;
use std::time::Instant;

use tracing::debug;

use crate::config::TabularConfig;
use crate::error::TabularError;
use crate::types::{CellValue, ColumnKind, ParsedTable, Row};

const BOM: char = '\u{feff}';

/// Parse raw bytes with a header row into a typed table.
///
/// ```rust
/// use tabular::{parse_table, CellValue, TabularConfig};
///
/// let table = parse_table(b"Name,Age\nJohn,25\nJane,30", &TabularConfig::default()).unwrap();
/// assert_eq!(table.columns, vec!["Name", "Age"]);
/// assert_eq!(table.rows[1].get("Age"), Some(&CellValue::Integer(30)));
/// ```
pub fn parse_table(bytes: &[u8], cfg: &TabularConfig) -> Result<ParsedTable, TabularError> {
    let start = Instant::now();

    if let Some(limit) = cfg.max_bytes {
        if bytes.len() > limit {
            return Err(TabularError::PayloadTooLarge {
                actual: bytes.len(),
                limit,
            });
        }
    }

    let text = decode(bytes)?;
    let (columns, raw_rows) = read_records(text, cfg)?;
    let kinds = infer_kinds(columns.len(), &raw_rows);

    let rows = raw_rows
        .into_iter()
        .map(|cells| {
            columns
                .iter()
                .zip(kinds.iter())
                .zip(cells)
                .map(|((name, kind), cell)| (name.clone(), to_cell(*kind, cell)))
                .collect::<Row>()
        })
        .collect::<Vec<_>>();

    debug!(
        columns = columns.len(),
        rows = rows.len(),
        elapsed_micros = start.elapsed().as_micros(),
        "tabular_parse"
    );

    Ok(ParsedTable {
        columns,
        kinds,
        rows,
    })
}

fn decode(bytes: &[u8]) -> Result<&str, TabularError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        TabularError::Decode(format!("invalid utf-8 sequence at byte {}", e.valid_up_to()))
    })?;
    Ok(text.strip_prefix(BOM).unwrap_or(text))
}

/// A non-missing raw cell, or `None` for a missing one.
type RawRow = Vec<Option<String>>;

fn read_records(text: &str, cfg: &TabularConfig) -> Result<(Vec<String>, Vec<RawRow>), TabularError> {
    // Widths are checked here rather than by the reader so errors can name the line.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(cfg.delimiter_byte())
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(|e| TabularError::malformed(e.to_string()))?,
        None => return Err(TabularError::malformed("missing header row")),
    };
    if header.iter().all(|name| name.trim().is_empty()) {
        return Err(TabularError::malformed("header row is empty"));
    }
    let columns = column_names(header.iter());
    let width = columns.len();

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| TabularError::malformed(e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() > width || (record.len() < width && !cfg.pad_short_rows) {
            return Err(TabularError::malformed(format!(
                "line {line}: expected {width} fields, found {}",
                record.len()
            )));
        }

        if let Some(limit) = cfg.max_rows {
            if rows.len() == limit {
                return Err(TabularError::TooManyRows(limit));
            }
        }

        let mut row: RawRow = record
            .iter()
            .map(|cell| (!cfg.is_missing(cell)).then(|| cell.to_string()))
            .collect();
        row.resize(width, None);
        rows.push(row);
    }

    Ok((columns, rows))
}

/// Header names in source order. Blank names become `Unnamed: <index>` and
/// repeats get a `.1`, `.2`, ... suffix so every name is unique.
fn column_names<'a>(header: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut names = Vec::new();

    for (idx, raw) in header.enumerate() {
        let base = if raw.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            raw.to_string()
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while taken.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        taken.insert(name.clone());
        names.push(name);
    }

    names
}

fn infer_kinds(width: usize, rows: &[RawRow]) -> Vec<ColumnKind> {
    let mut kinds = vec![ColumnKind::Empty; width];
    for row in rows {
        for (kind, cell) in kinds.iter_mut().zip(row) {
            if *kind == ColumnKind::Text {
                continue;
            }
            if let Some(cell) = cell {
                *kind = (*kind).max(cell_kind(cell));
            }
        }
    }
    kinds
}

fn cell_kind(cell: &str) -> ColumnKind {
    if parse_integer(cell).is_some() {
        ColumnKind::Integer
    } else if parse_float(cell).is_some() {
        ColumnKind::Float
    } else {
        ColumnKind::Text
    }
}

fn to_cell(kind: ColumnKind, cell: Option<String>) -> CellValue {
    let Some(cell) = cell else {
        return CellValue::Empty;
    };
    let parsed = match kind {
        ColumnKind::Integer => parse_integer(&cell).map(CellValue::Integer),
        ColumnKind::Float => parse_float(&cell).map(CellValue::Float),
        ColumnKind::Text | ColumnKind::Empty => None,
    };
    parsed.unwrap_or(CellValue::Text(cell))
}

fn parse_integer(cell: &str) -> Option<i64> {
    let trimmed = cell.trim();
    if has_leading_zero(integer_part(trimmed)) {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

fn parse_float(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if !trimmed.bytes().any(|b| b.is_ascii_digit()) || has_leading_zero(integer_part(trimmed)) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Digits before any decimal point or exponent, sign removed.
fn integer_part(s: &str) -> &str {
    let unsigned = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    &unsigned[..end]
}

fn has_leading_zero(digits: &str) -> bool {
    digits.len() > 1 && digits.starts_with('0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<ParsedTable, TabularError> {
        parse_table(input.as_bytes(), &TabularConfig::default())
    }

    #[test]
    fn parses_simple_table() {
        let table = parse("Name,Age\nJohn,25\nJane,30").unwrap();
        assert_eq!(table.columns, vec!["Name", "Age"]);
        assert_eq!(table.kinds, vec![ColumnKind::Text, ColumnKind::Integer]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].get("Name"), Some(&CellValue::text("John")));
        assert_eq!(table.rows[0].get("Age"), Some(&CellValue::Integer(25)));
    }

    #[test]
    fn header_only_yields_no_rows() {
        let table = parse("a,b,c\n").unwrap();
        assert_eq!(table.columns, vec!["a", "b", "c"]);
        assert!(table.rows.is_empty());
        assert_eq!(table.kinds, vec![ColumnKind::Empty; 3]);
    }

    #[test]
    fn mixed_integer_and_float_is_float() {
        let table = parse("x\n1\n2.5\n-3").unwrap();
        assert_eq!(table.kinds, vec![ColumnKind::Float]);
        let values: Vec<_> = table.rows.iter().map(|r| r.get("x").cloned()).collect();
        assert_eq!(
            values,
            vec![
                Some(CellValue::Float(1.0)),
                Some(CellValue::Float(2.5)),
                Some(CellValue::Float(-3.0)),
            ]
        );
    }

    #[test]
    fn one_text_cell_makes_column_text() {
        let table = parse("x\n1\ntwo\n3").unwrap();
        assert_eq!(table.kinds, vec![ColumnKind::Text]);
        assert_eq!(table.rows[0].get("x"), Some(&CellValue::text("1")));
    }

    #[test]
    fn leading_zeros_stay_text() {
        let table = parse("zip,ratio\n02134,0.5\n10001,0.25").unwrap();
        assert_eq!(table.kinds, vec![ColumnKind::Text, ColumnKind::Float]);
        assert_eq!(table.rows[0].get("zip"), Some(&CellValue::text("02134")));
    }

    #[test]
    fn zero_is_a_number() {
        let table = parse("n\n0\n-0\n10").unwrap();
        assert_eq!(table.kinds, vec![ColumnKind::Integer]);
    }

    #[test]
    fn non_finite_words_are_text() {
        let table = parse("v\ninf\n1").unwrap();
        assert_eq!(table.kinds, vec![ColumnKind::Text]);
    }

    #[test]
    fn missing_cells_become_empty() {
        let table = parse("a,b,c\n1,,x\nNA,2,\n3,4,y").unwrap();
        assert_eq!(
            table.kinds,
            vec![ColumnKind::Integer, ColumnKind::Integer, ColumnKind::Text]
        );
        assert_eq!(table.rows[0].get("b"), Some(&CellValue::Empty));
        assert_eq!(table.rows[1].get("a"), Some(&CellValue::Empty));
        assert_eq!(table.rows[1].get("c"), Some(&CellValue::Empty));
        for row in &table.rows {
            assert_eq!(row.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn quoted_fields_keep_delimiters() {
        let table = parse("city,pop\n\"Portland, OR\",650000\n\"He said \"\"hi\"\"\",1").unwrap();
        assert_eq!(table.rows[0].get("city"), Some(&CellValue::text("Portland, OR")));
        assert_eq!(table.rows[1].get("city"), Some(&CellValue::text("He said \"hi\"")));
    }

    #[test]
    fn crlf_and_blank_lines() {
        let table = parse("a,b\r\n1,2\r\n\r\n3,4\r\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[1].get("b"), Some(&CellValue::Integer(4)));
    }

    #[test]
    fn strips_byte_order_mark() {
        let table = parse("\u{feff}Name,Age\nJohn,25").unwrap();
        assert_eq!(table.columns[0], "Name");
    }

    #[test]
    fn duplicate_and_blank_headers_are_renamed() {
        let table = parse("A,A,,A.1,A\n1,2,3,4,5").unwrap();
        assert_eq!(table.columns, vec!["A", "A.1", "Unnamed: 2", "A.1.1", "A.2"]);
        assert_eq!(table.rows[0].len(), 5);
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(matches!(parse(""), Err(TabularError::MalformedTable(_))));
    }

    #[test]
    fn blank_header_is_malformed() {
        assert!(matches!(parse(",,\n1,2,3"), Err(TabularError::MalformedTable(_))));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let err = parse("a,b\n1,2\n3,4,5").unwrap_err();
        assert_eq!(
            err,
            TabularError::MalformedTable("line 3: expected 2 fields, found 3".into())
        );

        let err = parse("a,b\n1").unwrap_err();
        assert!(err.to_string().contains("found 1"));
    }

    #[test]
    fn short_rows_can_be_padded() {
        let cfg = TabularConfig {
            pad_short_rows: true,
            ..TabularConfig::default()
        };
        let table = parse_table(b"a,b\n1\n2,3", &cfg).unwrap();
        assert_eq!(table.rows[0].get("b"), Some(&CellValue::Empty));
        assert_eq!(table.kinds[1], ColumnKind::Integer);

        assert!(parse_table(b"a,b\n1,2,3", &cfg).is_err());
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let err = parse_table(b"a,b\n\xff\xfe,1", &TabularConfig::default()).unwrap_err();
        assert_eq!(
            err,
            TabularError::Decode("invalid utf-8 sequence at byte 4".into())
        );
    }

    #[test]
    fn custom_delimiter() {
        let cfg = TabularConfig {
            delimiter: ';',
            ..TabularConfig::default()
        };
        let table = parse_table(b"a;b\n1,5;x", &cfg).unwrap();
        assert_eq!(table.rows[0].get("a"), Some(&CellValue::text("1,5")));
    }

    #[test]
    fn wide_header_keeps_column_order() {
        let header: Vec<String> = (0..4000).map(|i| format!("c{i}")).collect();
        let values: Vec<String> = (0..4000).map(|i| i.to_string()).collect();
        let input = format!("{}\n{}\n", header.join(","), values.join(","));

        let table = parse(&input).unwrap();
        assert_eq!(table.columns, header);
        assert!(table.kinds.iter().all(|k| *k == ColumnKind::Integer));
        let row = &table.rows[0];
        assert!(row.keys().eq(header.iter().map(String::as_str)));
        assert_eq!(row.get("c3999"), Some(&CellValue::Integer(3999)));
    }

    #[test]
    fn limits_are_enforced() {
        let cfg = TabularConfig {
            max_rows: Some(1),
            ..TabularConfig::default()
        };
        assert_eq!(
            parse_table(b"a\n1\n2", &cfg),
            Err(TabularError::TooManyRows(1))
        );
        assert!(parse_table(b"a\n1", &cfg).is_ok());

        let cfg = TabularConfig {
            max_bytes: Some(4),
            ..TabularConfig::default()
        };
        assert!(matches!(
            parse_table(b"a\n1\n2", &cfg),
            Err(TabularError::PayloadTooLarge { actual: 5, limit: 4 })
        ));
    }
}
