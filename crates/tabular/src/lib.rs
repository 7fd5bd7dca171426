//! Chartdeck tabular layer.
//!
//! Uploaded files enter here as raw bytes and leave as a [`DatasetRecord`]
//! ready for storage.
//!
//! ## What we do here
//!
//! - **Parse** delimited text with a header row ([`parse_table`]). The `csv`
//!   crate does the tokenizing; we name columns, reject ragged rows, and infer
//!   a type per column.
//! - **Normalize** the parsed rows ([`normalize`]): every row gets exactly the
//!   header's keys, missing cells become the empty sentinel, and the record is
//!   stamped with a fresh id and creation time.
//!
//! ## Example
//!
//! ```
//! use tabular::{normalize, parse_table, CellValue, TabularConfig};
//!
//! let table = parse_table(b"Name,Age\nJohn,25\nJane,", &TabularConfig::default()).unwrap();
//! let record = normalize(table, "people.csv");
//!
//! assert_eq!(record.columns, vec!["Name", "Age"]);
//! assert_eq!(record.data[1].get("Age"), Some(&CellValue::Empty));
//! ```
mod config;
mod error;
mod normalize;
mod parser;
mod types;

pub use crate::config::{ConfigError, TabularConfig, DEFAULT_MAX_BYTES};
pub use crate::error::TabularError;
pub use crate::normalize::{conform_row, normalize, normalize_with, RecordStamper, SystemStamper};
pub use crate::parser::parse_table;
pub use crate::types::{CellValue, ColumnKind, DatasetRecord, ParsedTable, Row};
