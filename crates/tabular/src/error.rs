//! Error types produced by the tabular crate.
//!
//! Every failure here means the uploaded bytes could not be turned into a
//! table. Nothing is partially parsed: callers either get a complete
//! [`ParsedTable`](crate::ParsedTable) or one of these errors.
//!
//! | Error | Description |
//! |-------|-------------|
//! | [`Decode`](TabularError::Decode) | Bytes are not valid UTF-8 |
//! | [`MalformedTable`](TabularError::MalformedTable) | Missing/blank header or ragged rows |
//! | [`PayloadTooLarge`](TabularError::PayloadTooLarge) | Input exceeds `max_bytes` |
//! | [`TooManyRows`](TabularError::TooManyRows) | Input exceeds `max_rows` |
use thiserror::Error;

/// Errors that can occur while parsing delimited text.
///
/// ```rust
/// use tabular::TabularError;
///
/// let err = TabularError::MalformedTable("header row is empty".into());
/// assert_eq!(err.to_string(), "malformed table: header row is empty");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TabularError {
    /// The byte stream is not valid text in UTF-8.
    #[error("could not decode file as UTF-8: {0}")]
    Decode(String),

    /// The header is absent or blank, or a row disagrees with the header width.
    #[error("malformed table: {0}")]
    MalformedTable(String),

    /// Raw input is larger than the configured byte limit.
    #[error("payload too large: {actual} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { actual: usize, limit: usize },

    /// More data rows than the configured row limit.
    #[error("too many rows: limit is {0}")]
    TooManyRows(usize),
}

impl TabularError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        TabularError::MalformedTable(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_embed_cause() {
        let err = TabularError::Decode("invalid utf-8 sequence at byte 4".into());
        assert!(err.to_string().contains("byte 4"));

        let err = TabularError::PayloadTooLarge {
            actual: 20,
            limit: 10,
        };
        assert_eq!(
            err.to_string(),
            "payload too large: 20 bytes exceeds limit of 10 bytes"
        );
    }
}
