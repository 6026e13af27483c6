//! Type-directed rendering of column values as SQL literals
//!
//! Each column's declared data type (as reported by
//! `information_schema.COLUMNS.DATA_TYPE`) picks one of three rules:
//!
//! - numeric types are written as the server's raw text, unquoted
//! - character types and `datetime` are quoted and escaped like `QUOTE()`
//! - everything else, binary types included, is written as `X'<hex>'`
//!
//! Matching is exact and case-sensitive. The hex rule is the fallback because
//! it round-trips arbitrary bytes.

use sqldump_core::{Row, Value};

const NUMERIC_TYPES: &[&str] = &[
    "bit",
    "tinyint",
    "smallint",
    "mediumint",
    "int",
    "integer",
    "bigint",
    "real",
    "double",
    "float",
    "decimal",
    "numeric",
];

const QUOTED_TYPES: &[&str] = &[
    "varchar",
    "tinytext",
    "text",
    "mediumtext",
    "longtext",
    "datetime",
];

/// How a column's values are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralRule {
    /// Raw text, no quoting
    Numeric,
    /// Quoted and escaped string literal
    Quoted,
    /// `X'<hex>'` byte string
    Binary,
}

impl LiteralRule {
    /// Classify a data type name. First matching set wins.
    pub fn for_type(data_type: &str) -> Self {
        if NUMERIC_TYPES.contains(&data_type) {
            LiteralRule::Numeric
        } else if QUOTED_TYPES.contains(&data_type) {
            LiteralRule::Quoted
        } else {
            LiteralRule::Binary
        }
    }

    /// Render one value under this rule
    pub fn render(self, value: &Value) -> String {
        match self {
            LiteralRule::Numeric => match value.raw_text() {
                Some(text) => text.into_owned(),
                None => "NULL".to_string(),
            },
            LiteralRule::Quoted => match value {
                Value::Null => "NULL".to_string(),
                Value::String(s) => quote_literal(s),
                // Not UTF-8: keep the bytes intact rather than convert lossily.
                Value::Bytes(b) => hex_literal(b),
                other => quote_literal(&other.to_string()),
            },
            LiteralRule::Binary => match value.as_bytes() {
                Some(bytes) => hex_literal(&bytes),
                None => "NULL".to_string(),
            },
        }
    }
}

/// Render a single value for a column of `data_type`
pub fn render(data_type: &str, value: &Value) -> String {
    LiteralRule::for_type(data_type).render(value)
}

/// Quote a string the way MySQL's `QUOTE()` does, additionally escaping
/// newlines and carriage returns so each row stays on one line.
pub fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Render bytes as a hexadecimal literal
pub fn hex_literal(bytes: &[u8]) -> String {
    format!("X'{}'", hex::encode_upper(bytes))
}

/// Per-table row renderer: one rule per column, in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFormatter {
    rules: Vec<LiteralRule>,
}

impl RowFormatter {
    pub fn new<'a>(data_types: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            rules: data_types.into_iter().map(LiteralRule::for_type).collect(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.rules.len()
    }

    /// Render a row as `(v1,v2,...)`.
    ///
    /// Columns beyond the known column list fall back to the binary rule.
    pub fn render_row(&self, row: &Row) -> String {
        let mut out = String::from("(");
        for (idx, value) in row.values.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            let rule = self.rules.get(idx).copied().unwrap_or(LiteralRule::Binary);
            out.push_str(&rule.render(value));
        }
        out.push(')');
        out
    }
}
