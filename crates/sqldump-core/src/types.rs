//! Core types for sqldump

use std::borrow::Cow;

/// A raw column value as delivered by the server.
///
/// The text protocol hands every non-NULL value over as bytes; drivers keep
/// the textual form untouched so numeric columns can be written back exactly
/// as the server printed them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// 64-bit signed integer (binary protocol)
    Int64(i64),
    /// 64-bit unsigned integer (binary protocol)
    UInt64(u64),
    /// 32-bit floating point (binary protocol)
    Float32(f32),
    /// 64-bit floating point (binary protocol)
    Float64(f64),
    /// UTF-8 text
    String(String),
    /// Bytes that are not valid UTF-8
    Bytes(Vec<u8>),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// The value's raw bytes, or `None` for NULL.
    pub fn as_bytes(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_bytes())),
            Value::Bytes(b) => Some(Cow::Borrowed(b.as_slice())),
            other => Some(Cow::Owned(other.to_string().into_bytes())),
        }
    }

    /// The value's textual form, or `None` for NULL.
    ///
    /// Non UTF-8 bytes are converted lossily.
    pub fn raw_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Bytes(b) => Some(String::from_utf8_lossy(b)),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    /// Build a value from raw bytes, keeping valid UTF-8 as text.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(s) => Value::String(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A row from a query result.
///
/// In compact mode the row is a flat value array and carries no column
/// names; in keyed mode the names are attached so metadata rows can be read
/// by column label.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column values
    pub values: Vec<Value>,
    /// Column names (empty for compact rows)
    columns: Vec<String>,
}

impl Row {
    /// Create a new keyed row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Create a compact row without column names
    pub fn compact(values: Vec<Value>) -> Self {
        Self {
            values,
            columns: Vec::new(),
        }
    }

    /// Get a value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name (case-insensitive, keyed rows only)
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a column as text, treating NULL and missing columns alike.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get_by_name(name)
            .and_then(|v| v.raw_text())
            .map(|s| s.into_owned())
    }

    /// Get column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether the row carries column names
    pub fn is_keyed(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Number of values in the row
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_keeps_utf8_as_text() {
        assert_eq!(Value::from_bytes(b"abc".to_vec()), Value::String("abc".into()));
        assert_eq!(
            Value::from_bytes(vec![0xff, 0x00, 0x10]),
            Value::Bytes(vec![0xff, 0x00, 0x10])
        );
    }

    #[test]
    fn test_raw_text_preserves_numeric_form() {
        let v = Value::String("1.50".into());
        assert_eq!(v.raw_text().as_deref(), Some("1.50"));
        assert_eq!(Value::Null.raw_text(), None);
        assert_eq!(Value::Int64(-7).raw_text().as_deref(), Some("-7"));
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(Value::String(" 42 ".into()).as_i64(), Some(42));
        assert_eq!(Value::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(Value::Null.as_i64(), None);
    }

    #[test]
    fn test_keyed_row_lookup() {
        let row = Row::new(
            vec!["TABLE_NAME".into(), "TABLE_ROWS".into()],
            vec![Value::from("users"), Value::from("12")],
        );
        assert!(row.is_keyed());
        assert_eq!(row.text("table_name").as_deref(), Some("users"));
        assert_eq!(row.get_by_name("TABLE_ROWS").and_then(Value::as_i64), Some(12));
        assert_eq!(row.text("missing"), None);
    }

    #[test]
    fn test_compact_row_has_no_names() {
        let row = Row::compact(vec![Value::from(1_i64), Value::Null]);
        assert!(!row.is_keyed());
        assert_eq!(row.len(), 2);
        assert_eq!(row.get_by_name("id"), None);
        assert_eq!(row.get(1), Some(&Value::Null));
    }
}
