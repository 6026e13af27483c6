//! Conversion from mysql_async rows to sqldump rows

use mysql_async::Row as MySqlRow;
use sqldump_core::{Row, Value};

/// Convert a mysql_async value, keeping the server's textual form.
///
/// The text protocol delivers every column as bytes. Those bytes are kept
/// as-is (as text when valid UTF-8) so that numbers, decimals and temporal
/// values are written back exactly as the server printed them.
pub fn mysql_value_to_value(val: mysql_async::Value) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => Value::from_bytes(bytes),
        mysql_async::Value::Int(i) => Value::Int64(i),
        mysql_async::Value::UInt(u) => Value::UInt64(u),
        mysql_async::Value::Float(f) => Value::Float32(f),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, min, sec
            );
            if micro > 0 {
                text.push_str(&format!(".{:06}", micro));
            }
            Value::String(text)
        }
        mysql_async::Value::Time(negative, days, hours, mins, secs, micros) => {
            let total_hours = days * 24 + u32::from(hours);
            let sign = if negative { "-" } else { "" };
            let mut text = format!("{}{:02}:{:02}:{:02}", sign, total_hours, mins, secs);
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            Value::String(text)
        }
    }
}

/// Convert a full row. Keyed rows carry their column labels.
pub fn convert_row(mysql_row: &MySqlRow, compact: bool) -> Row {
    let mut values = Vec::with_capacity(mysql_row.len());
    for idx in 0..mysql_row.len() {
        let mysql_val: mysql_async::Value = mysql_row.get(idx).unwrap_or(mysql_async::Value::NULL);
        values.push(mysql_value_to_value(mysql_val));
    }

    if compact {
        Row::compact(values)
    } else {
        let columns = mysql_row
            .columns_ref()
            .iter()
            .map(|col| col.name_str().to_string())
            .collect();
        Row::new(columns, values)
    }
}
