//! Size-bounded multi-row INSERT batching

use std::io::Write;

/// Largest statement the writer aims to emit (1 MiB)
pub const MAX_STATEMENT_BYTES: usize = 1_048_576;

const ROW_SEPARATOR: &str = ",\n  ";

/// Counters for one table's data section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub rows: u64,
    pub statements: u64,
    pub bytes: u64,
}

/// Accumulates rendered rows and writes them as `INSERT` statements.
///
/// Each statement is `prefix + row1,\n  row2 ... ;`. A batch is flushed as
/// soon as appending the next row would bring it to the byte cap, and that
/// row starts the next batch. A single row larger than the cap is written
/// on its own.
pub struct BatchWriter<'w, W: Write + ?Sized> {
    sink: &'w mut W,
    prefix: String,
    max_bytes: usize,
    rows: Vec<String>,
    size: usize,
    stats: BatchStats,
}

impl<'w, W: Write + ?Sized> BatchWriter<'w, W> {
    /// `prefix` is the rendered insert header, e.g. "INSERT INTO `t` VALUES\n  ".
    pub fn new(sink: &'w mut W, prefix: impl Into<String>) -> Self {
        Self::with_limit(sink, prefix, MAX_STATEMENT_BYTES)
    }

    pub fn with_limit(sink: &'w mut W, prefix: impl Into<String>, max_bytes: usize) -> Self {
        let prefix = prefix.into();
        let size = prefix.len();
        Self {
            sink,
            prefix,
            max_bytes,
            rows: Vec::new(),
            size,
            stats: BatchStats::default(),
        }
    }

    /// Add one rendered row, flushing the pending batch first if needed.
    pub fn push(&mut self, row: String) -> std::io::Result<()> {
        if !self.rows.is_empty() {
            let grown = self.size + ROW_SEPARATOR.len() + row.len();
            if grown >= self.max_bytes {
                self.flush()?;
            }
        }

        if !self.rows.is_empty() {
            self.size += ROW_SEPARATOR.len();
        }
        self.size += row.len();
        self.rows.push(row);
        self.stats.rows += 1;
        Ok(())
    }

    /// Rows waiting in the current batch
    pub fn pending_rows(&self) -> usize {
        self.rows.len()
    }

    /// Write the trailing batch, if any, and return the counters.
    pub fn finish(mut self) -> std::io::Result<BatchStats> {
        if !self.rows.is_empty() {
            self.flush()?;
        }
        Ok(self.stats)
    }

    /// Drop the trailing batch without writing it.
    ///
    /// The returned counters cover written rows only.
    pub fn abandon(mut self) -> BatchStats {
        if !self.rows.is_empty() {
            tracing::debug!(rows = self.rows.len(), "discarding unflushed batch");
            self.stats.rows -= self.rows.len() as u64;
        }
        self.stats
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut statement = String::with_capacity(self.size + 2);
        statement.push_str(&self.prefix);
        statement.push_str(&self.rows.join(ROW_SEPARATOR));
        statement.push_str(";\n");
        self.sink.write_all(statement.as_bytes())?;

        self.stats.statements += 1;
        self.stats.bytes += statement.len() as u64;
        self.rows.clear();
        self.size = self.prefix.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PREFIX: &str = "INSERT INTO `t` VALUES\n  ";

    fn statements(out: &[u8]) -> Vec<String> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .split_inclusive(";\n")
            .map(str::to_string)
            .collect()
    }

    fn rows_of(statement: &str) -> Vec<String> {
        statement
            .strip_prefix(PREFIX)
            .unwrap()
            .strip_suffix(";\n")
            .unwrap()
            .split(ROW_SEPARATOR)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_single_batch() {
        let mut out = Vec::new();
        let mut writer = BatchWriter::new(&mut out, PREFIX);
        writer.push("(1,'a')".into()).unwrap();
        writer.push("(2,'b\\'c')".into()).unwrap();
        let stats = writer.finish().unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "INSERT INTO `t` VALUES\n  (1,'a'),\n  (2,'b\\'c');\n"
        );
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.statements, 1);
    }

    #[test]
    fn test_no_rows_no_statement() {
        let mut out = Vec::new();
        let stats = BatchWriter::new(&mut out, PREFIX).finish().unwrap();
        assert!(out.is_empty());
        assert_eq!(stats, BatchStats::default());
    }

    #[test]
    fn test_flushes_before_reaching_cap() {
        let cap = 100;
        let mut out = Vec::new();
        let mut writer = BatchWriter::with_limit(&mut out, PREFIX, cap);
        let input: Vec<String> = (0..40).map(|i| format!("({},'row')", i)).collect();
        for row in &input {
            writer.push(row.clone()).unwrap();
        }
        let stats = writer.finish().unwrap();

        let emitted = statements(&out);
        assert!(emitted.len() > 1);
        assert_eq!(stats.statements as usize, emitted.len());

        let max_row = input.iter().map(String::len).max().unwrap();
        let mut replayed = Vec::new();
        for statement in &emitted {
            // Body without the trailing ";\n" is what the cap applies to.
            let body_len = statement.len() - 2;
            assert!(body_len < cap + max_row);
            replayed.extend(rows_of(statement));
        }
        assert_eq!(replayed, input);
    }

    #[test]
    fn test_every_multi_row_batch_stays_under_cap() {
        let cap = 64;
        let mut out = Vec::new();
        let mut writer = BatchWriter::with_limit(&mut out, PREFIX, cap);
        for i in 0..25 {
            writer.push(format!("({})", i * 7919)).unwrap();
        }
        writer.finish().unwrap();

        for statement in statements(&out) {
            if rows_of(&statement).len() > 1 {
                assert!(statement.len() - 2 < cap);
            }
        }
    }

    #[test]
    fn test_oversized_row_written_alone() {
        let cap = 40;
        let mut out = Vec::new();
        let mut writer = BatchWriter::with_limit(&mut out, PREFIX, cap);
        let big = format!("('{}')", "x".repeat(80));
        writer.push("(1)".into()).unwrap();
        writer.push(big.clone()).unwrap();
        writer.push("(2)".into()).unwrap();
        writer.finish().unwrap();

        let emitted = statements(&out);
        assert_eq!(emitted.len(), 3);
        assert_eq!(rows_of(&emitted[0]), vec!["(1)"]);
        assert_eq!(rows_of(&emitted[1]), vec![big]);
        assert_eq!(rows_of(&emitted[2]), vec!["(2)"]);
    }

    #[test]
    fn test_abandon_discards_pending() {
        let mut out = Vec::new();
        let mut writer = BatchWriter::new(&mut out, PREFIX);
        writer.push("(1)".into()).unwrap();
        assert_eq!(writer.pending_rows(), 1);
        let stats = writer.abandon();
        assert_eq!(stats.rows, 0);
        assert_eq!(stats.statements, 0);
        assert!(out.is_empty());
    }
}
