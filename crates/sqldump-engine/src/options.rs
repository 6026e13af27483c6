//! Dump options

use serde::Deserialize;
use std::time::Duration;

use crate::batch::MAX_STATEMENT_BYTES;

/// Options for a dump run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DumpOptions {
    /// Emit structure only
    pub no_data: bool,
    /// Dump stored procedures and functions
    pub routines: bool,
    /// Dump triggers
    pub triggers: bool,
    /// Tables and views to include (empty = all)
    pub tables: Vec<String>,
    /// Tables and views to leave out
    pub ignore_tables: Vec<String>,
    /// Write the completion timestamp in the trailer
    pub dump_date: bool,
    /// Dump data even when the catalog reports zero rows
    pub always_dump_data: bool,
    /// Byte cap for one `INSERT` statement
    pub max_statement_bytes: usize,
    /// Wait for each result page, in milliseconds
    pub page_timeout_ms: u64,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            no_data: false,
            routines: true,
            triggers: true,
            tables: Vec::new(),
            ignore_tables: Vec::new(),
            dump_date: true,
            always_dump_data: false,
            max_statement_bytes: MAX_STATEMENT_BYTES,
            page_timeout_ms: 500,
        }
    }
}

impl DumpOptions {
    pub fn schema_only() -> Self {
        Self {
            no_data: true,
            ..Default::default()
        }
    }

    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    pub fn without_date(mut self) -> Self {
        self.dump_date = false;
        self
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    /// Whether a table or view passes the include and exclude lists
    pub fn includes(&self, name: &str) -> bool {
        if self.ignore_tables.iter().any(|t| t == name) {
            return false;
        }
        self.tables.is_empty() || self.tables.iter().any(|t| t == name)
    }

    /// Whether a table's data section should be written
    pub fn wants_data(&self, declared_rows: u64) -> bool {
        !self.no_data && (declared_rows > 0 || self.always_dump_data)
    }
}
