//! Catalog queries and the descriptors built from their results

use serde::Serialize;
use sqldump_core::Row;

/// Columns of every base table, one row per column, sorted by table then
/// ordinal position. Names sort as bytes so tables differing only in case
/// never interleave.
pub const TABLE_COLUMNS_SQL: &str = "SELECT t.TABLE_NAME AS table_name, t.TABLE_ROWS AS table_rows, \
c.COLUMN_NAME AS column_name, c.ORDINAL_POSITION AS ordinal_position, c.DATA_TYPE AS data_type \
FROM information_schema.TABLES t \
JOIN information_schema.COLUMNS c ON c.TABLE_SCHEMA = t.TABLE_SCHEMA AND c.TABLE_NAME = t.TABLE_NAME \
WHERE t.TABLE_SCHEMA = DATABASE() AND t.TABLE_TYPE = 'BASE TABLE' \
ORDER BY BINARY t.TABLE_NAME, c.ORDINAL_POSITION";

/// Columns of every view, same shape as [`TABLE_COLUMNS_SQL`].
pub const VIEW_COLUMNS_SQL: &str = "SELECT c.TABLE_NAME AS table_name, 0 AS table_rows, \
c.COLUMN_NAME AS column_name, c.ORDINAL_POSITION AS ordinal_position, c.DATA_TYPE AS data_type \
FROM information_schema.COLUMNS c \
JOIN information_schema.VIEWS v ON v.TABLE_SCHEMA = c.TABLE_SCHEMA AND v.TABLE_NAME = c.TABLE_NAME \
WHERE c.TABLE_SCHEMA = DATABASE() \
ORDER BY BINARY c.TABLE_NAME, c.ORDINAL_POSITION";

pub const ROUTINES_SQL: &str = "SELECT ROUTINE_NAME AS routine_name, ROUTINE_TYPE AS routine_type \
FROM information_schema.ROUTINES \
WHERE ROUTINE_SCHEMA = DATABASE() \
ORDER BY ROUTINE_TYPE, ROUTINE_NAME";

pub const TRIGGERS_SQL: &str = "SELECT TRIGGER_NAME AS trigger_name, EVENT_OBJECT_TABLE AS table_name \
FROM information_schema.TRIGGERS \
WHERE TRIGGER_SCHEMA = DATABASE() \
ORDER BY EVENT_OBJECT_TABLE, ACTION_ORDER";

/// Escape an identifier for use inside backticks
pub fn escape_identifier(name: &str) -> String {
    name.replace('`', "``")
}

/// One column of a table or view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub ordinal: u32,
    pub name: String,
    pub data_type: String,
    /// Column line for a placeholder `CREATE TABLE`
    pub ddl: String,
}

impl ColumnDescriptor {
    pub fn new(ordinal: u32, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let name = name.into();
        let ddl = format!("  `{}` tinyint NOT NULL", escape_identifier(&name));
        Self {
            ordinal,
            name,
            data_type: data_type.into(),
            ddl,
        }
    }
}

/// A base table or view with its columns in ordinal order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    /// Row count as declared by the catalog (an estimate for InnoDB)
    pub declared_rows: u64,
    pub columns: Vec<ColumnDescriptor>,
    /// `SHOW CREATE` text once fetched
    pub create: Option<String>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, declared_rows: u64) -> Self {
        Self {
            name: name.into(),
            declared_rows,
            columns: Vec::new(),
            create: None,
        }
    }

    /// Column lines for a placeholder table, one per column
    pub fn placeholder_columns(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.ddl.as_str())
            .collect::<Vec<_>>()
            .join(",\n")
    }

    pub fn data_types(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.data_type.as_str())
    }
}

/// Groups a flat, sorted column stream into table descriptors.
///
/// A new table starts whenever the table name differs from the previous
/// row's. The stream must be sorted by table, then ordinal position.
#[derive(Debug, Default)]
pub struct TableGrouper {
    current: Option<TableDescriptor>,
    skipped: usize,
}

impl TableGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one metadata row; returns the previous table once it is complete.
    pub fn push(&mut self, row: &Row) -> Option<TableDescriptor> {
        let Some(table_name) = row.text("table_name") else {
            self.skipped += 1;
            return None;
        };
        let Some(column_name) = row.text("column_name") else {
            self.skipped += 1;
            return None;
        };
        let ordinal = row
            .get_by_name("ordinal_position")
            .and_then(|v| v.as_i64())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);
        let data_type = row.text("data_type").unwrap_or_default();

        let finished = match &self.current {
            Some(current) if current.name == table_name => None,
            _ => {
                let declared_rows = row
                    .get_by_name("table_rows")
                    .and_then(|v| v.as_i64())
                    .and_then(|v| u64::try_from(v).ok())
                    .unwrap_or(0);
                self.current
                    .replace(TableDescriptor::new(table_name, declared_rows))
            }
        };

        if let Some(current) = self.current.as_mut() {
            current
                .columns
                .push(ColumnDescriptor::new(ordinal, column_name, data_type));
        }
        finished
    }

    /// Return the last table, if any.
    pub fn finish(mut self) -> Option<TableDescriptor> {
        if self.skipped > 0 {
            tracing::warn!(rows = self.skipped, "skipped malformed column metadata rows");
        }
        self.current.take()
    }

    /// Group a whole batch of rows.
    pub fn group(rows: &[Row]) -> Vec<TableDescriptor> {
        let mut grouper = Self::new();
        let mut tables: Vec<TableDescriptor> = rows.iter().filter_map(|r| grouper.push(r)).collect();
        tables.extend(grouper.finish());
        tables
    }
}

/// Kind of stored routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoutineKind {
    Procedure,
    Function,
}

impl RoutineKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PROCEDURE" => Some(RoutineKind::Procedure),
            "FUNCTION" => Some(RoutineKind::Function),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
        }
    }

    /// Column holding the statement in `SHOW CREATE PROCEDURE|FUNCTION`
    pub fn create_column(self) -> &'static str {
        match self {
            RoutineKind::Procedure => "Create Procedure",
            RoutineKind::Function => "Create Function",
        }
    }
}

/// A stored procedure or function awaiting its `SHOW CREATE` text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineDescriptor {
    pub name: String,
    pub kind: RoutineKind,
}

impl RoutineDescriptor {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            name: row.text("routine_name")?,
            kind: RoutineKind::parse(&row.text("routine_type")?)?,
        })
    }

    pub fn show_create_sql(&self) -> String {
        format!(
            "SHOW CREATE {} `{}`",
            self.kind.as_str(),
            escape_identifier(&self.name)
        )
    }
}

/// A trigger awaiting its `SHOW CREATE TRIGGER` text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDescriptor {
    pub name: String,
    pub table: String,
}

impl TriggerDescriptor {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            name: row.text("trigger_name")?,
            table: row.text("table_name").unwrap_or_default(),
        })
    }

    pub fn show_create_sql(&self) -> String {
        format!("SHOW CREATE TRIGGER `{}`", escape_identifier(&self.name))
    }
}

/// Session settings a routine, trigger or view was created under, as
/// reported by its `SHOW CREATE` row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreationSettings {
    pub sql_mode: String,
    pub character_set_client: String,
    pub collation_connection: String,
}

impl CreationSettings {
    pub fn from_row(row: &Row) -> Self {
        Self {
            sql_mode: row.text("sql_mode").unwrap_or_default(),
            character_set_client: row.text("character_set_client").unwrap_or_default(),
            collation_connection: row.text("collation_connection").unwrap_or_default(),
        }
    }
}
