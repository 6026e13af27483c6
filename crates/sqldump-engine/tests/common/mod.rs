//! Common test utilities: a scripted in-memory client

#![allow(dead_code)]

use async_trait::async_trait;
use sqldump_core::{DumpClient, DumpError, Page, Result, Row, Value};
use sqldump_engine::catalog::{ROUTINES_SQL, TABLE_COLUMNS_SQL, TRIGGERS_SQL, VIEW_COLUMNS_SQL};
use sqldump_engine::{DumpOptions, DumpReport, Dumper, SessionInfo};
use std::collections::VecDeque;
use std::time::Duration;

fn keyed(columns: &[&str], values: Vec<Value>) -> Row {
    Row::new(columns.iter().map(|c| c.to_string()).collect(), values)
}

struct OpenStream {
    rows: VecDeque<Row>,
    delivered: usize,
    fail_after: Option<usize>,
    stalled: bool,
}

/// Mock client that answers catalog queries from a declared schema.
///
/// Streamed results are handed out `page_size` rows at a time. Queries whose
/// text contains a registered failure pattern error out; streams with a
/// truncation pattern fail after the given number of rows.
pub struct ScriptedClient {
    pub page_size: usize,
    table_columns: Vec<Row>,
    view_columns: Vec<Row>,
    routines: Vec<Row>,
    triggers: Vec<Row>,
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    truncations: Vec<(String, usize)>,
    stalls: Vec<String>,
    compact: bool,
    stream: Option<OpenStream>,
    /// Every statement received, in order
    pub query_log: Vec<String>,
    /// Streamed statements with the compact flag in force when they were sent
    pub send_log: Vec<(String, bool)>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        let variables = [
            ("character_set_client", "utf8mb4"),
            ("character_set_results", "utf8mb4"),
            ("collation_connection", "utf8mb4_general_ci"),
        ]
        .iter()
        .map(|(name, value)| {
            keyed(
                &["Variable_name", "Value"],
                vec![Value::from(*name), Value::from(*value)],
            )
        })
        .collect();

        Self {
            page_size: 2,
            table_columns: Vec::new(),
            view_columns: Vec::new(),
            routines: Vec::new(),
            triggers: Vec::new(),
            responses: vec![
                ("SHOW VARIABLES".to_string(), variables),
                (
                    "SELECT VERSION()".to_string(),
                    vec![keyed(&["version"], vec![Value::from("8.0.36")])],
                ),
            ],
            failures: Vec::new(),
            truncations: Vec::new(),
            stalls: Vec::new(),
            compact: false,
            stream: None,
            query_log: Vec::new(),
            send_log: Vec::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Declare a base table with its columns, `SHOW CREATE` text and rows.
    pub fn with_table(
        mut self,
        name: &str,
        declared_rows: u64,
        columns: &[(&str, &str)],
        create: &str,
        data: Vec<Vec<Value>>,
    ) -> Self {
        for (idx, (column, data_type)) in columns.iter().enumerate() {
            self.table_columns.push(column_row(name, declared_rows, column, idx, data_type));
        }
        self.responses.push((
            format!("SHOW CREATE TABLE `{}`", name),
            vec![keyed(
                &["Table", "Create Table"],
                vec![Value::from(name), Value::from(create)],
            )],
        ));
        let names: Vec<&str> = columns.iter().map(|(c, _)| *c).collect();
        self.responses.push((
            format!("SELECT * FROM `{}`", name),
            data.into_iter().map(|values| keyed(&names, values)).collect(),
        ));
        self
    }

    pub fn with_view(mut self, name: &str, columns: &[(&str, &str)], create: &str) -> Self {
        for (idx, (column, data_type)) in columns.iter().enumerate() {
            self.view_columns.push(column_row(name, 0, column, idx, data_type));
        }
        self.responses.push((
            format!("SHOW CREATE VIEW `{}`", name),
            vec![keyed(
                &[
                    "View",
                    "Create View",
                    "character_set_client",
                    "collation_connection",
                ],
                vec![
                    Value::from(name),
                    Value::from(create),
                    Value::from("utf8mb4"),
                    Value::from("utf8mb4_general_ci"),
                ],
            )],
        ));
        self
    }

    /// `kind` is `PROCEDURE` or `FUNCTION`
    pub fn with_routine(mut self, name: &str, kind: &str, create: &str) -> Self {
        self.routines.push(keyed(
            &["routine_name", "routine_type"],
            vec![Value::from(name), Value::from(kind)],
        ));
        let create_column = if kind == "FUNCTION" {
            "Create Function"
        } else {
            "Create Procedure"
        };
        self.responses.push((
            format!("SHOW CREATE {} `{}`", kind, name),
            vec![keyed(
                &[
                    "Procedure",
                    "sql_mode",
                    create_column,
                    "character_set_client",
                    "collation_connection",
                    "Database Collation",
                ],
                vec![
                    Value::from(name),
                    Value::from("STRICT_TRANS_TABLES"),
                    Value::from(create),
                    Value::from("utf8mb4"),
                    Value::from("utf8mb4_general_ci"),
                    Value::from("utf8mb4_general_ci"),
                ],
            )],
        ));
        self
    }

    pub fn with_trigger(mut self, name: &str, table: &str, create: &str) -> Self {
        self.triggers.push(keyed(
            &["trigger_name", "table_name"],
            vec![Value::from(name), Value::from(table)],
        ));
        self.responses.push((
            format!("SHOW CREATE TRIGGER `{}`", name),
            vec![keyed(
                &[
                    "Trigger",
                    "sql_mode",
                    "SQL Original Statement",
                    "character_set_client",
                    "collation_connection",
                    "Database Collation",
                ],
                vec![
                    Value::from(name),
                    Value::from(""),
                    Value::from(create),
                    Value::from("utf8mb4"),
                    Value::from("utf8mb4_general_ci"),
                    Value::from("utf8mb4_general_ci"),
                ],
            )],
        ));
        self
    }

    /// Fail every statement containing `pattern`
    pub fn failing(mut self, pattern: &str) -> Self {
        self.failures.push(pattern.to_string());
        self
    }

    /// Fail streams containing `pattern` after `rows` rows
    pub fn truncating(mut self, pattern: &str, rows: usize) -> Self {
        self.truncations.push((pattern.to_string(), rows));
        self
    }

    /// Streams containing `pattern` start but never deliver a page in time
    pub fn stalling(mut self, pattern: &str) -> Self {
        self.stalls.push(pattern.to_string());
        self
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        match self.failures.iter().find(|p| sql.contains(p.as_str())) {
            Some(pattern) => Err(DumpError::Query(format!("scripted failure on {}", pattern))),
            None => Ok(()),
        }
    }

    fn rows_for(&self, sql: &str) -> Vec<Row> {
        let mut rows = if sql == TABLE_COLUMNS_SQL {
            self.table_columns.clone()
        } else if sql == VIEW_COLUMNS_SQL {
            self.view_columns.clone()
        } else if sql == ROUTINES_SQL {
            self.routines.clone()
        } else if sql == TRIGGERS_SQL {
            self.triggers.clone()
        } else {
            self.responses
                .iter()
                .find(|(pattern, _)| sql.contains(pattern.as_str()))
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default()
        };
        if sql == TABLE_COLUMNS_SQL || sql == VIEW_COLUMNS_SQL {
            rows.sort_by_key(|row| row.text("table_name"));
        }
        rows
    }

    fn shape(&self, row: Row) -> Row {
        if self.compact {
            Row::compact(row.values)
        } else {
            row
        }
    }
}

fn column_row(table: &str, declared_rows: u64, column: &str, idx: usize, data_type: &str) -> Row {
    keyed(
        &[
            "table_name",
            "table_rows",
            "column_name",
            "ordinal_position",
            "data_type",
        ],
        vec![
            Value::from(table),
            Value::from(declared_rows.to_string()),
            Value::from(column),
            Value::Int64(idx as i64 + 1),
            Value::from(data_type),
        ],
    )
}

#[async_trait]
impl DumpClient for ScriptedClient {
    fn driver_name(&self) -> &str {
        "scripted"
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.stream = None;
        self.query_log.push(sql.to_string());
        self.check_failure(sql)?;
        let rows = self.rows_for(sql);
        Ok(rows.into_iter().map(|r| self.shape(r)).collect())
    }

    async fn send_query(&mut self, sql: &str) -> Result<usize> {
        self.stream = None;
        self.query_log.push(sql.to_string());
        self.send_log.push((sql.to_string(), self.compact));
        self.check_failure(sql)?;
        let fail_after = self
            .truncations
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| *rows);
        let stalled = self.stalls.iter().any(|p| sql.contains(p.as_str()));
        self.stream = Some(OpenStream {
            rows: self.rows_for(sql).into(),
            delivered: 0,
            fail_after,
            stalled,
        });
        Ok(sql.len())
    }

    async fn read_result(&mut self, timeout: Duration) -> Result<Page> {
        let page_size = self.page_size;
        let compact = self.compact;
        let Some(stream) = self.stream.as_mut() else {
            return Err(DumpError::StreamPage("no query in flight".into()));
        };
        if stream.stalled {
            self.stream = None;
            return Err(DumpError::Timeout(format!(
                "no row received within {} ms",
                timeout.as_millis()
            )));
        }

        let mut take = page_size.min(stream.rows.len());
        if let Some(limit) = stream.fail_after {
            if stream.delivered >= limit || stream.rows.is_empty() {
                self.stream = None;
                return Err(DumpError::StreamPage("connection reset".into()));
            }
            take = take.min(limit - stream.delivered);
        }

        let rows: Vec<Row> = stream
            .rows
            .drain(..take)
            .map(|row| if compact { Row::compact(row.values) } else { row })
            .collect();
        stream.delivered += rows.len();

        if stream.rows.is_empty() && stream.fail_after.is_none() {
            self.stream = None;
            Ok(Page::done(rows))
        } else {
            Ok(Page::more(rows))
        }
    }

    fn set_compact_arrays(&mut self, compact: bool) {
        self.compact = compact;
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn session() -> SessionInfo {
    SessionInfo {
        host: "localhost".into(),
        database: "shop".into(),
    }
}

/// Run a dump and return its text with the report
pub async fn dump(client: &mut ScriptedClient, options: DumpOptions) -> (String, DumpReport) {
    let mut out = Vec::new();
    let report = Dumper::new(client, options, session())
        .run(&mut out)
        .await
        .expect("in-memory sink never fails");
    (String::from_utf8(out).expect("dump is UTF-8"), report)
}

/// The one-table schema used across tests: `t(id int, name varchar)`
pub fn single_table() -> ScriptedClient {
    ScriptedClient::new().with_table(
        "t",
        2,
        &[("id", "int"), ("name", "varchar")],
        "CREATE TABLE `t` (\n  `id` int NOT NULL,\n  `name` varchar(20) DEFAULT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB",
        vec![
            vec![Value::from("1"), Value::from("a")],
            vec![Value::from("2"), Value::from("b'c")],
        ],
    )
}
