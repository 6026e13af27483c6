//! Client capability consumed by the dump engine

use crate::{Result, Row};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Default MySQL port
pub const DEFAULT_PORT: u16 = 3306;

/// Default largest packet the client accepts (16 MiB)
pub const DEFAULT_MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;

/// Default number of rows handed out per result page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Default limit on a single non-streamed lookup, in milliseconds
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 10_000;

/// Connection parameters for a dump session
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Connection character set, applied with `SET NAMES` on connect
    pub charset: String,
    pub max_packet_size: usize,
    /// Upper bound on rows returned by one `read_result` call
    pub page_size: usize,
    /// Limit on each `query` round trip
    pub query_timeout_ms: u64,
}

impl ConnectOptions {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            database: String::new(),
            user: None,
            password: None,
            charset: "utf8mb4".to_string(),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
        }
    }
}

/// Whether a streamed result has more pages to come
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// More rows may follow; call `read_result` again
    More,
    /// The result set is exhausted
    Done,
}

/// One page of a streamed result
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    pub status: PageStatus,
}

impl Page {
    pub fn more(rows: Vec<Row>) -> Self {
        Self {
            rows,
            status: PageStatus::More,
        }
    }

    pub fn done(rows: Vec<Row>) -> Self {
        Self {
            rows,
            status: PageStatus::Done,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == PageStatus::Done
    }
}

/// A single database connection as seen by the dump engine.
///
/// Two query paths exist: `query` for small single round-trip lookups
/// (`SHOW CREATE ...`, scalar reads) and `send_query` + `read_result` for
/// results too large to materialize. Only one streamed result may be open at
/// a time; starting another query abandons it.
#[async_trait]
pub trait DumpClient: Send {
    /// Get the driver name (e.g., "mysql")
    fn driver_name(&self) -> &str;

    /// Run a statement and return its first result set in full.
    ///
    /// Fails with `DumpError::Timeout` if the round trip takes longer than
    /// the connection's lookup limit.
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Start a streamed query. Returns the number of bytes sent.
    async fn send_query(&mut self, sql: &str) -> Result<usize>;

    /// Read the next page of the streamed result, waiting at most `timeout`
    /// for the first row.
    ///
    /// If no row arrives in time the stream is abandoned and the call fails
    /// with `DumpError::Timeout`.
    async fn read_result(&mut self, timeout: Duration) -> Result<Page>;

    /// Choose between flat value rows (`true`) and rows keyed by column name.
    fn set_compact_arrays(&mut self, compact: bool);

    /// Close the connection
    async fn close(&mut self) -> Result<()>;
}
