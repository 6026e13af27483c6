//! MySQL client implementation

use async_trait::async_trait;
use mysql_async::{
    Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, Row as MySqlRow, prelude::*,
};
use sqldump_core::{ConnectOptions, DumpClient, DumpError, Page, Result, Row};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;

use crate::convert::convert_row;

/// Global Tokio runtime for MySQL operations.
///
/// mysql_async internally calls `tokio::spawn` for connection pooling and networking,
/// which requires a Tokio runtime context. Running every network task here keeps the
/// client usable from callers driven by a different executor.
fn get_mysql_runtime() -> &'static tokio::runtime::Runtime {
    static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("sqldump-mysql-runtime")
            .build()
            .expect("Failed to create Tokio runtime for MySQL client")
    })
}

enum StreamItem {
    Row(Row),
    Failed(String),
}

/// An in-flight streamed result.
///
/// A background task owns the connection for the lifetime of the result and
/// forwards rows through a bounded channel, so at most `page_size` rows are
/// buffered ahead of the consumer.
struct PendingResult {
    rx: mpsc::Receiver<StreamItem>,
    task: JoinHandle<()>,
    failure: Option<String>,
}

impl PendingResult {
    /// Up to `page_size` rows, waiting at most `timeout` for the first one.
    async fn read_page(&mut self, timeout: Duration, page_size: usize) -> Result<Page> {
        if let Some(message) = self.failure.take() {
            return Err(DumpError::StreamPage(message));
        }

        let mut rows = Vec::new();
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Err(_) => {
                return Err(DumpError::Timeout(format!(
                    "no row received within {} ms",
                    timeout.as_millis()
                )));
            }
            Ok(None) => return Ok(Page::done(rows)),
            Ok(Some(StreamItem::Failed(message))) => return Err(DumpError::StreamPage(message)),
            Ok(Some(StreamItem::Row(row))) => rows.push(row),
        }

        while rows.len() < page_size {
            match self.rx.try_recv() {
                Ok(StreamItem::Row(row)) => rows.push(row),
                Ok(StreamItem::Failed(message)) => {
                    // Hand out what arrived first; the failure surfaces on the next read.
                    self.failure = Some(message);
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(Page::done(rows)),
            }
        }

        Ok(Page::more(rows))
    }
}

/// MySQL client backed by a single-connection pool
pub struct MySqlClient {
    pool: Pool,
    database: String,
    compact: bool,
    page_size: usize,
    query_timeout: Duration,
    pending: Option<PendingResult>,
}

impl MySqlClient {
    /// Connect to a MySQL database
    pub async fn connect(options: &ConnectOptions) -> Result<Self> {
        tracing::info!(
            host = %options.host,
            port = %options.port,
            database = %options.database,
            "connecting to MySQL database"
        );

        if !is_valid_charset(&options.charset) {
            return Err(DumpError::Configuration(format!(
                "invalid character set name: {}",
                options.charset
            )));
        }

        let mut opts_builder = OptsBuilder::from_opts(Opts::default())
            .ip_or_hostname(options.host.as_str())
            .tcp_port(options.port)
            .max_allowed_packet(Some(options.max_packet_size))
            .init(vec![format!("SET NAMES {}", options.charset)]);

        if !options.database.is_empty() {
            opts_builder = opts_builder.db_name(Some(options.database.as_str()));
        }
        if let Some(u) = &options.user {
            opts_builder = opts_builder.user(Some(u.as_str()));
        }
        if let Some(p) = &options.password {
            opts_builder = opts_builder.pass(Some(p.as_str()));
        }

        // One connection for the whole dump: session variables set on connect
        // must stay in effect for every later statement.
        let constraints = PoolConstraints::new(1, 1).ok_or_else(|| {
            DumpError::Connection("Failed to configure MySQL pool constraints (min=1, max=1)".into())
        })?;

        let pool_opts = PoolOpts::default()
            .with_constraints(constraints)
            .with_reset_connection(false);
        opts_builder = opts_builder.pool_opts(pool_opts);

        let opts: Opts = opts_builder.into();

        let pool = get_mysql_runtime()
            .spawn(async move {
                let pool = Pool::new(opts);
                // Verify connectivity by acquiring and releasing a connection
                let _conn = pool.get_conn().await.map_err(|e| {
                    DumpError::Connection(format!("Failed to connect to MySQL: {}", e))
                })?;
                Ok::<Pool, DumpError>(pool)
            })
            .await
            .map_err(|e| DumpError::Connection(format!("MySQL connection task failed: {}", e)))??;

        tracing::info!(host = %options.host, port = %options.port, "MySQL connection established");
        Ok(Self {
            pool,
            database: options.database.clone(),
            compact: false,
            page_size: options.page_size.max(1),
            query_timeout: options.query_timeout(),
            pending: None,
        })
    }

    /// Database selected at connect time
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Abandon the in-flight streamed result, if any.
    ///
    /// The connection goes back to the pool, which drains what is left of the
    /// result before handing it out again.
    fn abandon_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!("abandoning unfinished streamed result");
            pending.task.abort();
        }
    }
}

#[async_trait]
impl DumpClient for MySqlClient {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.abandon_pending();

        let pool = self.pool.clone();
        let sql = sql.to_string();
        let compact = self.compact;
        let start_time = std::time::Instant::now();

        let task = get_mysql_runtime().spawn(async move {
            let mut conn = pool
                .get_conn()
                .await
                .map_err(|e| DumpError::Connection(format!("Failed to get MySQL connection: {}", e)))?;
            let mysql_rows: Vec<MySqlRow> = conn
                .query(&sql)
                .await
                .map_err(|e| DumpError::Query(format!("Failed to execute query: {}", e)))?;
            Ok::<Vec<Row>, DumpError>(
                mysql_rows
                    .iter()
                    .map(|row| convert_row(row, compact))
                    .collect(),
            )
        });
        let rows = await_with_timeout(task, self.query_timeout).await?;

        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = start_time.elapsed().as_millis() as u64,
            "query executed successfully"
        );
        Ok(rows)
    }

    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn send_query(&mut self, sql: &str) -> Result<usize> {
        self.abandon_pending();

        let pool = self.pool.clone();
        let owned_sql = sql.to_string();
        let compact = self.compact;
        let (tx, rx) = mpsc::channel(self.page_size);
        let (started_tx, started_rx) = oneshot::channel::<Result<()>>();

        let task = get_mysql_runtime().spawn(async move {
            let mut conn = match pool.get_conn().await {
                Ok(conn) => conn,
                Err(e) => {
                    let _ = started_tx.send(Err(DumpError::Connection(format!(
                        "Failed to get MySQL connection: {}",
                        e
                    ))));
                    return;
                }
            };

            let mut result = match conn.query_iter(owned_sql).await {
                Ok(result) => result,
                Err(e) => {
                    let _ = started_tx.send(Err(DumpError::Query(format!(
                        "Failed to execute query: {}",
                        e
                    ))));
                    return;
                }
            };
            let _ = started_tx.send(Ok(()));

            loop {
                match result.next().await {
                    Ok(Some(mysql_row)) => {
                        let row = convert_row(&mysql_row, compact);
                        if tx.send(StreamItem::Row(row)).await.is_err() {
                            // Receiver dropped: the consumer moved on.
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(StreamItem::Failed(e.to_string())).await;
                        break;
                    }
                }
            }
        });

        match started_rx.await {
            Ok(Ok(())) => {
                self.pending = Some(PendingResult {
                    rx,
                    task,
                    failure: None,
                });
                Ok(sql.len())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DumpError::Query("MySQL streaming task ended before starting".into())),
        }
    }

    async fn read_result(&mut self, timeout: Duration) -> Result<Page> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(Page::done(Vec::new()));
        };

        let page = pending.read_page(timeout, self.page_size).await;
        if !matches!(&page, Ok(page) if !page.is_done()) {
            if let Some(finished) = self.pending.take() {
                finished.task.abort();
            }
        }
        page
    }

    fn set_compact_arrays(&mut self, compact: bool) {
        self.compact = compact;
    }

    async fn close(&mut self) -> Result<()> {
        tracing::info!("closing MySQL connection pool");
        self.abandon_pending();
        let pool = self.pool.clone();
        get_mysql_runtime()
            .spawn(async move { pool.disconnect().await })
            .await
            .map_err(|e| DumpError::Connection(format!("MySQL close task failed: {}", e)))?
            .map_err(|e| DumpError::Connection(format!("Failed to close MySQL connection: {}", e)))?;
        Ok(())
    }
}

/// Wait for a spawned lookup, aborting it once `limit` has passed.
async fn await_with_timeout<T>(task: JoinHandle<Result<T>>, limit: Duration) -> Result<T> {
    let abort = task.abort_handle();
    match tokio::time::timeout(limit, task).await {
        Ok(joined) => {
            joined.map_err(|e| DumpError::Query(format!("MySQL query task failed: {}", e)))?
        }
        Err(_) => {
            abort.abort();
            Err(DumpError::Timeout(format!(
                "query did not finish within {} ms",
                limit.as_millis()
            )))
        }
    }
}

/// Character set names are interpolated into `SET NAMES`, so only plain
/// identifiers are accepted.
fn is_valid_charset(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
