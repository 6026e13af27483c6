//! Pull-based row stream over a paged query result

use sqldump_core::{DumpClient, DumpError, Row};
use std::collections::VecDeque;
use std::time::Duration;

/// Default wait for each result page
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_millis(500);

/// How a stream ended
#[derive(Debug)]
pub enum StreamOutcome {
    /// Still yielding rows
    Open,
    /// Every page was read
    Exhausted,
    /// The query never started
    NotStarted(DumpError),
    /// A page failed after the stream had started
    Truncated(DumpError),
}

impl StreamOutcome {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, StreamOutcome::Exhausted)
    }

    /// Take the error out of a failed stream
    pub fn into_error(self) -> Option<DumpError> {
        match self {
            StreamOutcome::NotStarted(e) | StreamOutcome::Truncated(e) => Some(e),
            StreamOutcome::Open | StreamOutcome::Exhausted => None,
        }
    }
}

type Finalizer<'a> = Box<dyn FnOnce() + Send + 'a>;

/// Lazy, single-use sequence of rows for one query.
///
/// The query is sent once when the stream is opened; pages are requested
/// only after every row of the previous page has been handed out, so at most
/// one page is held in memory. A page that fails or does not arrive within
/// the page timeout ends the stream as [`StreamOutcome::Truncated`].
pub struct RowStream<'a, C: DumpClient + ?Sized> {
    client: &'a mut C,
    buffered: VecDeque<Row>,
    outcome: StreamOutcome,
    page_timeout: Duration,
    finalize: Option<Finalizer<'a>>,
    rows_yielded: u64,
    pages_read: u64,
}

impl<'a, C: DumpClient + ?Sized> RowStream<'a, C> {
    /// Send `sql` and return a stream over its rows.
    ///
    /// A query that fails to start yields an empty stream; the error is kept
    /// in [`RowStream::outcome`].
    pub async fn open(client: &'a mut C, sql: &str, page_timeout: Duration) -> Self {
        let outcome = match client.send_query(sql).await {
            Ok(bytes) => {
                tracing::trace!(bytes, "streamed query sent");
                StreamOutcome::Open
            }
            Err(e) => {
                tracing::warn!(error = %e, "streamed query failed to start");
                StreamOutcome::NotStarted(e)
            }
        };

        Self {
            client,
            buffered: VecDeque::new(),
            outcome,
            page_timeout,
            finalize: None,
            rows_yielded: 0,
            pages_read: 0,
        }
    }

    /// Register a hook run exactly once after the last row of the last page.
    ///
    /// The hook does not run if the stream fails.
    pub fn with_finalize(mut self, finalize: impl FnOnce() + Send + 'a) -> Self {
        self.finalize = Some(Box::new(finalize));
        self
    }

    /// Next row, or `None` once the stream has ended for any reason.
    pub async fn next(&mut self) -> Option<Row> {
        loop {
            if let Some(row) = self.buffered.pop_front() {
                self.rows_yielded += 1;
                return Some(row);
            }

            match self.outcome {
                StreamOutcome::Open => {}
                StreamOutcome::Exhausted => {
                    if let Some(finalize) = self.finalize.take() {
                        finalize();
                    }
                    return None;
                }
                StreamOutcome::NotStarted(_) | StreamOutcome::Truncated(_) => return None,
            }

            match self.client.read_result(self.page_timeout).await {
                Ok(page) => {
                    if !page.rows.is_empty() {
                        self.pages_read += 1;
                    }
                    let done = page.is_done();
                    self.buffered.extend(page.rows);
                    if done {
                        self.outcome = StreamOutcome::Exhausted;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        rows = self.rows_yielded,
                        "result stream truncated"
                    );
                    self.outcome = StreamOutcome::Truncated(e);
                }
            }
        }
    }

    /// Drain the remaining rows into a vector.
    pub async fn collect(mut self) -> (Vec<Row>, StreamOutcome) {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            rows.push(row);
        }
        (rows, self.outcome)
    }

    pub fn outcome(&self) -> &StreamOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> StreamOutcome {
        self.outcome
    }

    pub fn rows_yielded(&self) -> u64 {
        self.rows_yielded
    }

    /// Number of non-empty pages received so far
    pub fn pages_read(&self) -> u64 {
        self.pages_read
    }
}
