//! sqldump engine - logical dump generation for MySQL-compatible databases
//!
//! The engine turns a [`DumpClient`](sqldump_core::DumpClient) into a
//! replayable SQL script:
//!
//! - [`formatter`] renders column values as SQL literals by declared type
//! - [`RowStream`] pulls a query result page by page
//! - [`BatchWriter`] packs rendered rows into size-capped `INSERT`s
//! - [`Dumper`] runs the phases and returns a [`DumpReport`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqldump_engine::{DumpOptions, Dumper, SessionInfo};
//!
//! let mut client = MySqlClient::connect(&connect).await?;
//! let session = SessionInfo { host: "localhost".into(), database: "shop".into() };
//! let mut stdout = std::io::stdout().lock();
//! let report = Dumper::new(&mut client, DumpOptions::default(), session)
//!     .run(&mut stdout)
//!     .await?;
//! if !report.is_complete() {
//!     eprintln!("dump is missing content: {report}");
//! }
//! ```

mod batch;
pub mod catalog;
mod dumper;
pub mod formatter;
mod options;
mod report;
pub mod rewrite;
mod row_stream;
mod session;
pub mod templates;

pub use batch::{BatchStats, BatchWriter, MAX_STATEMENT_BYTES};
pub use dumper::Dumper;
pub use formatter::{LiteralRule, RowFormatter};
pub use options::DumpOptions;
pub use report::{DumpReport, Issue, Phase, PhaseReport, PhaseStatus};
pub use row_stream::{DEFAULT_PAGE_TIMEOUT, RowStream, StreamOutcome};
pub use session::SessionInfo;
