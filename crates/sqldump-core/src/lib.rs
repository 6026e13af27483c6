//! sqldump core - shared abstractions for the dump engine
//!
//! This crate provides the types every other sqldump crate depends on:
//!
//! - `DumpClient` - the abstract database capability the engine drives
//!   (single round-trip queries plus paged streaming reads)
//! - `ConnectOptions` - connection parameters handed to a driver
//! - `Value` and `Row` - raw column values as they arrive from the server
//! - `DumpError` - the error type shared across the workspace

mod client;
mod error;
mod types;

pub use client::*;
pub use error::*;
pub use types::*;
