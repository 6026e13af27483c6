//! MySQL/MariaDB client implementation for sqldump

mod client;
mod convert;

pub use client::MySqlClient;
pub use convert::{convert_row, mysql_value_to_value};
