//! Configuration: TOML file merged with command-line flags

use anyhow::{Context, bail};
use clap::Args;
use serde::Deserialize;
use sqldump_core::ConnectOptions;
use sqldump_engine::DumpOptions;
use std::path::Path;

/// Contents of a `--config` file.
///
/// ```toml
/// [connection]
/// host = "db.internal"
/// user = "backup"
/// database = "shop"
///
/// [dump]
/// ignore_tables = ["sessions"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectOptions,
    pub dump: DumpOptions,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.connection.database.is_empty() {
            bail!("no database given");
        }
        if self.connection.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.connection.query_timeout_ms == 0 || self.dump.page_timeout_ms == 0 {
            bail!("query_timeout_ms and page_timeout_ms must be at least 1");
        }
        if self.dump.max_statement_bytes == 0 {
            bail!("max_statement_bytes must be at least 1");
        }
        Ok(())
    }
}

/// Connection flags
#[derive(Debug, Default, Args)]
pub struct ConnectArgs {
    /// Server host
    #[arg(long, env = "SQLDUMP_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short = 'P', long, env = "SQLDUMP_PORT")]
    pub port: Option<u16>,

    /// User name
    #[arg(short, long, env = "SQLDUMP_USER")]
    pub user: Option<String>,

    /// Password
    #[arg(short, long, env = "SQLDUMP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Connection character set
    #[arg(long = "default-character-set")]
    pub charset: Option<String>,

    /// Largest packet accepted from the server, in bytes
    #[arg(long)]
    pub max_allowed_packet: Option<usize>,
}

impl ConnectArgs {
    pub fn apply(&self, options: &mut ConnectOptions) {
        if let Some(host) = &self.host {
            options.host = host.clone();
        }
        if let Some(port) = self.port {
            options.port = port;
        }
        if self.user.is_some() {
            options.user = self.user.clone();
        }
        if self.password.is_some() {
            options.password = self.password.clone();
        }
        if let Some(charset) = &self.charset {
            options.charset = charset.clone();
        }
        if let Some(size) = self.max_allowed_packet {
            options.max_packet_size = size;
        }
    }
}

/// Dump content flags
#[derive(Debug, Default, Args)]
pub struct DumpArgs {
    /// Write table structure only
    #[arg(short = 'd', long)]
    pub no_data: bool,

    /// Leave out stored procedures and functions
    #[arg(long)]
    pub skip_routines: bool,

    /// Leave out triggers
    #[arg(long)]
    pub skip_triggers: bool,

    /// Tables and views to dump (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Table or view to leave out (repeatable)
    #[arg(long = "ignore-table")]
    pub ignore_tables: Vec<String>,

    /// Omit the completion date so repeated dumps are identical
    #[arg(long)]
    pub skip_dump_date: bool,

    /// Dump data even for tables the catalog reports as empty
    #[arg(long)]
    pub always_dump_data: bool,
}

impl DumpArgs {
    pub fn apply(&self, options: &mut DumpOptions) {
        options.no_data |= self.no_data;
        if self.skip_routines {
            options.routines = false;
        }
        if self.skip_triggers {
            options.triggers = false;
        }
        if !self.tables.is_empty() {
            options.tables = self.tables.clone();
        }
        options.ignore_tables.extend(self.ignore_tables.iter().cloned());
        if self.skip_dump_date {
            options.dump_date = false;
        }
        options.always_dump_data |= self.always_dump_data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[connection]\nhost = \"db.internal\"\ndatabase = \"shop\"\n\n[dump]\nignore_tables = [\"sessions\"]\ndump_date = false"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.connection.host, "db.internal");
        assert_eq!(config.connection.database, "shop");
        assert_eq!(config.connection.port, 3306);
        assert_eq!(config.connection.charset, "utf8mb4");
        assert_eq!(config.dump.ignore_tables, vec!["sessions".to_string()]);
        assert!(!config.dump.dump_date);
        assert!(config.dump.routines);
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[connection\nhost = ").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("parsing config file"));
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = Config::default();
        config.connection.host = "from-file".into();
        config.dump.ignore_tables = vec!["a".into()];

        let connect = ConnectArgs {
            host: Some("from-flag".into()),
            port: Some(3307),
            ..Default::default()
        };
        let dump = DumpArgs {
            skip_triggers: true,
            ignore_tables: vec!["b".into()],
            ..Default::default()
        };
        connect.apply(&mut config.connection);
        dump.apply(&mut config.dump);

        assert_eq!(config.connection.host, "from-flag");
        assert_eq!(config.connection.port, 3307);
        assert_eq!(config.connection.user, None);
        assert!(!config.dump.triggers);
        assert!(config.dump.routines);
        assert_eq!(config.dump.ignore_tables, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_timeouts_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[connection]\ndatabase = \"shop\"\nquery_timeout_ms = 2500\n\n[dump]\npage_timeout_ms = 0"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.connection.query_timeout_ms, 2500);
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "query_timeout_ms and page_timeout_ms must be at least 1");
    }

    #[test]
    fn test_validate_requires_database() {
        let err = Config::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "no database given");
    }
}
