//! sqldump - logical dump of a MySQL-compatible database
//!
//! Exit status: 0 for a complete dump, 2 when the dump was written but some
//! objects or rows are missing, 1 when nothing could be dumped.

mod config;
mod logging;

use anyhow::Context;
use clap::Parser;
use sqldump_core::DumpClient;
use sqldump_driver_mysql::MySqlClient;
use sqldump_engine::{DumpReport, Dumper, SessionInfo};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use config::{Config, ConnectArgs, DumpArgs};
use logging::LoggingConfig;

#[derive(Parser)]
#[command(name = "sqldump")]
#[command(about = "Write a replayable SQL dump of a MySQL-compatible database")]
#[command(version)]
struct Cli {
    /// Database to dump
    database: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "SQLDUMP_CONFIG")]
    config: Option<PathBuf>,

    /// Write the dump to this file instead of stdout
    #[arg(short = 'r', long)]
    result_file: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    connect: ConnectArgs,

    #[command(flatten)]
    dump: DumpArgs,
}

impl Cli {
    fn resolve(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(database) = &self.database {
            config.connection.database = database.clone();
        }
        self.connect.apply(&mut config.connection);
        self.dump.apply(&mut config.dump);
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(LoggingConfig::for_verbosity(cli.verbose)) {
        eprintln!("sqldump: logging disabled: {e:#}");
    }

    match run(&cli).await {
        Ok(report) if report.is_complete() => ExitCode::SUCCESS,
        Ok(report) => {
            for issue in &report.errors {
                eprintln!("sqldump: {issue}");
            }
            eprintln!("sqldump: dump is incomplete ({report})");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("sqldump: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<DumpReport> {
    let config = cli.resolve()?;

    let mut client = MySqlClient::connect(&config.connection)
        .await
        .with_context(|| format!("connecting to {}:{}", config.connection.host, config.connection.port))?;

    let mut sink: Box<dyn Write> = match &cli.result_file {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let session = SessionInfo {
        host: config.connection.host.clone(),
        database: config.connection.database.clone(),
    };
    let report = Dumper::new(&mut client, config.dump, session)
        .run(&mut *sink)
        .await
        .context("writing dump")?;
    sink.flush().context("writing dump")?;

    if let Err(e) = client.close().await {
        tracing::warn!(error = %e, "closing connection failed");
    }
    tracing::info!(%report, "dump written");
    Ok(report)
}
