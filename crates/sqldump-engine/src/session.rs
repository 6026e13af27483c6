//! Capture of server session state into the dump context

use sqldump_core::{DumpClient, Result};
use sqldump_templates::Context;

pub const SESSION_VARIABLES_SQL: &str =
    "SHOW VARIABLES WHERE Variable_name LIKE 'character\\_set\\_%' OR Variable_name LIKE 'collation\\_%'";

pub const VERSION_SQL: &str = "SELECT VERSION() AS version";

/// Identity of the dump written into its header
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub host: String,
    pub database: String,
}

/// Store `character_set_*` / `collation_*` variables and the server version
/// at the context root. Returns the number of variables captured.
pub async fn capture<C: DumpClient + ?Sized>(
    client: &mut C,
    ctx: &mut Context,
    info: &SessionInfo,
) -> Result<usize> {
    ctx.set("generator", format!("sqldump {}", env!("CARGO_PKG_VERSION")));
    ctx.set("host", info.host.as_str());
    ctx.set("database", info.database.as_str());

    let rows = client.query(SESSION_VARIABLES_SQL).await?;
    let mut captured = 0;
    for row in &rows {
        let (Some(name), Some(value)) = (row.text("Variable_name"), row.text("Value")) else {
            continue;
        };
        ctx.set(name.to_ascii_lowercase(), value);
        captured += 1;
    }

    match client.query(VERSION_SQL).await {
        Ok(rows) => {
            if let Some(version) = rows.first().and_then(|r| r.text("version")) {
                ctx.set("version", version);
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not read server version"),
    }

    tracing::debug!(variables = captured, "session state captured");
    Ok(captured)
}
