//! Dump orchestration
//!
//! A dump is a fixed sequence of phases run over one connection:
//!
//! ```text
//! PROLOGUE -> TEMP_VIEWS -> BASE_TABLES -> ROUTINES -> TRIGGERS -> VIEWS -> EVENTS -> EPILOGUE
//! ```
//!
//! Views are first written as placeholder tables so anything declared later
//! can refer to them, and replaced with their real definition once tables,
//! routines and triggers exist. A failing query only cuts short the object
//! or phase it belongs to; the failure is logged, recorded in the
//! [`DumpReport`] and the dump moves on. Only a failing output sink aborts.

use serde::Serialize;
use sqldump_core::{DumpClient, DumpError, Result, Row};
use sqldump_templates::{Context, TemplateSet};
use std::io::Write;

use crate::batch::BatchWriter;
use crate::catalog::{
    CreationSettings, ROUTINES_SQL, RoutineDescriptor, TABLE_COLUMNS_SQL, TRIGGERS_SQL,
    TableDescriptor, TableGrouper, TriggerDescriptor, VIEW_COLUMNS_SQL, escape_identifier,
};
use crate::formatter::RowFormatter;
use crate::options::DumpOptions;
use crate::report::{DumpReport, Issue, Phase, PhaseReport, PhaseStatus};
use crate::rewrite::{ViewParts, rewrite_routine, rewrite_trigger, split_view};
use crate::row_stream::RowStream;
use crate::session::{self, SessionInfo};
use crate::templates::{self, dump_templates};

#[derive(Serialize)]
struct TableContext<'a> {
    name: &'a str,
    ident: String,
    rows: u64,
    create: &'a str,
    columns: String,
}

impl<'a> TableContext<'a> {
    fn new(table: &'a TableDescriptor) -> Self {
        Self {
            name: &table.name,
            ident: escape_identifier(&table.name),
            rows: table.declared_rows,
            create: table.create.as_deref().unwrap_or_default(),
            columns: table.placeholder_columns(),
        }
    }
}

#[derive(Serialize)]
struct RoutineContext<'a> {
    name: &'a str,
    ident: String,
    kind: &'static str,
    create: String,
    #[serde(flatten)]
    settings: CreationSettings,
}

#[derive(Serialize)]
struct TriggerContext<'a> {
    name: &'a str,
    ident: String,
    table: &'a str,
    create: String,
    #[serde(flatten)]
    settings: CreationSettings,
}

#[derive(Serialize)]
struct ViewContext<'a> {
    name: &'a str,
    ident: String,
    #[serde(flatten)]
    parts: ViewParts,
    #[serde(flatten)]
    settings: CreationSettings,
}

/// Counts bytes on their way to the real sink
struct CountingWriter<'w, W: Write + ?Sized> {
    inner: &'w mut W,
    bytes: u64,
}

impl<W: Write + ?Sized> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bytes += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Drives one dump over a borrowed client.
pub struct Dumper<'c, C: DumpClient + ?Sized> {
    client: &'c mut C,
    templates: TemplateSet,
    ctx: Context,
    options: DumpOptions,
    session: SessionInfo,
}

impl<'c, C: DumpClient + ?Sized> Dumper<'c, C> {
    pub fn new(client: &'c mut C, options: DumpOptions, session: SessionInfo) -> Self {
        Self {
            client,
            templates: dump_templates(),
            ctx: Context::new(),
            options,
            session,
        }
    }

    /// Replace the built-in template set
    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    /// Write the whole dump to `sink`.
    ///
    /// Returns `Err` only if the sink fails. Query and stream failures are
    /// collected in the report instead.
    pub async fn run<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<DumpReport> {
        let mut out = CountingWriter {
            inner: sink,
            bytes: 0,
        };
        let mut report = DumpReport::default();

        self.client.set_compact_arrays(false);
        if let Err(e) = session::capture(&mut *self.client, &mut self.ctx, &self.session).await {
            record(&mut report, Phase::Prologue, None, e);
        }

        for phase in Phase::ALL {
            tracing::info!(%phase, "starting phase");
            let errors_before = report.errors.len();
            let objects = match phase {
                Phase::Prologue => self.prologue(&mut out, &mut report)?,
                Phase::TempViews => self.temp_views(&mut out, &mut report).await?,
                Phase::BaseTables => self.base_tables(&mut out, &mut report).await?,
                Phase::Routines => self.routines(&mut out, &mut report).await?,
                Phase::Triggers => self.triggers(&mut out, &mut report).await?,
                Phase::Views => self.views(&mut out, &mut report).await?,
                Phase::Events => self.events(&mut out, &mut report)?,
                Phase::Epilogue => self.epilogue(&mut out, &mut report)?,
            };

            let status = match objects {
                None => PhaseStatus::Skipped,
                Some(_) if report.errors.len() > errors_before => PhaseStatus::Failed,
                Some(_) => PhaseStatus::Completed,
            };
            report.phases.push(PhaseReport {
                phase,
                status,
                objects: objects.unwrap_or(0),
            });
        }

        out.flush()?;
        report.bytes_written = out.bytes;
        tracing::info!(summary = %report, complete = report.is_complete(), "dump finished");
        Ok(report)
    }

    fn prologue(&mut self, out: &mut dyn Write, report: &mut DumpReport) -> Result<Option<usize>> {
        self.emit(out, report, Phase::Prologue, None, templates::PROLOGUE)?;
        Ok(Some(0))
    }

    async fn temp_views(
        &mut self,
        out: &mut dyn Write,
        report: &mut DumpReport,
    ) -> Result<Option<usize>> {
        let views = self.load_tables(VIEW_COLUMNS_SQL, Phase::TempViews, report).await;
        for view in &views {
            tracing::debug!(view = %view.name, columns = view.columns.len(), "writing placeholder table");
            self.set_object("table", &TableContext::new(view), Phase::TempViews, report);
            self.emit(out, report, Phase::TempViews, Some(&view.name), templates::TEMP_VIEW)?;
        }
        self.ctx.clear("table");
        Ok(Some(views.len()))
    }

    async fn base_tables(
        &mut self,
        out: &mut dyn Write,
        report: &mut DumpReport,
    ) -> Result<Option<usize>> {
        let tables = self.load_tables(TABLE_COLUMNS_SQL, Phase::BaseTables, report).await;
        let mut written = 0;

        for mut table in tables {
            let sql = format!("SHOW CREATE TABLE `{}`", escape_identifier(&table.name));
            let create = match self.show_create(&sql, "Create Table").await {
                Ok((create, _)) => create,
                Err(e) => {
                    record(report, Phase::BaseTables, Some(&table.name), e);
                    continue;
                }
            };
            table.create = Some(create);

            tracing::debug!(table = %table.name, declared_rows = table.declared_rows, "writing table");
            self.set_object("table", &TableContext::new(&table), Phase::BaseTables, report);
            self.emit(out, report, Phase::BaseTables, Some(&table.name), templates::TABLE_STRUCTURE)?;
            written += 1;
            report.tables += 1;

            if self.options.wants_data(table.declared_rows) {
                self.table_data(&table, out, report).await?;
            }
        }

        self.ctx.clear("table");
        Ok(Some(written))
    }

    /// Stream one table's rows into size-capped `INSERT` statements inside
    /// the lock and key-disable guards.
    async fn table_data(
        &mut self,
        table: &TableDescriptor,
        out: &mut dyn Write,
        report: &mut DumpReport,
    ) -> Result<()> {
        let phase = Phase::BaseTables;
        let Some(insert) = self.render(report, phase, Some(&table.name), templates::TABLE_INSERT)
        else {
            return Ok(());
        };
        let prefix = format!("{}\n  ", insert);
        let formatter = RowFormatter::new(table.data_types());
        let sql = format!("SELECT * FROM `{}`", escape_identifier(&table.name));
        let page_timeout = self.options.page_timeout();

        self.emit(out, report, phase, Some(&table.name), templates::TABLE_DATA_BEGIN)?;

        self.client.set_compact_arrays(true);
        let mut writer =
            BatchWriter::with_limit(&mut *out, prefix, self.options.max_statement_bytes);
        let mut exhausted = false;
        let outcome = {
            let mut stream = RowStream::open(&mut *self.client, &sql, page_timeout)
                .await
                .with_finalize(|| exhausted = true);
            while let Some(row) = stream.next().await {
                writer.push(formatter.render_row(&row))?;
            }
            stream.into_outcome()
        };
        self.client.set_compact_arrays(false);

        // Without the finalize signal the trailing batch may be short of
        // rows the server still had, so it is dropped.
        let stats = if exhausted {
            writer.finish()?
        } else {
            writer.abandon()
        };
        tracing::debug!(
            table = %table.name,
            rows = stats.rows,
            statements = stats.statements,
            "table data written"
        );
        report.add_data(stats);
        if let Some(e) = outcome.into_error() {
            record(report, phase, Some(&table.name), e);
        }

        self.emit(out, report, phase, Some(&table.name), templates::TABLE_DATA_END)?;
        Ok(())
    }

    async fn routines(
        &mut self,
        out: &mut dyn Write,
        report: &mut DumpReport,
    ) -> Result<Option<usize>> {
        if !self.options.routines {
            return Ok(None);
        }
        let phase = Phase::Routines;
        let (rows, error) = self.collect_rows(ROUTINES_SQL).await;
        if let Some(e) = error {
            record(report, phase, None, e);
        }
        let routines: Vec<RoutineDescriptor> =
            rows.iter().filter_map(RoutineDescriptor::from_row).collect();
        if routines.is_empty() {
            return Ok(Some(0));
        }

        self.emit(out, report, phase, None, templates::ROUTINES_HEADER)?;
        let mut written = 0;
        for routine in &routines {
            let (create, settings) = match self
                .show_create(&routine.show_create_sql(), routine.kind.create_column())
                .await
            {
                Ok(found) => found,
                Err(e) => {
                    record(report, phase, Some(&routine.name), e);
                    continue;
                }
            };
            let create = rewrite_routine(&create).unwrap_or_else(|| {
                tracing::warn!(routine = %routine.name, "unrecognized routine definition, writing it unchanged");
                create
            });

            tracing::debug!(routine = %routine.name, kind = routine.kind.as_str(), "writing routine");
            let ctx = RoutineContext {
                name: &routine.name,
                ident: escape_identifier(&routine.name),
                kind: routine.kind.as_str(),
                create,
                settings,
            };
            self.set_object("routine", &ctx, phase, report);
            self.emit(out, report, phase, Some(&routine.name), templates::ROUTINE)?;
            written += 1;
            report.routines += 1;
        }

        self.ctx.clear("routine");
        Ok(Some(written))
    }

    async fn triggers(
        &mut self,
        out: &mut dyn Write,
        report: &mut DumpReport,
    ) -> Result<Option<usize>> {
        if !self.options.triggers {
            return Ok(None);
        }
        let phase = Phase::Triggers;
        let (rows, error) = self.collect_rows(TRIGGERS_SQL).await;
        if let Some(e) = error {
            record(report, phase, None, e);
        }
        let triggers: Vec<TriggerDescriptor> = rows
            .iter()
            .filter_map(TriggerDescriptor::from_row)
            .filter(|t| self.options.includes(&t.table))
            .collect();
        if triggers.is_empty() {
            return Ok(Some(0));
        }

        self.emit(out, report, phase, None, templates::TRIGGERS_HEADER)?;
        let mut written = 0;
        for trigger in &triggers {
            let (create, settings) = match self
                .show_create(&trigger.show_create_sql(), "SQL Original Statement")
                .await
            {
                Ok(found) => found,
                Err(e) => {
                    record(report, phase, Some(&trigger.name), e);
                    continue;
                }
            };
            let create = rewrite_trigger(&create).unwrap_or_else(|| {
                tracing::warn!(trigger = %trigger.name, "unrecognized trigger definition, writing it unchanged");
                create
            });

            tracing::debug!(trigger = %trigger.name, table = %trigger.table, "writing trigger");
            let ctx = TriggerContext {
                name: &trigger.name,
                ident: escape_identifier(&trigger.name),
                table: &trigger.table,
                create,
                settings,
            };
            self.set_object("trigger", &ctx, phase, report);
            self.emit(out, report, phase, Some(&trigger.name), templates::TRIGGER)?;
            written += 1;
            report.triggers += 1;
        }

        self.ctx.clear("trigger");
        Ok(Some(written))
    }

    async fn views(&mut self, out: &mut dyn Write, report: &mut DumpReport) -> Result<Option<usize>> {
        let phase = Phase::Views;
        let views = self.load_tables(VIEW_COLUMNS_SQL, phase, report).await;
        let mut written = 0;

        for view in &views {
            let sql = format!("SHOW CREATE VIEW `{}`", escape_identifier(&view.name));
            let (create, settings) = match self.show_create(&sql, "Create View").await {
                Ok(found) => found,
                Err(e) => {
                    record(report, phase, Some(&view.name), e);
                    continue;
                }
            };
            let Some(parts) = split_view(&create) else {
                record(
                    report,
                    phase,
                    Some(&view.name),
                    DumpError::Query(format!("unrecognized view definition: {}", create)),
                );
                continue;
            };

            tracing::debug!(view = %view.name, "writing view");
            let ctx = ViewContext {
                name: &view.name,
                ident: escape_identifier(&view.name),
                parts,
                settings,
            };
            self.set_object("view", &ctx, phase, report);
            self.emit(out, report, phase, Some(&view.name), templates::VIEW)?;
            written += 1;
            report.views += 1;
        }

        self.ctx.clear("view");
        Ok(Some(written))
    }

    fn events(&mut self, out: &mut dyn Write, report: &mut DumpReport) -> Result<Option<usize>> {
        tracing::debug!("event definitions are not dumped");
        self.emit(out, report, Phase::Events, None, templates::EVENTS)?;
        Ok(Some(0))
    }

    fn epilogue(&mut self, out: &mut dyn Write, report: &mut DumpReport) -> Result<Option<usize>> {
        self.emit(out, report, Phase::Epilogue, None, templates::EPILOGUE)?;
        if self.options.dump_date {
            let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            self.ctx.set("dump_completed", now);
            self.emit(out, report, Phase::Epilogue, None, templates::DUMP_COMPLETED)?;
        } else {
            self.emit(out, report, Phase::Epilogue, None, templates::DUMP_COMPLETED_UNDATED)?;
        }
        Ok(Some(0))
    }

    /// Stream a keyed metadata query to the end.
    ///
    /// Rows are gathered before any per-object lookup runs: the connection
    /// carries one result at a time.
    async fn collect_rows(&mut self, sql: &str) -> (Vec<Row>, Option<DumpError>) {
        self.client.set_compact_arrays(false);
        let stream = RowStream::open(&mut *self.client, sql, self.options.page_timeout()).await;
        let (rows, outcome) = stream.collect().await;
        (rows, outcome.into_error())
    }

    /// Load and group table or view columns, applying the name filters.
    async fn load_tables(
        &mut self,
        sql: &str,
        phase: Phase,
        report: &mut DumpReport,
    ) -> Vec<TableDescriptor> {
        let (rows, error) = self.collect_rows(sql).await;
        let mut tables = TableGrouper::group(&rows);
        if let Some(e) = error {
            // The last group may be missing columns that never arrived.
            if let Some(partial) = tables.pop() {
                tracing::debug!(table = %partial.name, "dropping partially read table");
            }
            record(report, phase, None, e);
        }
        tables.retain(|t| self.options.includes(&t.name));
        tables
    }

    /// Run a `SHOW CREATE ...` lookup and return the statement text together
    /// with the session settings it reports.
    async fn show_create(&mut self, sql: &str, column: &str) -> Result<(String, CreationSettings)> {
        let rows = self.client.query(sql).await?;
        let row = rows
            .first()
            .ok_or_else(|| DumpError::Query(format!("no result for {}", sql)))?;
        let create = row
            .text(column)
            .ok_or_else(|| DumpError::Query(format!("column {:?} missing from {}", column, sql)))?;
        Ok((create, CreationSettings::from_row(row)))
    }

    fn set_object<T: Serialize>(&mut self, key: &str, value: &T, phase: Phase, report: &mut DumpReport) {
        if let Err(e) = self.ctx.replace(key, value) {
            warn(report, phase, None, format!("could not store {} context: {}", key, e));
        }
    }

    /// Render a template, recording misses and unresolved placeholders.
    fn render(
        &self,
        report: &mut DumpReport,
        phase: Phase,
        object: Option<&str>,
        name: &str,
    ) -> Option<String> {
        match self.templates.render(name, &self.ctx) {
            Ok(rendered) => {
                if !rendered.is_complete() {
                    warn(
                        report,
                        phase,
                        object,
                        format!(
                            "template {} left placeholders empty: {}",
                            name,
                            rendered.unresolved.join(", ")
                        ),
                    );
                }
                Some(rendered.text)
            }
            Err(e) => {
                warn(report, phase, object, DumpError::TemplateMiss(name.to_string()).to_string());
                tracing::debug!(error = %e, "template skipped");
                None
            }
        }
    }

    /// Render a template and write it as one newline-terminated block.
    fn emit(
        &self,
        out: &mut dyn Write,
        report: &mut DumpReport,
        phase: Phase,
        object: Option<&str>,
        name: &str,
    ) -> Result<()> {
        if let Some(text) = self.render(report, phase, object, name) {
            if !text.is_empty() {
                out.write_all(text.as_bytes())?;
                out.write_all(b"\n")?;
            }
        }
        Ok(())
    }
}

fn record(report: &mut DumpReport, phase: Phase, object: Option<&str>, error: DumpError) {
    tracing::warn!(%phase, object, error = %error, "dump step failed, continuing");
    report.errors.push(Issue {
        phase,
        object: object.map(str::to_string),
        message: error.to_string(),
    });
}

fn warn(report: &mut DumpReport, phase: Phase, object: Option<&str>, message: String) {
    tracing::warn!(%phase, object, "{}", message);
    report.warnings.push(Issue {
        phase,
        object: object.map(str::to_string),
        message,
    });
}
