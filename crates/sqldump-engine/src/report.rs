//! Outcome of a dump run

use std::fmt;

use crate::batch::BatchStats;

/// Stages of a dump, in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Prologue,
    TempViews,
    BaseTables,
    Routines,
    Triggers,
    Views,
    Events,
    Epilogue,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::Prologue,
        Phase::TempViews,
        Phase::BaseTables,
        Phase::Routines,
        Phase::Triggers,
        Phase::Views,
        Phase::Events,
        Phase::Epilogue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Prologue => "prologue",
            Phase::TempViews => "temp_views",
            Phase::BaseTables => "base_tables",
            Phase::Routines => "routines",
            Phase::Triggers => "triggers",
            Phase::Views => "views",
            Phase::Events => "events",
            Phase::Epilogue => "epilogue",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    /// Every object of the phase was written
    Completed,
    /// Turned off by options
    Skipped,
    /// At least one query of the phase failed; output is partial
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub status: PhaseStatus,
    /// Objects written by the phase
    pub objects: usize,
}

/// A phase-local problem recorded while the dump carried on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub phase: Phase,
    /// Object being written, if any
    pub object: Option<String>,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            Some(object) => write!(f, "[{}] {}: {}", self.phase, object, self.message),
            None => write!(f, "[{}] {}", self.phase, self.message),
        }
    }
}

/// What a dump run produced and what it had to skip.
///
/// `errors` holds query and stream failures, `warnings` holds template
/// problems. A report with errors describes a dump that was written but is
/// missing content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpReport {
    pub phases: Vec<PhaseReport>,
    pub tables: usize,
    pub views: usize,
    pub routines: usize,
    pub triggers: usize,
    pub rows: u64,
    pub insert_statements: u64,
    pub bytes_written: u64,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl DumpReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub(crate) fn add_data(&mut self, stats: BatchStats) {
        self.rows += stats.rows;
        self.insert_statements += stats.statements;
    }
}

impl fmt::Display for DumpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tables, {} views, {} routines, {} triggers, {} rows in {} inserts, {} bytes",
            self.tables,
            self.views,
            self.routines,
            self.triggers,
            self.rows,
            self.insert_statements,
            self.bytes_written
        )?;
        if !self.errors.is_empty() {
            write!(f, ", {} errors", self.errors.len())?;
        }
        if !self.warnings.is_empty() {
            write!(f, ", {} warnings", self.warnings.len())?;
        }
        Ok(())
    }
}
