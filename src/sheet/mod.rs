//! Batch runs of setup sheets

use serde::Serialize;
use tracing::{debug, info};

use crate::ast::{Sheet, Statement};
use crate::calculator::{Calculator, Job, JobContext, OperationKind, Report};
use crate::error::CalcError;
use crate::presets::{Drive, PresetLibrary};
use crate::session::EchoCache;
use crate::units::UnitSystem;

const SHEET_SESSION: &str = "sheet";

/// Outcome of one job line. A failing line does not stop the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetEntry {
    pub line: usize,
    pub operation: OperationKind,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Report(Report),
    Error(CalcError),
}

impl SheetEntry {
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}

/// Run every job in `sheet`.
///
/// `defaults` supplies the machine, load and auto-limit used until the sheet
/// overrides them. A `load` line applies to every later job and is also
/// remembered for the current machine, so switching back to that machine
/// restores it.
pub fn run(
    sheet: &Sheet,
    presets: &PresetLibrary,
    units: UnitSystem,
    defaults: &JobContext,
) -> Vec<SheetEntry> {
    let units = sheet.units.unwrap_or(units);
    let calc = Calculator::new(presets, units);
    let mut loads = EchoCache::new();
    let mut machine = defaults.machine.clone();
    let mut load = defaults.max_load_pct;
    let mut entries = Vec::new();

    for statement in &sheet.statements {
        match statement {
            Statement::Machine { name, .. } => {
                debug!(machine = %name, "sheet switches machine");
                machine = Some(name.clone());
            }
            Statement::Load { pct, .. } => {
                let pct = match machine.as_deref() {
                    Some(name) => loads.set_max_load(SHEET_SESSION, name, *pct),
                    None => *pct,
                };
                load = Some(pct);
            }
            Statement::Job(line) => {
                let max_load_pct = machine
                    .as_deref()
                    .and_then(|name| loads.max_load(SHEET_SESSION, name))
                    .or(load);
                let ctx = JobContext {
                    machine: machine.clone(),
                    drive: if line.live { Drive::LiveTool } else { Drive::Spindle },
                    max_load_pct,
                    auto_limit: line.auto_limit || defaults.auto_limit,
                };
                let job = Job::new(line.operation.clone(), ctx);
                let outcome = match calc.run(&job) {
                    Ok(report) => Outcome::Report(report),
                    Err(e) => Outcome::Error(e),
                };
                entries.push(SheetEntry {
                    line: line.line,
                    operation: line.kind(),
                    outcome,
                });
            }
        }
    }

    info!(
        jobs = entries.len(),
        failed = entries.iter().filter(|e| e.is_error()).count(),
        "sheet complete"
    );
    entries
}
