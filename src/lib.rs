//! chipload - feeds & speeds for lathes and mills
//!
//! Resolves the missing half of the speed pair (cutting speed ↔ RPM) and the
//! feed pair (feed per rev or chip load ↔ feed per minute), clamps to the
//! machine's RPM limit, then checks the cut against material/insert ranges
//! and the machine's power budget. Findings come back as advisories; the
//! calculator never refuses a cut because it looks aggressive.

pub mod advisor;
pub mod ast;
pub mod calculator;
pub mod config;
pub mod error;
pub mod formulas;
pub mod lexer;
pub mod parser;
pub mod power;
pub mod presets;
pub mod resolve;
pub mod session;
pub mod sheet;
pub mod units;

#[cfg(feature = "web")]
pub mod server;

pub use calculator::{Calculator, Job, JobContext, Operation, OperationKind, Report};
pub use error::{CalcError, Missing};
pub use presets::PresetLibrary;
pub use units::UnitSystem;
