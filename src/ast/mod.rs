//! Syntax tree for setup sheets
//!
//! A sheet is a list of lines. Settings lines (`units`, `machine`, `load`)
//! change the state that later job lines run under.

use crate::calculator::{Operation, OperationKind};
use crate::units::UnitSystem;

pub type Span = std::ops::Range<usize>;

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    /// Set only by a `units` line ahead of every job
    pub units: Option<UnitSystem>,
    pub statements: Vec<Statement>,
}

impl Sheet {
    pub fn jobs(&self) -> impl Iterator<Item = &JobLine> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Job(job) => Some(job),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Machine { name: String, span: Span },
    Load { pct: u8, span: Span },
    Job(JobLine),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobLine {
    pub operation: Operation,
    /// Run on the live tool rather than the spindle
    pub live: bool,
    pub auto_limit: bool,
    /// 1-based source line
    pub line: usize,
    pub span: Span,
}

impl JobLine {
    pub fn kind(&self) -> OperationKind {
        match self.operation {
            Operation::Turning(_) => OperationKind::Turning,
            Operation::Drilling(_) => OperationKind::Drilling,
            Operation::Milling(_) => OperationKind::Milling,
        }
    }
}
