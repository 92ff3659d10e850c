//! Session memory - last inputs per operation and per-machine load limits
//!
//! Nothing here is persisted. A session id is whatever string the caller
//! uses to tell users apart (the web API takes it from a header, the sheet
//! runner uses one id per file). The cache holds a bounded number of
//! sessions and drops the least recently written one first.

use std::collections::{HashMap, VecDeque};

use crate::calculator::{Job, OperationKind};
use crate::power::clamp_load_pct;

pub const ANONYMOUS: &str = "anonymous";

/// Sessions kept before the least recently written one is dropped
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug, Default)]
struct SessionMemory {
    last: HashMap<OperationKind, Job>,
    max_load: HashMap<String, u8>,
}

#[derive(Debug)]
pub struct EchoCache {
    sessions: HashMap<String, SessionMemory>,
    /// Session ids, least recently written first
    order: VecDeque<String>,
    capacity: usize,
}

impl Default for EchoCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl EchoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` sessions (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Remember `job` as the last input of its operation kind
    pub fn remember(&mut self, session: &str, job: &Job) {
        self.touch(session).last.insert(job.kind(), job.clone());
    }

    pub fn last(&self, session: &str, kind: OperationKind) -> Option<&Job> {
        self.sessions.get(session)?.last.get(&kind)
    }

    /// Store the max load for a machine, returning the clamped value
    pub fn set_max_load(&mut self, session: &str, machine: &str, pct: u8) -> u8 {
        let pct = clamp_load_pct(pct);
        self.touch(session).max_load.insert(machine_key(machine), pct);
        pct
    }

    /// Max load last set for `machine` in this session
    pub fn max_load(&self, session: &str, machine: &str) -> Option<u8> {
        self.sessions
            .get(session)?
            .max_load
            .get(&machine_key(machine))
            .copied()
    }

    /// Drop everything stored for a session. Returns whether anything was stored.
    pub fn forget(&mut self, session: &str) -> bool {
        self.order.retain(|s| s != session);
        self.sessions.remove(session).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Memory for `session`, marked most recently used. Evicts the oldest
    /// session when a new one would exceed the capacity.
    fn touch(&mut self, session: &str) -> &mut SessionMemory {
        if let Some(pos) = self.order.iter().position(|s| s == session) {
            self.order.remove(pos);
        } else {
            while self.sessions.len() >= self.capacity {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.sessions.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
        self.order.push_back(session.to_string());
        self.sessions.entry(session.to_string()).or_default()
    }
}

fn machine_key(machine: &str) -> String {
    machine.trim().to_lowercase()
}
