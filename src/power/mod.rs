//! Material-removal power
//!
//! HP = unit_power × MRR, where MRR = area × feed per minute. The area
//! depends on the operation:
//! - Drilling: the full hole, π × (D/2)²
//! - Turning: surface travel per inch of feed times depth, π × D × DOC
//! - Milling: radial width × axial depth
//!
//! Power is linear in feed, so the feed that fits a budget is solved directly.

use serde::Serialize;
use std::f64::consts::PI;
use tracing::debug;

use crate::presets::{Drive, MachineProfile, MaterialPreset};
use crate::units::UnitSystem;

/// Unit power (HP per in³/min) used when a named material carries none
pub const FALLBACK_UNIT_POWER: f64 = 0.7;

/// Default share of rated power a job may use
pub const DEFAULT_MAX_LOAD_PCT: u8 = 60;

/// Cross-section swept per unit of table feed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutSection {
    Drill { diameter: f64 },
    Turn { diameter: f64, depth: f64 },
    Mill { axial_depth: f64, radial_width: f64 },
}

impl CutSection {
    pub fn area(&self) -> f64 {
        match *self {
            CutSection::Drill { diameter } => PI * (diameter / 2.0).powi(2),
            CutSection::Turn { diameter, depth } => PI * diameter * depth,
            CutSection::Mill {
                axial_depth,
                radial_width,
            } => axial_depth * radial_width,
        }
    }
}

/// Reduced feed that keeps the cut inside a power budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedSuggestion {
    pub feed_per_rev: f64,
    pub feed_per_min: f64,
}

/// Unit power and volume scale for one material in one unit system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerModel {
    pub unit_power: f64,
    pub volume_factor: f64,
}

impl PowerModel {
    pub fn for_material(units: UnitSystem, material: Option<&MaterialPreset>) -> Self {
        let unit_power = material
            .and_then(|m| m.unit_power)
            .unwrap_or(FALLBACK_UNIT_POWER);
        Self {
            unit_power: units.unit_power_from_imperial(unit_power),
            volume_factor: units.volume_factor(),
        }
    }

    /// Material removal rate in the unit-power volume unit per minute
    pub fn removal_rate(&self, section: CutSection, feed_per_min: f64) -> f64 {
        section.area() * feed_per_min * self.volume_factor
    }

    pub fn required(&self, section: CutSection, feed_per_min: f64) -> f64 {
        self.unit_power * self.removal_rate(section, feed_per_min)
    }

    /// Largest feed whose required power equals `budget`.
    ///
    /// `None` when no meaningful suggestion exists (zero area, unit power,
    /// RPM or budget).
    pub fn max_feed(&self, section: CutSection, rpm: f64, budget: f64) -> Option<FeedSuggestion> {
        let per_feed = self.unit_power * section.area() * self.volume_factor;
        if !(per_feed > 0.0) || !(rpm > 0.0) || !per_feed.is_finite() {
            return None;
        }

        let feed_per_min = budget / per_feed;
        if !(feed_per_min > 0.0) || !feed_per_min.is_finite() {
            return None;
        }

        debug!(budget, feed_per_min, rpm, "feed suggestion for power budget");
        Some(FeedSuggestion {
            feed_per_rev: feed_per_min / rpm,
            feed_per_min,
        })
    }
}

/// Estimated drilling HP for a material (imperial).
pub fn required_power(material: Option<&MaterialPreset>, diameter: f64, feed_per_min: f64) -> f64 {
    PowerModel::for_material(UnitSystem::Imperial, material)
        .required(CutSection::Drill { diameter }, feed_per_min)
}

/// Drilling feed that fits within `budget` HP (imperial).
pub fn max_feed_for_power_budget(
    material: Option<&MaterialPreset>,
    diameter: f64,
    rpm: f64,
    budget: f64,
) -> Option<FeedSuggestion> {
    PowerModel::for_material(UnitSystem::Imperial, material).max_feed(
        CutSection::Drill { diameter },
        rpm,
        budget,
    )
}

/// Rated power of the drive in `units`, 0 when the machine is unknown
pub fn available_power(units: UnitSystem, machine: Option<&MachineProfile>, drive: Drive) -> f64 {
    machine
        .map(|m| units.power_from_hp(m.available_hp(drive)))
        .unwrap_or(0.0)
}

/// Share of a drive's rating a job is allowed to use
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadBudget {
    pub available: f64,
    pub max_load_pct: u8,
}

impl LoadBudget {
    pub fn new(available: f64, max_load_pct: u8) -> Self {
        Self {
            available,
            max_load_pct: clamp_load_pct(max_load_pct),
        }
    }

    pub fn allowed(&self) -> f64 {
        self.available * (self.max_load_pct as f64 / 100.0)
    }
}

/// Max load percentage is always kept within 1..=100
pub fn clamp_load_pct(pct: u8) -> u8 {
    pct.clamp(1, 100)
}

/// Outcome of comparing a cut against its budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerCheck {
    pub required: f64,
    pub allowed: f64,
    pub available: f64,
    pub max_load_pct: u8,
}

impl PowerCheck {
    pub fn over_budget(&self) -> bool {
        self.available > 0.0 && self.required > self.allowed
    }
}
