//! Advisories - range checks against presets and load warnings
//!
//! Advisories never fail a calculation. Every check runs independently and
//! all findings are returned together.

use serde::Serialize;

use crate::power::{FeedSuggestion, PowerCheck};
use crate::presets::Band;
use crate::resolve::Clamp;
use crate::units::UnitSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
}

impl Advisory {
    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn info(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Which quantity a band check is about, with the consequences to mention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checked {
    TurningSpeed,
    TurningFeed,
    DrillSpeed,
    DrillFeed,
    MillSpeed,
    ChipLoad,
}

impl Checked {
    fn noun(self) -> &'static str {
        match self {
            Checked::TurningSpeed | Checked::DrillSpeed | Checked::MillSpeed => "Cutting speed",
            Checked::TurningFeed | Checked::DrillFeed => "Feed",
            Checked::ChipLoad => "Chipload",
        }
    }

    fn unit(self, units: UnitSystem) -> &'static str {
        match self {
            Checked::TurningSpeed | Checked::DrillSpeed | Checked::MillSpeed => units.speed_label(),
            Checked::TurningFeed | Checked::DrillFeed => units.feed_per_rev_label(),
            Checked::ChipLoad => units.chip_load_label(),
        }
    }

    fn codes(self) -> (&'static str, &'static str) {
        match self {
            Checked::TurningSpeed | Checked::DrillSpeed | Checked::MillSpeed => {
                ("SPEED_BELOW_RANGE", "SPEED_ABOVE_RANGE")
            }
            Checked::TurningFeed | Checked::DrillFeed => ("FEED_BELOW_RANGE", "FEED_ABOVE_RANGE"),
            Checked::ChipLoad => ("CHIP_LOAD_BELOW_RANGE", "CHIP_LOAD_ABOVE_RANGE"),
        }
    }

    fn below(self) -> &'static str {
        match self {
            Checked::TurningSpeed => "may rub / poor finish",
            Checked::TurningFeed => "may rub depending on insert/nose radius",
            Checked::DrillSpeed | Checked::MillSpeed => "may rub",
            Checked::DrillFeed => "may rub/work-harden depending on material",
            Checked::ChipLoad => "risk of rubbing",
        }
    }

    fn above(self) -> &'static str {
        match self {
            Checked::TurningSpeed => "may wear/burn edge",
            Checked::TurningFeed => "watch power, chatter, edge",
            Checked::DrillSpeed => "may burn/wear drill",
            Checked::DrillFeed => "watch load/chip packing",
            Checked::MillSpeed => "may wear tool fast",
            Checked::ChipLoad => "watch chatter/tool load",
        }
    }

    fn decimals(self) -> usize {
        match self {
            Checked::TurningSpeed | Checked::DrillSpeed | Checked::MillSpeed => 0,
            _ => 4,
        }
    }
}

/// Compare `value` against an optional preset band
pub fn check_band(
    checked: Checked,
    units: UnitSystem,
    value: f64,
    band: Option<Band>,
) -> Option<Advisory> {
    let band = band?;
    if band.contains(value) {
        return None;
    }

    let noun = checked.noun();
    let unit = checked.unit(units);
    let p = checked.decimals();
    let (below_code, above_code) = checked.codes();

    let (code, side, consequence) = if value < band.min {
        (below_code, "below", checked.below())
    } else {
        (above_code, "above", checked.above())
    };

    Some(Advisory::warning(
        code,
        format!(
            "{noun} {value:.p$} {unit} is {side} the typical range {:.p$}-{:.p$} ({consequence}).",
            band.min, band.max
        ),
    ))
}

pub fn clamp_advisory(clamp: &Clamp) -> Advisory {
    Advisory::warning(
        "RPM_CLAMPED",
        format!(
            "{} RPM limited to machine max ({:.0}); requested {:.0}.",
            clamp.drive, clamp.max_rpm, clamp.requested_rpm
        ),
    )
}

pub fn load_risk(units: UnitSystem, check: &PowerCheck) -> Advisory {
    let p = units.power_label();
    Advisory::warning(
        "LOAD_RISK",
        format!(
            "Load risk: estimated {p} {:.2} > allowed {:.2} ({}% of {:.1} {p}).",
            check.required, check.allowed, check.max_load_pct, check.available
        ),
    )
}

pub fn feed_suggestion(units: UnitSystem, suggestion: &FeedSuggestion, rpm: f64) -> Advisory {
    Advisory::info(
        "FEED_SUGGESTION",
        format!(
            "Suggestion to stay under load: ≤ {:.4} {} (≈ {:.2} {}) at {:.0} RPM.",
            suggestion.feed_per_rev,
            units.feed_per_rev_label(),
            suggestion.feed_per_min,
            units.feed_per_min_label(),
            rpm
        ),
    )
}

pub fn auto_limit_applied() -> Advisory {
    Advisory::info(
        "AUTO_LIMIT_APPLIED",
        "Auto-limit applied: feed reduced to meet load limit.",
    )
}
