//! Speed and feed formulas
//!
//! Each conversion has an algebraic inverse in this module:
//! - Cutting speed ↔ RPM: v = π × D × n / K
//! - Feed per rev ↔ feed per minute: F = f × n
//! - Chip load ↔ feed per minute: F = fz × z × n
//!
//! K comes from the unit system (12 for inch/SFM, 1000 for mm/m·min⁻¹).

use std::f64::consts::PI;

use crate::error::{positive, CalcError, Result};
use crate::units::UnitSystem;

/// Cutting speed from diameter and RPM.
pub fn cutting_speed_from_rpm(units: UnitSystem, diameter: f64, rpm: f64) -> Result<f64> {
    let diameter = positive("diameter", diameter)?;
    let rpm = positive("rpm", rpm)?;
    Ok(PI * diameter * rpm / units.surface_constant())
}

/// RPM from diameter and cutting speed.
pub fn rpm_from_cutting_speed(units: UnitSystem, diameter: f64, cutting_speed: f64) -> Result<f64> {
    let diameter = positive("diameter", diameter)?;
    let cutting_speed = positive("cutting speed", cutting_speed)?;
    Ok(cutting_speed * units.surface_constant() / (PI * diameter))
}

pub fn feed_per_min_from_feed_per_rev(feed_per_rev: f64, rpm: f64) -> Result<f64> {
    Ok(positive("feed per rev", feed_per_rev)? * positive("rpm", rpm)?)
}

pub fn feed_per_rev_from_feed_per_min(feed_per_min: f64, rpm: f64) -> Result<f64> {
    Ok(positive("feed per minute", feed_per_min)? / positive("rpm", rpm)?)
}

/// Table feed for a multi-flute tool: IPM = IPT × flutes × RPM
pub fn feed_per_min_from_chip_load(chip_load: f64, flutes: u32, rpm: f64) -> Result<f64> {
    let chip_load = positive("chip load", chip_load)?;
    let flutes = flute_count(flutes)?;
    Ok(chip_load * flutes * positive("rpm", rpm)?)
}

/// Chip load per tooth: IPT = IPM / (flutes × RPM)
pub fn chip_load_from_feed_per_min(feed_per_min: f64, flutes: u32, rpm: f64) -> Result<f64> {
    let feed_per_min = positive("feed per minute", feed_per_min)?;
    let flutes = flute_count(flutes)?;
    Ok(feed_per_min / (flutes * positive("rpm", rpm)?))
}

fn flute_count(flutes: u32) -> Result<f64> {
    if flutes == 0 {
        return Err(CalcError::InvalidArgument {
            field: "flutes",
            value: 0.0,
        });
    }
    Ok(flutes as f64)
}
