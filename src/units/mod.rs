//! Unit systems
//!
//! Presets are authored in shop-floor imperial units (SFM, IPR, IPT, HP and
//! HP per in³/min). Metric requests get every preset value converted here so
//! the formulas and advisories always work in one consistent system.

use serde::{Deserialize, Serialize};
use uom::si::f64::{Length, Power, Volume};
use uom::si::length::{foot, inch, meter, millimeter};
use uom::si::power::{horsepower, kilowatt};
use uom::si::volume::{cubic_centimeter, cubic_inch, cubic_millimeter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Diameter in inches, cutting speed in ft/min, feeds in in/rev and in/min, power in HP
    #[default]
    Imperial,
    /// Diameter in mm, cutting speed in m/min, feeds in mm/rev and mm/min, power in kW
    Metric,
}

impl UnitSystem {
    /// Diameter units per cutting-speed length unit (K in v = π·d·n / K).
    ///
    /// Imperial: inches per foot = 12. Metric: millimetres per metre = 1000.
    pub fn surface_constant(self) -> f64 {
        match self {
            UnitSystem::Imperial => Length::new::<foot>(1.0).get::<inch>(),
            UnitSystem::Metric => Length::new::<meter>(1.0).get::<millimeter>(),
        }
    }

    /// Scale from (diameter unit)³ to the volume unit unit-power is quoted in.
    ///
    /// Imperial removal rates are already in³/min. Metric rates come out in
    /// mm³/min and unit power is per cm³/min.
    pub fn volume_factor(self) -> f64 {
        match self {
            UnitSystem::Imperial => 1.0,
            UnitSystem::Metric => Volume::new::<cubic_millimeter>(1.0).get::<cubic_centimeter>(),
        }
    }

    /// Convert a preset cutting speed (ft/min) into this system.
    pub fn cutting_speed_from_sfm(self, sfm: f64) -> f64 {
        match self {
            UnitSystem::Imperial => sfm,
            UnitSystem::Metric => Length::new::<foot>(sfm).get::<meter>(),
        }
    }

    /// Convert a preset feed length (inches per rev or per tooth) into this system.
    pub fn feed_from_inches(self, inches: f64) -> f64 {
        match self {
            UnitSystem::Imperial => inches,
            UnitSystem::Metric => Length::new::<inch>(inches).get::<millimeter>(),
        }
    }

    /// Convert a machine power rating (HP) into this system.
    pub fn power_from_hp(self, hp: f64) -> f64 {
        match self {
            UnitSystem::Imperial => hp,
            UnitSystem::Metric => Power::new::<horsepower>(hp).get::<kilowatt>(),
        }
    }

    /// Convert a unit power (HP per in³/min) into this system (kW per cm³/min).
    pub fn unit_power_from_imperial(self, hp_per_cubic_inch: f64) -> f64 {
        match self {
            UnitSystem::Imperial => hp_per_cubic_inch,
            UnitSystem::Metric => {
                let kw = Power::new::<horsepower>(hp_per_cubic_inch).get::<kilowatt>();
                kw / Volume::new::<cubic_inch>(1.0).get::<cubic_centimeter>()
            }
        }
    }

    pub fn length_label(self) -> &'static str {
        match self {
            UnitSystem::Imperial => "in",
            UnitSystem::Metric => "mm",
        }
    }

    pub fn speed_label(self) -> &'static str {
        match self {
            UnitSystem::Imperial => "SFM",
            UnitSystem::Metric => "m/min",
        }
    }

    pub fn feed_per_rev_label(self) -> &'static str {
        match self {
            UnitSystem::Imperial => "IPR",
            UnitSystem::Metric => "mm/rev",
        }
    }

    pub fn feed_per_min_label(self) -> &'static str {
        match self {
            UnitSystem::Imperial => "IPM",
            UnitSystem::Metric => "mm/min",
        }
    }

    pub fn chip_load_label(self) -> &'static str {
        match self {
            UnitSystem::Imperial => "IPT",
            UnitSystem::Metric => "mm/tooth",
        }
    }

    pub fn power_label(self) -> &'static str {
        match self {
            UnitSystem::Imperial => "HP",
            UnitSystem::Metric => "kW",
        }
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitSystem::Imperial => write!(f, "imperial"),
            UnitSystem::Metric => write!(f, "metric"),
        }
    }
}

impl std::str::FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imperial" | "inch" | "in" => Ok(UnitSystem::Imperial),
            "metric" | "mm" => Ok(UnitSystem::Metric),
            other => Err(format!("unknown unit system '{}' (expected imperial or metric)", other)),
        }
    }
}
