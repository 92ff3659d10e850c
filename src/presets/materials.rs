//! Material and insert presets - starter ranges for carbide tooling
//!
//! Tune to your shop, machine rigidity and grade. All values are imperial:
//! cutting speed in SFM, feeds in IPR / IPT, unit power in HP per in³/min.

use serde::{Deserialize, Serialize};

/// Inclusive recommended range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Apply a unit conversion to both ends
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            min: f(self.min),
            max: f(self.max),
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
    }
}

impl From<[f64; 2]> for Band {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<Band> for [f64; 2] {
    fn from(band: Band) -> Self {
        [band.min, band.max]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurningBands {
    pub cutting_speed: Band,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MillingBands {
    pub cutting_speed: Band,
    pub chip_load: Band,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillingBands {
    pub cutting_speed: Band,
    pub feed_per_rev: Band,
}

/// Workpiece material cutting data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialPreset {
    /// Filled from the library key on load
    #[serde(default, skip_serializing)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turning: Option<TurningBands>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milling: Option<MillingBands>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drilling: Option<DrillingBands>,

    /// HP per in³/min of material removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_power: Option<f64>,
}

impl MaterialPreset {
    /// Every band this preset carries, labelled for error reporting
    pub(crate) fn bands(&self) -> Vec<(&'static str, Band)> {
        let mut bands = Vec::new();
        if let Some(t) = &self.turning {
            bands.push(("turning.cutting_speed", t.cutting_speed));
        }
        if let Some(m) = &self.milling {
            bands.push(("milling.cutting_speed", m.cutting_speed));
            bands.push(("milling.chip_load", m.chip_load));
        }
        if let Some(d) = &self.drilling {
            bands.push(("drilling.cutting_speed", d.cutting_speed));
            bands.push(("drilling.feed_per_rev", d.feed_per_rev));
        }
        bands
    }
}

/// Turning insert feed recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertPreset {
    #[serde(default, skip_serializing)]
    pub name: String,
    pub feed_per_rev: Band,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_is_inclusive() {
        let band = Band::new(250.0, 600.0);
        assert!(band.contains(250.0));
        assert!(band.contains(600.0));
        assert!(band.contains(400.0));
        assert!(!band.contains(249.9));
        assert!(!band.contains(600.1));
    }

    #[test]
    fn test_band_validity() {
        assert!(Band::new(0.004, 0.010).is_valid());
        assert!(Band::new(5.0, 5.0).is_valid());
        assert!(!Band::new(0.010, 0.004).is_valid());
        assert!(!Band::new(f64::NAN, 1.0).is_valid());
        assert!(!Band::new(-1.0, 1.0).is_valid());
    }

    #[test]
    fn test_band_from_json_pair() {
        let band: Band = serde_json::from_str("[0.003, 0.008]").unwrap();
        assert_eq!(band, Band::new(0.003, 0.008));
        assert_eq!(serde_json::to_string(&band).unwrap(), "[0.003,0.008]");
    }

    #[test]
    fn test_material_partial_sections() {
        let json = r#"{ "drilling": { "cutting_speed": [70, 150], "feed_per_rev": [0.004, 0.012] } }"#;
        let mat: MaterialPreset = serde_json::from_str(json).unwrap();
        assert!(mat.turning.is_none());
        assert!(mat.milling.is_none());
        assert!(mat.unit_power.is_none());
        assert_eq!(mat.bands().len(), 2);
    }
}
