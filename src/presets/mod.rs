//! Preset library - material, insert and machine tables
//!
//! The built-in library ships as JSON and a shop can point the config at its
//! own file with the same layout:
//!
//! ```json
//! {
//!   "materials": { "4140": { "turning": { "cutting_speed": [250, 600] }, "unit_power": 1.0 } },
//!   "inserts":   { "CNMG (Rough)": { "feed_per_rev": [0.010, 0.020] } },
//!   "machines":  { "Haas ST-10": { "type": "lathe", "spindle_max_rpm": 6000, "spindle_hp": 15 } }
//! }
//! ```
//!
//! Every range is checked for `min <= max` when the library loads. Tables are
//! never modified after that.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub mod machines;
pub mod materials;

pub use machines::*;
pub use materials::*;

const BUILTIN_JSON: &str = include_str!("builtin.json");

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("failed to read preset file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid preset JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{preset}: {field} range [{min}, {max}] is invalid (need 0 <= min <= max)")]
    InvalidBand {
        preset: String,
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{preset}: {field} must be >= 0, got {value}")]
    InvalidValue {
        preset: String,
        field: &'static str,
        value: f64,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetLibrary {
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialPreset>,

    #[serde(default)]
    pub inserts: BTreeMap<String, InsertPreset>,

    #[serde(default)]
    pub machines: BTreeMap<String, MachineProfile>,
}

impl PresetLibrary {
    /// The shop starter tables compiled into the binary
    pub fn builtin() -> Result<Self, PresetError> {
        Self::from_json(BUILTIN_JSON)
    }

    /// Load a preset library from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, PresetError> {
        let content = std::fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        let mut library: PresetLibrary = serde_json::from_str(json)?;

        for (name, material) in library.materials.iter_mut() {
            material.name = name.clone();
        }
        for (name, insert) in library.inserts.iter_mut() {
            insert.name = name.clone();
        }
        for (name, machine) in library.machines.iter_mut() {
            machine.name = name.clone();
        }

        library.validate()?;
        tracing::debug!(
            materials = library.materials.len(),
            inserts = library.inserts.len(),
            machines = library.machines.len(),
            "loaded preset library"
        );
        Ok(library)
    }

    fn validate(&self) -> Result<(), PresetError> {
        for material in self.materials.values() {
            for (field, band) in material.bands() {
                check_band(&material.name, field, band)?;
            }
            if let Some(unit_power) = material.unit_power {
                check_value(&material.name, "unit_power", unit_power)?;
            }
        }

        for insert in self.inserts.values() {
            check_band(&insert.name, "feed_per_rev", insert.feed_per_rev)?;
        }

        for machine in self.machines.values() {
            check_value(&machine.name, "spindle_max_rpm", machine.spindle_max_rpm)?;
            check_value(&machine.name, "spindle_hp", machine.spindle_hp)?;
            if let Some(rpm) = machine.live_tool_max_rpm {
                check_value(&machine.name, "live_tool_max_rpm", rpm)?;
            }
            if let Some(hp) = machine.live_tool_hp {
                check_value(&machine.name, "live_tool_hp", hp)?;
            }
        }

        Ok(())
    }

    /// Material by name (exact, then case-insensitive). `None` just disables advisories.
    pub fn material(&self, name: &str) -> Option<&MaterialPreset> {
        lookup(&self.materials, name)
    }

    pub fn insert(&self, name: &str) -> Option<&InsertPreset> {
        lookup(&self.inserts, name)
    }

    pub fn machine(&self, name: &str) -> Option<&MachineProfile> {
        lookup(&self.machines, name)
    }

    /// Machines of one kind, sorted by name
    pub fn machines_of(&self, kind: MachineKind) -> Vec<&MachineProfile> {
        self.machines.values().filter(|m| m.kind == kind).collect()
    }
}

fn lookup<'a, T>(table: &'a BTreeMap<String, T>, name: &str) -> Option<&'a T> {
    let name = name.trim();
    if let Some(found) = table.get(name) {
        return Some(found);
    }
    let lower = name.to_lowercase();
    table
        .iter()
        .find(|(key, _)| key.to_lowercase() == lower)
        .map(|(_, value)| value)
}

fn check_band(preset: &str, field: &'static str, band: Band) -> Result<(), PresetError> {
    if band.is_valid() {
        Ok(())
    } else {
        Err(PresetError::InvalidBand {
            preset: preset.to_string(),
            field,
            min: band.min,
            max: band.max,
        })
    }
}

fn check_value(preset: &str, field: &'static str, value: f64) -> Result<(), PresetError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PresetError::InvalidValue {
            preset: preset.to_string(),
            field,
            value,
        })
    }
}
