//! Machine profiles - spindle and live-tool limits

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineKind {
    Lathe,
    Mill,
}

impl std::fmt::Display for MachineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineKind::Lathe => write!(f, "lathe"),
            MachineKind::Mill => write!(f, "mill"),
        }
    }
}

/// Rotating power source driving the cutter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drive {
    #[default]
    Spindle,
    LiveTool,
}

impl std::fmt::Display for Drive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Drive::Spindle => write!(f, "Spindle"),
            Drive::LiveTool => write!(f, "Live Tool"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineProfile {
    #[serde(default, skip_serializing)]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: MachineKind,

    pub spindle_max_rpm: f64,
    pub spindle_hp: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_tool_max_rpm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_tool_hp: Option<f64>,
}

impl MachineProfile {
    pub fn has_live_tool(&self) -> bool {
        self.live_tool_max_rpm.is_some() || self.live_tool_hp.is_some()
    }

    /// The drive that actually runs when `requested` is selected.
    ///
    /// Asking for the live tool on a machine without one falls back to the spindle.
    pub fn effective_drive(&self, requested: Drive) -> Drive {
        match requested {
            Drive::LiveTool if self.has_live_tool() => Drive::LiveTool,
            _ => Drive::Spindle,
        }
    }

    /// Max RPM for the drive, 0 when unlimited/unknown
    pub fn max_rpm(&self, drive: Drive) -> f64 {
        match self.effective_drive(drive) {
            Drive::LiveTool => self.live_tool_max_rpm.unwrap_or(0.0),
            Drive::Spindle => self.spindle_max_rpm,
        }
    }

    /// Rated HP for the drive, 0 when unknown
    pub fn available_hp(&self, drive: Drive) -> f64 {
        match self.effective_drive(drive) {
            Drive::LiveTool => self.live_tool_hp.unwrap_or(0.0),
            Drive::Spindle => self.spindle_hp,
        }
    }
}
