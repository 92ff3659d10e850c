//! Calculator - resolve a job, then check it against presets and the machine
//!
//! One call per operation kind. Each call resolves the speed and feed pairs
//! (clamped to the machine's RPM limit), runs the preset range checks, and
//! when a material is named, compares the material-removal power against the
//! machine's load budget.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::advisor::{self, Advisory, Checked, Severity};
use crate::error::{positive, Result};
use crate::power::{
    available_power, CutSection, FeedSuggestion, LoadBudget, PowerCheck, PowerModel,
    DEFAULT_MAX_LOAD_PCT,
};
use crate::presets::{Band, Drive, MachineProfile, MaterialPreset, PresetLibrary};
use crate::resolve::{
    resolve, Clamp, CutRequest, FeedRequest, Input, ResolvedCut, ResolvedFeed, SpindleLimit,
};
use crate::units::UnitSystem;

mod display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Turning,
    Drilling,
    Milling,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Turning => write!(f, "turning"),
            OperationKind::Drilling => write!(f, "drilling"),
            OperationKind::Milling => write!(f, "milling"),
        }
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "turning" | "turn" => Ok(OperationKind::Turning),
            "drilling" | "drill" => Ok(OperationKind::Drilling),
            "milling" | "mill" => Ok(OperationKind::Milling),
            other => Err(format!("unknown operation '{}'", other)),
        }
    }
}

/// Machine selection and load policy for one job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobContext {
    pub machine: Option<String>,
    pub drive: Drive,
    /// Share of rated power the job may use, 60% when unset
    pub max_load_pct: Option<u8>,
    pub auto_limit: bool,
}

impl JobContext {
    pub fn max_load_pct(&self) -> u8 {
        self.max_load_pct.unwrap_or(DEFAULT_MAX_LOAD_PCT)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurningRequest {
    pub diameter: Input<f64>,
    pub cutting_speed: Input<f64>,
    pub rpm: Input<f64>,
    pub feed_per_rev: Input<f64>,
    pub feed_per_min: Input<f64>,
    pub depth_of_cut: Option<f64>,
    pub material: Option<String>,
    pub insert: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrillingRequest {
    pub diameter: Input<f64>,
    pub cutting_speed: Input<f64>,
    pub rpm: Input<f64>,
    pub feed_per_rev: Input<f64>,
    pub feed_per_min: Input<f64>,
    pub material: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MillingRequest {
    pub diameter: Input<f64>,
    pub cutting_speed: Input<f64>,
    pub rpm: Input<f64>,
    pub flutes: Input<u32>,
    pub chip_load: Input<f64>,
    pub feed_per_min: Input<f64>,
    pub axial_depth: Option<f64>,
    pub radial_width: Option<f64>,
    pub material: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum Operation {
    Turning(TurningRequest),
    Drilling(DrillingRequest),
    Milling(MillingRequest),
}

/// A complete calculation request.
///
/// ```json
/// { "operation": "drilling", "diameter": 0.5, "rpm": 500, "feed_per_min": 2,
///   "material": "Cast Iron", "setup": { "machine": "Haas ST-20Y", "drive": "live_tool" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(flatten)]
    pub operation: Operation,

    #[serde(default)]
    pub setup: JobContext,
}

impl Job {
    pub fn new(operation: Operation, setup: JobContext) -> Self {
        Self { operation, setup }
    }

    pub fn kind(&self) -> OperationKind {
        match self.operation {
            Operation::Turning(_) => OperationKind::Turning,
            Operation::Drilling(_) => OperationKind::Drilling,
            Operation::Milling(_) => OperationKind::Milling,
        }
    }
}

/// Preset ranges the resolved values were checked against, in request units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Recommended {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutting_speed: Option<Band>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_per_rev: Option<Band>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chip_load: Option<Band>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub operation: OperationKind,
    pub units: UnitSystem,
    pub machine: Option<String>,
    pub drive: Drive,
    pub params: ResolvedCut,
    pub clamp: Option<Clamp>,
    pub recommended: Recommended,
    pub power: Option<PowerCheck>,
    pub suggestion: Option<FeedSuggestion>,
    pub auto_limited: bool,
    pub advisories: Vec<Advisory>,
}

impl Report {
    pub fn warnings(&self) -> impl Iterator<Item = &Advisory> {
        self.advisories
            .iter()
            .filter(|a| a.severity == Severity::Warning)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.advisories.iter().any(|a| a.code == code)
    }
}

/// The machine a job runs on, if it is known
struct Setup<'p> {
    profile: Option<&'p MachineProfile>,
    drive: Drive,
}

impl Setup<'_> {
    fn limit(&self) -> Option<SpindleLimit> {
        self.profile.map(|m| SpindleLimit {
            drive: self.drive,
            max_rpm: m.max_rpm(self.drive),
        })
    }
}

#[derive(Default)]
struct PowerOutcome {
    check: Option<PowerCheck>,
    suggestion: Option<FeedSuggestion>,
    auto_limited: bool,
}

pub struct Calculator<'a> {
    presets: &'a PresetLibrary,
    units: UnitSystem,
}

impl<'a> Calculator<'a> {
    pub fn new(presets: &'a PresetLibrary, units: UnitSystem) -> Self {
        Self { presets, units }
    }

    pub fn run(&self, job: &Job) -> Result<Report> {
        match &job.operation {
            Operation::Turning(req) => self.turning(req, &job.setup),
            Operation::Drilling(req) => self.drilling(req, &job.setup),
            Operation::Milling(req) => self.milling(req, &job.setup),
        }
    }

    /// Turning always runs on the main spindle.
    pub fn turning(&self, req: &TurningRequest, ctx: &JobContext) -> Result<Report> {
        let setup = self.setup(ctx, Drive::Spindle);
        let request = CutRequest {
            diameter: req.diameter,
            cutting_speed: req.cutting_speed,
            rpm: req.rpm,
            feed: FeedRequest::PerRev {
                feed_per_rev: req.feed_per_rev,
                feed_per_min: req.feed_per_min,
            },
        };
        let resolution = resolve(self.units, &request, setup.limit())?;
        let mut cut = resolution.cut;
        let depth = req
            .depth_of_cut
            .map(|d| positive("depth of cut", d))
            .transpose()?;

        let material = self.material(req.material.as_deref());
        let insert = req.insert.as_deref().and_then(|name| {
            let found = self.presets.insert(name);
            if found.is_none() {
                warn!(insert = name, "unknown insert, feed range check disabled");
            }
            found
        });

        let recommended = Recommended {
            cutting_speed: material
                .and_then(|m| m.turning.as_ref())
                .map(|t| self.speed_band(t.cutting_speed)),
            feed_per_rev: insert.map(|i| self.feed_band(i.feed_per_rev)),
            chip_load: None,
        };

        let mut advisories: Vec<Advisory> = resolution.clamp.iter().map(advisor::clamp_advisory).collect();
        advisories.extend(advisor::check_band(
            Checked::TurningSpeed,
            self.units,
            cut.cutting_speed,
            recommended.cutting_speed,
        ));
        if let Some(feed_per_rev) = per_rev(&cut) {
            advisories.extend(advisor::check_band(
                Checked::TurningFeed,
                self.units,
                feed_per_rev,
                recommended.feed_per_rev,
            ));
        }

        let section = depth.map(|depth| CutSection::Turn {
            diameter: cut.diameter,
            depth,
        });
        let power = self.power(
            section,
            req.material.as_deref(),
            material,
            &setup,
            ctx,
            &mut cut,
            &mut advisories,
        )?;

        Ok(self.report(OperationKind::Turning, &setup, resolution.clamp, cut, recommended, power, advisories))
    }

    pub fn drilling(&self, req: &DrillingRequest, ctx: &JobContext) -> Result<Report> {
        let setup = self.setup(ctx, ctx.drive);
        let request = CutRequest {
            diameter: req.diameter,
            cutting_speed: req.cutting_speed,
            rpm: req.rpm,
            feed: FeedRequest::PerRev {
                feed_per_rev: req.feed_per_rev,
                feed_per_min: req.feed_per_min,
            },
        };
        let resolution = resolve(self.units, &request, setup.limit())?;
        let mut cut = resolution.cut;

        let material = self.material(req.material.as_deref());
        let drilling = material.and_then(|m| m.drilling.as_ref());
        let recommended = Recommended {
            cutting_speed: drilling.map(|d| self.speed_band(d.cutting_speed)),
            feed_per_rev: drilling.map(|d| self.feed_band(d.feed_per_rev)),
            chip_load: None,
        };

        let mut advisories: Vec<Advisory> = resolution.clamp.iter().map(advisor::clamp_advisory).collect();
        advisories.extend(advisor::check_band(
            Checked::DrillSpeed,
            self.units,
            cut.cutting_speed,
            recommended.cutting_speed,
        ));
        if let Some(feed_per_rev) = per_rev(&cut) {
            advisories.extend(advisor::check_band(
                Checked::DrillFeed,
                self.units,
                feed_per_rev,
                recommended.feed_per_rev,
            ));
        }

        let section = Some(CutSection::Drill {
            diameter: cut.diameter,
        });
        let power = self.power(
            section,
            req.material.as_deref(),
            material,
            &setup,
            ctx,
            &mut cut,
            &mut advisories,
        )?;

        Ok(self.report(OperationKind::Drilling, &setup, resolution.clamp, cut, recommended, power, advisories))
    }

    pub fn milling(&self, req: &MillingRequest, ctx: &JobContext) -> Result<Report> {
        let setup = self.setup(ctx, ctx.drive);
        let request = CutRequest {
            diameter: req.diameter,
            cutting_speed: req.cutting_speed,
            rpm: req.rpm,
            feed: FeedRequest::PerTooth {
                chip_load: req.chip_load,
                flutes: req.flutes,
                feed_per_min: req.feed_per_min,
            },
        };
        let resolution = resolve(self.units, &request, setup.limit())?;
        let mut cut = resolution.cut;
        let axial = req
            .axial_depth
            .map(|d| positive("axial depth", d))
            .transpose()?;
        let radial = req
            .radial_width
            .map(|w| positive("radial width", w))
            .transpose()?;

        let material = self.material(req.material.as_deref());
        let milling = material.and_then(|m| m.milling.as_ref());
        let recommended = Recommended {
            cutting_speed: milling.map(|m| self.speed_band(m.cutting_speed)),
            feed_per_rev: None,
            chip_load: milling.map(|m| self.feed_band(m.chip_load)),
        };

        let mut advisories: Vec<Advisory> = resolution.clamp.iter().map(advisor::clamp_advisory).collect();
        advisories.extend(advisor::check_band(
            Checked::MillSpeed,
            self.units,
            cut.cutting_speed,
            recommended.cutting_speed,
        ));
        if let Some(chip_load) = per_tooth(&cut) {
            advisories.extend(advisor::check_band(
                Checked::ChipLoad,
                self.units,
                chip_load,
                recommended.chip_load,
            ));
        }

        let section = match (axial, radial) {
            (Some(axial_depth), Some(radial_width)) => Some(CutSection::Mill {
                axial_depth,
                radial_width,
            }),
            _ => None,
        };
        let power = self.power(
            section,
            req.material.as_deref(),
            material,
            &setup,
            ctx,
            &mut cut,
            &mut advisories,
        )?;

        Ok(self.report(OperationKind::Milling, &setup, resolution.clamp, cut, recommended, power, advisories))
    }

    fn setup(&self, ctx: &JobContext, requested: Drive) -> Setup<'a> {
        let profile = ctx.machine.as_deref().and_then(|name| {
            let found = self.presets.machine(name);
            if found.is_none() {
                warn!(machine = name, "unknown machine, no RPM or power limits applied");
            }
            found
        });
        let drive = profile
            .map(|m| m.effective_drive(requested))
            .unwrap_or(requested);
        if drive != requested {
            debug!(requested = %requested, using = %drive, "machine has no live tool");
        }
        Setup { profile, drive }
    }

    fn material(&self, name: Option<&str>) -> Option<&'a MaterialPreset> {
        let name = name?;
        let found = self.presets.material(name);
        if found.is_none() {
            warn!(material = name, "unknown material, range checks disabled");
        }
        found
    }

    fn speed_band(&self, band: Band) -> Band {
        band.map(|v| self.units.cutting_speed_from_sfm(v))
    }

    fn feed_band(&self, band: Band) -> Band {
        band.map(|v| self.units.feed_from_inches(v))
    }

    /// Load check for a named material. Runs only when the cut section is
    /// known and the machine has a power rating.
    #[allow(clippy::too_many_arguments)]
    fn power(
        &self,
        section: Option<CutSection>,
        material_name: Option<&str>,
        material: Option<&MaterialPreset>,
        setup: &Setup<'_>,
        ctx: &JobContext,
        cut: &mut ResolvedCut,
        advisories: &mut Vec<Advisory>,
    ) -> Result<PowerOutcome> {
        let named = material_name.is_some_and(|n| !n.trim().is_empty());
        let Some(section) = section.filter(|_| named) else {
            return Ok(PowerOutcome::default());
        };

        let available = available_power(self.units, setup.profile, setup.drive);
        if available <= 0.0 {
            return Ok(PowerOutcome::default());
        }

        let model = PowerModel::for_material(self.units, material);
        let budget = LoadBudget::new(available, ctx.max_load_pct());
        let mut check = PowerCheck {
            required: model.required(section, cut.feed.feed_per_min()),
            allowed: budget.allowed(),
            available,
            max_load_pct: budget.max_load_pct,
        };
        debug!(required = check.required, allowed = check.allowed, "power check");

        if !check.over_budget() {
            return Ok(PowerOutcome {
                check: Some(check),
                ..PowerOutcome::default()
            });
        }

        advisories.push(advisor::load_risk(self.units, &check));
        let suggestion = model.max_feed(section, cut.rpm, check.allowed);
        let mut auto_limited = false;

        if let Some(s) = suggestion {
            advisories.push(advisor::feed_suggestion(self.units, &s, cut.rpm));
            if ctx.auto_limit {
                cut.feed = cut.feed.with_feed_per_min(s.feed_per_min, cut.rpm)?;
                check.required = model.required(section, s.feed_per_min);
                advisories.push(advisor::auto_limit_applied());
                auto_limited = true;
            }
        }

        Ok(PowerOutcome {
            check: Some(check),
            suggestion,
            auto_limited,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn report(
        &self,
        operation: OperationKind,
        setup: &Setup<'_>,
        clamp: Option<Clamp>,
        params: ResolvedCut,
        recommended: Recommended,
        power: PowerOutcome,
        advisories: Vec<Advisory>,
    ) -> Report {
        Report {
            operation,
            units: self.units,
            machine: setup.profile.map(|m| m.name.clone()),
            drive: setup.drive,
            params,
            clamp,
            recommended,
            power: power.check,
            suggestion: power.suggestion,
            auto_limited: power.auto_limited,
            advisories,
        }
    }
}

fn per_rev(cut: &ResolvedCut) -> Option<f64> {
    match cut.feed {
        ResolvedFeed::PerRev { feed_per_rev, .. } => Some(feed_per_rev),
        _ => None,
    }
}

fn per_tooth(cut: &ResolvedCut) -> Option<f64> {
    match cut.feed {
        ResolvedFeed::PerTooth { chip_load, .. } => Some(chip_load),
        _ => None,
    }
}
