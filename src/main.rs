use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::debug;

use chipload::calculator::{DrillingRequest, MillingRequest, TurningRequest};
use chipload::config::{Config, ConfigError};
use chipload::parser::{self, ParseError};
use chipload::presets::{Drive, PresetError};
use chipload::sheet::{self, Outcome};
use chipload::{CalcError, Calculator, Job, JobContext, Operation, PresetLibrary, Report, UnitSystem};

#[derive(Parser, Debug)]
#[command(name = "chipload")]
#[command(about = "Feeds & speeds for lathes and mills")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $CHIPLOAD_CONFIG, then ./chipload.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Unit system: imperial or metric
    #[arg(long, global = true)]
    units: Option<UnitSystem>,

    /// Machine profile name
    #[arg(short, long, global = true)]
    machine: Option<String>,

    /// Max load as a percentage of rated power (1-100)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(1..=100))]
    load: Option<u8>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Turning: diameter, cutting speed or RPM, feed per rev or per minute
    Turn(TurnArgs),
    /// Drilling: diameter, cutting speed or RPM, feed per rev or per minute
    Drill(DrillArgs),
    /// Milling: diameter, cutting speed or RPM, chip load or feed per minute
    Mill(MillArgs),
    /// Run every job in a setup sheet
    Sheet {
        file: PathBuf,
    },
    /// List the preset library
    Presets {
        #[arg(value_enum)]
        table: Option<Table>,
    },
    /// Serve the JSON API
    #[cfg(feature = "web")]
    Serve {
        /// Listen address, overrides [server] addr
        #[arg(long, value_name = "HOST:PORT")]
        addr: Option<String>,
    },
}

#[derive(Args, Debug)]
struct SpeedArgs {
    /// Tool or workpiece diameter
    #[arg(long = "dia")]
    diameter: Option<f64>,

    /// Cutting speed (SFM or m/min)
    #[arg(long = "sfm", alias = "speed")]
    cutting_speed: Option<f64>,

    #[arg(long)]
    rpm: Option<f64>,

    /// Feed per minute (IPM or mm/min)
    #[arg(long = "ipm", alias = "fpm")]
    feed_per_min: Option<f64>,

    #[arg(long)]
    material: Option<String>,

    /// Reduce the feed when the estimated power exceeds the allowed load
    #[arg(long)]
    auto_limit: bool,
}

#[derive(Args, Debug)]
struct TurnArgs {
    #[command(flatten)]
    speed: SpeedArgs,

    /// Feed per revolution (IPR or mm/rev)
    #[arg(long = "ipr", alias = "fpr")]
    feed_per_rev: Option<f64>,

    /// Depth of cut
    #[arg(long)]
    doc: Option<f64>,

    #[arg(long)]
    insert: Option<String>,
}

#[derive(Args, Debug)]
struct DrillArgs {
    #[command(flatten)]
    speed: SpeedArgs,

    #[arg(long = "ipr", alias = "fpr")]
    feed_per_rev: Option<f64>,

    /// Run on the live tool instead of the spindle
    #[arg(long)]
    live: bool,
}

#[derive(Args, Debug)]
struct MillArgs {
    #[command(flatten)]
    speed: SpeedArgs,

    #[arg(long, default_value_t = 4)]
    flutes: u32,

    /// Chip load per tooth (IPT or mm/tooth)
    #[arg(long = "ipt", alias = "chipload")]
    chip_load: Option<f64>,

    /// Axial depth of cut
    #[arg(long)]
    doc: Option<f64>,

    /// Radial width of cut
    #[arg(long)]
    woc: Option<f64>,

    #[arg(long)]
    live: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Table {
    Materials,
    Inserts,
    Machines,
}

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Parse(String),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "web")]
    #[error("invalid listen address '{0}'")]
    Addr(String),

    #[cfg(feature = "web")]
    #[error("failed to start runtime: {0}")]
    Runtime(std::io::Error),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(AppError::Parse(rendered)) => {
            eprint!("{}", rendered);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load(),
    };
    let units = cli.units.unwrap_or(config.units);
    let presets = config.preset_library()?;
    debug!(%units, "configuration resolved");

    let context = |drive: Drive, auto_limit: bool| JobContext {
        machine: cli.machine.clone().or_else(|| config.machine.clone()),
        drive,
        max_load_pct: Some(cli.load.unwrap_or(config.max_load_pct)),
        auto_limit: auto_limit || config.auto_limit,
    };

    match &cli.command {
        Command::Turn(args) => {
            let req = TurningRequest {
                diameter: args.speed.diameter.into(),
                cutting_speed: args.speed.cutting_speed.into(),
                rpm: args.speed.rpm.into(),
                feed_per_rev: args.feed_per_rev.into(),
                feed_per_min: args.speed.feed_per_min.into(),
                depth_of_cut: args.doc,
                material: args.speed.material.clone(),
                insert: args.insert.clone(),
            };
            let job = Job::new(Operation::Turning(req), context(Drive::Spindle, args.speed.auto_limit));
            calculate(&presets, units, &job, cli.json)
        }
        Command::Drill(args) => {
            let req = DrillingRequest {
                diameter: args.speed.diameter.into(),
                cutting_speed: args.speed.cutting_speed.into(),
                rpm: args.speed.rpm.into(),
                feed_per_rev: args.feed_per_rev.into(),
                feed_per_min: args.speed.feed_per_min.into(),
                material: args.speed.material.clone(),
            };
            let job = Job::new(
                Operation::Drilling(req),
                context(drive(args.live), args.speed.auto_limit),
            );
            calculate(&presets, units, &job, cli.json)
        }
        Command::Mill(args) => {
            let req = MillingRequest {
                diameter: args.speed.diameter.into(),
                cutting_speed: args.speed.cutting_speed.into(),
                rpm: args.speed.rpm.into(),
                flutes: Some(args.flutes).into(),
                chip_load: args.chip_load.into(),
                feed_per_min: args.speed.feed_per_min.into(),
                axial_depth: args.doc,
                radial_width: args.woc,
                material: args.speed.material.clone(),
            };
            let job = Job::new(
                Operation::Milling(req),
                context(drive(args.live), args.speed.auto_limit),
            );
            calculate(&presets, units, &job, cli.json)
        }
        Command::Sheet { file } => {
            run_sheet(file, &presets, units, &context(Drive::Spindle, false), cli.json)
        }
        Command::Presets { table } => {
            list_presets(&presets, *table, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        #[cfg(feature = "web")]
        Command::Serve { addr } => {
            let addr = addr.clone().unwrap_or_else(|| config.server.addr.clone());
            let addr: std::net::SocketAddr =
                addr.parse().map_err(|_| AppError::Addr(addr.clone()))?;
            let runtime = tokio::runtime::Runtime::new().map_err(AppError::Runtime)?;
            let state = chipload::server::AppState::new(presets, units);
            runtime.block_on(chipload::server::serve(addr, state));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn drive(live: bool) -> Drive {
    if live {
        Drive::LiveTool
    } else {
        Drive::Spindle
    }
}

fn calculate(
    presets: &PresetLibrary,
    units: UnitSystem,
    job: &Job,
    json: bool,
) -> Result<ExitCode, AppError> {
    let report = Calculator::new(presets, units).run(job)?;
    print_report(&report, json)?;
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &Report, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

fn run_sheet(
    file: &Path,
    presets: &PresetLibrary,
    units: UnitSystem,
    defaults: &JobContext,
    json: bool,
) -> Result<ExitCode, AppError> {
    let source = std::fs::read_to_string(file).map_err(|source| AppError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let name = file.display().to_string();
    let parsed = parser::parse(&source).map_err(|e: ParseError| AppError::Parse(e.render(&name, &source)))?;

    let entries = sheet::run(&parsed, presets, units, defaults);
    let failed = entries.iter().filter(|e| e.is_error()).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                println!();
            }
            match &entry.outcome {
                Outcome::Report(report) => {
                    println!("[line {}]", entry.line);
                    print!("{}", report);
                }
                Outcome::Error(e) => {
                    println!("[line {}] {} failed: {}", entry.line, entry.operation, e);
                }
            }
        }
    }

    if failed > 0 {
        eprintln!("{} of {} jobs failed", failed, entries.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn list_presets(presets: &PresetLibrary, table: Option<Table>, json: bool) -> Result<(), AppError> {
    let show = |t: Table| table.map_or(true, |only| only == t);

    if json {
        let value = match table {
            None => serde_json::to_value(presets)?,
            Some(Table::Materials) => serde_json::to_value(&presets.materials)?,
            Some(Table::Inserts) => serde_json::to_value(&presets.inserts)?,
            Some(Table::Machines) => serde_json::to_value(&presets.machines)?,
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if show(Table::Materials) {
        println!("Materials");
        for (name, m) in &presets.materials {
            let mut ops = Vec::new();
            if m.turning.is_some() {
                ops.push("turning");
            }
            if m.drilling.is_some() {
                ops.push("drilling");
            }
            if m.milling.is_some() {
                ops.push("milling");
            }
            println!("  {:<20}{}", name, ops.join(", "));
        }
    }
    if show(Table::Inserts) {
        println!("Inserts");
        for (name, insert) in &presets.inserts {
            println!(
                "  {:<20}IPR {:.3}-{:.3}",
                name, insert.feed_per_rev.min, insert.feed_per_rev.max
            );
        }
    }
    if show(Table::Machines) {
        println!("Machines");
        for (name, machine) in &presets.machines {
            let mut line = format!(
                "  {:<20}{:<6}{:.0} RPM, {:.1} HP",
                name, machine.kind.to_string(), machine.spindle_max_rpm, machine.spindle_hp
            );
            if machine.has_live_tool() {
                line.push_str(&format!(
                    "; live tool {:.0} RPM, {:.1} HP",
                    machine.live_tool_max_rpm.unwrap_or(0.0),
                    machine.live_tool_hp.unwrap_or(0.0)
                ));
            }
            println!("{}", line);
        }
    }
    Ok(())
}
