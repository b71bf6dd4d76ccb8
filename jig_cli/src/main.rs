//! # Jigset CLI
//!
//! Terminal front end for jig_core: one-off height solves, the progression
//! table for the saved session, wheel and preset management, and base
//! calibration.
//!
//! State lives in a JSON file (`--state`, `JIG_STATE`, default
//! `jigset.json`). Set `RUST_LOG=debug` to see solver diagnostics.

mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::info;

use jig_core::calculations::calibration::{run_calibration, CalibrationMeasurement, CalibrationRequest};
use jig_core::calculations::heights::{compute_heights, HeightsInput};
use jig_core::errors::{CalcError, CalcResult};
use jig_core::file_io::{load_or_default, load_state, save_state};
use jig_core::machine::{BaseSide, DEFAULT_AXLE_DIAMETER_MM};
use jig_core::session::StepPatch;
use jig_core::state::{export_state, AppState, HeightMode};
use jig_core::wheels::{find_wheel, Wheel};

#[derive(Parser, Debug)]
#[command(name = "jigset", version, about = "Sharpening jig height calculator")]
struct Cli {
    /// State file
    #[arg(long, global = true, env = "JIG_STATE", default_value = "jigset.json")]
    state: PathBuf,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a state file with factory defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show or change the global setup values
    Settings(SettingsArgs),

    /// Solve heights for one wheel
    Heights(HeightsArgs),

    /// Heights for every step of the saved progression
    Table,

    /// Manage the progression steps
    #[command(subcommand)]
    Step(StepCommand),

    /// Manage saved progressions
    #[command(subcommand)]
    Preset(PresetCommand),

    /// List, add or delete wheels
    #[command(alias = "wheels")]
    Wheel {
        #[command(subcommand)]
        action: Option<WheelCommand>,
    },

    /// Solve base constants from measured rows
    Calibrate(CalibrateArgs),

    /// Merge a stored calibration snapshot into the machine constants
    Apply {
        snapshot_id: String,
    },

    /// Print the state as JSON, or write it to a file
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replace the state with an exported file
    Import {
        file: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct SettingsArgs {
    /// Projection A (mm)
    #[arg(long)]
    projection: Option<f64>,

    /// Target angle per side (deg)
    #[arg(long, short = 'a')]
    angle: Option<f64>,

    /// Reference tool diameter Ds (mm)
    #[arg(long)]
    tool: Option<f64>,

    /// Jig diameter Dj (mm)
    #[arg(long)]
    jig: Option<f64>,

    /// Enable a micro-bevel bump of this many degrees
    #[arg(long, allow_negative_numbers = true, conflicts_with = "no_bump")]
    bump: Option<f64>,

    /// Disable the micro-bevel bump
    #[arg(long)]
    no_bump: bool,

    /// Height shown in the table: hn or hr
    #[arg(long)]
    mode: Option<HeightMode>,
}

#[derive(clap::Args, Debug)]
struct HeightsArgs {
    /// Wheel diameter D (mm)
    #[arg(long, short = 'd', conflicts_with = "wheel_id")]
    diameter: Option<f64>,

    /// Use a configured wheel (diameter, offset, base)
    #[arg(long)]
    wheel_id: Option<String>,

    /// Base for hn: rear or front
    #[arg(long, short = 'b')]
    base: Option<BaseSide>,

    /// Target angle per side (deg)
    #[arg(long, short = 'a')]
    angle: Option<f64>,

    /// Projection A (mm)
    #[arg(long)]
    projection: Option<f64>,

    /// Jig diameter Dj (mm)
    #[arg(long)]
    jig: Option<f64>,

    /// Reference tool diameter Ds (mm)
    #[arg(long)]
    tool: Option<f64>,

    /// Micro-bevel bump (deg); defaults to the saved setting
    #[arg(long, allow_negative_numbers = true)]
    bump: Option<f64>,

    /// Angle offset (deg)
    #[arg(long, allow_negative_numbers = true)]
    offset: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum StepCommand {
    /// Append a step on a wheel
    Add(StepAddArgs),

    /// Change a step's base, offset or notes
    Edit(StepEditArgs),

    /// Remove a step
    Remove {
        step_id: String,
    },

    /// Move the step at a table position (from 1) up or down
    Move {
        position: usize,

        /// Places to move; negative moves up
        #[arg(allow_negative_numbers = true)]
        delta: isize,
    },

    /// Remove every step
    Clear,
}

#[derive(clap::Args, Debug)]
struct StepAddArgs {
    wheel_id: String,

    /// Base override; the wheel's default otherwise
    #[arg(long, short = 'b')]
    base: Option<BaseSide>,

    /// Angle offset override (deg); the wheel's default otherwise
    #[arg(long, allow_negative_numbers = true)]
    offset: Option<f64>,

    #[arg(long, default_value = "")]
    notes: String,
}

#[derive(clap::Args, Debug)]
struct StepEditArgs {
    step_id: String,

    #[arg(long, short = 'b', conflicts_with = "inherit_base")]
    base: Option<BaseSide>,

    /// Go back to the wheel's default base
    #[arg(long)]
    inherit_base: bool,

    #[arg(long, allow_negative_numbers = true, conflicts_with = "inherit_offset")]
    offset: Option<f64>,

    /// Go back to the wheel's default offset
    #[arg(long)]
    inherit_offset: bool,

    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand, Debug)]
enum PresetCommand {
    /// List saved presets
    List,

    /// Save the current progression under a name
    Save {
        name: String,
    },

    /// Replace the progression with a preset (id or name)
    Load {
        preset: String,
    },
}

#[derive(Subcommand, Debug)]
enum WheelCommand {
    /// List configured wheels
    List,

    /// Add a wheel
    Add(WheelAddArgs),

    /// Delete a wheel and every step that uses it
    Delete {
        wheel_id: String,
    },
}

#[derive(clap::Args, Debug)]
struct WheelAddArgs {
    name: String,

    /// Diameter D (mm)
    #[arg(long, short = 'd')]
    diameter: f64,

    /// Default angle offset (deg)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset: f64,

    /// Default base for hn
    #[arg(long, short = 'b', default_value = "rear")]
    base: BaseSide,

    /// Honing wheel (always front base)
    #[arg(long)]
    honing: bool,

    #[arg(long)]
    grit: Option<String>,
}

#[derive(clap::Args, Debug)]
struct CalibrateArgs {
    /// Base being calibrated
    #[arg(long, short = 'b')]
    base: BaseSide,

    /// Axle diameter Da (mm)
    #[arg(long, default_value_t = DEFAULT_AXLE_DIAMETER_MM)]
    axle: f64,

    /// Reference tool diameter Ds (mm); defaults to the saved setting
    #[arg(long)]
    tool: Option<f64>,

    /// Measurement as HN:CAO, repeat 2-5 times
    #[arg(long = "row", short = 'r', required = true, value_parser = parse_row)]
    rows: Vec<CalibrationMeasurement>,

    /// Label for the stored snapshot
    #[arg(long, default_value = "")]
    name: String,

    /// Apply the result to the machine immediately
    #[arg(long)]
    apply: bool,
}

/// `"159.9:201.3"` → measurement with the raw text kept.
fn parse_row(s: &str) -> Result<CalibrationMeasurement, String> {
    let (hn, cao) = s
        .split_once(':')
        .ok_or_else(|| format!("expected HN:CAO, got '{}'", s))?;
    Ok(CalibrationMeasurement::new(hn.trim(), cao.trim()))
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if cli.json {
                if let Ok(json) = serde_json::to_string_pretty(&e) {
                    eprintln!("{}", json);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> CalcResult<()> {
    match &cli.command {
        Commands::Init { force } => {
            if cli.state.exists() && !force {
                return Err(CalcError::file_error(
                    "init",
                    cli.state.display().to_string(),
                    "file exists (use --force to overwrite)",
                ));
            }
            save_state(&AppState::default(), &cli.state)?;
            println!("Wrote defaults to {}", cli.state.display());
            Ok(())
        }
        Commands::Settings(args) => {
            let mut state = load_or_default(&cli.state)?;
            if apply_settings(&mut state, args)? {
                save_state(&state, &cli.state)?;
            }
            output::print_settings(&state, cli.json);
            Ok(())
        }
        Commands::Heights(args) => {
            let state = load_or_default(&cli.state)?;
            let input = heights_input(&state, args)?;
            let result = compute_heights(&input);
            output::print_heights(&input, &result, cli.json);
            Ok(())
        }
        Commands::Table => {
            let state = load_or_default(&cli.state)?;
            output::print_table(&state, &state.results(), cli.json);
            Ok(())
        }
        Commands::Step(command) => update_state(cli, |state| {
            let message = step_command(state, command)?;
            println!("{}", message);
            Ok(())
        }),
        Commands::Preset(PresetCommand::List) => {
            let state = load_or_default(&cli.state)?;
            output::print_presets(&state, cli.json);
            Ok(())
        }
        Commands::Preset(PresetCommand::Save { name }) => update_state(cli, |state| {
            let id = state.save_preset(name)?;
            println!("Saved preset '{}' ({})", name.trim(), id);
            Ok(())
        }),
        Commands::Preset(PresetCommand::Load { preset }) => update_state(cli, |state| {
            state.load_preset(preset)?;
            println!("Loaded {} steps from '{}'", state.session.len(), preset);
            Ok(())
        }),
        Commands::Wheel { action: None } | Commands::Wheel { action: Some(WheelCommand::List) } => {
            let state = load_or_default(&cli.state)?;
            output::print_wheels(&state.wheels, cli.json);
            Ok(())
        }
        Commands::Wheel { action: Some(WheelCommand::Add(args)) } => update_state(cli, |state| {
            let id = state.add_wheel(wheel_from_args(args))?;
            println!("Added wheel {}", id);
            Ok(())
        }),
        Commands::Wheel { action: Some(WheelCommand::Delete { wheel_id }) } => update_state(cli, |state| {
            let steps_before = state.session.len();
            let wheel = state.delete_wheel(wheel_id)?;
            println!(
                "Deleted wheel '{}' and {} steps using it",
                wheel.name,
                steps_before - state.session.len()
            );
            Ok(())
        }),
        Commands::Calibrate(args) => calibrate(cli, args),
        Commands::Apply { snapshot_id } => {
            let mut state = load_state(&cli.state)?;
            let base = state.apply_calibration(snapshot_id)?;
            save_state(&state, &cli.state)?;
            let c = state.constants.get(base);
            println!("Applied {} to {} base: hc = {:.3} mm, o = {:.3} mm", snapshot_id, base, c.hc_mm, c.o_mm);
            Ok(())
        }
        Commands::Export { out } => {
            let state = load_or_default(&cli.state)?;
            match out {
                Some(path) => {
                    save_state(&state, path)?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{}", export_state(&state)?),
            }
            Ok(())
        }
        Commands::Import { file } => {
            let state = load_state(file)?;
            save_state(&state, &cli.state)?;
            info!("imported {} into {}", file.display(), cli.state.display());
            println!(
                "Imported {} wheels, {} steps, {} presets",
                state.wheels.len(),
                state.session.len(),
                state.presets.len()
            );
            Ok(())
        }
    }
}

/// Load, change and save the state file.
fn update_state<F>(cli: &Cli, change: F) -> CalcResult<()>
where
    F: FnOnce(&mut AppState) -> CalcResult<()>,
{
    let mut state = load_or_default(&cli.state)?;
    change(&mut state)?;
    save_state(&state, &cli.state)
}

/// Apply `settings` flags; returns whether anything changed.
fn apply_settings(state: &mut AppState, args: &SettingsArgs) -> CalcResult<bool> {
    let mut changed = false;
    let lengths = [
        ("projection", args.projection, &mut state.global.projection_mm),
        ("tool", args.tool, &mut state.global.reference_tool_diameter_mm),
        ("jig", args.jig, &mut state.global.jig.diameter_mm),
    ];
    for (field, value, target) in lengths {
        if let Some(v) = value {
            if !(v.is_finite() && v > 0.0) {
                return Err(CalcError::invalid_input(field, v.to_string(), "Must be a positive number"));
            }
            *target = v;
            changed = true;
        }
    }
    if let Some(angle) = args.angle {
        if !(angle.is_finite() && angle > 0.0 && angle < 90.0) {
            return Err(CalcError::invalid_input("angle", angle.to_string(), "Must be between 0 and 90 degrees"));
        }
        state.global.target_angle_deg = angle;
        changed = true;
    }
    if let Some(bump) = args.bump {
        if !bump.is_finite() {
            return Err(CalcError::invalid_input("bump", bump.to_string(), "Must be a number"));
        }
        state.global.micro_bump.enabled = true;
        state.global.micro_bump.bump_deg = bump;
        changed = true;
    }
    if args.no_bump {
        state.global.micro_bump.enabled = false;
        changed = true;
    }
    if let Some(mode) = args.mode {
        state.height_mode = mode;
        changed = true;
    }
    Ok(changed)
}

/// Run a `step` subcommand and describe what it did.
fn step_command(state: &mut AppState, command: &StepCommand) -> CalcResult<String> {
    match command {
        StepCommand::Add(args) => {
            let wheel = find_wheel(&state.wheels, &args.wheel_id)
                .ok_or_else(|| CalcError::wheel_not_found(&args.wheel_id))?;
            let name = wheel.name.clone();
            let id = state.session.add_step(args.wheel_id.clone());
            state.session.update_step(
                &id,
                StepPatch {
                    base: Some(args.base),
                    angle_offset_deg: Some(args.offset),
                    notes: Some(args.notes.clone()),
                    ..StepPatch::default()
                },
            )?;
            Ok(format!("Added step {} on '{}' at position {}", id, name, state.session.len()))
        }
        StepCommand::Edit(args) => {
            let patch = StepPatch {
                wheel_id: None,
                base: if args.inherit_base { Some(None) } else { args.base.map(Some) },
                angle_offset_deg: if args.inherit_offset {
                    Some(None)
                } else {
                    args.offset.map(Some)
                },
                notes: args.notes.clone(),
            };
            state.session.update_step(&args.step_id, patch)?;
            Ok(format!("Updated step {}", args.step_id))
        }
        StepCommand::Remove { step_id } => {
            state.session.remove_step(step_id).ok_or_else(|| CalcError::StepNotFound {
                step_id: step_id.clone(),
            })?;
            Ok(format!("Removed step {}", step_id))
        }
        StepCommand::Move { position, delta } => {
            let moved = match position.checked_sub(1) {
                Some(index) => state.session.move_step(index, *delta),
                None => false,
            };
            if !moved {
                return Err(CalcError::invalid_input(
                    "position",
                    format!("{} by {}", position, delta),
                    format!("Progression has {} steps", state.session.len()),
                ));
            }
            Ok(format!("Moved step {} by {}", position, delta))
        }
        StepCommand::Clear => {
            let count = state.session.len();
            state.session.clear();
            Ok(format!("Removed {} steps", count))
        }
    }
}

fn wheel_from_args(args: &WheelAddArgs) -> Wheel {
    let mut wheel = if args.honing {
        Wheel::honing(args.name.trim(), args.diameter)
    } else {
        Wheel {
            base_for_hn: args.base,
            ..Wheel::new(args.name.trim(), args.diameter)
        }
    };
    wheel.angle_offset_deg = args.offset;
    wheel.grit = args.grit.clone();
    wheel
}

/// Build a solve request from saved settings plus command-line overrides.
fn heights_input(state: &AppState, args: &HeightsArgs) -> CalcResult<HeightsInput> {
    let wheel = match &args.wheel_id {
        Some(id) => Some(find_wheel(&state.wheels, id).ok_or_else(|| CalcError::wheel_not_found(id))?),
        None => None,
    };

    let wheel_diameter_mm = match (wheel, args.diameter) {
        (Some(w), _) => w.diameter_mm,
        (None, Some(d)) => d,
        (None, None) => return Err(CalcError::missing_field("--diameter or --wheel-id")),
    };

    let base = match wheel {
        Some(w) => w.effective_base(args.base),
        None => args.base.unwrap_or(BaseSide::Rear),
    };

    let angle_offset_deg = args
        .offset
        .or(wheel.map(|w| w.angle_offset_deg))
        .unwrap_or(0.0);

    Ok(HeightsInput {
        base,
        wheel_diameter_mm,
        projection_mm: args.projection.unwrap_or(state.global.projection_mm),
        target_angle_deg: args.angle.unwrap_or(state.global.target_angle_deg),
        jig_diameter_mm: args.jig.unwrap_or(state.global.jig.diameter_mm),
        reference_tool_diameter_mm: args.tool.unwrap_or(state.global.reference_tool_diameter_mm),
        constants: state.constants,
        micro_bump_deg: args.bump.unwrap_or(state.global.micro_bump.effective_deg()),
        angle_offset_deg,
    })
}

fn calibrate(cli: &Cli, args: &CalibrateArgs) -> CalcResult<()> {
    let mut state = load_or_default(&cli.state)?;

    let request = CalibrationRequest {
        base: args.base,
        name: args.name.clone(),
        axle_diameter_mm: args.axle,
        reference_tool_diameter_mm: args.tool.unwrap_or(state.global.reference_tool_diameter_mm),
        measurements: args.rows.clone(),
    };

    let run = run_calibration(&request, &state.machine(), &state.global, &state.wheels)?;
    output::print_calibration(&run, cli.json);

    let snapshot_id = state.record_calibration(&run);
    if args.apply {
        state.apply_calibration(&snapshot_id)?;
        println!("Applied to {} base.", args.base);
    } else if !cli.json {
        println!("Saved as {} (run `jigset apply {}` to use it).", snapshot_id, snapshot_id);
    }
    save_state(&state, &cli.state)
}
