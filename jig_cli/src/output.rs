//! Text and JSON rendering for CLI results.

use serde::Serialize;

use jig_core::calculations::angle_error::AngleErrorQuality;
use jig_core::calculations::calibration::CalibrationRun;
use jig_core::calculations::heights::{HeightsInput, HeightsResult};
use jig_core::calculations::progression::WheelResult;
use jig_core::state::{AppState, HeightMode};
use jig_core::wheels::Wheel;

const RULE: &str = "═══════════════════════════════════════";

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: could not serialize output: {}", e),
    }
}

/// Two decimals, or a dash when the solve went non-finite.
fn mm(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        "—".to_string()
    }
}

/// Degrees without trailing zeros (16, 16.5, 16.25).
fn deg(value: f64) -> String {
    let s = format!("{:.2}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn print_heights(input: &HeightsInput, result: &HeightsResult, json: bool) {
    if json {
        #[derive(Serialize)]
        struct Out<'a> {
            input: &'a HeightsInput,
            result: &'a HeightsResult,
        }
        print_json(&Out { input, result });
        return;
    }

    println!("{}", RULE);
    println!("  JIG HEIGHTS");
    println!("{}", RULE);
    println!("  Wheel D:    {} mm", mm(input.wheel_diameter_mm));
    println!("  Angle β:    {}° (total {}°)", deg(input.target_angle_deg), deg(input.total_angle_deg()));
    println!("  Base:       {}", input.base.label());
    println!();
    println!("  hn = {} mm  (datum to tool top)", mm(result.hn_mm));
    println!("  hr = {} mm  (wheel to tool top, rear reference)", mm(result.hr_mm));
    println!("  βeff = {}°", deg(result.beta_eff_deg));
    if !result.is_finite() {
        println!();
        println!("  [WARN] Geometry is degenerate for these inputs.");
    }
    println!("{}", RULE);
}

pub fn print_table(state: &AppState, results: &[WheelResult], json: bool) {
    if json {
        print_json(&results);
        return;
    }
    if results.is_empty() {
        println!("No progression steps. Add some with `jigset step add <wheel-id>`.");
        return;
    }
    if let Some(preset) = state.active_preset() {
        println!("Preset: {}", preset.name);
    }

    let label = match state.height_mode {
        HeightMode::Hn => "hn (mm)",
        HeightMode::Hr => "hr (mm)",
    };
    println!(
        "{:>3}  {:<40} {:>7} {:>6}  {:<5} {:>9}",
        "#", "Wheel", "D (mm)", "Δβ°", "Base", label
    );
    for (i, r) in results.iter().enumerate() {
        println!(
            "{:>3}  {:<40} {:>7} {:>6}  {:<5} {:>9}",
            i + 1,
            r.wheel.name,
            mm(r.wheel.diameter_mm),
            deg(r.angle_offset_deg),
            r.base_for_hn.as_str(),
            mm(r.height_mm(state.height_mode))
        );
    }
}

pub fn print_wheels(wheels: &[Wheel], json: bool) {
    if json {
        print_json(&wheels);
        return;
    }
    for w in wheels {
        println!(
            "{}  {:<40} {:>7} mm  {}{}",
            w.id,
            w.name,
            mm(w.diameter_mm),
            w.base_for_hn,
            if w.is_honing { "  (honing)" } else { "" }
        );
    }
}

pub fn print_presets(state: &AppState, json: bool) {
    if json {
        print_json(&state.presets);
        return;
    }
    if state.presets.is_empty() {
        println!("No saved presets.");
        return;
    }
    let active = state.active_preset().map(|p| p.id.as_str());
    for p in &state.presets {
        println!(
            "{} {}  {:<30} {} steps",
            if Some(p.id.as_str()) == active { "*" } else { " " },
            p.id,
            p.name,
            p.steps.len()
        );
    }
}

pub fn print_settings(state: &AppState, json: bool) {
    let global = &state.global;
    if json {
        print_json(global);
        return;
    }
    println!("  Projection A:   {} mm", mm(global.projection_mm));
    println!("  Angle β:        {}°", deg(global.target_angle_deg));
    println!("  Tool Ds:        {} mm", mm(global.reference_tool_diameter_mm));
    println!("  Jig Dj:         {} mm", mm(global.jig.diameter_mm));
    if global.micro_bump.enabled {
        println!("  Micro-bevel:    +{}°", deg(global.micro_bump.bump_deg));
    } else {
        println!("  Micro-bevel:    off");
    }
    let mode = match state.height_mode {
        HeightMode::Hn => "hn",
        HeightMode::Hr => "hr",
    };
    println!("  Table shows:    {}", mode);
}

pub fn print_calibration(run: &CalibrationRun, json: bool) {
    if json {
        print_json(run);
        return;
    }

    let diag = &run.result.diagnostics;
    println!("{}", RULE);
    println!("  CALIBRATION ({} base)", run.snapshot.base);
    println!("{}", RULE);
    println!("  hc = {:.3} mm, o = {:.3} mm", run.result.hc_mm, run.result.o_mm);
    println!("  Max |residual| in hn: {:.3} mm", diag.max_abs_residual_mm);
    for r in &run.row_residuals {
        println!("    row {}: {:+.3} mm", r.row, r.residual_mm);
    }
    match run.angle_error_deg {
        Some(a) => {
            let quality = AngleErrorQuality::grade(a);
            println!(
                "  Worst-case angle error over your wheels ≈ {:.3}° ({})",
                a,
                quality.label()
            );
            if quality.should_remeasure() {
                println!("  Above 0.10°: consider re-measuring.");
            }
        }
        None => println!("  Angle error: not estimable (perfect fit or flat geometry)"),
    }
    println!("{}", RULE);
}
