//! # Base Calibration
//!
//! Back-solves the two offsets `{hc, o}` of one base from a handful of
//! physical measurements taken with the axle (diameter `Da`) and the
//! reference tool (diameter `Ds`). No wheel and no angle are involved.
//!
//! ## Model
//!
//! For each measured row the centre distance is `CA = CAo - Ra - Rs` and
//! the forward relation is `CA² - (hn + t)² = o²` with `t = hc - Rs`.
//! Subtracting row 0 from row `i` eliminates `o`:
//!
//! ```text
//! t_i = [(CA_0² - CA_i²) - (hn_0² - hn_i²)] / [2·(hn_0 - hn_i)]
//! ```
//!
//! `t` is the mean of the `t_i`, and `o² ` the mean of the positive
//! `CA_i² - (hn_i + t)²`. Row 0 anchors every pair, so the result depends on
//! row order and an outlier in row 0 weighs on every estimate.
//!
//! ## Example
//!
//! ```rust
//! use jig_core::calculations::calibration::{calibrate_base, MeasuredPoint};
//!
//! let points = [
//!     MeasuredPoint { hn_mm: 120.0, cao_mm: 175.0 },
//!     MeasuredPoint { hn_mm: 150.0, cao_mm: 202.0 },
//!     MeasuredPoint { hn_mm: 180.0, cao_mm: 230.0 },
//! ];
//!
//! let result = calibrate_base(&points, 12.0, 11.98).expect("three usable rows");
//! println!("hc = {:.3} mm, o = {:.3} mm", result.hc_mm, result.o_mm);
//! println!("max |residual| = {:.3} mm", result.diagnostics.max_abs_residual_mm);
//! ```

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::angle_error::estimate_max_angle_error_deg;
use crate::calculations::heights::base_height;
use crate::errors::{CalcError, CalcResult};
use crate::machine::{BaseConstants, BaseSide, GlobalSettings, MachineConfig};
use crate::numbers::parse_finite;
use crate::wheels::Wheel;

/// Pairs whose heights differ by less than this are skipped.
const MIN_HEIGHT_SEPARATION_MM: f64 = 1e-9;

/// One measurement row as typed by the user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationMeasurement {
    /// Datum to reference tool top (mm), as entered
    pub hn: String,

    /// Outer-to-outer caliper span axle ↔ reference tool (mm), as entered
    #[serde(rename = "CAo")]
    pub cao: String,
}

impl CalibrationMeasurement {
    pub fn new(hn: impl Into<String>, cao: impl Into<String>) -> Self {
        CalibrationMeasurement {
            hn: hn.into(),
            cao: cao.into(),
        }
    }

    /// Numeric form, or `None` if either field is empty or not a finite number.
    pub fn parsed(&self) -> Option<MeasuredPoint> {
        Some(MeasuredPoint {
            hn_mm: parse_finite(&self.hn)?,
            cao_mm: parse_finite(&self.cao)?,
        })
    }
}

/// One measurement row in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasuredPoint {
    #[serde(rename = "hn")]
    pub hn_mm: f64,
    #[serde(rename = "CAo")]
    pub cao_mm: f64,
}

impl MeasuredPoint {
    fn is_finite(&self) -> bool {
        self.hn_mm.is_finite() && self.cao_mm.is_finite()
    }
}

/// Fit quality of a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationDiagnostics {
    /// Measured minus predicted hn per used row (mm)
    pub residuals: Vec<f64>,

    #[serde(rename = "maxAbsResidualMm")]
    pub max_abs_residual_mm: f64,
}

/// Solved constants for one base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    #[serde(rename = "hc")]
    pub hc_mm: f64,

    #[serde(rename = "o")]
    pub o_mm: f64,

    pub diagnostics: CalibrationDiagnostics,
}

impl CalibrationResult {
    pub fn constants(&self) -> BaseConstants {
        BaseConstants::new(self.hc_mm, self.o_mm)
    }
}

/// Solve `{hc, o}` for one base from measured rows.
///
/// Rows with a non-finite field are dropped. Returns `None` with fewer than
/// two usable rows, when every row has the same height as row 0, or when no
/// row yields a positive `o²`.
pub fn calibrate_base(
    points: &[MeasuredPoint],
    axle_diameter_mm: f64,
    reference_tool_diameter_mm: f64,
) -> Option<CalibrationResult> {
    let ra = axle_diameter_mm / 2.0;
    let rs = reference_tool_diameter_mm / 2.0;

    // (hn, CA) for usable rows
    let rows: Vec<(f64, f64)> = points
        .iter()
        .filter(|p| p.is_finite())
        .map(|p| (p.hn_mm, p.cao_mm - ra - rs))
        .collect();

    if rows.len() < 2 {
        debug!("calibration needs 2 usable rows, got {}", rows.len());
        return None;
    }

    let (hn0, ca0) = rows[0];
    let t_values: Vec<f64> = rows[1..]
        .iter()
        .filter_map(|&(hni, cai)| {
            if (hni - hn0).abs() < MIN_HEIGHT_SEPARATION_MM {
                debug!("skipping calibration row with hn {} equal to anchor", hni);
                return None;
            }
            let num = (ca0 * ca0 - cai * cai) - (hn0 * hn0 - hni * hni);
            let den = 2.0 * (hn0 - hni);
            Some(num / den)
        })
        .collect();

    if t_values.is_empty() {
        warn!("calibration rows all share the anchor height; cannot solve hc");
        return None;
    }

    let t = mean(&t_values);
    let hc_mm = t + rs;

    let o2_values: Vec<f64> = rows
        .iter()
        .map(|&(hn, ca)| {
            let y = hn + t;
            ca * ca - y * y
        })
        .filter(|&o2| o2 > 0.0)
        .collect();

    if o2_values.is_empty() {
        warn!("no calibration row gives a positive o²; measurements inconsistent");
        return None;
    }
    if o2_values.len() < rows.len() {
        debug!(
            "dropped {} calibration rows with non-positive o²",
            rows.len() - o2_values.len()
        );
    }

    let o_mm = mean(&o2_values).sqrt();

    let residuals: Vec<f64> = rows
        .iter()
        .map(|&(hn, ca)| hn - base_height(ca, o_mm, hc_mm, rs))
        .collect();
    let max_abs_residual_mm = residuals.iter().fold(0.0_f64, |m, r| m.max(r.abs()));

    Some(CalibrationResult {
        hc_mm,
        o_mm,
        diagnostics: CalibrationDiagnostics {
            residuals,
            max_abs_residual_mm,
        },
    })
}

/// [`calibrate_base`] over text rows; unparseable rows are dropped.
pub fn calibrate_measurements(
    rows: &[CalibrationMeasurement],
    axle_diameter_mm: f64,
    reference_tool_diameter_mm: f64,
) -> Option<CalibrationResult> {
    let points: Vec<MeasuredPoint> = rows.iter().filter_map(CalibrationMeasurement::parsed).collect();
    calibrate_base(&points, axle_diameter_mm, reference_tool_diameter_mm)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

// ============================================================================
// Calibration workflow
// ============================================================================

/// Everything needed for one calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRequest {
    pub base: BaseSide,

    /// Optional user label for the resulting snapshot
    #[serde(default)]
    pub name: String,

    /// Da (mm)
    #[serde(rename = "Da")]
    pub axle_diameter_mm: f64,

    /// Ds (mm)
    #[serde(rename = "Ds")]
    pub reference_tool_diameter_mm: f64,

    pub measurements: Vec<CalibrationMeasurement>,
}

impl CalibrationRequest {
    /// Check every field, collecting all problems at once.
    pub fn validate(&self) -> CalcResult<()> {
        let mut missing = Vec::new();

        if !(self.axle_diameter_mm.is_finite() && self.axle_diameter_mm > 0.0) {
            missing.push("Axle diameter".to_string());
        }
        if !(self.reference_tool_diameter_mm.is_finite() && self.reference_tool_diameter_mm > 0.0) {
            missing.push("Reference tool diameter".to_string());
        }

        let mut complete_rows = 0;
        for (idx, row) in self.measurements.iter().enumerate() {
            let hn_ok = parse_finite(&row.hn).is_some();
            let cao_ok = parse_finite(&row.cao).is_some();
            if !hn_ok {
                missing.push(format!("Row {} hn", idx + 1));
            }
            if !cao_ok {
                missing.push(format!("Row {} CAo", idx + 1));
            }
            if hn_ok && cao_ok {
                complete_rows += 1;
            }
        }
        if complete_rows < 2 {
            missing.push("At least 2 complete measurement rows".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CalcError::InvalidCalibration { missing })
        }
    }
}

/// Residual of one entered row, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowResidual {
    pub row: usize,
    #[serde(rename = "residualMm")]
    pub residual_mm: f64,
}

/// Stored record of a calibration run, kept for later review or apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSnapshot {
    pub id: String,
    pub base: BaseSide,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "hc")]
    pub hc_mm: f64,
    #[serde(rename = "o")]
    pub o_mm: f64,
    pub measurements: Vec<CalibrationMeasurement>,
    pub diagnostics: CalibrationDiagnostics,
    #[serde(rename = "angleErrorDeg")]
    pub angle_error_deg: Option<f64>,
    /// Rows used by the solver
    pub count: usize,
    #[serde(rename = "Da")]
    pub axle_diameter_mm: f64,
    #[serde(rename = "Ds")]
    pub reference_tool_diameter_mm: f64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl CalibrationSnapshot {
    pub fn constants(&self) -> BaseConstants {
        BaseConstants::new(self.hc_mm, self.o_mm)
    }
}

/// Outcome of [`run_calibration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRun {
    pub result: CalibrationResult,

    /// Worst-case angle error over the wheel set, if estimable
    pub angle_error_deg: Option<f64>,

    pub row_residuals: Vec<RowResidual>,

    /// Machine with the solved base merged in
    pub proposed_machine: MachineConfig,

    pub snapshot: CalibrationSnapshot,
}

/// Validate, solve, estimate the angle error and build a snapshot.
///
/// The angle error is evaluated against the proposed constants, not the
/// currently active ones. Nothing is applied; see
/// [`crate::state::AppState::apply_calibration`].
pub fn run_calibration(
    request: &CalibrationRequest,
    machine: &MachineConfig,
    global: &GlobalSettings,
    wheels: &[Wheel],
) -> CalcResult<CalibrationRun> {
    request.validate()?;

    let result = calibrate_measurements(
        &request.measurements,
        request.axle_diameter_mm,
        request.reference_tool_diameter_mm,
    )
    .ok_or_else(|| CalcError::calibration_failed("Need at least two valid hn + CAo rows with distinct heights"))?;

    // Residuals are indexed by used rows; map back to entered rows
    let row_residuals: Vec<RowResidual> = request
        .measurements
        .iter()
        .enumerate()
        .filter(|(_, row)| row.parsed().is_some())
        .zip(result.diagnostics.residuals.iter())
        .map(|((idx, _), &residual_mm)| RowResidual {
            row: idx + 1,
            residual_mm,
        })
        .collect();

    let proposed_machine =
        machine.with_constants(machine.constants.with_base(request.base, result.constants()));

    let angle_error_deg = estimate_max_angle_error_deg(
        &result.diagnostics,
        request.base,
        global,
        &proposed_machine,
        wheels,
    );

    let snapshot = CalibrationSnapshot {
        id: format!("calib-{}", Uuid::new_v4()),
        base: request.base,
        name: request.name.trim().to_string(),
        hc_mm: result.hc_mm,
        o_mm: result.o_mm,
        measurements: request.measurements.clone(),
        diagnostics: result.diagnostics.clone(),
        angle_error_deg,
        count: result.diagnostics.residuals.len(),
        axle_diameter_mm: request.axle_diameter_mm,
        reference_tool_diameter_mm: request.reference_tool_diameter_mm,
        created_at: Utc::now(),
    };

    Ok(CalibrationRun {
        result,
        angle_error_deg,
        row_residuals,
        proposed_machine,
        snapshot,
    })
}
