//! # Calibration Angle Error
//!
//! Converts a calibration's worst height residual (mm) into the grind
//! angle error (degrees) it would cause, using first-order propagation:
//!
//! ```text
//! Δβ ≈ Δhn / (∂hn/∂β)
//! ```
//!
//! `∂hn/∂β` is a central difference of [`compute_heights`] around the
//! global target angle. The estimate is taken over every wheel diameter the
//! user owns (or a stock 250/215/200 mm set) and the worst case reported.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::calculations::calibration::CalibrationDiagnostics;
use crate::calculations::heights::{compute_heights, HeightsInput};
use crate::machine::{BaseSide, GlobalSettings, MachineConfig};
use crate::wheels::Wheel;

/// Wheel diameters used when the user has no wheels configured.
pub const FALLBACK_WHEEL_DIAMETERS_MM: [f64; 3] = [250.0, 215.0, 200.0];

/// Half-width of the central difference (degrees).
const ANGLE_STEP_DEG: f64 = 0.05;

/// Below this |∂hn/∂β| (mm/deg) the geometry is too flat to invert.
const MIN_SENSITIVITY_MM_PER_DEG: f64 = 1e-6;

/// Local `∂hn/∂β` in mm per degree at the input's target angle.
pub fn height_sensitivity_mm_per_deg(input: &HeightsInput) -> f64 {
    let beta = input.target_angle_deg;
    let plus = compute_heights(&input.at_angle(beta + ANGLE_STEP_DEG)).hn_mm;
    let minus = compute_heights(&input.at_angle(beta - ANGLE_STEP_DEG)).hn_mm;
    (plus - minus) / (2.0 * ANGLE_STEP_DEG)
}

/// Worst-case angle error (degrees) implied by a calibration residual.
///
/// Returns `None` when the residual is not a positive finite number or when
/// no candidate wheel diameter gives a usable sensitivity.
///
/// ```rust
/// use jig_core::calculations::angle_error::estimate_max_angle_error_deg;
/// use jig_core::calculations::calibration::CalibrationDiagnostics;
/// use jig_core::machine::{BaseSide, GlobalSettings, MachineConfig};
///
/// let diagnostics = CalibrationDiagnostics {
///     residuals: vec![0.2, -0.1],
///     max_abs_residual_mm: 0.2,
/// };
/// let err = estimate_max_angle_error_deg(
///     &diagnostics,
///     BaseSide::Rear,
///     &GlobalSettings::default(),
///     &MachineConfig::default(),
///     &[],
/// );
/// assert!(err.unwrap() > 0.1);
/// ```
pub fn estimate_max_angle_error_deg(
    diagnostics: &CalibrationDiagnostics,
    base: BaseSide,
    global: &GlobalSettings,
    machine: &MachineConfig,
    wheels: &[Wheel],
) -> Option<f64> {
    let max_residual = diagnostics.max_abs_residual_mm;
    if !max_residual.is_finite() || max_residual <= 0.0 {
        return None;
    }

    let candidates: Vec<f64> = if wheels.is_empty() {
        FALLBACK_WHEEL_DIAMETERS_MM.to_vec()
    } else {
        wheels.iter().map(|w| w.diameter_mm).collect()
    };

    let mut worst: Option<f64> = None;
    for diameter_mm in candidates {
        if !diameter_mm.is_finite() || diameter_mm <= 0.0 {
            continue;
        }

        let input = HeightsInput {
            base,
            wheel_diameter_mm: diameter_mm,
            projection_mm: global.projection_mm,
            target_angle_deg: global.target_angle_deg,
            jig_diameter_mm: machine.jig_diameter_mm,
            reference_tool_diameter_mm: machine.reference_tool_diameter_mm,
            constants: machine.constants,
            micro_bump_deg: 0.0,
            angle_offset_deg: 0.0,
        };

        let sensitivity = height_sensitivity_mm_per_deg(&input);
        if !(sensitivity.abs() >= MIN_SENSITIVITY_MM_PER_DEG) {
            debug!("skipping D = {} mm: dhn/dβ = {}", diameter_mm, sensitivity);
            continue;
        }

        let angle_error = (max_residual / sensitivity).abs();
        worst = Some(worst.map_or(angle_error, |w: f64| w.max(angle_error)));
    }

    worst
}

/// Verdict on an estimated angle error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleErrorQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl AngleErrorQuality {
    /// Grade an angle error in degrees.
    pub fn grade(angle_error_deg: f64) -> Self {
        if angle_error_deg <= 0.05 {
            AngleErrorQuality::Excellent
        } else if angle_error_deg <= 0.1 {
            AngleErrorQuality::Good
        } else if angle_error_deg <= 0.2 {
            AngleErrorQuality::Fair
        } else {
            AngleErrorQuality::Poor
        }
    }

    /// Whether re-measuring is advisable (above 0.1°).
    pub fn should_remeasure(&self) -> bool {
        matches!(self, AngleErrorQuality::Fair | AngleErrorQuality::Poor)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AngleErrorQuality::Excellent => "Excellent",
            AngleErrorQuality::Good => "Good",
            AngleErrorQuality::Fair => "Fair",
            AngleErrorQuality::Poor => "Poor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{BaseConstants, MachineConstants};

    fn diagnostics(max_abs_residual_mm: f64) -> CalibrationDiagnostics {
        CalibrationDiagnostics {
            residuals: vec![max_abs_residual_mm],
            max_abs_residual_mm,
        }
    }

    fn estimate(residual: f64, wheels: &[Wheel]) -> Option<f64> {
        estimate_max_angle_error_deg(
            &diagnostics(residual),
            BaseSide::Rear,
            &GlobalSettings::default(),
            &MachineConfig::default(),
            wheels,
        )
    }

    #[test]
    fn test_fallback_diameters() {
        // dhn/dβ ≈ 1.43 / 1.33 / 1.28 mm/deg for 250 / 215 / 200 mm
        let err = estimate(0.2, &[]).unwrap();
        assert!((err - 0.1562).abs() < 1e-3, "err = {}", err);
    }

    #[test]
    fn test_worst_case_over_wheels() {
        let big_only = estimate(0.2, &[Wheel::new("SG-250", 250.0)]).unwrap();
        let with_small = estimate(
            0.2,
            &[Wheel::new("SG-250", 250.0), Wheel::new("SG-200", 200.0)],
        )
        .unwrap();
        assert!((big_only - 0.1398).abs() < 1e-3);
        assert!(with_small > big_only);
    }

    #[test]
    fn test_scales_linearly_with_residual() {
        let a = estimate(0.1, &[]).unwrap();
        let b = estimate(0.3, &[]).unwrap();
        assert!((b - 3.0 * a).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_residual_is_none() {
        assert!(estimate(0.0, &[]).is_none());
        assert!(estimate(-0.1, &[]).is_none());
        assert!(estimate(f64::NAN, &[]).is_none());
    }

    #[test]
    fn test_invalid_wheel_diameters_skipped() {
        let wheels = [Wheel::new("broken", 0.0), Wheel::new("nan", f64::NAN)];
        assert!(estimate(0.2, &wheels).is_none());
    }

    #[test]
    fn test_flat_geometry_is_none() {
        // o larger than any centre distance: hn is clamped flat in β
        let machine = MachineConfig::default().with_constants(
            MachineConstants::default().with_base(BaseSide::Rear, BaseConstants::new(29.0, 1000.0)),
        );
        let err = estimate_max_angle_error_deg(
            &diagnostics(0.2),
            BaseSide::Rear,
            &GlobalSettings::default(),
            &machine,
            &[],
        );
        assert!(err.is_none());
    }

    #[test]
    fn test_sensitivity_positive_at_default() {
        let input = HeightsInput {
            base: BaseSide::Front,
            wheel_diameter_mm: 215.0,
            projection_mm: 127.39,
            target_angle_deg: 16.0,
            jig_diameter_mm: 12.0,
            reference_tool_diameter_mm: 11.98,
            constants: MachineConstants::default(),
            micro_bump_deg: 0.0,
            angle_offset_deg: 0.0,
        };
        assert!(height_sensitivity_mm_per_deg(&input) > 0.5);
    }

    #[test]
    fn test_quality_grades() {
        assert_eq!(AngleErrorQuality::grade(0.03), AngleErrorQuality::Excellent);
        assert_eq!(AngleErrorQuality::grade(0.1), AngleErrorQuality::Good);
        assert_eq!(AngleErrorQuality::grade(0.15), AngleErrorQuality::Fair);
        assert_eq!(AngleErrorQuality::grade(0.5), AngleErrorQuality::Poor);
        assert!(!AngleErrorQuality::Good.should_remeasure());
        assert!(AngleErrorQuality::Fair.should_remeasure());
    }
}
