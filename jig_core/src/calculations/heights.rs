//! # Jig Height Solver
//!
//! Forward model from a wheel, a projection and a target angle to the
//! height the user sets on the reference tool.
//!
//! ## Geometry
//!
//! ```text
//!   R  = D/2                      wheel radius
//!   jg = A - Ds/2                 apex to jig-centre tangent point
//!   CJ = Dj/2 + Ds/2              jig centre to tool centre
//!   CG = sqrt(jg² + CJ²)          apex to tool centre
//!   φ  = atan(CJ / jg)
//!   CA = sqrt(CG² + R² + 2·CG·R·sin(β - φ))   wheel centre to tool centre
//!   hr = CA - R + Ds/2            wheel top to tool top (rear reference)
//!   hn = sqrt(CA² - o²) - hc + Ds/2           base datum to tool top
//! ```
//!
//! The solver never fails: degenerate diameters can come back as `NaN`
//! or infinite values and the caller checks finiteness before display.
//!
//! ## Example
//!
//! ```rust
//! use jig_core::calculations::heights::{compute_heights, HeightsInput};
//! use jig_core::machine::{BaseSide, MachineConstants};
//!
//! let input = HeightsInput {
//!     base: BaseSide::Rear,
//!     wheel_diameter_mm: 250.0,
//!     projection_mm: 127.39,
//!     target_angle_deg: 16.0,
//!     jig_diameter_mm: 12.0,
//!     reference_tool_diameter_mm: 11.98,
//!     constants: MachineConstants::default(),
//!     micro_bump_deg: 0.0,
//!     angle_offset_deg: 0.0,
//! };
//!
//! let result = compute_heights(&input);
//! assert!((result.beta_eff_deg - 16.0).abs() < 1e-6);
//! println!("hn = {:.2} mm", result.hn_mm);
//! ```

use serde::{Deserialize, Serialize};

use crate::machine::{BaseSide, MachineConstants};
use crate::units::{Degrees, Radians};

/// Inputs for one forward solve.
///
/// ## JSON Example
///
/// ```json
/// {
///   "base": "rear",
///   "D": 250.0,
///   "A": 127.39,
///   "betaDeg": 16.0,
///   "Dj": 12.0,
///   "Ds": 11.98,
///   "constants": { "rear": { "hc": 29.0, "o": 50.0 }, "front": { "hc": 51.3, "o": 131.7 } }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightsInput {
    /// Base that hn is referenced to
    pub base: BaseSide,

    /// D: wheel diameter (mm)
    #[serde(rename = "D")]
    pub wheel_diameter_mm: f64,

    /// A: projection (mm)
    #[serde(rename = "A")]
    pub projection_mm: f64,

    /// β: target angle per side (degrees)
    #[serde(rename = "betaDeg")]
    pub target_angle_deg: f64,

    /// Dj: jig diameter (mm)
    #[serde(rename = "Dj")]
    pub jig_diameter_mm: f64,

    /// Ds: reference tool diameter (mm)
    #[serde(rename = "Ds")]
    pub reference_tool_diameter_mm: f64,

    pub constants: MachineConstants,

    /// Extra angle from an enabled micro-bevel (degrees)
    #[serde(rename = "microBumpDeg", default)]
    pub micro_bump_deg: f64,

    /// Per-wheel or per-step angle delta (degrees)
    #[serde(rename = "angleOffsetDeg", default)]
    pub angle_offset_deg: f64,
}

impl HeightsInput {
    /// Angle actually solved for: target + micro-bump + offset.
    pub fn total_angle_deg(&self) -> f64 {
        self.target_angle_deg + self.micro_bump_deg + self.angle_offset_deg
    }

    /// Same request referenced to another base.
    pub fn on_base(&self, base: BaseSide) -> HeightsInput {
        HeightsInput { base, ..*self }
    }

    /// Same request with a different target angle.
    pub fn at_angle(&self, target_angle_deg: f64) -> HeightsInput {
        HeightsInput {
            target_angle_deg,
            ..*self
        }
    }
}

/// Output of one forward solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightsResult {
    /// Wheel top to reference tool top (mm), rear-referenced
    #[serde(rename = "hr")]
    pub hr_mm: f64,

    /// Base datum to reference tool top (mm), for the requested base
    #[serde(rename = "hn")]
    pub hn_mm: f64,

    /// Angle recovered by inverting the solve (degrees)
    #[serde(rename = "betaEffDeg")]
    pub beta_eff_deg: f64,
}

impl HeightsResult {
    pub fn is_finite(&self) -> bool {
        self.hr_mm.is_finite() && self.hn_mm.is_finite() && self.beta_eff_deg.is_finite()
    }
}

/// Solve the jig heights for one wheel/angle/base combination.
pub fn compute_heights(input: &HeightsInput) -> HeightsResult {
    let r = input.wheel_diameter_mm / 2.0;
    let rs = input.reference_tool_diameter_mm / 2.0;

    let jg = input.projection_mm - rs;
    let cj = input.jig_diameter_mm / 2.0 + rs;
    let cg = (jg * jg + cj * cj).sqrt();
    let phi = (cj / jg).atan();

    let beta: Radians = Degrees(input.total_angle_deg()).into();

    let ca = (cg * cg + r * r + 2.0 * cg * r * (beta.0 - phi).sin()).sqrt();

    // hr does not depend on the base offsets
    let hr_mm = (ca - r) + rs;

    let base = input.constants.get(input.base);
    let hn_mm = base_height(ca, base.o_mm, base.hc_mm, rs);

    let arg = (ca * ca - cg * cg - r * r) / (2.0 * cg * r);
    let beta_eff: Degrees = Radians(arg.clamp(-1.0, 1.0).asin() + phi).into();

    HeightsResult {
        hr_mm,
        hn_mm,
        beta_eff_deg: beta_eff.0,
    }
}

/// Base datum to tool top for a given axle-to-tool centre distance.
///
/// `y = sqrt(max(CA² - o², 0))`, `hn = y - hc + Rs`. Shared with the
/// calibration residuals so both directions use one relation.
///
/// Only a negative radicand is clamped; a `NaN` one stays `NaN`.
pub(crate) fn base_height(center_distance_mm: f64, o_mm: f64, hc_mm: f64, tool_radius_mm: f64) -> f64 {
    let radicand = center_distance_mm * center_distance_mm - o_mm * o_mm;
    let y = if radicand < 0.0 { 0.0 } else { radicand.sqrt() };
    y - hc_mm + tool_radius_mm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::BaseConstants;

    fn default_input() -> HeightsInput {
        HeightsInput {
            base: BaseSide::Rear,
            wheel_diameter_mm: 250.0,
            projection_mm: 127.39,
            target_angle_deg: 16.0,
            jig_diameter_mm: 12.0,
            reference_tool_diameter_mm: 11.98,
            constants: MachineConstants::default(),
            micro_bump_deg: 0.0,
            angle_offset_deg: 0.0,
        }
    }

    #[test]
    fn test_default_configuration() {
        let result = compute_heights(&default_input());
        assert!(result.is_finite());
        // hr = CA - R + Rs, CA ≈ 189.71
        assert!((result.hr_mm - 70.703).abs() < 0.01);
        assert!((result.hn_mm - 159.995).abs() < 0.01);
        assert!((result.beta_eff_deg - 16.0).abs() < 1e-6);
    }

    #[test]
    fn test_front_base() {
        let result = compute_heights(&default_input().on_base(BaseSide::Front));
        assert!((result.hn_mm - 91.241).abs() < 0.01);
    }

    #[test]
    fn test_hr_independent_of_base() {
        let rear = compute_heights(&default_input());
        let front = compute_heights(&default_input().on_base(BaseSide::Front));
        assert_eq!(rear.hr_mm, front.hr_mm);
        assert_ne!(rear.hn_mm, front.hn_mm);
    }

    #[test]
    fn test_effective_angle_round_trip() {
        for &(beta, bump, offset) in &[(16.0, 0.0, 0.0), (20.0, 1.0, -0.5), (12.5, 0.0, 2.0), (30.0, 2.0, 0.0)] {
            let input = HeightsInput {
                target_angle_deg: beta,
                micro_bump_deg: bump,
                angle_offset_deg: offset,
                ..default_input()
            };
            let result = compute_heights(&input);
            assert!(
                (result.beta_eff_deg - (beta + bump + offset)).abs() < 1e-6,
                "beta {} + {} + {} recovered as {}",
                beta,
                bump,
                offset,
                result.beta_eff_deg
            );
        }
    }

    #[test]
    fn test_angle_perturbations_are_additive() {
        let summed = compute_heights(&default_input().at_angle(17.5));
        let split = compute_heights(&HeightsInput {
            micro_bump_deg: 1.0,
            angle_offset_deg: 0.5,
            ..default_input()
        });
        assert!((summed.hn_mm - split.hn_mm).abs() < 1e-9);
    }

    #[test]
    fn test_hn_monotonic_in_angle() {
        for base in [BaseSide::Rear, BaseSide::Front] {
            let mut previous = f64::NEG_INFINITY;
            let mut beta = 5.0;
            while beta <= 40.0 {
                let hn = compute_heights(&default_input().on_base(base).at_angle(beta)).hn_mm;
                assert!(hn > previous, "hn not increasing at {} deg on {}", beta, base);
                previous = hn;
                beta += 0.5;
            }
        }
    }

    #[test]
    fn test_smaller_wheel_needs_higher_hr() {
        let big = compute_heights(&default_input());
        let small = compute_heights(&HeightsInput {
            wheel_diameter_mm: 200.0,
            ..default_input()
        });
        assert!(small.hr_mm > big.hr_mm);
    }

    #[test]
    fn test_clamps_when_offset_exceeds_distance() {
        let input = HeightsInput {
            constants: MachineConstants::default()
                .with_base(BaseSide::Rear, BaseConstants::new(29.0, 500.0)),
            ..default_input()
        };
        let result = compute_heights(&input);
        // y clamps to 0 instead of NaN
        assert!((result.hn_mm - (-29.0 + 5.99)).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_input_propagates() {
        let result = compute_heights(&HeightsInput {
            wheel_diameter_mm: f64::NAN,
            ..default_input()
        });
        assert!(!result.is_finite());
        assert!(result.hn_mm.is_nan());

        let result = compute_heights(&HeightsInput {
            constants: MachineConstants::default()
                .with_base(BaseSide::Rear, BaseConstants::new(29.0, f64::NAN)),
            ..default_input()
        });
        assert!(result.hn_mm.is_nan());
        assert!(result.hr_mm.is_finite());

        // zero diameter must not panic
        let _ = compute_heights(&HeightsInput {
            wheel_diameter_mm: 0.0,
            ..default_input()
        });
    }

    #[test]
    fn test_base_height_keeps_nan() {
        assert!(base_height(f64::NAN, 50.0, 29.0, 5.99).is_nan());
        assert!(base_height(100.0, f64::NAN, 29.0, 5.99).is_nan());
        assert!(base_height(100.0, 50.0, f64::NAN, 5.99).is_nan());
        assert_eq!(base_height(40.0, 50.0, 29.0, 5.99), -29.0 + 5.99);
    }

    #[test]
    fn test_input_json_defaults() {
        let json = r#"{
            "base": "front",
            "D": 250.0,
            "A": 127.39,
            "betaDeg": 16.0,
            "Dj": 12.0,
            "Ds": 11.98,
            "constants": { "rear": { "hc": 29.0, "o": 50.0 }, "front": { "hc": 51.3, "o": 131.7 } }
        }"#;
        let input: HeightsInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.base, BaseSide::Front);
        assert_eq!(input.micro_bump_deg, 0.0);
        assert_eq!(input.angle_offset_deg, 0.0);
    }
}
