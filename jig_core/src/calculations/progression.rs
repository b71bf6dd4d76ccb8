//! # Progression Results
//!
//! Runs the height solver over an ordered list of progression steps and
//! produces one display row per step.
//!
//! Each step is solved twice: once on the rear base for the wheel-referenced
//! `hr`, once on the step's effective base for `hn`. Steps pointing at a
//! wheel that no longer exists are dropped without error. Steps whose solve
//! goes non-finite are kept (the front end shows them as unavailable) and
//! logged.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::calculations::heights::{compute_heights, HeightsInput};
use crate::machine::{BaseSide, GlobalSettings, MachineConfig};
use crate::session::ProgressionStep;
use crate::state::HeightMode;
use crate::wheels::{find_wheel, Wheel};

/// One row of the progression table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelResult {
    pub wheel: Wheel,
    pub step: ProgressionStep,

    /// Base hn is referenced to after the honing rule
    #[serde(rename = "baseForHn")]
    pub base_for_hn: BaseSide,

    #[serde(rename = "orientationLabel")]
    pub orientation_label: String,

    /// Angle offset applied for this step (degrees)
    #[serde(rename = "angleOffsetDeg")]
    pub angle_offset_deg: f64,

    #[serde(rename = "betaEffDeg")]
    pub beta_eff_deg: f64,

    /// hr on the rear base (mm)
    #[serde(rename = "hrWheel")]
    pub hr_wheel_mm: f64,

    /// hn on `base_for_hn` (mm)
    #[serde(rename = "hnBase")]
    pub hn_base_mm: f64,
}

impl WheelResult {
    /// Height for the requested display mode.
    pub fn height_mm(&self, mode: HeightMode) -> f64 {
        match mode {
            HeightMode::Hn => self.hn_base_mm,
            HeightMode::Hr => self.hr_wheel_mm,
        }
    }
}

/// Solve every resolvable step, preserving step order.
///
/// ```rust
/// use jig_core::calculations::progression::compute_results_for_steps;
/// use jig_core::machine::{GlobalSettings, MachineConfig};
/// use jig_core::session::ProgressionStep;
/// use jig_core::wheels::Wheel;
///
/// let wheels = vec![Wheel::new("SG-250", 250.0)];
/// let steps = vec![
///     ProgressionStep::for_wheel(&wheels[0].id),
///     ProgressionStep::for_wheel("deleted-wheel"),
/// ];
///
/// let results = compute_results_for_steps(
///     &wheels,
///     &steps,
///     &GlobalSettings::default(),
///     &MachineConfig::default(),
/// );
/// assert_eq!(results.len(), 1);
/// ```
pub fn compute_results_for_steps(
    wheels: &[Wheel],
    steps: &[ProgressionStep],
    global: &GlobalSettings,
    machine: &MachineConfig,
) -> Vec<WheelResult> {
    let micro_bump_deg = global.micro_bump.effective_deg();

    steps
        .iter()
        .filter_map(|step| {
            let Some(wheel) = find_wheel(wheels, &step.wheel_id) else {
                debug!("dropping step {}: wheel {} not found", step.id, step.wheel_id);
                return None;
            };

            let base_for_hn = wheel.effective_base(step.base);
            let angle_offset_deg = step.angle_offset_deg.unwrap_or(wheel.angle_offset_deg);

            let input = HeightsInput {
                base: base_for_hn,
                wheel_diameter_mm: wheel.diameter_mm,
                projection_mm: global.projection_mm,
                target_angle_deg: global.target_angle_deg,
                jig_diameter_mm: machine.jig_diameter_mm,
                reference_tool_diameter_mm: machine.reference_tool_diameter_mm,
                constants: machine.constants,
                micro_bump_deg,
                angle_offset_deg,
            };

            let rear = compute_heights(&input.on_base(BaseSide::Rear));
            let on_base = compute_heights(&input);
            if !(rear.hr_mm.is_finite() && on_base.is_finite()) {
                warn!(
                    "degenerate solve for wheel '{}' (D = {} mm) on {} base",
                    wheel.name, wheel.diameter_mm, base_for_hn
                );
            }

            Some(WheelResult {
                wheel: wheel.clone(),
                step: step.clone(),
                base_for_hn,
                orientation_label: base_for_hn.label().to_string(),
                angle_offset_deg,
                beta_eff_deg: on_base.beta_eff_deg,
                hr_wheel_mm: rear.hr_mm,
                hn_base_mm: on_base.hn_mm,
            })
        })
        .collect()
}
