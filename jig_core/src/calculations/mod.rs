//! # Jig Calculations
//!
//! Pure, stateless functions over plain numeric inputs. None of them fail:
//! degenerate geometry comes back as non-finite numbers, insufficient data
//! as `None`, unresolvable steps are dropped.
//!
//! - [`heights`] - forward solve: wheel + angle → hr, hn, effective β
//! - [`calibration`] - inverse solve: measured rows → base offsets {hc, o}
//! - [`angle_error`] - calibration residual → worst-case angle error
//! - [`progression`] - height solver over an ordered list of steps

pub mod angle_error;
pub mod calibration;
pub mod heights;
pub mod progression;

// Re-export commonly used types
pub use angle_error::{estimate_max_angle_error_deg, AngleErrorQuality};
pub use calibration::{
    calibrate_base, run_calibration, CalibrationDiagnostics, CalibrationMeasurement, CalibrationRequest,
    CalibrationResult, CalibrationSnapshot, MeasuredPoint,
};
pub use heights::{compute_heights, HeightsInput, HeightsResult};
pub use progression::{compute_results_for_steps, WheelResult};
