//! # Unit Types
//!
//! Angle wrappers for the jig geometry. All angles are degrees per side
//! (half-angle, not the included angle); radians only appear inside the
//! trigonometry. Lengths are plain millimetre `f64`s.
//!
//! Struct fields stay plain `f64` with a unit suffix (`diameter_mm`,
//! `target_angle_deg`) so the JSON stays flat.
//!
//! ## Example
//!
//! ```rust
//! use jig_core::units::{Degrees, Radians};
//!
//! let angle = Degrees(180.0);
//! let rad: Radians = angle.into();
//! assert!((rad.0 - std::f64::consts::PI).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};

/// Angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Degrees(pub f64);

/// Angle in radians
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Radians(pub f64);

impl From<Degrees> for Radians {
    fn from(deg: Degrees) -> Self {
        Radians(deg_to_rad(deg.0))
    }
}

impl From<Radians> for Degrees {
    fn from(rad: Radians) -> Self {
        Degrees(rad_to_deg(rad.0))
    }
}

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / std::f64::consts::PI
}
