//! # jig_core - Sharpening Jig Geometry Engine
//!
//! `jig_core` computes the setup height for a sharpening jig on a wet-wheel
//! grinder from a target bevel angle, the wheel diameter and the machine
//! geometry, and calibrates that machine geometry from a few caliper
//! measurements. All inputs and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless core**: the calculations are pure functions of their inputs
//! - **Never throws**: degenerate geometry yields non-finite numbers, missing
//!   data yields `None`; errors only come from the workflow layer
//! - **Explicit state**: settings, wheels and sessions live in an
//!   [`AppState`] value passed around, never in globals
//!
//! ## Quick Start
//!
//! ```rust
//! use jig_core::calculations::heights::{compute_heights, HeightsInput};
//! use jig_core::machine::{BaseSide, GlobalSettings, MachineConfig};
//!
//! let global = GlobalSettings::default();
//! let machine = MachineConfig::default();
//!
//! let result = compute_heights(&HeightsInput {
//!     base: BaseSide::Rear,
//!     wheel_diameter_mm: 250.0,
//!     projection_mm: global.projection_mm,
//!     target_angle_deg: global.target_angle_deg,
//!     jig_diameter_mm: machine.jig_diameter_mm,
//!     reference_tool_diameter_mm: machine.reference_tool_diameter_mm,
//!     constants: machine.constants,
//!     micro_bump_deg: 0.0,
//!     angle_offset_deg: 0.0,
//! });
//!
//! assert!(result.is_finite());
//! ```
//!
//! ## Modules
//!
//! - [`calculations`] - Height solver, calibration, angle error, progression table
//! - [`machine`] - Bases, machine constants and global setup values
//! - [`wheels`] - Wheel definitions and the stock catalogue
//! - [`session`] - Progression steps and presets
//! - [`state`] - Application state and JSON import/export
//! - [`file_io`] - Atomic state file saves
//! - [`numbers`] - Text-to-number coercion for user input
//! - [`units`] - Degree / radian wrappers
//! - [`errors`] - Structured error types

pub mod calculations;
pub mod errors;
pub mod file_io;
pub mod machine;
pub mod numbers;
pub mod session;
pub mod state;
pub mod units;
pub mod wheels;

// Re-export commonly used types at crate root for convenience
pub use errors::{CalcError, CalcResult};
pub use file_io::{load_or_default, load_state, save_state};
pub use machine::{BaseConstants, BaseSide, GlobalSettings, MachineConfig, MachineConstants};
pub use state::{AppState, HeightMode};
pub use wheels::Wheel;
