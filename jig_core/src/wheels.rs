//! # Wheels
//!
//! Grinding and honing wheels a user owns. Progression steps refer to
//! wheels by id, so deleting a wheel must cascade to the steps (see
//! [`crate::state::AppState::delete_wheel`]).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::machine::BaseSide;

/// A grinding or honing wheel.
///
/// ## JSON Example
///
/// ```json
/// {
///   "id": "wheel-3f2c...",
///   "name": "SG-250 Original Grindstone",
///   "D": 250.0,
///   "angleOffset": 0.0,
///   "baseForHn": "rear",
///   "isHoning": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wheel {
    pub id: String,
    pub name: String,

    /// Effective diameter (mm)
    #[serde(rename = "D")]
    pub diameter_mm: f64,

    /// Default angle delta for this wheel (degrees)
    #[serde(rename = "angleOffset", default)]
    pub angle_offset_deg: f64,

    /// Default base used for hn
    #[serde(rename = "baseForHn", default)]
    pub base_for_hn: BaseSide,

    #[serde(rename = "isHoning", default)]
    pub is_honing: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grit: Option<String>,
}

impl Wheel {
    /// New grinding wheel on the rear base with a fresh id.
    pub fn new(name: impl Into<String>, diameter_mm: f64) -> Self {
        Wheel {
            id: new_wheel_id(),
            name: name.into(),
            diameter_mm,
            angle_offset_deg: 0.0,
            base_for_hn: BaseSide::Rear,
            is_honing: false,
            grit: None,
        }
    }

    /// New honing wheel. Honing always runs edge trailing on the front base.
    pub fn honing(name: impl Into<String>, diameter_mm: f64) -> Self {
        Wheel {
            base_for_hn: BaseSide::Front,
            is_honing: true,
            ..Wheel::new(name, diameter_mm)
        }
    }

    /// Base used for a step on this wheel.
    ///
    /// Honing wheels are forced to the front base; otherwise the step's
    /// override wins over the wheel default.
    pub fn effective_base(&self, step_override: Option<BaseSide>) -> BaseSide {
        if self.is_honing {
            BaseSide::Front
        } else {
            step_override.unwrap_or(self.base_for_hn)
        }
    }
}

fn new_wheel_id() -> String {
    format!("wheel-{}", Uuid::new_v4())
}

/// Find a wheel by id.
pub fn find_wheel<'a>(wheels: &'a [Wheel], id: &str) -> Option<&'a Wheel> {
    wheels.iter().find(|w| w.id == id)
}

/// Stock wheel catalogue for a new installation.
pub fn default_wheels() -> Vec<Wheel> {
    vec![
        // 250 mm class
        Wheel::new("SG-250 Original Grindstone", 250.0),
        Wheel::new("SB-250 Blackstone Silicon", 250.0),
        Wheel::new("SJ-250 Japanese Waterstone", 250.0),
        Wheel::new("DC-250 Diamond Wheel Coarse (360)", 250.0),
        Wheel::new("DF-250 Diamond Wheel Fine (600)", 250.0),
        Wheel::new("DE-250 Diamond Wheel Extra Fine (1200)", 250.0),
        Wheel::honing("LA-220 Leather Honing Wheel", 215.0),
        Wheel::honing("CW-220 Composite Honing Wheel", 220.0),
        // 200 mm class
        Wheel::new("SG-200 Original Grindstone", 200.0),
        Wheel::new("SJ-200 Japanese Waterstone", 200.0),
        Wheel::new("DC-200 Diamond Wheel Coarse (360)", 200.0),
        Wheel::new("DF-200 Diamond Wheel Fine (600)", 200.0),
        Wheel::new("DE-200 Diamond Wheel Extra Fine (1200)", 200.0),
        Wheel::honing("LA-145 Leather Honing Wheel", 145.0),
    ]
}
