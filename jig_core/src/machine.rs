//! # Machine Model
//!
//! Geometry of the grinder itself: the two support bases a jig can be
//! referenced from, their calibrated offsets, and the global setup values
//! (projection, reference tool, jig, target angle) shared by every wheel.
//!
//! ```text
//! MachineConfig
//! ├── constants: MachineConstants
//! │   ├── rear:  BaseConstants { hc_mm, o_mm }
//! │   └── front: BaseConstants { hc_mm, o_mm }
//! ├── reference_tool_diameter_mm  (Ds)
//! └── jig_diameter_mm             (Dj)
//! ```
//!
//! Ds and Dj are entered once in [`GlobalSettings`]; the machine the
//! solvers see is built from them with [`MachineConfig::from_settings`].

use serde::{Deserialize, Serialize};

/// Which support base a height is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseSide {
    Rear,
    Front,
}

impl BaseSide {
    /// Orientation shown to the user for this base.
    pub fn label(&self) -> &'static str {
        match self {
            BaseSide::Rear => "Edge leading (rear base)",
            BaseSide::Front => "Edge trailing (front base)",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseSide::Rear => "rear",
            BaseSide::Front => "front",
        }
    }
}

impl Default for BaseSide {
    fn default() -> Self {
        BaseSide::Rear
    }
}

impl std::fmt::Display for BaseSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BaseSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rear" | "r" => Ok(BaseSide::Rear),
            "front" | "f" => Ok(BaseSide::Front),
            other => Err(format!("unknown base '{}': expected 'rear' or 'front'", other)),
        }
    }
}

/// Offsets of one base, solved by calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseConstants {
    /// Vertical datum offset (mm)
    #[serde(rename = "hc")]
    pub hc_mm: f64,

    /// Horizontal offset from the datum to the reference tool axis (mm)
    #[serde(rename = "o")]
    pub o_mm: f64,
}

impl BaseConstants {
    pub fn new(hc_mm: f64, o_mm: f64) -> Self {
        BaseConstants { hc_mm, o_mm }
    }
}

/// Offsets for both bases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineConstants {
    pub rear: BaseConstants,
    pub front: BaseConstants,
}

impl MachineConstants {
    /// Constants for the requested base.
    pub fn get(&self, base: BaseSide) -> BaseConstants {
        match base {
            BaseSide::Rear => self.rear,
            BaseSide::Front => self.front,
        }
    }

    /// Copy with one base replaced.
    ///
    /// ```rust
    /// use jig_core::machine::{BaseConstants, BaseSide, MachineConstants};
    ///
    /// let proposed = MachineConstants::default()
    ///     .with_base(BaseSide::Front, BaseConstants::new(50.0, 130.0));
    /// assert_eq!(proposed.front.o_mm, 130.0);
    /// assert_eq!(proposed.rear, MachineConstants::default().rear);
    /// ```
    pub fn with_base(&self, base: BaseSide, constants: BaseConstants) -> MachineConstants {
        let mut next = *self;
        match base {
            BaseSide::Rear => next.rear = constants,
            BaseSide::Front => next.front = constants,
        }
        next
    }
}

impl Default for MachineConstants {
    fn default() -> Self {
        // T-8 class machine
        MachineConstants {
            rear: BaseConstants::new(29.0, 50.0),
            front: BaseConstants::new(51.3, 131.7),
        }
    }
}

/// A grinder and its fixed tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub id: String,
    pub name: String,
    pub constants: MachineConstants,

    /// Ds: universal support bar / reference tool diameter (mm)
    #[serde(rename = "usbDiameter")]
    pub reference_tool_diameter_mm: f64,

    /// Dj: jig diameter (mm)
    #[serde(rename = "jigDiameter")]
    pub jig_diameter_mm: f64,
}

impl MachineConfig {
    /// The machine in use: Ds and Dj from the global settings plus the
    /// active base constants.
    pub fn from_settings(global: &GlobalSettings, constants: MachineConstants) -> MachineConfig {
        MachineConfig {
            constants,
            reference_tool_diameter_mm: global.reference_tool_diameter_mm,
            jig_diameter_mm: global.jig.diameter_mm,
            ..MachineConfig::default()
        }
    }

    /// Copy of this machine with different constants.
    pub fn with_constants(&self, constants: MachineConstants) -> MachineConfig {
        MachineConfig {
            constants,
            ..self.clone()
        }
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            id: "machine-default".to_string(),
            name: "Default machine".to_string(),
            constants: MachineConstants::default(),
            reference_tool_diameter_mm: DEFAULT_REFERENCE_TOOL_DIAMETER_MM,
            jig_diameter_mm: DEFAULT_JIG_DIAMETER_MM,
        }
    }
}

pub const DEFAULT_PROJECTION_MM: f64 = 127.39;
pub const DEFAULT_REFERENCE_TOOL_DIAMETER_MM: f64 = 11.98;
pub const DEFAULT_TARGET_ANGLE_DEG: f64 = 16.0;
pub const DEFAULT_JIG_DIAMETER_MM: f64 = 12.0;
pub const DEFAULT_AXLE_DIAMETER_MM: f64 = 12.0;

/// Small extra angle added on top of the target for a secondary bevel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MicroBump {
    pub enabled: bool,
    pub bump_deg: f64,
}

impl MicroBump {
    /// Bump actually applied to the solve.
    pub fn effective_deg(&self) -> f64 {
        if self.enabled {
            self.bump_deg
        } else {
            0.0
        }
    }
}

/// The jig clamped on the tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JigSettings {
    /// Dj (mm)
    #[serde(rename = "Dj")]
    pub diameter_mm: f64,
}

impl Default for JigSettings {
    fn default() -> Self {
        JigSettings {
            diameter_mm: DEFAULT_JIG_DIAMETER_MM,
        }
    }
}

/// Setup values shared by every wheel in a session.
///
/// Serialized with the short keys of the state file (`projection`,
/// `usbDiameter`, `targetAngle`, `jig.Dj`, `microBump`); missing keys take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// A: jig apex to edge contact (mm)
    #[serde(rename = "projection")]
    pub projection_mm: f64,

    /// Ds: reference tool diameter (mm)
    #[serde(rename = "usbDiameter")]
    pub reference_tool_diameter_mm: f64,

    /// Target bevel angle per side (degrees)
    #[serde(rename = "targetAngle")]
    pub target_angle_deg: f64,

    pub jig: JigSettings,

    #[serde(rename = "microBump")]
    pub micro_bump: MicroBump,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        GlobalSettings {
            projection_mm: DEFAULT_PROJECTION_MM,
            reference_tool_diameter_mm: DEFAULT_REFERENCE_TOOL_DIAMETER_MM,
            target_angle_deg: DEFAULT_TARGET_ANGLE_DEG,
            jig: JigSettings::default(),
            micro_bump: MicroBump::default(),
        }
    }
}
