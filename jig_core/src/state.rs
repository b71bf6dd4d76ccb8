//! # Application State
//!
//! `AppState` is the root container for everything a user configures:
//! setup values, the machine, wheels, the current progression, presets and
//! calibration history. It serialises to a single JSON document used both
//! for the on-disk state file and for import/export.
//!
//! ## Structure
//!
//! ```text
//! AppState
//! ├── version
//! ├── global: GlobalSettings (projection, Ds, target angle, jig Dj, micro-bump)
//! ├── constants: MachineConstants (rear / front {hc, o})
//! ├── wheels: Vec<Wheel>
//! ├── sessionSteps: Session (ordered ProgressionStep list)
//! ├── sessionPresets: Vec<SessionPreset>
//! ├── heightMode: hn | hr
//! ├── calibSnapshots: Vec<CalibrationSnapshot> (newest first)
//! └── calibAppliedIds: { rear, front }
//! ```
//!
//! The solvers see a [`MachineConfig`] built from `global` and `constants`
//! by [`AppState::machine`]; Ds and Dj are stored once, in `global`.
//!
//! ## Example
//!
//! ```rust
//! use jig_core::state::{export_state, parse_state, AppState};
//!
//! let mut state = AppState::default();
//! let first = state.wheels[0].id.clone();
//! state.session.add_step(first);
//!
//! let json = export_state(&state).unwrap();
//! let restored = parse_state(&json).unwrap();
//! assert_eq!(restored.results().len(), 1);
//! ```

use std::collections::HashSet;

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::calculations::calibration::{CalibrationRun, CalibrationSnapshot};
use crate::calculations::progression::{compute_results_for_steps, WheelResult};
use crate::errors::{CalcError, CalcResult};
use crate::machine::{BaseSide, GlobalSettings, MachineConfig, MachineConstants};
use crate::session::{load_preset, progression_fingerprint, save_preset, Session, SessionPreset};
use crate::wheels::{default_wheels, find_wheel, Wheel};

/// Current state file version
pub const STATE_VERSION: u32 = 3;

/// Which height a front end shows for each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightMode {
    /// Base datum to tool top
    #[default]
    Hn,
    /// Wheel to tool top
    Hr,
}

impl std::str::FromStr for HeightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hn" => Ok(HeightMode::Hn),
            "hr" => Ok(HeightMode::Hr),
            other => Err(format!("unknown height mode '{}': expected 'hn' or 'hr'", other)),
        }
    }
}

/// Snapshot id last applied to each base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedCalibration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rear: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,
}

impl AppliedCalibration {
    pub fn get(&self, base: BaseSide) -> Option<&str> {
        match base {
            BaseSide::Rear => self.rear.as_deref(),
            BaseSide::Front => self.front.as_deref(),
        }
    }

    fn set(&mut self, base: BaseSide, snapshot_id: String) {
        match base {
            BaseSide::Rear => self.rear = Some(snapshot_id),
            BaseSide::Front => self.front = Some(snapshot_id),
        }
    }
}

/// Root state container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub version: u32,
    pub global: GlobalSettings,

    /// Active base constants
    pub constants: MachineConstants,

    pub wheels: Vec<Wheel>,

    #[serde(rename = "sessionSteps")]
    pub session: Session,

    #[serde(rename = "sessionPresets")]
    pub presets: Vec<SessionPreset>,

    #[serde(rename = "heightMode")]
    pub height_mode: HeightMode,

    #[serde(rename = "calibSnapshots")]
    pub calibration_snapshots: Vec<CalibrationSnapshot>,

    #[serde(rename = "calibAppliedIds")]
    pub applied_calibration: AppliedCalibration,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            version: STATE_VERSION,
            global: GlobalSettings::default(),
            constants: MachineConstants::default(),
            wheels: default_wheels(),
            session: Session::default(),
            presets: Vec::new(),
            height_mode: HeightMode::default(),
            calibration_snapshots: Vec::new(),
            applied_calibration: AppliedCalibration::default(),
        }
    }
}

impl AppState {
    /// Machine the solvers run against.
    pub fn machine(&self) -> MachineConfig {
        MachineConfig::from_settings(&self.global, self.constants)
    }

    /// Progression table for the current state.
    pub fn results(&self) -> Vec<WheelResult> {
        compute_results_for_steps(&self.wheels, &self.session.steps, &self.global, &self.machine())
    }

    /// Keep the first wheel of every id; returns how many were dropped.
    pub fn dedupe_wheels(&mut self) -> usize {
        let mut seen = HashSet::new();
        let before = self.wheels.len();
        self.wheels.retain(|w| seen.insert(w.id.clone()));
        before - self.wheels.len()
    }

    /// Add a wheel and return its id.
    ///
    /// The name must not be blank, the diameter must be positive and the id
    /// must not already be in use.
    pub fn add_wheel(&mut self, wheel: Wheel) -> CalcResult<String> {
        if wheel.name.trim().is_empty() {
            return Err(CalcError::missing_field("name"));
        }
        if !(wheel.diameter_mm.is_finite() && wheel.diameter_mm > 0.0) {
            return Err(CalcError::invalid_input(
                "D",
                wheel.diameter_mm.to_string(),
                "Wheel diameter must be a positive number",
            ));
        }
        if find_wheel(&self.wheels, &wheel.id).is_some() {
            return Err(CalcError::invalid_input("id", wheel.id, "Wheel id already in use"));
        }
        let id = wheel.id.clone();
        self.wheels.push(wheel);
        Ok(id)
    }

    /// Remove a wheel and every progression step that used it.
    pub fn delete_wheel(&mut self, id: &str) -> CalcResult<Wheel> {
        let idx = self
            .wheels
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| CalcError::wheel_not_found(id))?;
        self.session.remove_wheel_refs(id);
        Ok(self.wheels.remove(idx))
    }

    /// Save the current progression as a named preset; returns its id.
    pub fn save_preset(&mut self, name: &str) -> CalcResult<String> {
        let preset = save_preset(name, &self.session.steps, &self.wheels, &self.presets)?;
        let id = preset.id.clone();
        self.presets.push(preset);
        Ok(id)
    }

    /// Replace the progression with a stored preset, looked up by id or,
    /// failing that, by name (ignoring case).
    pub fn load_preset(&mut self, key: &str) -> CalcResult<()> {
        let lowered = key.trim().to_lowercase();
        let preset = self
            .presets
            .iter()
            .find(|p| p.id == key)
            .or_else(|| self.presets.iter().find(|p| p.name.to_lowercase() == lowered))
            .ok_or_else(|| CalcError::PresetNotFound {
                preset_id: key.to_string(),
            })?;
        self.session = Session::new(load_preset(preset, &self.wheels)?);
        Ok(())
    }

    /// Preset the current progression was loaded from, if it has not been
    /// modified since.
    ///
    /// A preset matches when loading it now would give the same wheels,
    /// bases and offsets in the same order.
    pub fn active_preset(&self) -> Option<&SessionPreset> {
        if self.session.is_empty() {
            return None;
        }
        let current = progression_fingerprint(&self.session.steps);
        self.presets.iter().find(|preset| {
            load_preset(preset, &self.wheels)
                .map(|steps| progression_fingerprint(&steps) == current)
                .unwrap_or(false)
        })
    }

    /// Keep a calibration run's snapshot, newest first.
    pub fn record_calibration(&mut self, run: &CalibrationRun) -> String {
        let snapshot = run.snapshot.clone();
        let id = snapshot.id.clone();
        self.calibration_snapshots.insert(0, snapshot);
        id
    }

    /// Merge a snapshot's `{hc, o}` into the active machine constants.
    pub fn apply_calibration(&mut self, snapshot_id: &str) -> CalcResult<BaseSide> {
        let snapshot = self
            .calibration_snapshots
            .iter()
            .find(|s| s.id == snapshot_id)
            .ok_or_else(|| CalcError::SnapshotNotFound {
                snapshot_id: snapshot_id.to_string(),
            })?;

        let base = snapshot.base;
        self.constants = self.constants.with_base(base, snapshot.constants());
        self.applied_calibration.set(base, snapshot.id.clone());
        Ok(base)
    }
}

/// Pretty JSON for export or saving.
pub fn export_state(state: &AppState) -> CalcResult<String> {
    serde_json::to_string_pretty(state).map_err(|e| CalcError::serialization(e.to_string()))
}

/// Parse a state document, tolerating missing or malformed sections.
///
/// A section that is absent or does not deserialize falls back to its
/// default. An empty wheel list is replaced by the stock catalogue and
/// duplicate wheel ids are dropped. Only malformed JSON, a non-object root
/// or a version below 1 are errors.
pub fn parse_state(raw: &str) -> CalcResult<AppState> {
    let value: Value = serde_json::from_str(raw).map_err(|e| CalcError::serialization(e.to_string()))?;
    let Value::Object(root) = value else {
        return Err(CalcError::serialization("State document must be a JSON object"));
    };

    let version = match root.get("version") {
        None | Some(Value::Null) => 1,
        Some(v) => match v.as_f64() {
            Some(n) if n >= 1.0 && n.fract() == 0.0 => n as u32,
            _ => {
                return Err(CalcError::VersionMismatch {
                    file_version: v.to_string(),
                    expected_version: STATE_VERSION.to_string(),
                })
            }
        },
    };

    let mut applied_calibration: AppliedCalibration = section(&root, "calibAppliedIds");
    applied_calibration.rear = applied_calibration.rear.filter(|id| !id.is_empty());
    applied_calibration.front = applied_calibration.front.filter(|id| !id.is_empty());

    let mut state = AppState {
        version,
        global: section(&root, "global"),
        constants: section(&root, "constants"),
        wheels: section(&root, "wheels"),
        session: section(&root, "sessionSteps"),
        presets: section(&root, "sessionPresets"),
        height_mode: section(&root, "heightMode"),
        calibration_snapshots: section(&root, "calibSnapshots"),
        applied_calibration,
    };

    if state.wheels.is_empty() {
        state.wheels = default_wheels();
    }
    let dropped = state.dedupe_wheels();
    if dropped > 0 {
        warn!("dropped {} wheels with duplicate ids", dropped);
    }

    Ok(state)
}

fn section<T: DeserializeOwned + Default>(root: &Map<String, Value>, key: &str) -> T {
    match root.get(key) {
        None | Some(Value::Null) => T::default(),
        Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
            warn!("ignoring malformed '{}' section: {}", key, e);
            T::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::calibration::{run_calibration, CalibrationMeasurement, CalibrationRequest};
    use crate::session::StepPatch;

    #[test]
    fn test_default_state() {
        let state = AppState::default();
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.wheels.len(), 14);
        assert!(state.session.is_empty());
        assert!(state.results().is_empty());
    }

    #[test]
    fn test_height_mode_parse() {
        assert_eq!("HR".parse::<HeightMode>().unwrap(), HeightMode::Hr);
        assert_eq!("hn".parse::<HeightMode>().unwrap(), HeightMode::Hn);
        assert!("both".parse::<HeightMode>().is_err());
    }

    #[test]
    fn test_export_parse_roundtrip() {
        let mut state = AppState::default();
        let id = state.wheels[0].id.clone();
        state.session.add_step(id);
        state.height_mode = HeightMode::Hr;

        let json = export_state(&state).unwrap();
        assert!(json.contains("\"sessionSteps\""));
        let restored = parse_state(&json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_parse_fills_missing_sections() {
        let state = parse_state(r#"{"version": 2, "global": {"projection": 140.0,
            "usbDiameter": 12.0, "targetAngle": 20.0, "jig": {"Dj": 12.0}}}"#)
            .unwrap();
        assert_eq!(state.version, 2);
        assert_eq!(state.global.projection_mm, 140.0);
        assert_eq!(state.constants, MachineConstants::default());
        assert_eq!(state.wheels.len(), 14);
        assert_eq!(state.height_mode, HeightMode::Hn);
    }

    #[test]
    fn test_parse_browser_export() {
        let json = r#"{
            "version": 3,
            "global": {
                "projection": 130.0, "usbDiameter": 12.0, "targetAngle": 20.0,
                "jig": {"Dj": 12.0}, "microBump": {"enabled": false, "bumpDeg": 1.0}
            },
            "constants": {"rear": {"hc": 30.0, "o": 49.0}, "front": {"hc": 52.0, "o": 130.0}},
            "wheels": [
                {"id": "w1", "name": "SG-250", "D": 250, "DText": "250", "angleOffset": 0,
                 "baseForHn": "rear", "isHoning": false}
            ],
            "sessionSteps": [{"id": "s1", "wheelId": "w1", "base": "front", "angleOffset": 1, "notes": ""}],
            "sessionPresets": [],
            "heightMode": "hr",
            "calibSnapshots": [],
            "calibAppliedIds": {"rear": "", "front": ""}
        }"#;
        let state = parse_state(json).unwrap();
        assert_eq!(state.global.projection_mm, 130.0);
        assert_eq!(state.global.reference_tool_diameter_mm, 12.0);
        assert_eq!(state.constants.rear.hc_mm, 30.0);
        assert_eq!(state.constants.front.o_mm, 130.0);
        assert_eq!(state.wheels.len(), 1);
        assert_eq!(state.session.steps[0].base, Some(BaseSide::Front));
        assert_eq!(state.height_mode, HeightMode::Hr);
        assert_eq!(state.applied_calibration.get(BaseSide::Rear), None);

        let results = state.results();
        assert_eq!(results.len(), 1);
        assert!((results[0].beta_eff_deg - 21.0).abs() < 1e-6);
    }

    #[test]
    fn test_state_json_keys() {
        let json = serde_json::to_value(AppState::default()).unwrap();
        assert!(json.get("constants").is_some());
        assert!(json.get("machine").is_none());
        assert_eq!(json["global"]["usbDiameter"], 11.98);
        assert_eq!(json["global"]["jig"]["Dj"], 12.0);
        assert_eq!(json["heightMode"], "hn");
    }

    #[test]
    fn test_global_tool_and_jig_drive_results() {
        let mut state = AppState::default();
        let first = state.wheels[0].id.clone();
        state.session.add_step(first);
        let before = state.results()[0].hn_base_mm;

        state.global.reference_tool_diameter_mm = 25.0;
        state.global.jig.diameter_mm = 30.0;
        let machine = state.machine();
        assert_eq!(machine.reference_tool_diameter_mm, 25.0);
        assert_eq!(machine.jig_diameter_mm, 30.0);
        assert!((state.results()[0].hn_base_mm - before).abs() > 0.1);
    }

    #[test]
    fn test_parse_malformed_section_falls_back() {
        let state = parse_state(r#"{"global": 5, "heightMode": "hr", "wheels": "nope"}"#).unwrap();
        assert_eq!(state.version, 1);
        assert_eq!(state.global, GlobalSettings::default());
        assert_eq!(state.height_mode, HeightMode::Hr);
        assert_eq!(state.wheels.len(), 14);
    }

    #[test]
    fn test_parse_rejects_bad_documents() {
        assert!(parse_state("not json").is_err());
        assert!(parse_state("[1, 2]").is_err());
        let err = parse_state(r#"{"version": 0}"#).unwrap_err();
        assert_eq!(err.error_code(), "VERSION_MISMATCH");
    }

    #[test]
    fn test_parse_dedupes_wheels() {
        let json = r#"{"wheels": [
            {"id": "w1", "name": "First", "D": 250},
            {"id": "w1", "name": "Copy", "D": 200},
            {"id": "w2", "name": "Other", "D": 200}
        ]}"#;
        let state = parse_state(json).unwrap();
        let names: Vec<_> = state.wheels.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Other"]);
    }

    #[test]
    fn test_delete_wheel_cascades() {
        let mut state = AppState::default();
        let keep = state.wheels[0].id.clone();
        let gone = state.wheels[1].id.clone();
        state.session.add_step(keep.clone());
        state.session.add_step(gone.clone());

        let removed = state.delete_wheel(&gone).unwrap();
        assert_eq!(removed.id, gone);
        assert_eq!(state.session.len(), 1);
        assert_eq!(state.session.steps[0].wheel_id, keep);
        assert!(state.delete_wheel(&gone).is_err());
    }

    #[test]
    fn test_preset_save_and_load() {
        let mut state = AppState::default();
        let a = state.wheels[0].id.clone();
        let b = state.wheels[6].id.clone();
        state.session.add_step(a.clone());
        state.session.add_step(b);

        let preset_id = state.save_preset("Plane iron").unwrap();
        state.session.clear();
        state.load_preset(&preset_id).unwrap();
        assert_eq!(state.session.len(), 2);
        assert_eq!(state.session.steps[0].wheel_id, a);
        assert!(state.load_preset("missing").is_err());

        state.session.clear();
        state.load_preset("plane IRON").unwrap();
        assert_eq!(state.session.len(), 2);
    }

    #[test]
    fn test_active_preset_tracks_modifications() {
        let mut state = AppState::default();
        let a = state.wheels[0].id.clone();
        let b = state.wheels[6].id.clone();
        state.session.add_step(a);
        state.session.add_step(b.clone());
        assert!(state.active_preset().is_none());

        let preset_id = state.save_preset("Chisel").unwrap();
        state.load_preset(&preset_id).unwrap();
        assert_eq!(state.active_preset().map(|p| p.id.as_str()), Some(preset_id.as_str()));

        // Notes do not count as a modification
        let step_id = state.session.steps[0].id.clone();
        state
            .session
            .update_step(&step_id, StepPatch { notes: Some("flatten back".into()), ..StepPatch::default() })
            .unwrap();
        assert!(state.active_preset().is_some());

        state
            .session
            .update_step(&step_id, StepPatch { base: Some(Some(BaseSide::Front)), ..StepPatch::default() })
            .unwrap();
        assert!(state.active_preset().is_none());

        state.load_preset(&preset_id).unwrap();
        state.session.add_step(b);
        assert!(state.active_preset().is_none());
    }

    #[test]
    fn test_add_wheel_validates() {
        let mut state = AppState::default();
        let before = state.wheels.len();

        let id = state.add_wheel(Wheel::new("CBN-180", 180.0)).unwrap();
        assert_eq!(state.wheels.len(), before + 1);
        assert!(find_wheel(&state.wheels, &id).is_some());

        assert!(state.add_wheel(Wheel::new("  ", 180.0)).is_err());
        assert!(state.add_wheel(Wheel::new("Zero", 0.0)).is_err());
        assert!(state.add_wheel(Wheel::new("NaN", f64::NAN)).is_err());
        let mut duplicate = Wheel::new("Copy", 200.0);
        duplicate.id = id;
        assert!(state.add_wheel(duplicate).is_err());
        assert_eq!(state.wheels.len(), before + 1);
    }

    #[test]
    fn test_record_and_apply_calibration() {
        let mut state = AppState::default();
        let rs = state.global.reference_tool_diameter_mm / 2.0;
        let measurements: Vec<CalibrationMeasurement> = [160.0_f64, 180.0, 200.0]
            .iter()
            .map(|&ca| {
                let hn = (ca * ca - 130.0 * 130.0).sqrt() - 52.0 + rs;
                CalibrationMeasurement::new(hn.to_string(), (ca + 6.0 + rs).to_string())
            })
            .collect();
        let request = CalibrationRequest {
            base: BaseSide::Front,
            name: "front check".to_string(),
            axle_diameter_mm: 12.0,
            reference_tool_diameter_mm: state.global.reference_tool_diameter_mm,
            measurements,
        };
        let run = run_calibration(&request, &state.machine(), &state.global, &state.wheels).unwrap();
        let snapshot_id = state.record_calibration(&run);

        // Recording alone does not touch the active constants
        assert_eq!(state.constants, MachineConstants::default());

        let base = state.apply_calibration(&snapshot_id).unwrap();
        assert_eq!(base, BaseSide::Front);
        assert!((state.constants.front.hc_mm - 52.0).abs() < 1e-6);
        assert!((state.constants.front.o_mm - 130.0).abs() < 1e-6);
        assert_eq!(state.constants.rear, MachineConstants::default().rear);
        assert_eq!(state.applied_calibration.get(BaseSide::Front), Some(snapshot_id.as_str()));
        assert!(state.apply_calibration("calib-missing").is_err());
    }
}
