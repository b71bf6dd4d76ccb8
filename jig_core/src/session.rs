//! # Progression Sessions and Presets
//!
//! A session is the ordered list of wheels a user works through (coarse to
//! fine, then honing). Presets store a session by wheel id *and* name so a
//! preset survives a wheel being deleted and re-created.
//!
//! ## Example
//!
//! ```rust
//! use jig_core::session::{load_preset, save_preset, Session};
//! use jig_core::wheels::default_wheels;
//!
//! let wheels = default_wheels();
//! let mut session = Session::default();
//! session.add_step(&wheels[0].id);
//! session.add_step(&wheels[6].id);
//!
//! let preset = save_preset("Chisel", &session.steps, &wheels, &[]).unwrap();
//! let restored = load_preset(&preset, &wheels).unwrap();
//! assert_eq!(restored.len(), 2);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CalcError, CalcResult};
use crate::machine::BaseSide;
use crate::wheels::{find_wheel, Wheel};

/// Current preset format version.
pub const PRESET_VERSION: u32 = 1;

/// One entry of a progression.
///
/// `base` and `angle_offset_deg` override the wheel defaults when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionStep {
    pub id: String,

    #[serde(rename = "wheelId")]
    pub wheel_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<BaseSide>,

    #[serde(rename = "angleOffset", default, skip_serializing_if = "Option::is_none")]
    pub angle_offset_deg: Option<f64>,

    #[serde(default)]
    pub notes: String,
}

impl ProgressionStep {
    /// Step on `wheel_id` inheriting the wheel's base and offset.
    pub fn for_wheel(wheel_id: impl Into<String>) -> Self {
        ProgressionStep {
            id: new_step_id(),
            wheel_id: wheel_id.into(),
            base: None,
            angle_offset_deg: None,
            notes: String::new(),
        }
    }
}

fn new_step_id() -> String {
    format!("step-{}", Uuid::new_v4())
}

/// Partial update for a step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepPatch {
    pub wheel_id: Option<String>,
    pub base: Option<Option<BaseSide>>,
    pub angle_offset_deg: Option<Option<f64>>,
    pub notes: Option<String>,
}

/// Ordered progression of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    pub steps: Vec<ProgressionStep>,
}

impl Session {
    pub fn new(steps: Vec<ProgressionStep>) -> Self {
        Session { steps }
    }

    /// Append a step and return its id.
    pub fn add_step(&mut self, wheel_id: impl Into<String>) -> String {
        let step = ProgressionStep::for_wheel(wheel_id);
        let id = step.id.clone();
        self.steps.push(step);
        id
    }

    pub fn update_step(&mut self, id: &str, patch: StepPatch) -> CalcResult<()> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CalcError::StepNotFound {
                step_id: id.to_string(),
            })?;

        if let Some(wheel_id) = patch.wheel_id {
            step.wheel_id = wheel_id;
        }
        if let Some(base) = patch.base {
            step.base = base;
        }
        if let Some(offset) = patch.angle_offset_deg {
            step.angle_offset_deg = offset;
        }
        if let Some(notes) = patch.notes {
            step.notes = notes;
        }
        Ok(())
    }

    pub fn remove_step(&mut self, id: &str) -> Option<ProgressionStep> {
        let idx = self.steps.iter().position(|s| s.id == id)?;
        Some(self.steps.remove(idx))
    }

    /// Move the step at `index` by `delta` places.
    ///
    /// Returns `false` and leaves the order untouched if either index falls
    /// outside the list.
    pub fn move_step(&mut self, index: usize, delta: isize) -> bool {
        let len = self.steps.len() as isize;
        let target = index as isize + delta;
        if index as isize >= len || target < 0 || target >= len {
            return false;
        }
        let step = self.steps.remove(index);
        self.steps.insert(target as usize, step);
        true
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Drop every step on `wheel_id`; returns how many were removed.
    pub fn remove_wheel_refs(&mut self, wheel_id: &str) -> usize {
        let before = self.steps.len();
        self.steps.retain(|s| s.wheel_id != wheel_id);
        before - self.steps.len()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Wheel reference stored in a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetStepRef {
    #[serde(rename = "wheelId")]
    pub wheel_id: String,

    /// Fallback key when the id no longer exists
    #[serde(rename = "wheelName")]
    pub wheel_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<BaseSide>,

    #[serde(rename = "angleOffset", default, skip_serializing_if = "Option::is_none")]
    pub angle_offset_deg: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Named, saved progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPreset {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub version: u32,
    pub steps: Vec<PresetStepRef>,
}

/// Build a preset from the current steps.
///
/// Steps whose wheel no longer exists are left out. Fails on a blank name,
/// an empty progression, a name already used (ignoring case) or when no
/// step resolves to a wheel.
pub fn save_preset(
    name: &str,
    steps: &[ProgressionStep],
    wheels: &[Wheel],
    existing: &[SessionPreset],
) -> CalcResult<SessionPreset> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CalcError::missing_field("name"));
    }
    if steps.is_empty() {
        return Err(CalcError::invalid_input("steps", "[]", "Progression is empty"));
    }
    let lowered = name.to_lowercase();
    if existing.iter().any(|p| p.name.to_lowercase() == lowered) {
        return Err(CalcError::DuplicatePreset {
            name: name.to_string(),
        });
    }

    let refs: Vec<PresetStepRef> = steps
        .iter()
        .filter_map(|step| {
            let wheel = find_wheel(wheels, &step.wheel_id)?;
            Some(PresetStepRef {
                wheel_id: wheel.id.clone(),
                wheel_name: wheel.name.clone(),
                base: step.base,
                angle_offset_deg: step.angle_offset_deg,
                notes: if step.notes.is_empty() {
                    None
                } else {
                    Some(step.notes.clone())
                },
            })
        })
        .collect();

    if refs.is_empty() {
        return Err(CalcError::invalid_input(
            "steps",
            steps.len().to_string(),
            "No step refers to an existing wheel",
        ));
    }

    Ok(SessionPreset {
        id: format!("preset-{}", Uuid::new_v4()),
        name: name.to_string(),
        notes: None,
        created_at: Utc::now(),
        version: PRESET_VERSION,
        steps: refs,
    })
}

/// Resolve a preset against the current wheels into fresh steps.
///
/// Each reference matches by id first, then by exact wheel name.
pub fn load_preset(preset: &SessionPreset, wheels: &[Wheel]) -> CalcResult<Vec<ProgressionStep>> {
    let steps: Vec<ProgressionStep> = preset
        .steps
        .iter()
        .filter_map(|r| {
            let wheel = find_wheel(wheels, &r.wheel_id)
                .or_else(|| wheels.iter().find(|w| w.name == r.wheel_name))?;
            Some(ProgressionStep {
                id: new_step_id(),
                wheel_id: wheel.id.clone(),
                base: r.base,
                angle_offset_deg: r.angle_offset_deg,
                notes: r.notes.clone().unwrap_or_default(),
            })
        })
        .collect();

    if steps.is_empty() {
        return Err(CalcError::invalid_input(
            "preset",
            preset.name.clone(),
            "None of the preset's wheels exist any more",
        ));
    }
    Ok(steps)
}

/// Comparison key of a progression, ignoring step ids and notes.
///
/// Two progressions with equal fingerprints produce the same results.
pub fn progression_fingerprint(steps: &[ProgressionStep]) -> Vec<(String, Option<BaseSide>, Option<u64>)> {
    steps
        .iter()
        .map(|s| (s.wheel_id.clone(), s.base, s.angle_offset_deg.map(f64::to_bits)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wheels::default_wheels;

    fn session_of(n: usize) -> Session {
        let mut session = Session::default();
        for i in 0..n {
            session.add_step(format!("w{}", i));
        }
        session
    }

    fn wheel_ids(session: &Session) -> Vec<&str> {
        session.steps.iter().map(|s| s.wheel_id.as_str()).collect()
    }

    #[test]
    fn test_move_step() {
        let mut session = session_of(3);
        assert!(session.move_step(0, 2));
        assert_eq!(wheel_ids(&session), vec!["w1", "w2", "w0"]);
        assert!(session.move_step(2, -1));
        assert_eq!(wheel_ids(&session), vec!["w1", "w0", "w2"]);
    }

    #[test]
    fn test_move_step_out_of_range() {
        let mut session = session_of(3);
        assert!(!session.move_step(0, -1));
        assert!(!session.move_step(2, 1));
        assert!(!session.move_step(5, -1));
        assert_eq!(wheel_ids(&session), vec!["w0", "w1", "w2"]);
    }

    #[test]
    fn test_update_and_remove_step() {
        let mut session = session_of(2);
        let id = session.steps[1].id.clone();
        session
            .update_step(
                &id,
                StepPatch {
                    base: Some(Some(BaseSide::Front)),
                    angle_offset_deg: Some(Some(0.5)),
                    ..StepPatch::default()
                },
            )
            .unwrap();
        assert_eq!(session.steps[1].base, Some(BaseSide::Front));
        assert_eq!(session.steps[1].angle_offset_deg, Some(0.5));

        assert!(session.update_step("nope", StepPatch::default()).is_err());
        assert!(session.remove_step(&id).is_some());
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_remove_wheel_refs() {
        let mut session = Session::default();
        session.add_step("a");
        session.add_step("b");
        session.add_step("a");
        assert_eq!(session.remove_wheel_refs("a"), 2);
        assert_eq!(wheel_ids(&session), vec!["b"]);
    }

    #[test]
    fn test_save_preset_rules() {
        let wheels = default_wheels();
        let mut session = Session::default();
        session.add_step(&wheels[0].id);
        session.add_step("deleted");

        let preset = save_preset("  Chisel 25° ", &session.steps, &wheels, &[]).unwrap();
        assert_eq!(preset.name, "Chisel 25°");
        assert_eq!(preset.steps.len(), 1);
        assert_eq!(preset.steps[0].wheel_name, wheels[0].name);
        assert_eq!(preset.version, PRESET_VERSION);

        let dup = save_preset("chisel 25°", &session.steps, &wheels, &[preset.clone()]);
        assert!(matches!(dup, Err(CalcError::DuplicatePreset { .. })));
        assert!(save_preset("   ", &session.steps, &wheels, &[]).is_err());
        assert!(save_preset("Empty", &[], &wheels, &[]).is_err());
    }

    #[test]
    fn test_load_preset_falls_back_to_name() {
        let wheels = default_wheels();
        let mut session = Session::default();
        session.add_step(&wheels[0].id);
        session.add_step(&wheels[6].id);
        let preset = save_preset("Knife", &session.steps, &wheels, &[]).unwrap();

        // Same catalogue regenerated: new ids, same names
        let rebuilt = default_wheels();
        let steps = load_preset(&preset, &rebuilt).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].wheel_id, rebuilt[0].id);
        assert_eq!(steps[1].wheel_id, rebuilt[6].id);
        assert_ne!(steps[0].id, session.steps[0].id);

        assert!(load_preset(&preset, &[]).is_err());
    }

    #[test]
    fn test_fingerprint_ignores_ids_and_notes() {
        let wheels = default_wheels();
        let mut a = Session::default();
        a.add_step(&wheels[0].id);
        let mut b = Session::default();
        b.add_step(&wheels[0].id);
        b.steps[0].notes = "light pressure".to_string();
        assert_eq!(progression_fingerprint(&a.steps), progression_fingerprint(&b.steps));

        b.steps[0].angle_offset_deg = Some(1.0);
        assert_ne!(progression_fingerprint(&a.steps), progression_fingerprint(&b.steps));
    }

    #[test]
    fn test_step_json_shape() {
        let json = r#"{"id":"s1","wheelId":"w1","base":"front","angleOffset":0.5}"#;
        let step: ProgressionStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.base, Some(BaseSide::Front));
        assert_eq!(step.angle_offset_deg, Some(0.5));
        assert!(step.notes.is_empty());
    }
}
