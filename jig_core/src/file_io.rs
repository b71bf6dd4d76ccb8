//! # File I/O Module
//!
//! Reads and writes the JSON state file.
//!
//! - **Atomic saves**: write to `.tmp`, fsync, rename over the target
//! - **Permissive loads**: the text goes through [`parse_state`], so older
//!   or hand-edited files load with defaults for anything missing
//!
//! ## Example
//!
//! ```rust,no_run
//! use jig_core::file_io::{load_or_default, save_state};
//! use std::path::Path;
//!
//! let path = Path::new("jigset.json");
//! let mut state = load_or_default(path)?;
//! state.global.target_angle_deg = 25.0;
//! save_state(&state, path)?;
//! # Ok::<(), jig_core::errors::CalcError>(())
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::errors::{CalcError, CalcResult};
use crate::state::{export_state, parse_state, AppState};

/// Temporary sibling used during an atomic save
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Save state with atomic write semantics.
///
/// 1. Serialize to pretty JSON
/// 2. Write to `<file>.tmp`
/// 3. Sync to disk
/// 4. Rename over `path`
pub fn save_state(state: &AppState, path: &Path) -> CalcResult<()> {
    let json = export_state(state)?;
    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        CalcError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        CalcError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        CalcError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    debug!("saved state to {}", path.display());
    Ok(())
}

/// Load state from a file.
///
/// # Returns
///
/// * `Ok(AppState)` - Loaded, with defaults for missing sections
/// * `Err(CalcError::FileError)` - I/O error
/// * `Err(CalcError::SerializationError)` - Not a JSON object
/// * `Err(CalcError::VersionMismatch)` - Version below 1
pub fn load_state(path: &Path) -> CalcResult<AppState> {
    let mut file = File::open(path).map_err(|e| {
        CalcError::file_error("open", path.display().to_string(), e.to_string())
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| {
        CalcError::file_error("read", path.display().to_string(), e.to_string())
    })?;

    parse_state(&contents).map_err(|e| match e {
        CalcError::SerializationError { reason } => CalcError::SerializationError {
            reason: format!("Invalid state in {}: {}", path.display(), reason),
        },
        other => other,
    })
}

/// Load state, or factory defaults if the file does not exist yet.
pub fn load_or_default(path: &Path) -> CalcResult<AppState> {
    if !path.exists() {
        info!("no state file at {}, using defaults", path.display());
        return Ok(AppState::default());
    }
    load_state(path)
}
