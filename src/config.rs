//! Runtime configuration for atomic data
//!
//! The static periodic table can be overridden at runtime, either
//! programmatically with [`add_atom_data`] or by loading a JSON file
//! mapping atom types to their data:
//!
//! ```json
//! { "Ow": { "mass": 18.015, "vdw_radius": 1.52 } }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{OnceLock, RwLock};

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// User-provided data for one atom type, overriding the periodic table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtomData {
    /// Full element name, e.g. "Oxygen"
    #[serde(default)]
    pub full_name: Option<String>,
    /// Atomic mass in atomic mass units
    #[serde(default)]
    pub mass: Option<f64>,
    /// Formal charge in multiples of e
    #[serde(default)]
    pub charge: Option<f64>,
    /// Van der Waals radius in Angstroms
    #[serde(default)]
    pub vdw_radius: Option<f64>,
    /// Covalent radius in Angstroms
    #[serde(default)]
    pub covalent_radius: Option<f64>,
}

fn overrides() -> &'static RwLock<ahash::AHashMap<String, AtomData>> {
    static OVERRIDES: OnceLock<RwLock<ahash::AHashMap<String, AtomData>>> = OnceLock::new();
    OVERRIDES.get_or_init(|| RwLock::new(ahash::AHashMap::new()))
}

/// Get the user-provided data for an atom type, if any
pub fn atom_data(atom_type: &str) -> Option<AtomData> {
    let guard = overrides()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.get(atom_type).cloned()
}

/// Register user-provided data for an atom type
pub fn add_atom_data(atom_type: impl Into<String>, data: AtomData) {
    let mut guard = overrides()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.insert(atom_type.into(), data);
}

/// Remove all registered atom type overrides
pub fn clear_atom_data() {
    let mut guard = overrides()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clear();
}

/// Load atom type overrides from a JSON file
///
/// The file must contain a single object mapping atom types to
/// [`AtomData`] objects. Entries are merged into the current overrides,
/// replacing duplicated types.
pub fn load_from_json(path: impl AsRef<Path>) -> Result<()> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let parsed: HashMap<String, AtomData> = serde_json::from_str(&content).map_err(|e| {
        Error::Configuration(format!(
            "invalid configuration file at '{}': {}",
            path.as_ref().display(),
            e
        ))
    })?;

    let mut guard = overrides()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    for (atom_type, data) in parsed {
        guard.insert(atom_type, data);
    }
    Ok(())
}
