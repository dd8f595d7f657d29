//! Atom data and element lookups

use crate::config;
use crate::core::periodic;
use crate::core::property::{Property, PropertyMap};

/// A single atom: a name, a type, a mass, a charge and arbitrary
/// per-atom properties.
///
/// The atom type drives element lookups (mass, radii, atomic number)
/// through the periodic table; runtime configuration overrides and the
/// `vdw_radius` property take precedence over the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atom {
    name: String,
    atom_type: String,
    mass: f64,
    charge: f64,
    properties: PropertyMap,
}

impl Atom {
    /// Create an atom with the given name; the type defaults to the name
    pub fn new(name: impl Into<String>) -> Atom {
        let name = name.into();
        Atom::with_type(name.clone(), name)
    }

    /// Create an atom with distinct name and type
    pub fn with_type(name: impl Into<String>, atom_type: impl Into<String>) -> Atom {
        let atom_type = atom_type.into();
        let mass = config::atom_data(&atom_type)
            .and_then(|data| data.mass)
            .or_else(|| periodic::lookup(&atom_type).map(|e| e.mass))
            .unwrap_or(0.0);
        Atom {
            name: name.into(),
            atom_type,
            mass,
            charge: 0.0,
            properties: PropertyMap::new(),
        }
    }

    /// The atom name, e.g. "CA" or "O2"
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The atom type, e.g. "C" or "Ow"
    pub fn atom_type(&self) -> &str {
        &self.atom_type
    }

    /// The atom mass in atomic mass units
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// The atom charge in multiples of e
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Change the atom name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Change the atom type. This updates the mass from the new type.
    pub fn set_type(&mut self, atom_type: impl Into<String>) {
        self.atom_type = atom_type.into();
        self.mass = config::atom_data(&self.atom_type)
            .and_then(|data| data.mass)
            .or_else(|| periodic::lookup(&self.atom_type).map(|e| e.mass))
            .unwrap_or(0.0);
    }

    /// Change the atom mass
    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
    }

    /// Change the atom charge
    pub fn set_charge(&mut self, charge: f64) {
        self.charge = charge;
    }

    /// The atomic number for this atom type, if known
    pub fn atomic_number(&self) -> Option<u64> {
        periodic::lookup(&self.atom_type).map(|e| e.number)
    }

    /// The full element name for this atom type, if known
    pub fn full_name(&self) -> Option<&'static str> {
        periodic::lookup(&self.atom_type).map(|e| e.name)
    }

    /// The covalent radius for this atom type in Angstroms, if known
    pub fn covalent_radius(&self) -> Option<f64> {
        if let Some(data) = config::atom_data(&self.atom_type) {
            if data.covalent_radius.is_some() {
                return data.covalent_radius;
            }
        }
        periodic::lookup(&self.atom_type).and_then(|e| e.covalent_radius)
    }

    /// The Van der Waals radius for this atom in Angstroms, if known.
    ///
    /// A `vdw_radius` property on the atom overrides both the runtime
    /// configuration and the periodic table.
    pub fn vdw_radius(&self) -> Option<f64> {
        if let Some(Property::Double(radius)) = self.properties.get("vdw_radius") {
            return Some(*radius);
        }
        if let Some(data) = config::atom_data(&self.atom_type) {
            if data.vdw_radius.is_some() {
                return data.vdw_radius;
            }
        }
        periodic::lookup(&self.atom_type).and_then(|e| e.vdw_radius)
    }

    /// Set a named property on this atom
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Property>) {
        self.properties.set(name, value);
    }

    /// Get a named property on this atom
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// All properties attached to this atom
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_defaults_to_name() {
        let atom = Atom::new("Zn");
        assert_eq!(atom.name(), "Zn");
        assert_eq!(atom.atom_type(), "Zn");
        assert!((atom.mass() - 65.409).abs() < 1e-6);
    }

    #[test]
    fn test_distinct_name_and_type() {
        let atom = Atom::with_type("OW", "O");
        assert_eq!(atom.name(), "OW");
        assert_eq!(atom.atom_type(), "O");
        assert!((atom.mass() - 15.999).abs() < 1e-6);
        assert_eq!(atom.atomic_number(), Some(8));
        assert_eq!(atom.full_name(), Some("Oxygen"));
    }

    #[test]
    fn test_unknown_type() {
        let atom = Atom::new("XYZZY");
        assert_eq!(atom.mass(), 0.0);
        assert_eq!(atom.atomic_number(), None);
        assert_eq!(atom.vdw_radius(), None);
    }

    #[test]
    fn test_vdw_radius_property_override() {
        let mut atom = Atom::new("C");
        assert_eq!(atom.vdw_radius(), Some(1.70));
        atom.set("vdw_radius", 2.5);
        assert_eq!(atom.vdw_radius(), Some(2.5));
    }

    #[test]
    fn test_set_type_updates_mass() {
        let mut atom = Atom::new("C");
        atom.set_type("N");
        assert!((atom.mass() - 14.007).abs() < 1e-6);
    }
}
