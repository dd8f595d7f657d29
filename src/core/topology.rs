//! Topology: atoms, residues and connectivity

use crate::core::atom::Atom;
use crate::core::connectivity::{Angle, Bond, BondOrder, Connectivity, Dihedral, Improper};
use crate::core::residue::Residue;
use crate::errors::{Error, Result};

/// The topology of a frame: the atoms, the residues grouping them and
/// the connectivity between them.
///
/// Atoms are identified by their index in the atom list; every index in
/// bonds and residues refers to this list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    atoms: Vec<Atom>,
    connectivity: Connectivity,
    residues: Vec<Residue>,
    // atom index -> residue index
    residue_mapping: ahash::AHashMap<usize, usize>,
}

impl Topology {
    /// Create an empty topology
    pub fn new() -> Topology {
        Topology::default()
    }

    /// Number of atoms in the topology
    pub fn size(&self) -> usize {
        self.atoms.len()
    }

    /// Check whether the topology contains no atoms
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Append an atom to the topology
    pub fn add_atom(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    /// Access the atom at `index`
    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    /// Mutable access to the atom at `index`
    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    /// All the atoms in the topology
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Resize the topology to contain `size` atoms, appending default
    /// atoms or truncating. Fails when a bond references a truncated
    /// index.
    pub fn resize(&mut self, size: usize) -> Result<()> {
        for bond in self.connectivity.bonds() {
            if bond[0] >= size || bond[1] >= size {
                return Err(Error::invalid(format!(
                    "can not resize the topology to contain {} atoms as there \
                     is a bond between atoms {} - {}",
                    size, bond[0], bond[1]
                )));
            }
        }
        self.atoms.resize_with(size, Atom::default);
        Ok(())
    }

    /// Reserve capacity for `size` atoms
    pub fn reserve(&mut self, size: usize) {
        self.atoms.reserve(size);
    }

    /// Add a bond between the atoms at `i` and `j`
    pub fn add_bond(&mut self, i: usize, j: usize, order: BondOrder) -> Result<()> {
        self.check_indexes("add_bond", &[i, j])?;
        self.connectivity.add_bond(i, j, order)
    }

    /// Remove the bond between the atoms at `i` and `j`, if it exists
    pub fn remove_bond(&mut self, i: usize, j: usize) -> Result<()> {
        self.check_indexes("remove_bond", &[i, j])?;
        self.connectivity.remove_bond(i, j)
    }

    /// Get the order of the bond between the atoms at `i` and `j`
    pub fn bond_order(&self, i: usize, j: usize) -> Result<BondOrder> {
        self.check_indexes("bond_order", &[i, j])?;
        self.connectivity.bond_order(i, j)
    }

    /// Remove the atom at `index`, shifting every higher index down by
    /// one in bonds, residues and the atom to residue mapping.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.check_indexes("remove", &[index])?;
        // drop every bond touching the atom first, so the index shift is valid
        let to_remove: Vec<Bond> = self
            .connectivity
            .bonds()
            .iter()
            .filter(|bond| bond[0] == index || bond[1] == index)
            .copied()
            .collect();
        for bond in to_remove {
            self.connectivity.remove_bond(bond[0], bond[1])?;
        }

        self.atoms.remove(index);
        self.connectivity.atom_removed(index)?;

        if let Some(residue) = self.residue_mapping.remove(&index) {
            self.residues[residue].remove(index);
        }
        for residue in &mut self.residues {
            residue.atom_removed(index);
        }

        let mut mapping = ahash::AHashMap::with_capacity(self.residue_mapping.len());
        for (atom, residue) in self.residue_mapping.drain() {
            let atom = if atom > index { atom - 1 } else { atom };
            mapping.insert(atom, residue);
        }
        self.residue_mapping = mapping;
        Ok(())
    }

    /// All bonds, sorted canonically
    pub fn bonds(&self) -> &[Bond] {
        self.connectivity.bonds()
    }

    /// Bond orders, index-aligned with `bonds()`
    pub fn bond_orders(&self) -> &[BondOrder] {
        self.connectivity.bond_orders()
    }

    /// All angles derived from the bonds
    pub fn angles(&mut self) -> &[Angle] {
        self.connectivity.angles()
    }

    /// All dihedrals derived from the bonds
    pub fn dihedrals(&mut self) -> &[Dihedral] {
        self.connectivity.dihedrals()
    }

    /// All impropers derived from the bonds
    pub fn impropers(&mut self) -> &[Improper] {
        self.connectivity.impropers()
    }

    /// Remove all bonds
    pub fn clear_bonds(&mut self) {
        self.connectivity.clear();
    }

    /// Add a residue to the topology, failing if any of its atoms is
    /// already part of another residue
    pub fn add_residue(&mut self, residue: Residue) -> Result<()> {
        for &atom in &residue {
            if self.residue_mapping.contains_key(&atom) {
                return Err(Error::invalid(format!(
                    "can not add this residue: atom {} is already in another residue",
                    atom
                )));
            }
        }
        let residue_index = self.residues.len();
        for &atom in &residue {
            self.residue_mapping.insert(atom, residue_index);
        }
        self.residues.push(residue);
        Ok(())
    }

    /// All residues in the topology
    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    /// The residue containing the atom at `index`, if any
    pub fn residue_for_atom(&self, index: usize) -> Option<&Residue> {
        self.residue_mapping
            .get(&index)
            .map(|&residue| &self.residues[residue])
    }

    /// Check whether two residues are linked, i.e. a bond connects them
    /// or they are the same residue
    pub fn are_linked(&self, first: &Residue, second: &Residue) -> bool {
        if first == second {
            return true;
        }
        for &i in first {
            for &j in second {
                if self.connectivity.contains_bond(i, j) {
                    return true;
                }
            }
        }
        false
    }

    fn check_indexes(&self, operation: &str, indexes: &[usize]) -> Result<()> {
        for &index in indexes {
            if index >= self.size() {
                return Err(Error::out_of_bounds(format!(
                    "atomic index in Topology::{}: we have {} atoms, but the index is {}",
                    operation,
                    self.size(),
                    index
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology_with_atoms(count: usize) -> Topology {
        let mut topology = Topology::new();
        for _ in 0..count {
            topology.add_atom(Atom::new("C"));
        }
        topology
    }

    #[test]
    fn test_bond_index_checks() {
        let mut topology = topology_with_atoms(3);
        assert!(topology.add_bond(0, 1, BondOrder::Unknown).is_ok());
        assert!(matches!(
            topology.add_bond(0, 12, BondOrder::Unknown),
            Err(Error::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_resize_with_bonds() {
        let mut topology = topology_with_atoms(5);
        topology.add_bond(3, 4, BondOrder::Unknown).unwrap();
        assert!(topology.resize(4).is_err());
        assert!(topology.resize(8).is_ok());
        assert_eq!(topology.size(), 8);
    }

    #[test]
    fn test_remove_shifts_bonds_and_residues() {
        let mut topology = topology_with_atoms(5);
        topology.add_bond(0, 1, BondOrder::Unknown).unwrap();
        topology.add_bond(3, 4, BondOrder::Unknown).unwrap();

        let mut residue = Residue::new("RES");
        residue.add_atom(3);
        residue.add_atom(4);
        topology.add_residue(residue).unwrap();

        topology.remove(2).unwrap();

        assert_eq!(topology.size(), 4);
        assert_eq!(
            topology.bonds(),
            &[Bond::new(0, 1).unwrap(), Bond::new(2, 3).unwrap()]
        );
        let residue = topology.residue_for_atom(2).unwrap();
        assert!(residue.contains(2));
        assert!(residue.contains(3));
        assert!(topology.residue_for_atom(0).is_none());
    }

    #[test]
    fn test_remove_drops_attached_bonds() {
        let mut topology = topology_with_atoms(3);
        topology.add_bond(0, 1, BondOrder::Unknown).unwrap();
        topology.add_bond(1, 2, BondOrder::Unknown).unwrap();
        topology.remove(1).unwrap();
        assert!(topology.bonds().is_empty());
        assert_eq!(topology.size(), 2);
    }

    #[test]
    fn test_atom_in_single_residue() {
        let mut topology = topology_with_atoms(3);
        let mut first = Residue::new("A");
        first.add_atom(0);
        topology.add_residue(first).unwrap();

        let mut second = Residue::new("B");
        second.add_atom(0);
        assert!(topology.add_residue(second).is_err());
    }

    #[test]
    fn test_are_linked() {
        let mut topology = topology_with_atoms(4);
        topology.add_bond(1, 2, BondOrder::Unknown).unwrap();

        let mut first = Residue::new("A");
        first.add_atom(0);
        first.add_atom(1);
        let mut second = Residue::new("B");
        second.add_atom(2);
        second.add_atom(3);

        topology.add_residue(first.clone()).unwrap();
        topology.add_residue(second.clone()).unwrap();

        assert!(topology.are_linked(&first, &second));
        assert!(topology.are_linked(&first, &first));

        let mut third = Residue::new("C");
        third.add_atom(3);
        assert!(!topology.are_linked(&first, &third));
    }
}
