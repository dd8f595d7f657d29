//! Bonds and derived connectivity elements
//!
//! Bonds, angles, dihedrals and impropers are stored in canonical form
//! so that chemically equivalent elements compare equal, whatever the
//! order their atoms were given in. The angle/dihedral/improper sets are
//! derived from the bonds and recomputed lazily.

use crate::errors::{Error, Result};
use crate::utils::SortedSet;

/// The order of a bond
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BondOrder {
    /// The bond order is unknown or unspecified
    #[default]
    Unknown,
    /// Single bond
    Single,
    /// Double bond
    Double,
    /// Triple bond
    Triple,
    /// Quadruple bond, used in some metal complexes
    Quadruple,
    /// Aromatic or otherwise delocalised bond
    Aromatic,
    /// Amide bond
    Amide,
}

/// A bond between the atoms at indexes `i` and `j`
///
/// The canonical representation stores the smaller index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bond([usize; 2]);

impl Bond {
    /// Create a bond, failing if `i == j`
    pub fn new(i: usize, j: usize) -> Result<Bond> {
        if i == j {
            return Err(Error::invalid(
                "can not have a bond between an atom and itself",
            ));
        }
        Ok(Bond([i.min(j), i.max(j)]))
    }

    /// The two atoms of this bond, in canonical order
    pub fn atoms(&self) -> [usize; 2] {
        self.0
    }
}

impl std::ops::Index<usize> for Bond {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

/// An angle between the atoms at indexes `i`, `j` and `k`, where `j` is
/// the central atom
///
/// The canonical representation stores `min(i, k), j, max(i, k)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Angle([usize; 3]);

impl Angle {
    /// Create an angle, failing if any two atoms are the same
    pub fn new(i: usize, j: usize, k: usize) -> Result<Angle> {
        if i == j || i == k || j == k {
            return Err(Error::invalid(
                "can not have the same atom twice in an angle",
            ));
        }
        Ok(Angle([i.min(k), j, i.max(k)]))
    }

    /// The three atoms of this angle, in canonical order
    pub fn atoms(&self) -> [usize; 3] {
        self.0
    }
}

impl std::ops::Index<usize> for Angle {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

/// A dihedral angle formed by the atoms at indexes `i`, `j`, `k` and
/// `m`, bonded as i-j-k-m
///
/// The canonical representation is the one of `(i, j, k, m)` and its
/// reverse with `max(i, j) < max(k, m)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dihedral([usize; 4]);

impl Dihedral {
    /// Create a dihedral, failing if any atom is repeated
    pub fn new(i: usize, j: usize, k: usize, m: usize) -> Result<Dihedral> {
        if i == j || j == k || k == m {
            return Err(Error::invalid(
                "can not have an atom linked to itself in a dihedral angle",
            ));
        }
        if i == k || j == m || i == m {
            return Err(Error::invalid(
                "can not have an atom twice in a dihedral angle",
            ));
        }
        if i.max(j) < k.max(m) {
            Ok(Dihedral([i, j, k, m]))
        } else {
            Ok(Dihedral([m, k, j, i]))
        }
    }

    /// The four atoms of this dihedral, in canonical order
    pub fn atoms(&self) -> [usize; 4] {
        self.0
    }
}

impl std::ops::Index<usize> for Dihedral {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

/// An improper dihedral centered on the atom at index `j`, with `i`,
/// `k` and `m` bonded to it
///
/// The canonical representation stores the central atom second and the
/// three others in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Improper([usize; 4]);

impl Improper {
    /// Create an improper, failing if any atom is repeated
    pub fn new(i: usize, j: usize, k: usize, m: usize) -> Result<Improper> {
        if j == i || j == k || j == m {
            return Err(Error::invalid(
                "can not have an atom linked to itself in an improper dihedral angle",
            ));
        }
        if i == k || i == m || k == m {
            return Err(Error::invalid(
                "can not have an atom twice in an improper dihedral angle",
            ));
        }
        let mut others = [i, k, m];
        others.sort_unstable();
        Ok(Improper([others[0], j, others[1], others[2]]))
    }

    /// The four atoms of this improper, with the central atom second
    pub fn atoms(&self) -> [usize; 4] {
        self.0
    }
}

impl std::ops::Index<usize> for Improper {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

/// The connectivity of a topology: a set of bonds with their orders, and
/// the angles, dihedrals and impropers derived from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connectivity {
    bonds: SortedSet<Bond>,
    // kept index-aligned with `bonds`
    bond_orders: Vec<BondOrder>,
    angles: SortedSet<Angle>,
    dihedrals: SortedSet<Dihedral>,
    impropers: SortedSet<Improper>,
    uptodate: bool,
    biggest_atom: usize,
}

impl Connectivity {
    /// Create an empty connectivity
    pub fn new() -> Connectivity {
        Connectivity {
            uptodate: true,
            ..Connectivity::default()
        }
    }

    /// Add a bond between atoms `i` and `j` with the given order.
    ///
    /// Adding an existing bond keeps its original order.
    pub fn add_bond(&mut self, i: usize, j: usize, order: BondOrder) -> Result<()> {
        let bond = Bond::new(i, j)?;
        self.uptodate = false;
        self.biggest_atom = self.biggest_atom.max(i).max(j);

        let (rank, inserted) = self.bonds.insert(bond);
        if inserted {
            self.bond_orders.insert(rank, order);
        }
        Ok(())
    }

    /// Remove the bond between atoms `i` and `j`. Removing a bond that
    /// does not exist does nothing.
    pub fn remove_bond(&mut self, i: usize, j: usize) -> Result<()> {
        let bond = Bond::new(i, j)?;
        if let Some(rank) = self.bonds.remove(&bond) {
            self.uptodate = false;
            self.bond_orders.remove(rank);
        }
        debug_assert_eq!(self.bonds.len(), self.bond_orders.len());
        Ok(())
    }

    /// Check whether a bond between atoms `i` and `j` exists
    pub fn contains_bond(&self, i: usize, j: usize) -> bool {
        Bond::new(i, j).map_or(false, |bond| self.bonds.contains(&bond))
    }

    /// Get the order of the bond between atoms `i` and `j`, failing when
    /// the bond does not exist
    pub fn bond_order(&self, i: usize, j: usize) -> Result<BondOrder> {
        let bond = Bond::new(i, j)?;
        match self.bonds.position(&bond) {
            Some(rank) => Ok(self.bond_orders[rank]),
            None => Err(Error::invalid(format!(
                "out of bounds atomic index in bond_order: no bond between {} and {} exists",
                i, j
            ))),
        }
    }

    /// Shift the atomic indexes after the atom at `index` was removed,
    /// failing when a bond still references it
    pub fn atom_removed(&mut self, index: usize) -> Result<()> {
        for bond in self.bonds.iter() {
            if bond[0] == index || bond[1] == index {
                return Err(Error::invalid(
                    "can not shift atomic indexes that still have a bond",
                ));
            }
        }

        // decrementing indexes above `index` is strictly monotonic on the
        // remaining atoms, so the canonical sort order is preserved
        for bond in self.bonds.as_mutable_vec() {
            let [mut i, mut j] = bond.atoms();
            if i > index {
                i -= 1;
            }
            if j > index {
                j -= 1;
            }
            *bond = Bond([i, j]);
        }

        if self.biggest_atom > 0 {
            self.biggest_atom -= 1;
        }
        self.uptodate = false;
        Ok(())
    }

    /// All bonds, sorted canonically. This is always cheap.
    pub fn bonds(&self) -> &[Bond] {
        self.bonds.as_vec()
    }

    /// Bond orders, index-aligned with `bonds()`. This is always cheap.
    pub fn bond_orders(&self) -> &[BondOrder] {
        &self.bond_orders
    }

    /// All angles, recomputing them first if the bonds changed
    pub fn angles(&mut self) -> &[Angle] {
        if !self.uptodate {
            self.recalculate();
        }
        self.angles.as_vec()
    }

    /// All dihedrals, recomputing them first if the bonds changed
    pub fn dihedrals(&mut self) -> &[Dihedral] {
        if !self.uptodate {
            self.recalculate();
        }
        self.dihedrals.as_vec()
    }

    /// All impropers, recomputing them first if the bonds changed
    pub fn impropers(&mut self) -> &[Improper] {
        if !self.uptodate {
            self.recalculate();
        }
        self.impropers.as_vec()
    }

    /// Remove every bond and derived element
    pub fn clear(&mut self) {
        self.bonds.clear();
        self.bond_orders.clear();
        self.angles.clear();
        self.dihedrals.clear();
        self.impropers.clear();
        self.uptodate = true;
        self.biggest_atom = 0;
    }

    /// Rebuild the angle, dihedral and improper sets from the bonds.
    ///
    /// The result only depends on the set of bonds, never on the order
    /// they were inserted in.
    fn recalculate(&mut self) {
        self.angles.clear();
        self.dihedrals.clear();
        self.impropers.clear();

        let mut bonded_to = vec![Vec::new(); self.biggest_atom + 1];
        for bond in self.bonds.iter() {
            bonded_to[bond[0]].push(bond[1]);
            bonded_to[bond[1]].push(bond[0]);
        }

        // the atom filters make every constructor below infallible
        let mut angles = std::mem::take(&mut self.angles);
        for bond in self.bonds.iter() {
            let (i, j) = (bond[0], bond[1]);
            for &k in &bonded_to[i] {
                if k != j {
                    if let Ok(angle) = Angle::new(k, i, j) {
                        angles.insert(angle);
                    }
                }
            }
            for &k in &bonded_to[j] {
                if k != i {
                    if let Ok(angle) = Angle::new(i, j, k) {
                        angles.insert(angle);
                    }
                }
            }
        }
        self.angles = angles;

        for angle in self.angles.iter() {
            let (i, j, k) = (angle[0], angle[1], angle[2]);
            for &m in &bonded_to[i] {
                if m != j && m != k {
                    if let Ok(dihedral) = Dihedral::new(m, i, j, k) {
                        self.dihedrals.insert(dihedral);
                    }
                }
            }
            for &m in &bonded_to[k] {
                if m != i && m != j {
                    if let Ok(dihedral) = Dihedral::new(i, j, k, m) {
                        self.dihedrals.insert(dihedral);
                    }
                }
            }
            for &m in &bonded_to[j] {
                if m != i && m != k {
                    if let Ok(improper) = Improper::new(i, j, k, m) {
                        self.impropers.insert(improper);
                    }
                }
            }
        }

        self.uptodate = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bond_canonical_order() {
        assert_eq!(Bond::new(5, 2).unwrap(), Bond::new(2, 5).unwrap());
        assert_eq!(Bond::new(5, 2).unwrap().atoms(), [2, 5]);
        assert!(Bond::new(3, 3).is_err());
    }

    #[test]
    fn test_angle_canonical_order() {
        assert_eq!(Angle::new(7, 1, 3).unwrap(), Angle::new(3, 1, 7).unwrap());
        assert_eq!(Angle::new(7, 1, 3).unwrap().atoms(), [3, 1, 7]);
        assert!(Angle::new(1, 1, 2).is_err());
        assert!(Angle::new(1, 2, 1).is_err());
    }

    #[test]
    fn test_dihedral_canonical_order() {
        assert_eq!(
            Dihedral::new(0, 1, 2, 3).unwrap(),
            Dihedral::new(3, 2, 1, 0).unwrap()
        );
        assert_eq!(Dihedral::new(3, 2, 1, 0).unwrap().atoms(), [0, 1, 2, 3]);
        assert!(Dihedral::new(0, 0, 2, 3).is_err());
        assert!(Dihedral::new(0, 1, 0, 3).is_err());
        assert!(Dihedral::new(0, 1, 2, 0).is_err());
    }

    #[test]
    fn test_improper_canonical_order() {
        assert_eq!(
            Improper::new(5, 1, 3, 0).unwrap(),
            Improper::new(0, 1, 5, 3).unwrap()
        );
        assert_eq!(Improper::new(5, 1, 3, 0).unwrap().atoms(), [0, 1, 3, 5]);
        assert!(Improper::new(1, 1, 2, 3).is_err());
        assert!(Improper::new(2, 1, 2, 3).is_err());
    }

    #[test]
    fn test_bond_orders_stay_aligned() {
        let mut connectivity = Connectivity::new();
        connectivity.add_bond(3, 4, BondOrder::Double).unwrap();
        connectivity.add_bond(0, 1, BondOrder::Single).unwrap();
        connectivity.add_bond(1, 2, BondOrder::Triple).unwrap();

        assert_eq!(
            connectivity.bonds(),
            &[
                Bond::new(0, 1).unwrap(),
                Bond::new(1, 2).unwrap(),
                Bond::new(3, 4).unwrap(),
            ]
        );
        assert_eq!(
            connectivity.bond_orders(),
            &[BondOrder::Single, BondOrder::Triple, BondOrder::Double]
        );

        connectivity.remove_bond(2, 1).unwrap();
        assert_eq!(
            connectivity.bond_orders(),
            &[BondOrder::Single, BondOrder::Double]
        );
        assert_eq!(
            connectivity.bond_order(4, 3).unwrap(),
            BondOrder::Double
        );
        assert!(connectivity.bond_order(1, 2).is_err());
    }

    #[test]
    fn test_remove_bond_is_idempotent() {
        let mut connectivity = Connectivity::new();
        connectivity.add_bond(0, 1, BondOrder::Unknown).unwrap();
        connectivity.remove_bond(7, 8).unwrap();
        connectivity.remove_bond(0, 1).unwrap();
        connectivity.remove_bond(0, 1).unwrap();
        assert!(connectivity.bonds().is_empty());
    }

    #[test]
    fn test_duplicate_bond_keeps_first_order() {
        let mut connectivity = Connectivity::new();
        connectivity.add_bond(0, 1, BondOrder::Double).unwrap();
        connectivity.add_bond(1, 0, BondOrder::Single).unwrap();
        assert_eq!(connectivity.bonds().len(), 1);
        assert_eq!(connectivity.bond_order(0, 1).unwrap(), BondOrder::Double);
    }

    #[test]
    fn test_angles_from_bonds() {
        let mut connectivity = Connectivity::new();
        for (i, j) in [(0, 1), (1, 2), (2, 3), (3, 4), (1, 4)] {
            connectivity.add_bond(i, j, BondOrder::Unknown).unwrap();
        }

        let expected: Vec<Angle> = [
            (0, 1, 2),
            (0, 1, 4),
            (1, 2, 3),
            (2, 1, 4),
            (2, 3, 4),
            (3, 4, 1),
        ]
        .into_iter()
        .map(|(i, j, k)| Angle::new(i, j, k).unwrap())
        .collect();

        let angles = connectivity.angles();
        assert_eq!(angles.len(), expected.len());
        for angle in &expected {
            assert!(angles.contains(angle));
        }
    }

    #[test]
    fn test_dihedrals_from_bonds() {
        let mut connectivity = Connectivity::new();
        for (i, j) in [(0, 1), (1, 2), (2, 3), (3, 4), (1, 4)] {
            connectivity.add_bond(i, j, BondOrder::Unknown).unwrap();
        }

        let dihedrals = connectivity.dihedrals().to_vec();
        assert!(dihedrals.contains(&Dihedral::new(0, 1, 2, 3).unwrap()));
        assert!(dihedrals.contains(&Dihedral::new(0, 1, 4, 3).unwrap()));
    }

    #[test]
    fn test_recompute_is_insertion_order_independent() {
        let bonds = [(0, 1), (1, 2), (2, 3), (3, 4), (1, 4)];

        let mut forward = Connectivity::new();
        for (i, j) in bonds {
            forward.add_bond(i, j, BondOrder::Unknown).unwrap();
        }
        let mut reversed = Connectivity::new();
        for (i, j) in bonds.iter().rev() {
            reversed.add_bond(*j, *i, BondOrder::Unknown).unwrap();
        }

        assert_eq!(forward.angles(), reversed.angles());
        assert_eq!(forward.dihedrals(), reversed.dihedrals());
        assert_eq!(forward.impropers(), reversed.impropers());
    }

    #[test]
    fn test_impropers_from_bonds() {
        // a central atom 0 bonded to 1, 2 and 3
        let mut connectivity = Connectivity::new();
        for j in [1, 2, 3] {
            connectivity.add_bond(0, j, BondOrder::Unknown).unwrap();
        }
        assert_eq!(
            connectivity.impropers(),
            &[Improper::new(1, 0, 2, 3).unwrap()]
        );
    }

    #[test]
    fn test_atom_removed() {
        let mut connectivity = Connectivity::new();
        connectivity.add_bond(0, 2, BondOrder::Single).unwrap();
        connectivity.add_bond(2, 4, BondOrder::Double).unwrap();

        assert!(connectivity.atom_removed(2).is_err());

        connectivity.remove_bond(0, 2).unwrap();
        connectivity.remove_bond(2, 4).unwrap();
        connectivity.add_bond(0, 3, BondOrder::Single).unwrap();
        connectivity.atom_removed(2).unwrap();
        assert_eq!(connectivity.bonds(), &[Bond::new(0, 2).unwrap()]);
        assert_eq!(connectivity.bond_orders(), &[BondOrder::Single]);
    }
}
