//! Frames: one time-step of a simulation

use crate::config;
use crate::core::atom::Atom;
use crate::core::cell::UnitCell;
use crate::core::connectivity::BondOrder;
use crate::core::math::Vector3D;
use crate::core::property::{Property, PropertyMap};
use crate::core::topology::Topology;
use crate::errors::{Error, Result};
use crate::warnings::warning;

/// One time-step of a simulation: a topology, the atomic positions,
/// optionally the velocities, a unit cell and frame-level properties.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    step: u64,
    positions: Vec<Vector3D>,
    velocities: Option<Vec<Vector3D>>,
    topology: Topology,
    cell: UnitCell,
    properties: PropertyMap,
}

impl Frame {
    /// Create an empty frame with an infinite cell
    pub fn new() -> Frame {
        Frame::default()
    }

    /// Create an empty frame with the given cell
    pub fn with_cell(cell: UnitCell) -> Frame {
        Frame {
            cell,
            ..Frame::default()
        }
    }

    /// Number of atoms in the frame
    pub fn size(&self) -> usize {
        debug_assert_eq!(self.positions.len(), self.topology.size());
        if let Some(velocities) = &self.velocities {
            debug_assert_eq!(self.positions.len(), velocities.len());
        }
        self.positions.len()
    }

    /// Check whether the frame contains no atoms
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The simulation step this frame was recorded at
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Change the simulation step
    pub fn set_step(&mut self, step: u64) {
        self.step = step;
    }

    /// The unit cell of this frame
    pub fn cell(&self) -> &UnitCell {
        &self.cell
    }

    /// Change the unit cell
    pub fn set_cell(&mut self, cell: UnitCell) {
        self.cell = cell;
    }

    /// The topology of this frame
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Mutable access to the topology
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Replace the topology, failing when the atom counts differ
    pub fn set_topology(&mut self, topology: Topology) -> Result<()> {
        if topology.size() != self.size() {
            return Err(Error::invalid(format!(
                "the topology contains {} atoms, but the frame contains {} atoms",
                topology.size(),
                self.size()
            )));
        }
        self.topology = topology;
        Ok(())
    }

    /// The atomic positions, in Angstroms
    pub fn positions(&self) -> &[Vector3D] {
        &self.positions
    }

    /// Mutable access to the atomic positions
    pub fn positions_mut(&mut self) -> &mut [Vector3D] {
        &mut self.positions
    }

    /// The atomic velocities in Angstrom/ps, if enabled
    pub fn velocities(&self) -> Option<&[Vector3D]> {
        self.velocities.as_deref()
    }

    /// Mutable access to the atomic velocities, if enabled
    pub fn velocities_mut(&mut self) -> Option<&mut [Vector3D]> {
        self.velocities.as_deref_mut()
    }

    /// Enable velocity storage, zero-filled. Does nothing when
    /// velocities are already enabled.
    pub fn add_velocities(&mut self) {
        if self.velocities.is_none() {
            self.velocities = Some(vec![Vector3D::zeros(); self.size()]);
        }
    }

    /// Resize the frame to contain `size` atoms. New atoms get default
    /// data and zeroed positions; velocities track the positions.
    pub fn resize(&mut self, size: usize) -> Result<()> {
        self.topology.resize(size)?;
        self.positions.resize(size, Vector3D::zeros());
        if let Some(velocities) = &mut self.velocities {
            velocities.resize(size, Vector3D::zeros());
        }
        Ok(())
    }

    /// Reserve capacity for `size` atoms
    pub fn reserve(&mut self, size: usize) {
        self.topology.reserve(size);
        self.positions.reserve(size);
        if let Some(velocities) = &mut self.velocities {
            velocities.reserve(size);
        }
    }

    /// Append an atom with its position and optional velocity. The
    /// velocity is ignored when velocity storage is not enabled.
    pub fn add_atom(&mut self, atom: Atom, position: Vector3D, velocity: Option<Vector3D>) {
        self.topology.add_atom(atom);
        self.positions.push(position);
        if let Some(velocities) = &mut self.velocities {
            velocities.push(velocity.unwrap_or_else(Vector3D::zeros));
        }
    }

    /// Remove the atom at `index` from the positions, the velocities and
    /// the topology
    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.size() {
            return Err(Error::out_of_bounds(format!(
                "atomic index in Frame::remove: we have {} atoms, but the index is {}",
                self.size(),
                index
            )));
        }
        self.topology.remove(index)?;
        self.positions.remove(index);
        if let Some(velocities) = &mut self.velocities {
            velocities.remove(index);
        }
        Ok(())
    }

    /// Distance between the atoms at `i` and `j`, in Angstroms,
    /// accounting for periodic boundary conditions
    pub fn distance(&self, i: usize, j: usize) -> Result<f64> {
        self.check_indexes("distance", &[i, j])?;
        let rij = self.positions[i] - self.positions[j];
        Ok(self.cell.wrap(&rij).norm())
    }

    /// Angle formed by the atoms at `i`, `j` and `k` with `j` central,
    /// in radians
    pub fn angle(&self, i: usize, j: usize, k: usize) -> Result<f64> {
        self.check_indexes("angle", &[i, j, k])?;
        let rij = self.cell.wrap(&(self.positions[i] - self.positions[j]));
        let rkj = self.cell.wrap(&(self.positions[k] - self.positions[j]));
        let cos = rij.dot(&rkj) / (rij.norm() * rkj.norm());
        Ok(cos.clamp(-1.0, 1.0).acos())
    }

    /// Dihedral angle formed by the atoms at `i`, `j`, `k` and `m`,
    /// bonded as i-j-k-m, in radians
    pub fn dihedral(&self, i: usize, j: usize, k: usize, m: usize) -> Result<f64> {
        self.check_indexes("dihedral", &[i, j, k, m])?;
        let rij = self.cell.wrap(&(self.positions[i] - self.positions[j]));
        let rjk = self.cell.wrap(&(self.positions[j] - self.positions[k]));
        let rkm = self.cell.wrap(&(self.positions[k] - self.positions[m]));

        let a = rij.cross(&rjk);
        let b = rjk.cross(&rkm);
        Ok(f64::atan2(rjk.norm() * b.dot(&rij), a.dot(&b)))
    }

    /// Distance from the atom at `j` to the plane through the atoms at
    /// `i`, `k` and `m`, in Angstroms. Returns 0 when the plane is
    /// degenerate.
    pub fn out_of_plane(&self, i: usize, j: usize, k: usize, m: usize) -> Result<f64> {
        self.check_indexes("out_of_plane", &[i, j, k, m])?;
        let rji = self.cell.wrap(&(self.positions[j] - self.positions[i]));
        let rik = self.cell.wrap(&(self.positions[i] - self.positions[k]));
        let rim = self.cell.wrap(&(self.positions[i] - self.positions[m]));

        let normal = rik.cross(&rim);
        let norm = normal.norm();
        if norm < 1e-12 {
            // i, k and m are colinear, j is always inside the plane
            Ok(0.0)
        } else {
            Ok(rji.dot(&normal) / norm)
        }
    }

    /// Guess the bonds in this frame from the interatomic distances.
    ///
    /// This replaces any existing bonds. The heuristic uses per-element
    /// distance cutoffs and removes spurious bonds between hydrogens
    /// bonded to other atoms, like VMD does.
    pub fn guess_bonds(&mut self) -> Result<()> {
        self.topology.clear_bonds();

        let mut cutoff: f64 = 0.833;
        for atom in self.topology.atoms() {
            let radius = guess_bonds_radius(atom).unwrap_or(0.0);
            cutoff = cutoff.max(radius);
        }
        let cutoff = 1.2 * cutoff;

        for i in 0..self.size() {
            let i_radius = guess_bonds_radius(&self.topology.atoms()[i]).ok_or_else(|| {
                Error::invalid(format!(
                    "missing Van der Waals radius for '{}'",
                    self.topology.atoms()[i].atom_type()
                ))
            })?;
            for j in (i + 1)..self.size() {
                let j_radius = guess_bonds_radius(&self.topology.atoms()[j]).ok_or_else(|| {
                    Error::invalid(format!(
                        "missing Van der Waals radius for '{}'",
                        self.topology.atoms()[j].atom_type()
                    ))
                })?;
                let d = self.distance(i, j)?;
                let radii = i_radius + j_radius;
                if 0.03 < d && d < 0.6 * radii && d < cutoff {
                    self.topology.add_bond(i, j, BondOrder::Unknown)?;
                }
            }
        }

        // remove bonds between hydrogens which are bonded more than once
        let bonds = self.topology.bonds().to_vec();
        let mut to_remove = Vec::new();
        for bond in &bonds {
            let (i, j) = (bond[0], bond[1]);
            if self.topology.atoms()[i].atom_type() != "H" {
                continue;
            }
            if self.topology.atoms()[j].atom_type() != "H" {
                continue;
            }

            let nbonds = bonds
                .iter()
                .filter(|b| b[0] == i || b[0] == j || b[1] == i || b[1] == j)
                .count();
            if nbonds != 1 {
                to_remove.push(*bond);
            }
        }
        for bond in &to_remove {
            warning(
                "bond guessing",
                format!("removing H-H bond between atoms {} and {}", bond[0], bond[1]),
            );
            self.topology.remove_bond(bond[0], bond[1])?;
        }

        Ok(())
    }

    /// Set a named property on this frame
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Property>) {
        self.properties.set(name, value);
    }

    /// Get a named property on this frame
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// All properties attached to this frame
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    fn check_indexes(&self, operation: &str, indexes: &[usize]) -> Result<()> {
        for &index in indexes {
            if index >= self.size() {
                return Err(Error::out_of_bounds(format!(
                    "atomic index in Frame::{}: we have {} atoms, but the index is {}",
                    operation,
                    self.size(),
                    index
                )));
            }
        }
        Ok(())
    }
}

// radii used by the VMD bond guessing algorithm
const BOND_GUESSING_RADII: [(&str, f64); 6] = [
    ("H", 1.0),
    ("C", 1.5),
    ("O", 1.3),
    ("N", 1.4),
    ("S", 1.9),
    ("F", 1.2),
];

fn guess_bonds_radius(atom: &Atom) -> Option<f64> {
    // an explicit per-atom radius wins over everything else
    if let Some(Property::Double(radius)) = atom.get("vdw_radius") {
        return Some(*radius);
    }

    let atom_type = atom.atom_type();
    match BOND_GUESSING_RADII.iter().find(|(t, _)| *t == atom_type) {
        Some((_, radius)) => {
            // the configuration file can override the built-in radii
            match config::atom_data(atom_type).and_then(|data| data.vdw_radius) {
                Some(user_radius) => Some(user_radius),
                None => Some(*radius),
            }
        }
        None => atom.vdw_radius(),
    }
}
