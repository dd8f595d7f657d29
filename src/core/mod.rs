//! Core data structures: atoms, residues, topologies, frames

pub mod atom;
pub mod cell;
pub mod connectivity;
pub mod frame;
pub mod math;
pub mod periodic;
pub mod property;
pub mod residue;
pub mod topology;

pub use atom::Atom;
pub use cell::{CellShape, UnitCell};
pub use connectivity::{Angle, Bond, BondOrder, Connectivity, Dihedral, Improper};
pub use frame::Frame;
pub use math::{Matrix3D, Vector3D};
pub use property::{Property, PropertyMap};
pub use residue::Residue;
pub use topology::Topology;
