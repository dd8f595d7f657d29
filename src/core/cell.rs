//! Periodic unit cells
//!
//! The cell is stored as a 3x3 matrix with the lattice vectors as
//! columns. Cells built from lengths and angles use the upper triangular
//! convention, which the Gromacs formats require.

use crate::core::math::{self, Matrix3D, Vector3D};
use crate::errors::{Error, Result};

/// The shape of a unit cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
    /// No periodic boundary conditions
    Infinite,
    /// Orthorhombic cell, with all angles at 90 degrees
    Orthorhombic,
    /// Triclinic cell, with at least one angle away from 90 degrees
    Triclinic,
}

/// A periodic unit cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    matrix: Matrix3D,
}

impl Default for UnitCell {
    fn default() -> UnitCell {
        UnitCell::infinite()
    }
}

impl UnitCell {
    /// Create an infinite cell, i.e. no periodic boundary conditions
    pub fn infinite() -> UnitCell {
        UnitCell {
            matrix: Matrix3D::zeros(),
        }
    }

    /// Create an orthorhombic cell from its lengths in Angstroms
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> UnitCell {
        UnitCell {
            matrix: Matrix3D::from_diagonal(&Vector3D::new(a, b, c)),
        }
    }

    /// Create a cell from lengths (Angstroms) and angles (degrees).
    ///
    /// The cell matrix is built in upper triangular form.
    pub fn triclinic(lengths: Vector3D, angles: Vector3D) -> UnitCell {
        UnitCell {
            matrix: math::cell_matrix(lengths, angles),
        }
    }

    /// Create a cell from a full matrix, with lattice vectors as columns
    pub fn from_matrix(matrix: Matrix3D) -> UnitCell {
        UnitCell { matrix }
    }

    /// The cell matrix, with lattice vectors as columns
    pub fn matrix(&self) -> &Matrix3D {
        &self.matrix
    }

    /// The shape of this cell, classified from the matrix content
    pub fn shape(&self) -> CellShape {
        if self.matrix == Matrix3D::zeros() {
            CellShape::Infinite
        } else if math::is_diagonal(&self.matrix) {
            CellShape::Orthorhombic
        } else {
            CellShape::Triclinic
        }
    }

    /// The lengths of the three lattice vectors, in Angstroms
    pub fn lengths(&self) -> Vector3D {
        Vector3D::new(
            self.matrix.column(0).norm(),
            self.matrix.column(1).norm(),
            self.matrix.column(2).norm(),
        )
    }

    /// The three cell angles (alpha, beta, gamma), in degrees.
    ///
    /// An infinite cell reports all angles at 90 degrees.
    pub fn angles(&self) -> Vector3D {
        if self.shape() == CellShape::Infinite {
            return Vector3D::new(90.0, 90.0, 90.0);
        }
        let a = self.matrix.column(0).into_owned();
        let b = self.matrix.column(1).into_owned();
        let c = self.matrix.column(2).into_owned();
        Vector3D::new(
            math::angle_between(&b, &c),
            math::angle_between(&a, &c),
            math::angle_between(&a, &b),
        )
    }

    /// The cell volume in cubic Angstroms
    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Convert a cartesian vector to fractional coordinates
    pub fn fractional(&self, vector: &Vector3D) -> Result<Vector3D> {
        if self.shape() == CellShape::Infinite {
            return Err(Error::Math(
                "can not convert to fractional coordinates with an infinite cell".into(),
            ));
        }
        Ok(math::invert(&self.matrix)? * vector)
    }

    /// Convert a fractional vector to cartesian coordinates
    pub fn cartesian(&self, fractional: &Vector3D) -> Vector3D {
        self.matrix * fractional
    }

    /// Wrap a displacement vector with the minimum image convention.
    ///
    /// For an infinite cell this is the identity.
    pub fn wrap(&self, vector: &Vector3D) -> Vector3D {
        match self.shape() {
            CellShape::Infinite => *vector,
            CellShape::Orthorhombic => {
                let mut wrapped = *vector;
                for i in 0..3 {
                    let length = self.matrix[(i, i)];
                    wrapped[i] -= (wrapped[i] / length).round() * length;
                }
                wrapped
            }
            CellShape::Triclinic => {
                let Ok(inverse) = math::invert(&self.matrix) else {
                    // degenerate matrix, no image to pick
                    return *vector;
                };
                let fractional = inverse * vector;
                let image = Vector3D::new(
                    fractional[0].round(),
                    fractional[1].round(),
                    fractional[2].round(),
                );
                vector - self.matrix * image
            }
        }
    }
}
