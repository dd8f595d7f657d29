//! Geometry primitives for molecular data
//!
//! Positions, velocities and cell matrices are stored as 64-bit nalgebra
//! vectors and matrices. This module adds the few operations nalgebra
//! does not express the way the rest of the crate needs them: a checked
//! matrix inverse and the triclinic cell matrix construction.

use nalgebra::{Matrix3, Vector3};

use crate::errors::{Error, Result};

/// 3D vector holding positions, velocities or cell lengths
pub type Vector3D = Vector3<f64>;

/// 3x3 matrix holding cell matrices and their inverses
pub type Matrix3D = Matrix3<f64>;

/// Compute the inverse of `matrix`, failing when it is not invertible
pub fn invert(matrix: &Matrix3D) -> Result<Matrix3D> {
    if matrix.determinant().abs() <= f64::EPSILON {
        return Err(Error::Math(
            "this matrix is not invertible".into(),
        ));
    }
    matrix
        .try_inverse()
        .ok_or_else(|| Error::Math("this matrix is not invertible".into()))
}

// right angles must produce exact zeros, so that cells built from
// lengths and angles classify as orthorhombic
fn cos_degrees(angle: f64) -> f64 {
    if angle == 90.0 {
        0.0
    } else {
        angle.to_radians().cos()
    }
}

fn sin_degrees(angle: f64) -> f64 {
    if angle == 90.0 {
        1.0
    } else {
        angle.to_radians().sin()
    }
}

/// Build the upper triangular cell matrix from lengths (Angstroms) and
/// angles (degrees). Lattice vectors are the matrix columns.
pub fn cell_matrix(lengths: Vector3D, angles: Vector3D) -> Matrix3D {
    let (a, b, c) = (lengths[0], lengths[1], lengths[2]);

    let (cos_alpha, cos_beta) = (cos_degrees(angles[0]), cos_degrees(angles[1]));
    let (cos_gamma, sin_gamma) = (cos_degrees(angles[2]), sin_degrees(angles[2]));

    let b_x = b * cos_gamma;
    let b_y = b * sin_gamma;
    let c_x = c * cos_beta;
    let c_y = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
    let c_z = (c * c - c_x * c_x - c_y * c_y).max(0.0).sqrt();

    Matrix3D::new(
        a, b_x, c_x, //
        0.0, b_y, c_y, //
        0.0, 0.0, c_z,
    )
}

/// Angle between two vectors in degrees, clamped against rounding
pub fn angle_between(u: &Vector3D, v: &Vector3D) -> f64 {
    let cos = u.dot(v) / (u.norm() * v.norm());
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Check whether a cell matrix is upper triangular
pub fn is_upper_triangular(matrix: &Matrix3D) -> bool {
    matrix[(1, 0)] == 0.0 && matrix[(2, 0)] == 0.0 && matrix[(2, 1)] == 0.0
}

/// Check whether a cell matrix is diagonal
pub fn is_diagonal(matrix: &Matrix3D) -> bool {
    is_upper_triangular(matrix)
        && matrix[(0, 1)] == 0.0
        && matrix[(0, 2)] == 0.0
        && matrix[(1, 2)] == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert() {
        let matrix = Matrix3D::new(2.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 8.0);
        let inverse = invert(&matrix).unwrap();
        assert_eq!(inverse[(0, 0)], 0.5);
        assert_eq!(inverse[(1, 1)], 0.25);
        assert_eq!(inverse[(2, 2)], 0.125);
    }

    #[test]
    fn test_invert_singular() {
        let matrix = Matrix3D::zeros();
        assert!(matches!(invert(&matrix), Err(Error::Math(_))));
    }

    #[test]
    fn test_orthorhombic_cell_matrix() {
        let matrix = cell_matrix(Vector3D::new(10.0, 11.0, 12.0), Vector3D::new(90.0, 90.0, 90.0));
        assert!((matrix[(0, 0)] - 10.0).abs() < 1e-12);
        assert!((matrix[(1, 1)] - 11.0).abs() < 1e-12);
        assert!((matrix[(2, 2)] - 12.0).abs() < 1e-12);
        assert!(matrix[(0, 1)].abs() < 1e-9);
        assert!(matrix[(0, 2)].abs() < 1e-9);
        assert!(matrix[(1, 2)].abs() < 1e-9);
    }

    #[test]
    fn test_triclinic_cell_matrix() {
        let matrix = cell_matrix(Vector3D::new(10.0, 10.0, 10.0), Vector3D::new(90.0, 90.0, 60.0));
        assert!(is_upper_triangular(&matrix));
        // |b| must still be 10
        let b = Vector3D::new(matrix[(0, 1)], matrix[(1, 1)], matrix[(2, 1)]);
        assert!((b.norm() - 10.0).abs() < 1e-12);
        // angle between a and b must be 60 degrees
        let a = Vector3D::new(matrix[(0, 0)], matrix[(1, 0)], matrix[(2, 0)]);
        assert!((angle_between(&a, &b) - 60.0).abs() < 1e-9);
    }
}
