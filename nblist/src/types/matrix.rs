use std::ops::{Index, IndexMut, Mul};

use super::Vector3D;

/// A 3x3 matrix type, stored in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Matrix3([[f64; 3]; 3]);

impl Matrix3 {
    /// Create a new `Matrix3` from the given rows
    pub fn new(rows: [[f64; 3]; 3]) -> Matrix3 {
        Matrix3(rows)
    }

    /// Create a new `Matrix3` with all components set to zero
    pub fn zero() -> Matrix3 {
        Matrix3([[0.0; 3]; 3])
    }

    /// Create the identity matrix
    pub fn one() -> Matrix3 {
        Matrix3([
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ])
    }

    /// Get the transposed matrix
    pub fn transposed(&self) -> Matrix3 {
        let m = &self.0;
        Matrix3([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    /// Get the determinant of this matrix
    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[2][1] * m[1][2]) -
        m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0]) +
        m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Get the inverse of this matrix.
    ///
    /// The result is full of infinities/NaN if the matrix is not invertible,
    /// callers are expected to check the determinant first.
    pub fn inverse(&self) -> Matrix3 {
        let m = &self.0;
        let inv_det = 1.0 / self.determinant();

        let mut inverse = Matrix3::zero();
        inverse[0][0] = (m[1][1] * m[2][2] - m[2][1] * m[1][2]) * inv_det;
        inverse[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
        inverse[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
        inverse[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
        inverse[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
        inverse[1][2] = (m[1][0] * m[0][2] - m[0][0] * m[1][2]) * inv_det;
        inverse[2][0] = (m[1][0] * m[2][1] - m[2][0] * m[1][1]) * inv_det;
        inverse[2][1] = (m[2][0] * m[0][1] - m[0][0] * m[2][1]) * inv_det;
        inverse[2][2] = (m[0][0] * m[1][1] - m[1][0] * m[0][1]) * inv_det;
        return inverse;
    }
}

impl Index<usize> for Matrix3 {
    type Output = [f64; 3];

    #[inline]
    fn index(&self, index: usize) -> &[f64; 3] {
        &self.0[index]
    }
}

impl IndexMut<usize> for Matrix3 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut [f64; 3] {
        &mut self.0[index]
    }
}

impl From<[[f64; 3]; 3]> for Matrix3 {
    fn from(rows: [[f64; 3]; 3]) -> Matrix3 {
        Matrix3(rows)
    }
}

impl_arithmetic!(
    Matrix3, Vector3D, Mul, mul, Vector3D,
    self, other,
    Vector3D::new(
        self[0][0] * other[0] + self[0][1] * other[1] + self[0][2] * other[2],
        self[1][0] * other[0] + self[1][1] * other[1] + self[1][2] * other[2],
        self[2][0] * other[0] + self[2][1] * other[1] + self[2][2] * other[2],
    )
);
