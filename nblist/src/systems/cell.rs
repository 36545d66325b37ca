//! The `PeriodicCell` type represents the enclosing box of a simulated system,
//! with independent periodic boundary conditions along each cell vector.
use crate::{Error, Matrix3, Vector3D};

/// The shape of a cell determine how we will be able to compute the periodic
/// boundaries condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
    /// Orthorhombic cell, with cuboid shape
    Orthorhombic,
    /// Triclinic cell, with arbitrary parallelepiped shape
    Triclinic,
}

/// A `PeriodicCell` defines the system physical boundaries: three cell vectors
/// (the rows of the cell matrix) and whether periodic boundary conditions
/// apply along each of them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicCell {
    /// Cell matrix, one cell vector per row
    matrix: Matrix3,
    /// Transpose of the cell matrix, cached from matrix
    transpose: Matrix3,
    /// Inverse of the transpose of the cell matrix, cached from matrix
    inverse: Matrix3,
    /// Cell shape
    shape: CellShape,
    /// Periodic boundary conditions along each of the cell vectors
    periodic: [bool; 3],
}

impl PeriodicCell {
    /// Create a new cell from the given `matrix` (with one cell vector per
    /// row), and periodicity flags along the three cell vectors.
    ///
    /// The cell must have a strictly positive volume, even along non-periodic
    /// directions, since it is also used to bin particles in space.
    pub fn new(matrix: Matrix3, periodic: [bool; 3]) -> Result<PeriodicCell, Error> {
        let determinant = matrix.determinant();
        if !(determinant > 1e-6) {
            return Err(Error::DegenerateCell(format!(
                "the cell matrix must have a positive determinant, got {}", determinant
            )));
        }

        let is_close_0 = |value| f64::abs(value) < 1e-6;
        let is_diagonal = is_close_0(matrix[0][1]) && is_close_0(matrix[0][2]) &&
                          is_close_0(matrix[1][0]) && is_close_0(matrix[1][2]) &&
                          is_close_0(matrix[2][0]) && is_close_0(matrix[2][1]);

        let shape = if is_diagonal {
            CellShape::Orthorhombic
        } else {
            CellShape::Triclinic
        };

        return Ok(PeriodicCell {
            matrix: matrix,
            transpose: matrix.transposed(),
            inverse: matrix.transposed().inverse(),
            shape: shape,
            periodic: periodic,
        });
    }

    /// Create a fully periodic orthorhombic cell, with side lengths `a, b, c`.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<PeriodicCell, Error> {
        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(Error::DegenerateCell(format!(
                "cell lengths must be positive, got {}, {}, {}", a, b, c
            )));
        }

        return PeriodicCell::new(Matrix3::new([
            [a, 0.0, 0.0],
            [0.0, b, 0.0],
            [0.0, 0.0, c]
        ]), [true, true, true]);
    }

    /// Create a fully periodic cubic cell, with side lengths `length, length,
    /// length`.
    pub fn cubic(length: f64) -> Result<PeriodicCell, Error> {
        PeriodicCell::orthorhombic(length, length, length)
    }

    /// Create a fully periodic triclinic cell, with side lengths `a, b, c` and
    /// angles `alpha, beta, gamma` (in degrees).
    pub fn triclinic(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<PeriodicCell, Error> {
        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(Error::DegenerateCell(format!(
                "cell lengths must be positive, got {}, {}, {}", a, b, c
            )));
        }

        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let (sin_gamma, cos_gamma) = gamma.to_radians().sin_cos();

        let b_x = b * cos_gamma;
        let b_y = b * sin_gamma;

        let c_x = c * cos_beta;
        let c_y = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c_z = f64::sqrt(c * c - c_y * c_y - c_x * c_x);

        return PeriodicCell::new(Matrix3::new([
            [a,   0.0, 0.0],
            [b_x, b_y, 0.0],
            [c_x, c_y, c_z],
        ]), [true, true, true]);
    }

    /// Get a copy of this cell using the given periodicity flags
    #[must_use]
    pub fn with_periodicity(mut self, periodic: [bool; 3]) -> PeriodicCell {
        self.periodic = periodic;
        return self;
    }

    /// Get the cell shape
    pub fn shape(&self) -> CellShape {
        self.shape
    }

    /// Get the periodicity flags along the three cell vectors
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Is this cell periodic along at least one direction?
    pub fn is_periodic(&self) -> bool {
        self.periodic.iter().any(|&p| p)
    }

    /// Get the matricial representation of the cell
    pub fn matrix(&self) -> Matrix3 {
        self.matrix
    }

    /// Get the volume of the cell
    pub fn volume(&self) -> f64 {
        match self.shape {
            CellShape::Orthorhombic => self.matrix[0][0] * self.matrix[1][1] * self.matrix[2][2],
            CellShape::Triclinic => {
                // The volume is the mixed product of the three cell vectors
                let (a, b, c) = self.vectors();
                a * (b ^ c)
            }
        }
    }

    /// Get the distances between faces of the cell
    pub fn distances_between_faces(&self) -> Vector3D {
        if self.shape == CellShape::Orthorhombic {
            return Vector3D::new(self.matrix[0][0], self.matrix[1][1], self.matrix[2][2]);
        }

        let (a, b, c) = self.vectors();
        // Plans normal vectors
        let na = (b ^ c).normalized();
        let nb = (c ^ a).normalized();
        let nc = (a ^ b).normalized();

        Vector3D::new(f64::abs(na * a), f64::abs(nb * b), f64::abs(nc * c))
    }

    fn vectors(&self) -> (Vector3D, Vector3D, Vector3D) {
        (self.matrix[0].into(), self.matrix[1].into(), self.matrix[2].into())
    }
}

/// Geometric operations using periodic boundary conditions
impl PeriodicCell {
    /// Wrap a vector in the cell along the periodic directions. For a cubic
    /// cell of side length `L`, this produce a vector with all periodic
    /// components in `[0, L)`. Non-periodic components are left untouched.
    pub fn wrap_vector(&self, vector: &mut Vector3D) {
        match self.shape {
            CellShape::Orthorhombic => {
                for xyz in 0..3 {
                    if self.periodic[xyz] {
                        let length = self.matrix[xyz][xyz];
                        vector[xyz] -= f64::floor(vector[xyz] / length) * length;
                    }
                }
            }
            CellShape::Triclinic => {
                let mut fractional = self.fractional(*vector);
                for xyz in 0..3 {
                    if self.periodic[xyz] {
                        fractional[xyz] -= f64::floor(fractional[xyz]);
                    }
                }
                *vector = self.cartesian(fractional);
            }
        }
    }

    /// Find the image of a vector in the cell, obeying the periodic boundary
    /// conditions. For a cubic cell of side length `L`, this produce a vector
    /// with all periodic components in `[-L/2, L/2)`.
    pub fn vector_image(&self, vector: &mut Vector3D) {
        match self.shape {
            CellShape::Orthorhombic => {
                for xyz in 0..3 {
                    if self.periodic[xyz] {
                        let length = self.matrix[xyz][xyz];
                        vector[xyz] -= f64::round(vector[xyz] / length) * length;
                    }
                }
            }
            CellShape::Triclinic => {
                let mut fractional = self.fractional(*vector);
                for xyz in 0..3 {
                    if self.periodic[xyz] {
                        fractional[xyz] -= f64::round(fractional[xyz]);
                    }
                }
                *vector = self.cartesian(fractional);
            }
        }
    }

    /// Get the fractional representation of the `vector` in this cell
    pub fn fractional(&self, vector: Vector3D) -> Vector3D {
        // this needs to use the inverse of the transpose of the matrix, since
        // we only have code to multiply a vector by a matrix on the left
        return self.inverse * vector;
    }

    /// Get the Cartesian representation of the `fractional` vector in this
    /// cell
    pub fn cartesian(&self, fractional: Vector3D) -> Vector3D {
        return self.transpose * fractional;
    }

    /// Periodic boundary conditions squared distance between the point `u` and
    /// the point `v`
    pub fn distance2(&self, u: Vector3D, v: Vector3D) -> f64 {
        let mut d = v - u;
        self.vector_image(&mut d);
        return d.norm2();
    }
}
