use crate::{Error, Matrix3, Vector3D};
use crate::systems::PeriodicCell;

/// A cell shift represents the displacement along cell vectors between the
/// actual position of a particle and a periodic image of this particle.
///
/// The cell shift can be used to reconstruct the vector between two points,
/// wrapped inside the cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellShift(pub [i32; 3]);

impl std::ops::Neg for CellShift {
    type Output = CellShift;

    fn neg(self) -> Self::Output {
        CellShift([-self[0], -self[1], -self[2]])
    }
}

impl std::ops::Index<usize> for CellShift {
    type Output = i32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl CellShift {
    /// Compute the shift vector in cartesian coordinates, using the given cell
    /// matrix (stored in row major order).
    pub fn cartesian(&self, cell: &Matrix3) -> Vector3D {
        let x = cell[0][0] * self[0] as f64 + cell[1][0] * self[1] as f64 + cell[2][0] * self[2] as f64;
        let y = cell[0][1] * self[0] as f64 + cell[1][1] * self[1] as f64 + cell[2][1] * self[2] as f64;
        let z = cell[0][2] * self[0] as f64 + cell[1][2] * self[1] as f64 + cell[2][2] * self[2] as f64;
        Vector3D::new(x, y, z)
    }

    /// Is this the zero shift?
    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }
}

/// Table of all the lattice translations needed to generate the periodic
/// images of particles up to a given cutoff.
///
/// Translations are identified by a small integer id. They are sorted in
/// lexicographic order of their cell shift, so the zero translation is in the
/// middle of the table, every translation with an id larger than
/// [`TranslationTable::zero`] is "positive", and the inverse of translation
/// `id` is `len - 1 - id`.
#[derive(Debug, Clone)]
pub struct TranslationTable {
    /// Maximal absolute shift along each cell vector
    extent: [i32; 3],
    shifts: Vec<CellShift>,
    vectors: Vec<Vector3D>,
}

impl TranslationTable {
    /// Build the table of translations for the given `cell`, such that every
    /// pair of particles closer than `cutoff` is represented by one of the
    /// translations.
    ///
    /// Along periodic directions, shifts go from `-m` to `m` with
    /// `m = ceil(cutoff / d)`, where `d` is the distance between the faces of
    /// the cell along this direction. Non-periodic directions only use the
    /// zero shift. Degenerate cells are already rejected when creating the
    /// [`PeriodicCell`], so only the `cutoff` is checked here.
    pub fn new(cell: &PeriodicCell, cutoff: f64) -> Result<TranslationTable, Error> {
        if !(cutoff > 0.0 && cutoff.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "cutoff must be a positive finite number, got {}", cutoff
            )));
        }

        let distances = cell.distances_between_faces();
        let periodic = cell.periodic();

        let mut extent = [0; 3];
        for xyz in 0..3 {
            if periodic[xyz] {
                extent[xyz] = f64::ceil(cutoff / distances[xyz]) as i32;
            }
        }

        let matrix = cell.matrix();
        let mut shifts = Vec::new();
        let mut vectors = Vec::new();
        for a in -extent[0]..=extent[0] {
            for b in -extent[1]..=extent[1] {
                for c in -extent[2]..=extent[2] {
                    let shift = CellShift([a, b, c]);
                    shifts.push(shift);
                    vectors.push(shift.cartesian(&matrix));
                }
            }
        }

        return Ok(TranslationTable {
            extent: extent,
            shifts: shifts,
            vectors: vectors,
        });
    }

    /// Get the number of translations in this table
    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    /// Is this table empty? This is always false, since the table contains at
    /// least the zero translation
    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Get the maximal shift along each cell vector
    pub fn extent(&self) -> [i32; 3] {
        self.extent
    }

    /// Get the id of the zero translation
    pub fn zero(&self) -> usize {
        self.shifts.len() / 2
    }

    /// Get the id of the translation corresponding to `shift`, if this shift is
    /// part of the table
    pub fn id(&self, shift: CellShift) -> Option<usize> {
        let mut id = 0;
        for xyz in 0..3 {
            let extent = self.extent[xyz];
            if shift[xyz] < -extent || shift[xyz] > extent {
                return None;
            }
            id = id * (2 * extent + 1) as usize + (shift[xyz] + extent) as usize;
        }
        return Some(id);
    }

    /// Get the cell shift associated with the translation `id`
    pub fn shift(&self, id: usize) -> CellShift {
        self.shifts[id]
    }

    /// Get the cartesian vector associated with the translation `id`
    #[inline]
    pub fn vector(&self, id: usize) -> Vector3D {
        self.vectors[id]
    }

    /// Get the id of the opposite of translation `id`
    #[inline]
    pub fn inverse(&self, id: usize) -> usize {
        self.shifts.len() - 1 - id
    }
}
