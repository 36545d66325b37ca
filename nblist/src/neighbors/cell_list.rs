use log::{debug, warn};
use ndarray::Array3;

use crate::{Error, Vector3D};
use crate::systems::{PeriodicCell, ParticleStore};

use super::translations::{CellShift, TranslationTable};

/// Maximal number of cells, we need to use this to prevent having too many
/// cells with a small unit cell and a large cutoff
const MAX_NUMBER_OF_CELLS: f64 = 1e5;

/// The cell list is used to sort particles inside bins/cells.
///
/// The list of potential pairs is then constructed by looking through all
/// neighboring cells (the number of cells to search depends on the cutoff and
/// the size of the cells) for each particle to create pair candidates.
#[derive(Debug, Clone)]
pub(crate) struct CellList {
    /// the cells themselves, containing particles indexes
    cells: Array3<Vec<usize>>,
    /// the cell containing each particle
    particle_cells: Vec<[usize; 3]>,
    /// periodic boundary conditions along each cell vector
    periodic: [bool; 3],
    /// distances between faces of the periodic cell
    distances_between_faces: Vector3D,
    /// the periodic cell used to compute fractional coordinates
    cell: PeriodicCell,
}

impl CellList {
    /// Create a new `CellList` for the given periodic cell and cutoff,
    /// determining all required parameters.
    pub fn new(cell: &PeriodicCell, cutoff: f64) -> CellList {
        let distances_between_faces = cell.distances_between_faces();

        let mut n_cells = [
            f64::clamp(f64::trunc(distances_between_faces[0] / cutoff), 1.0, f64::INFINITY),
            f64::clamp(f64::trunc(distances_between_faces[1] / cutoff), 1.0, f64::INFINITY),
            f64::clamp(f64::trunc(distances_between_faces[2] / cutoff), 1.0, f64::INFINITY),
        ];

        // limit memory consumption by ensuring we have less than `MAX_N_CELLS`
        // cells to look though
        let n_cells_total = n_cells[0] * n_cells[1] * n_cells[2];
        if n_cells_total > MAX_NUMBER_OF_CELLS {
            warn!(
                "the cutoff ({}) is very small compared to the cell, limiting the number of bins to {}",
                cutoff, MAX_NUMBER_OF_CELLS
            );

            // set the total number of cells close to MAX_N_CELLS, while keeping
            // roughly the ratio of cells in each direction
            let ratio_x_y = n_cells[0] / n_cells[1];
            let ratio_y_z = n_cells[1] / n_cells[2];

            n_cells[2] = f64::trunc(f64::cbrt(MAX_NUMBER_OF_CELLS / (ratio_x_y * ratio_y_z * ratio_y_z)));
            n_cells[1] = f64::trunc(ratio_y_z * n_cells[2]);
            n_cells[0] = f64::trunc(ratio_x_y * n_cells[1]);

            for n in &mut n_cells {
                *n = f64::max(*n, 1.0);
            }
        }

        let n_cells = [
            n_cells[0] as usize,
            n_cells[1] as usize,
            n_cells[2] as usize,
        ];

        CellList {
            cells: Array3::from_elem(n_cells, Vec::new()),
            particle_cells: Vec::new(),
            periodic: cell.periodic(),
            distances_between_faces: distances_between_faces,
            cell: *cell,
        }
    }

    fn n_cells(&self) -> [usize; 3] {
        let shape = self.cells.shape();
        [shape[0], shape[1], shape[2]]
    }

    /// Add a single particle to the cell list at the given `position`. The
    /// particles must be added in order, starting from 0.
    pub fn add_particle(&mut self, index: usize, position: Vector3D) {
        debug_assert_eq!(index, self.particle_cells.len());
        let fractional = self.cell.fractional(position);
        let n_cells = self.n_cells();

        // find the cell in which this particle 'should go'. Positions are
        // already wrapped along periodic directions, and particles outside
        // of the box along non-periodic directions go to the closest cell.
        let mut cell_index = [0; 3];
        for xyz in 0..3 {
            let i = f64::floor(fractional[xyz] * n_cells[xyz] as f64);
            cell_index[xyz] = f64::clamp(i, 0.0, (n_cells[xyz] - 1) as f64) as usize;
        }

        self.cells[cell_index].push(index);
        self.particle_cells.push(cell_index);
    }

    /// Get the number of cells to search in each direction to make sure all
    /// possible pairs below the `cutoff` are accounted for.
    fn n_search(&self, cutoff: f64) -> [i32; 3] {
        let n_cells = self.n_cells();

        let mut n_search = [0; 3];
        for xyz in 0..3 {
            let n = f64::ceil(cutoff * n_cells[xyz] as f64 / self.distances_between_faces[xyz]);
            n_search[xyz] = f64::max(n, 1.0) as i32;

            if !self.periodic[xyz] {
                // don't look for neighboring cells outside of the box
                n_search[xyz] = i32::min(n_search[xyz], n_cells[xyz] as i32 - 1);
            }
        }

        return n_search;
    }

    /// Get the index of the cell at `cell_index`, and the shift to apply to
    /// particles in this cell. Returns `None` if this cell is outside of the
    /// box along a non-periodic direction.
    fn neighbor_cell(&self, cell_index: [i32; 3]) -> Option<(CellShift, [usize; 3])> {
        let n_cells = self.n_cells();
        let mut shift = [0; 3];
        let mut index = [0; 3];
        for xyz in 0..3 {
            if self.periodic[xyz] {
                let (quotient, remainder) = divmod(cell_index[xyz], n_cells[xyz]);
                shift[xyz] = quotient;
                index[xyz] = remainder;
            } else if cell_index[xyz] < 0 || cell_index[xyz] >= n_cells[xyz] as i32 {
                return None;
            } else {
                index[xyz] = cell_index[xyz] as usize;
            }
        }
        return Some((CellShift(shift), index));
    }

    /// Call `callback(first, second, shift)` for all the candidate pairs
    /// potentially closer than `cutoff`. Some pairs might be separated by more
    /// than `cutoff`, so additional filtering of the pairs is required.
    ///
    /// This produces a so-called "half" neighbors list, where each pair is
    /// only included once: pairs between different particles always have
    /// `first < second`, and pairs between a particle and one of its periodic
    /// images only use the shift that compares greater than zero.
    ///
    /// If two particles are neighbors of one another more than once (this can
    /// happen when the cutoff is larger than half the cell), all pairs at
    /// different distances/directions are still included.
    pub fn for_each_pair(&self, cutoff: f64, mut callback: impl FnMut(usize, usize, CellShift)) {
        let n_search = self.n_search(cutoff);

        let search_x = -n_search[0]..=n_search[0];
        let search_y = -n_search[1]..=n_search[1];
        let search_z = -n_search[2]..=n_search[2];

        // for each cell in the cell list
        for ((cell_i_x, cell_i_y, cell_i_z), current_cell) in self.cells.indexed_iter() {
            // look through each neighboring cell
            for delta_x in search_x.clone() {
                for delta_y in search_y.clone() {
                    for delta_z in search_z.clone() {
                        let cell_i = [
                            cell_i_x as i32 + delta_x,
                            cell_i_y as i32 + delta_y,
                            cell_i_z as i32 + delta_z,
                        ];

                        let (shift, neighbor_cell_i) = match self.neighbor_cell(cell_i) {
                            Some(value) => value,
                            None => continue,
                        };

                        for &first in current_cell {
                            for &second in &self.cells[neighbor_cell_i] {
                                // create a half neighbor list
                                if first > second {
                                    continue;
                                }

                                if first == second && shift <= CellShift::default() {
                                    // skip the particle itself, and keep only
                                    // one of the `shift`/`-shift` pair of
                                    // periodic images
                                    continue;
                                }

                                callback(first, second, shift);
                            }
                        }
                    }
                }
            } // loop over neighboring cells
        }
    }

    /// Call `callback(neighbor, shift)` for all particles potentially closer
    /// than `cutoff` to the particle `center`, including periodic images of
    /// `center` itself. This produces a "full" neighbor list for `center`.
    pub fn for_each_around(&self, center: usize, cutoff: f64, mut callback: impl FnMut(usize, CellShift)) {
        let n_search = self.n_search(cutoff);
        let cell = self.particle_cells[center];

        for delta_x in -n_search[0]..=n_search[0] {
            for delta_y in -n_search[1]..=n_search[1] {
                for delta_z in -n_search[2]..=n_search[2] {
                    let cell_i = [
                        cell[0] as i32 + delta_x,
                        cell[1] as i32 + delta_y,
                        cell[2] as i32 + delta_z,
                    ];

                    let (shift, neighbor_cell_i) = match self.neighbor_cell(cell_i) {
                        Some(value) => value,
                        None => continue,
                    };

                    for &neighbor in &self.cells[neighbor_cell_i] {
                        if neighbor == center && shift.is_zero() {
                            continue;
                        }
                        callback(neighbor, shift);
                    }
                }
            }
        }
    }
}

/// Function to compute both quotient and remainder of the division of a by b.
/// This function follows Python convention, making sure the remainder have the
/// same sign as `b`.
fn divmod(a: i32, b: usize) -> (i32, usize) {
    debug_assert!(b < (i32::MAX as usize));
    let b = b as i32;
    let mut quotient = a / b;
    let mut remainder = a % b;
    if remainder < 0 {
        remainder += b;
        quotient -= 1;
    }
    return (quotient, remainder as usize);
}

/// Entry in a candidate list: the neighbor and the translation to apply to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateEntry {
    /// index of the neighbor particle
    pub neighbor: usize,
    /// id of the translation in the [`TranslationTable`] to apply to the
    /// neighbor position
    pub translation: usize,
}

/// Cached candidates for all particles in a store, built with a cutoff larger
/// than the actual interaction cutoff.
///
/// The difference vector for a candidate `entry` of particle `i` is
/// `positions[entry.neighbor] - positions[i] + translations.vector(entry.translation)`.
#[derive(Debug, Clone)]
pub struct CandidateList {
    /// half list, each pair only appears once
    half: Vec<Vec<CandidateEntry>>,
    /// full list, each pair appears once for each particle
    full: Vec<Vec<CandidateEntry>>,
    /// cells used to build the candidates, kept around for queries with a
    /// different cutoff
    cells: CellList,
}

impl CandidateList {
    /// Build the list of candidate neighbors for all particles in `store`,
    /// using the given `cutoff`. The `translations` must have been created
    /// for the same cell and a cutoff at least as large.
    #[time_graph::instrument(name = "CandidateList::build")]
    pub fn build(store: &ParticleStore, translations: &TranslationTable, cutoff: f64) -> Result<CandidateList, Error> {
        if !(cutoff > 0.0 && cutoff.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "cutoff must be a positive finite number, got {}", cutoff
            )));
        }

        let positions = store.positions();

        let mut cells = CellList::new(store.cell(), cutoff);
        for (index, &position) in positions.iter().enumerate() {
            cells.add_particle(index, position);
        }

        let cutoff2 = cutoff * cutoff;
        let mut half = vec![Vec::new(); positions.len()];
        let mut full = vec![Vec::new(); positions.len()];
        let mut missing_shift = None;

        // the cell list creates too many pairs, we only need to keep the one
        // where the distance is actually below the cutoff
        cells.for_each_pair(cutoff, |first, second, shift| {
            let translation = match translations.id(shift) {
                Some(translation) => translation,
                None => {
                    missing_shift = Some(shift);
                    return;
                }
            };

            let vector = positions[second] - positions[first] + translations.vector(translation);
            let distance2 = vector.norm2();
            if distance2 < cutoff2 {
                if distance2 < 1e-3 {
                    warn!(
                        "particles {} and {} are very close to one another ({})",
                        first, second, distance2.sqrt()
                    );
                }

                let entry = CandidateEntry {
                    neighbor: second,
                    translation: translation,
                };
                half[first].push(entry);
                full[first].push(entry);
                full[second].push(CandidateEntry {
                    neighbor: first,
                    translation: translations.inverse(translation),
                });
            }
        });

        if let Some(shift) = missing_shift {
            return Err(Error::Internal(format!(
                "cell shift {:?} is not part of the translation table", shift.0
            )));
        }

        for candidates in half.iter_mut().chain(full.iter_mut()) {
            candidates.sort_unstable();
        }

        debug!(
            "built candidate list for {} particles with cutoff {}: {} pairs",
            positions.len(), cutoff, half.iter().map(Vec::len).sum::<usize>()
        );

        return Ok(CandidateList {
            half: half,
            full: full,
            cells: cells,
        });
    }

    /// Get the number of particles in this list
    pub fn len(&self) -> usize {
        self.full.len()
    }

    /// Is this list empty?
    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }

    /// Get the candidates for particle `index`, only including each pair once
    pub fn half(&self, index: usize) -> &[CandidateEntry] {
        &self.half[index]
    }

    /// Get all the candidates for particle `index`
    pub fn full(&self, index: usize) -> &[CandidateEntry] {
        &self.full[index]
    }

    /// Get the largest number of candidates for a single particle
    pub fn max_length(&self) -> usize {
        self.full.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub(crate) fn cells(&self) -> &CellList {
        &self.cells
    }
}
