use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use rayon::prelude::*;

use crate::{Error, Vector3D};
use crate::systems::{GenerationToken, ParticleStore, PeriodicCell};

use super::{CandidateEntry, CandidateList, CutoffMatrix, NeighborBuffers};
use super::{NeighborListOptions, NeighborSource, TranslationTable};

/// Everything computed during a build of a [`LocalCellList`]
#[derive(Debug)]
struct BuiltList {
    /// token of the store used for this build
    generation: GenerationToken,
    /// value of the token when this list was built
    stamp: u64,
    /// modification count of the store the last time we checked for drift
    checked_modifications: AtomicU64,
    /// cell used for this build
    cell: PeriodicCell,
    /// positions of all particles at the time of the build
    reference: Vec<Vector3D>,
    translations: TranslationTable,
    candidates: CandidateList,
}

/// Which cutoff to use when filtering candidates
#[derive(Debug, Clone, Copy)]
enum Filter<'a> {
    /// use the cutoff matrix, with the species of the particles
    Species(&'a CutoffMatrix, &'a [i32]),
    /// use the same squared cutoff for all pairs
    Uniform(f64),
}

impl Filter<'_> {
    #[inline]
    fn cutoff2(&self, first: usize, second: usize) -> f64 {
        match *self {
            Filter::Species(cutoffs, species) => cutoffs.cutoff2(species[first], species[second]),
            Filter::Uniform(cutoff2) => cutoff2,
        }
    }
}

/// Neighbor list using a cell list to find candidate neighbors, and caching
/// them with an additional skin so that particles can move a bit before the
/// list needs to be rebuilt.
///
/// The list does not own the [`ParticleStore`]: the store is given to every
/// call instead, and the list remembers the store's [`GenerationToken`] to
/// detect when it becomes stale, or when it is used with a different store.
///
/// Queries take `&self`, so a valid list can be queried from multiple threads
/// at the same time.
#[derive(Debug)]
pub struct LocalCellList {
    options: NeighborListOptions,
    cutoffs: CutoffMatrix,
    skin: f64,
    built: Option<BuiltList>,
}

impl LocalCellList {
    /// Create a new neighbor list with the given options. The list needs to be
    /// built with [`LocalCellList::update`] or
    /// [`LocalCellList::check_and_update`] before it can be used.
    pub fn new(options: NeighborListOptions) -> Result<LocalCellList, Error> {
        options.validate()?;
        let cutoffs = options.cutoffs()?;
        let skin = options.skin()?;

        return Ok(LocalCellList {
            options: options,
            cutoffs: cutoffs,
            skin: skin,
            built: None,
        });
    }

    /// Get the options used to create this list
    pub fn options(&self) -> &NeighborListOptions {
        &self.options
    }

    /// Get the skin used by this list
    pub fn skin(&self) -> f64 {
        self.skin
    }

    /// Get the cutoff used when building the list of candidates, i.e. the
    /// largest interaction cutoff plus the skin
    pub fn build_cutoff(&self) -> f64 {
        self.cutoffs.max_cutoff() + self.skin
    }

    /// Rebuild the list of candidates for the particles in `store`,
    /// regardless of the current state of the list.
    #[time_graph::instrument(name = "LocalCellList::update")]
    pub fn update(&mut self, store: &ParticleStore) -> Result<(), Error> {
        let build_cutoff = self.build_cutoff();
        debug!(
            "rebuilding neighbor list for {} particles with cutoff {}",
            store.len(), build_cutoff
        );

        let translations = TranslationTable::new(store.cell(), build_cutoff)?;
        let candidates = CandidateList::build(store, &translations, build_cutoff)?;

        let generation = store.generation().clone();
        let stamp = generation.current();
        self.built = Some(BuiltList {
            generation: generation,
            stamp: stamp,
            checked_modifications: AtomicU64::new(store.modification_count()),
            cell: *store.cell(),
            reference: store.positions().to_vec(),
            translations: translations,
            candidates: candidates,
        });

        Ok(())
    }

    /// Check if this list needs to be rebuilt before being used with `store`.
    /// This is the case if the list was never built, was built for another
    /// store, was invalidated, or if the particles moved too much since the
    /// last build.
    pub fn needs_update(&self, store: &ParticleStore) -> Result<bool, Error> {
        match self.check_valid(store) {
            Ok(_) => Ok(false),
            Err(Error::StaleList(_)) => Ok(true),
            Err(Error::InvalidParameter(_)) if self.built.is_some() => {
                // this list was built for a different store
                Ok(true)
            }
            Err(error) => Err(error),
        }
    }

    /// Rebuild the list if it needs to be updated, returning `true` if the
    /// list was rebuilt.
    pub fn check_and_update(&mut self, store: &ParticleStore) -> Result<bool, Error> {
        if self.needs_update(store)? {
            self.update(store)?;
            return Ok(true);
        }
        return Ok(false);
    }

    /// Is this list valid for the particles in `store`?
    pub fn is_valid(&self, store: &ParticleStore) -> bool {
        self.check_valid(store).is_ok()
    }

    /// Mark this list as needing a rebuild. This also invalidates all other
    /// lists built for the same store.
    ///
    /// A list that was never built is not associated with any store yet, so
    /// calling this function on it does nothing: sibling lists stay valid.
    pub fn invalidate(&self) {
        if let Some(built) = &self.built {
            built.generation.advance();
        }
    }

    /// Get the largest number of candidates for a single particle, which is an
    /// upper bound on the number of neighbors [`LocalCellList::get_full_neighbors`]
    /// can return without cutoff override. This is zero if the list was never
    /// built.
    pub fn max_neighbor_list_length(&self) -> usize {
        match &self.built {
            Some(built) => built.candidates.max_length(),
            None => 0,
        }
    }

    /// Get the number of candidates for particle `index`, which is an upper
    /// bound on the number of its neighbors without cutoff override.
    pub fn candidate_count(&self, index: usize) -> Result<usize, Error> {
        let built = self.built.as_ref().ok_or_else(never_built)?;
        if index >= built.candidates.len() {
            return Err(Error::InvalidParameter(format!(
                "particle index {} is out of bounds for a list with {} particles",
                index, built.candidates.len()
            )));
        }
        return Ok(built.candidates.full(index).len());
    }

    /// Write all the neighbors of particle `center` to `buffers`, after the
    /// entries already there, and return the number of neighbors.
    ///
    /// If `cutoff` is a positive number, it is used for all pairs of species
    /// instead of the cutoffs given in the options. Otherwise, the cutoff
    /// depends on the species of both particles.
    ///
    /// This fails with [`Error::StaleList`] if the list needs to be rebuilt,
    /// and with [`Error::CapacityExceeded`] if the neighbors would not fit in
    /// the buffers, in which case nothing is written.
    pub fn get_full_neighbors(
        &self,
        store: &ParticleStore,
        center: usize,
        buffers: &mut NeighborBuffers<'_>,
        cutoff: Option<f64>,
    ) -> Result<usize, Error> {
        let built = self.check_valid(store)?;
        check_index(store, center)?;

        match cutoff_override(cutoff)? {
            Some(cutoff) => {
                let radius = cutoff + 2.0 * self.options.drift_factor * self.skin;
                let filter = Filter::Uniform(cutoff * cutoff);
                return write_neighbors(buffers, None, |callback| {
                    built.cells_around(store, center, radius, filter, callback);
                });
            }
            None => {
                let filter = Filter::Species(&self.cutoffs, store.species());
                let candidates = built.candidates.full(center);
                return write_neighbors(buffers, Some(candidates.len()), |callback| {
                    built.filter_candidates(store, center, candidates, filter, callback);
                });
            }
        }
    }

    /// Write the neighbors of particle `center` to `buffers`, only including
    /// each pair once over all particles. Pairs between different particles
    /// are only included for the particle with the lowest index.
    pub fn get_half_neighbors(
        &self,
        store: &ParticleStore,
        center: usize,
        buffers: &mut NeighborBuffers<'_>,
    ) -> Result<usize, Error> {
        let built = self.check_valid(store)?;
        check_index(store, center)?;

        let filter = Filter::Species(&self.cutoffs, store.species());
        let candidates = built.candidates.half(center);
        return write_neighbors(buffers, Some(candidates.len()), |callback| {
            built.filter_candidates(store, center, candidates, filter, callback);
        });
    }

    /// Get the indexes of all the neighbors of particle `center`. A particle
    /// which is a neighbor of `center` through multiple periodic images
    /// appears multiple times.
    pub fn full_neighbor_indices(&self, store: &ParticleStore, center: usize) -> Result<Vec<usize>, Error> {
        let built = self.check_valid(store)?;
        check_index(store, center)?;

        let filter = Filter::Species(&self.cutoffs, store.species());
        let mut neighbors = Vec::new();
        built.filter_candidates(store, center, built.candidates.full(center), filter, |neighbor, _, _| {
            neighbors.push(neighbor);
        });

        return Ok(neighbors);
    }

    /// Check that this list can be used with `store`, returning the built data
    fn check_valid(&self, store: &ParticleStore) -> Result<&BuiltList, Error> {
        let built = self.built.as_ref().ok_or_else(never_built)?;

        if !built.generation.same_as(store.generation()) {
            return Err(Error::InvalidParameter(
                "this neighbor list was built for a different particle store".into()
            ));
        }

        if built.generation.current() != built.stamp {
            return Err(Error::StaleList(
                "the neighbor list was invalidated and must be rebuilt".into()
            ));
        }

        if store.len() != built.reference.len() {
            return Err(Error::StaleList(format!(
                "the number of particles changed from {} to {}",
                built.reference.len(), store.len()
            )));
        }

        let modifications = store.modification_count();
        if built.checked_modifications.load(Ordering::Acquire) != modifications {
            let (first, second) = built.largest_displacements(store.positions());
            let limit = self.skin * self.options.drift_factor;
            if 0.5 * (first + second) > limit {
                debug!(
                    "particles moved by {} and {} since the last build, above the limit of {}",
                    first, second, limit
                );
                built.generation.advance();
                return Err(Error::StaleList(
                    "particles moved too much since the last build".into()
                ));
            }
            built.checked_modifications.store(modifications, Ordering::Release);
        }

        return Ok(built);
    }
}

impl BuiltList {
    /// Get the two largest displacements of particles since the last build
    fn largest_displacements(&self, positions: &[Vector3D]) -> (f64, f64) {
        let cell = &self.cell;
        let (first, second) = self.reference.par_iter()
            .zip_eq(positions.par_iter())
            .map(|(&reference, &position)| {
                let mut displacement = position - reference;
                cell.vector_image(&mut displacement);
                displacement.norm2()
            })
            .fold(|| (0.0, 0.0), push_largest)
            .reduce(|| (0.0, 0.0), |a, b| push_largest(push_largest(a, b.0), b.1));

        return (first.sqrt(), second.sqrt());
    }

    /// Get the current position of particle `index`, made continuous with the
    /// position used for the last build. If a particle was wrapped back inside
    /// the cell since the last build, this undoes the wrapping.
    #[inline]
    fn continuous_position(&self, positions: &[Vector3D], index: usize) -> Vector3D {
        let reference = self.reference[index];
        let mut displacement = positions[index] - reference;
        self.cell.vector_image(&mut displacement);
        return reference + displacement;
    }

    /// Call `callback(neighbor, vector, distance2)` for all `candidates` of
    /// `center` which are closer than the cutoff given by `filter`
    fn filter_candidates(
        &self,
        store: &ParticleStore,
        center: usize,
        candidates: &[CandidateEntry],
        filter: Filter<'_>,
        mut callback: impl FnMut(usize, Vector3D, f64),
    ) {
        let positions = store.positions();
        let center_position = self.continuous_position(positions, center);
        for entry in candidates {
            let position = self.continuous_position(positions, entry.neighbor);
            let vector = position - center_position + self.translations.vector(entry.translation);
            let distance2 = vector.norm2();
            if distance2 < filter.cutoff2(center, entry.neighbor) {
                callback(entry.neighbor, vector, distance2);
            }
        }
    }

    /// Call `callback(neighbor, vector, distance2)` for all particles closer
    /// than the cutoff given by `filter`, looking through all bins of the cell
    /// list up to `radius` around the center.
    fn cells_around(
        &self,
        store: &ParticleStore,
        center: usize,
        radius: f64,
        filter: Filter<'_>,
        mut callback: impl FnMut(usize, Vector3D, f64),
    ) {
        let positions = store.positions();
        let matrix = self.cell.matrix();
        let center_position = self.continuous_position(positions, center);
        self.candidates.cells().for_each_around(center, radius, |neighbor, shift| {
            let position = self.continuous_position(positions, neighbor);
            let vector = position - center_position + shift.cartesian(&matrix);
            let distance2 = vector.norm2();
            if distance2 < filter.cutoff2(center, neighbor) {
                callback(neighbor, vector, distance2);
            }
        });
    }
}

/// Run `visit` to write neighbors in `buffers`, making sure they fit first.
/// `upper_bound` is the maximal number of neighbors `visit` can produce, if
/// known.
pub(crate) fn write_neighbors(
    buffers: &mut NeighborBuffers<'_>,
    upper_bound: Option<usize>,
    visit: impl Fn(&mut dyn FnMut(usize, Vector3D, f64)),
) -> Result<usize, Error> {
    let remaining = buffers.remaining();
    let fits = match upper_bound {
        Some(upper_bound) => upper_bound <= remaining,
        None => false,
    };

    if !fits {
        // count the actual number of neighbors before writing anything
        let mut count = 0;
        visit(&mut |_, _, _| count += 1);
        if count > remaining {
            return Err(Error::CapacityExceeded {
                required: count,
                capacity: remaining,
            });
        }
    }

    let start = buffers.len();
    visit(&mut |neighbor, vector, distance2| buffers.push(neighbor, vector, distance2));
    return Ok(buffers.len() - start);
}

/// Get the actual cutoff override from the user-provided value. Non-positive
/// values mean that no override should be used.
pub(crate) fn cutoff_override(cutoff: Option<f64>) -> Result<Option<f64>, Error> {
    match cutoff {
        Some(cutoff) if cutoff > 0.0 => {
            if !cutoff.is_finite() {
                return Err(Error::InvalidParameter(format!(
                    "cutoff override must be finite, got {}", cutoff
                )));
            }
            Ok(Some(cutoff))
        }
        _ => Ok(None),
    }
}

fn push_largest((first, second): (f64, f64), value: f64) -> (f64, f64) {
    if value > first {
        (value, first)
    } else if value > second {
        (first, value)
    } else {
        (first, second)
    }
}

fn never_built() -> Error {
    Error::StaleList("the neighbor list was never built".into())
}

fn check_index(store: &ParticleStore, index: usize) -> Result<(), Error> {
    if index >= store.len() {
        return Err(Error::InvalidParameter(format!(
            "particle index {} is out of bounds for a store with {} particles",
            index, store.len()
        )));
    }
    Ok(())
}

impl NeighborSource for LocalCellList {
    type Particles = ParticleStore;

    fn check_and_update(&mut self, particles: &mut Self::Particles) -> Result<bool, Error> {
        LocalCellList::check_and_update(self, particles)
    }

    fn get_full_neighbors(
        &self,
        particles: &Self::Particles,
        center: usize,
        buffers: &mut NeighborBuffers<'_>,
        cutoff: Option<f64>,
    ) -> Result<usize, Error> {
        LocalCellList::get_full_neighbors(self, particles, center, buffers, cutoff)
    }

    fn full_neighbor_indices(&self, particles: &Self::Particles, center: usize) -> Result<Vec<usize>, Error> {
        LocalCellList::full_neighbor_indices(self, particles, center)
    }
}
