use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::{Error, ExternalModelError, Vector3D};

use super::local::{cutoff_override, write_neighbors};
use super::{NeighborBuffers, NeighborSource};

/// An external model managing the neighbors of particles, typically in a
/// parallel simulation where each worker owns some particles and also knows
/// about "ghost" copies of particles owned by other workers.
///
/// Ghost particles have their own indexes after the local particles, and
/// their positions are already translated to the right periodic image, so
/// difference vectors can be computed directly from the global positions.
pub trait ExternalModel {
    /// Get the candidate neighbors of the local particle `index`, as indexes
    /// into [`ExternalModel::global_positions`]
    fn neighbor_candidates(&self, index: usize) -> Result<&[usize], ExternalModelError>;

    /// Get the positions of all local and ghost particles
    fn global_positions(&self) -> Result<&[Vector3D], ExternalModelError>;

    /// Update the list of candidates and ghost particles in the model
    fn update_neighbor_list(&mut self) -> Result<(), ExternalModelError>;
}

/// Neighbor list delegating the search of candidates to an
/// [`ExternalModel`], and only filtering them with a cutoff.
///
/// The list is considered stale until the first call to
/// [`ExternalNeighborList::check_and_update`], after a call to
/// [`ExternalNeighborList::invalidate`], and whenever the number of global
/// positions in the model changed since the last update.
#[derive(Debug)]
pub struct ExternalNeighborList {
    cutoff: f64,
    /// number of global positions at the last update, `None` if the list
    /// was never updated
    n_positions: Option<usize>,
    invalidated: AtomicBool,
}

impl ExternalNeighborList {
    /// Create a new list using the given `cutoff` for all pairs
    pub fn new(cutoff: f64) -> Result<ExternalNeighborList, Error> {
        if !(cutoff > 0.0 && cutoff.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "cutoff must be a positive finite number, got {}", cutoff
            )));
        }

        return Ok(ExternalNeighborList {
            cutoff: cutoff,
            n_positions: None,
            invalidated: AtomicBool::new(false),
        });
    }

    /// Get the cutoff used by this list
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Mark this list as needing an update
    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::Release);
    }

    /// Check if the `model` neighbor list needs to be updated
    pub fn needs_update(&self, model: &dyn ExternalModel) -> Result<bool, Error> {
        match self.check_valid(model) {
            Ok(_) => Ok(false),
            Err(Error::StaleList(_)) => Ok(true),
            Err(error) => Err(error),
        }
    }

    /// Update the `model` neighbor list if needed, returning whether an
    /// update was needed.
    pub fn check_and_update(&mut self, model: &mut dyn ExternalModel) -> Result<bool, Error> {
        if !self.needs_update(model)? {
            return Ok(false);
        }

        model.update_neighbor_list()?;
        let n_positions = model.global_positions()?.len();
        debug!("updated external neighbor list with {} global positions", n_positions);

        self.n_positions = Some(n_positions);
        self.invalidated.store(false, Ordering::Release);
        return Ok(true);
    }

    /// Write all the neighbors of the local particle `center` to `buffers`,
    /// after the entries already there, and return the number of neighbors.
    /// A positive `cutoff` replaces the cutoff of this list.
    pub fn get_full_neighbors(
        &self,
        model: &dyn ExternalModel,
        center: usize,
        buffers: &mut NeighborBuffers<'_>,
        cutoff: Option<f64>,
    ) -> Result<usize, Error> {
        let positions = self.check_valid(model)?;
        let candidates = self.candidates(model, positions, center)?;

        let cutoff = cutoff_override(cutoff)?.unwrap_or(self.cutoff);
        let cutoff2 = cutoff * cutoff;
        return write_neighbors(buffers, Some(candidates.len()), |callback| {
            filter_candidates(positions, center, candidates, cutoff2, callback);
        });
    }

    /// Get the indexes of all the neighbors of the local particle `center`
    pub fn full_neighbor_indices(&self, model: &dyn ExternalModel, center: usize) -> Result<Vec<usize>, Error> {
        let positions = self.check_valid(model)?;
        let candidates = self.candidates(model, positions, center)?;

        let mut neighbors = Vec::new();
        filter_candidates(positions, center, candidates, self.cutoff * self.cutoff, |neighbor, _, _| {
            neighbors.push(neighbor);
        });
        return Ok(neighbors);
    }

    fn check_valid<'a>(&self, model: &'a dyn ExternalModel) -> Result<&'a [Vector3D], Error> {
        let n_positions = match self.n_positions {
            Some(n_positions) => n_positions,
            None => return Err(Error::StaleList("the neighbor list was never updated".into())),
        };

        if self.invalidated.load(Ordering::Acquire) {
            return Err(Error::StaleList(
                "the neighbor list was invalidated and must be updated".into()
            ));
        }

        let positions = model.global_positions()?;
        if positions.len() != n_positions {
            return Err(Error::StaleList(format!(
                "the number of global positions changed from {} to {}",
                n_positions, positions.len()
            )));
        }

        return Ok(positions);
    }

    /// Get the candidates for `center` from the model, checking that they
    /// refer to existing positions
    fn candidates<'a>(
        &self,
        model: &'a dyn ExternalModel,
        positions: &[Vector3D],
        center: usize,
    ) -> Result<&'a [usize], Error> {
        if center >= positions.len() {
            return Err(Error::InvalidParameter(format!(
                "particle index {} is out of bounds for a model with {} positions",
                center, positions.len()
            )));
        }

        let candidates = model.neighbor_candidates(center)?;
        if let Some(&neighbor) = candidates.iter().find(|&&neighbor| neighbor >= positions.len()) {
            return Err(Error::Internal(format!(
                "the external model returned neighbor {} for particle {}, but only has {} positions",
                neighbor, center, positions.len()
            )));
        }

        return Ok(candidates);
    }
}

fn filter_candidates(
    positions: &[Vector3D],
    center: usize,
    candidates: &[usize],
    cutoff2: f64,
    mut callback: impl FnMut(usize, Vector3D, f64),
) {
    let center_position = positions[center];
    for &neighbor in candidates {
        if neighbor == center {
            continue;
        }

        let vector = positions[neighbor] - center_position;
        let distance2 = vector.norm2();
        if distance2 < cutoff2 {
            callback(neighbor, vector, distance2);
        }
    }
}

impl NeighborSource for ExternalNeighborList {
    type Particles = dyn ExternalModel;

    fn check_and_update(&mut self, particles: &mut Self::Particles) -> Result<bool, Error> {
        ExternalNeighborList::check_and_update(self, particles)
    }

    fn get_full_neighbors(
        &self,
        particles: &Self::Particles,
        center: usize,
        buffers: &mut NeighborBuffers<'_>,
        cutoff: Option<f64>,
    ) -> Result<usize, Error> {
        ExternalNeighborList::get_full_neighbors(self, particles, center, buffers, cutoff)
    }

    fn full_neighbor_indices(&self, particles: &Self::Particles, center: usize) -> Result<Vec<usize>, Error> {
        ExternalNeighborList::full_neighbor_indices(self, particles, center)
    }
}
