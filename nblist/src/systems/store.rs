use log::debug;

use crate::{Error, Vector3D};

use super::{PeriodicCell, GenerationToken};

/// Storage for the positions and species of a set of particles.
///
/// Positions are always wrapped inside the primary cell along the periodic
/// directions. The store is owned by the simulation driver, neighbor lists only
/// keep a clone of its [`GenerationToken`] and take a reference to the store
/// when building or querying.
///
/// Every change to the positions advances the `modification_count`, which
/// neighbor lists use to decide when to look for excessive displacements.
/// Structural changes (adding particles, changing the cell) advance the
/// generation token, invalidating all the lists built from this store.
///
/// Cloning a store creates a new, independent store with its own generation
/// token: lists built from the original can not be used with the clone.
#[derive(Debug)]
pub struct ParticleStore {
    cell: PeriodicCell,
    species: Vec<i32>,
    positions: Vec<Vector3D>,
    modifications: u64,
    generation: GenerationToken,
}

impl Clone for ParticleStore {
    fn clone(&self) -> ParticleStore {
        ParticleStore {
            cell: self.cell,
            species: self.species.clone(),
            positions: self.positions.clone(),
            modifications: self.modifications,
            generation: GenerationToken::new(),
        }
    }
}

impl ParticleStore {
    /// Create a new empty store with the given cell
    pub fn new(cell: PeriodicCell) -> ParticleStore {
        ParticleStore {
            cell: cell,
            species: Vec::new(),
            positions: Vec::new(),
            modifications: 0,
            generation: GenerationToken::new(),
        }
    }

    /// Add a particle with the given `species` and `position` to this store,
    /// returning the index of the new particle.
    pub fn add_particle(&mut self, species: i32, mut position: Vector3D) -> usize {
        self.cell.wrap_vector(&mut position);
        self.species.push(species);
        self.positions.push(position);

        self.modifications += 1;
        self.generation.advance();

        return self.positions.len() - 1;
    }

    /// Set the position of the particle at `index`
    pub fn set_position(&mut self, index: usize, mut position: Vector3D) -> Result<(), Error> {
        self.check_index(index)?;

        self.cell.wrap_vector(&mut position);
        self.positions[index] = position;
        self.modifications += 1;

        Ok(())
    }

    /// Move the particle at `index` by `delta`
    pub fn displace(&mut self, index: usize, delta: Vector3D) -> Result<(), Error> {
        self.check_index(index)?;
        let position = self.positions[index] + delta;
        return self.set_position(index, position);
    }

    /// Change the cell of this store. This re-wraps all positions inside the
    /// new cell, and invalidates all neighbor lists.
    pub fn set_cell(&mut self, cell: PeriodicCell) {
        self.cell = cell;
        for position in &mut self.positions {
            self.cell.wrap_vector(position);
        }

        self.modifications += 1;
        debug!("cell changed, invalidating neighbor lists");
        self.generation.advance();
    }

    /// Explicitly invalidate all neighbor lists built from this store
    pub fn invalidate(&self) {
        self.generation.advance();
    }

    /// Get the cell of this store
    pub fn cell(&self) -> &PeriodicCell {
        &self.cell
    }

    /// Get the number of particles in this store
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Is this store empty?
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Get the (wrapped) positions of all particles
    pub fn positions(&self) -> &[Vector3D] {
        &self.positions
    }

    /// Get the species of all particles
    pub fn species(&self) -> &[i32] {
        &self.species
    }

    /// Get the number of modifications made to this store since it was
    /// created. This value only ever increases.
    pub fn modification_count(&self) -> u64 {
        self.modifications
    }

    /// Get the generation token shared by this store and all neighbor lists
    /// built from it
    pub fn generation(&self) -> &GenerationToken {
        &self.generation
    }

    fn check_index(&self, index: usize) -> Result<(), Error> {
        if index >= self.positions.len() {
            return Err(Error::InvalidParameter(format!(
                "particle index {} is out of bounds for a store with {} particles",
                index, self.positions.len()
            )));
        }
        Ok(())
    }
}
