//! Neighbor lists, finding all pairs of particles closer than a cutoff.
//!
//! [`LocalCellList`] builds a cached list of candidates with a cell list,
//! while [`ExternalNeighborList`] gets its candidates from an
//! [`ExternalModel`]. Both are used through the [`NeighborSource`] trait.

use crate::Error;

mod translations;
pub use self::translations::{CellShift, TranslationTable};

mod cutoffs;
pub use self::cutoffs::CutoffMatrix;

mod options;
pub use self::options::{NeighborListOptions, SpeciesPairCutoff};

mod buffers;
pub use self::buffers::NeighborBuffers;

mod cell_list;
pub use self::cell_list::{CandidateEntry, CandidateList};

mod local;
pub use self::local::LocalCellList;

mod external;
pub use self::external::{ExternalModel, ExternalNeighborList};

/// Common interface of all neighbor lists
pub trait NeighborSource {
    /// The particles this list works with
    type Particles: ?Sized;

    /// Update the list if it is stale, returning whether an update was needed
    fn check_and_update(&mut self, particles: &mut Self::Particles) -> Result<bool, Error>;

    /// Write the neighbors of `center` to `buffers`, after the entries already
    /// there, and return the number of neighbors written. A positive `cutoff`
    /// overrides the cutoff(s) of this list.
    fn get_full_neighbors(
        &self,
        particles: &Self::Particles,
        center: usize,
        buffers: &mut NeighborBuffers<'_>,
        cutoff: Option<f64>,
    ) -> Result<usize, Error>;

    /// Get the indexes of all the neighbors of `center`
    fn full_neighbor_indices(&self, particles: &Self::Particles, center: usize) -> Result<Vec<usize>, Error>;
}
