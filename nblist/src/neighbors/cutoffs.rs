use indexmap::IndexMap;
use ndarray::Array2;

use crate::Error;

use super::SpeciesPairCutoff;

/// Squared cutoff distances to use for every pair of species.
///
/// Pairs of species which are not part of the matrix use the default scalar
/// cutoff.
#[derive(Debug, Clone)]
pub struct CutoffMatrix {
    /// default cutoff, squared
    default2: f64,
    /// position of each species in `cutoffs2`
    species: IndexMap<i32, usize>,
    /// symmetric matrix of squared cutoffs
    cutoffs2: Array2<f64>,
}

impl CutoffMatrix {
    /// Create a matrix using the same `cutoff` for all pairs of species
    pub fn uniform(cutoff: f64) -> CutoffMatrix {
        CutoffMatrix {
            default2: cutoff * cutoff,
            species: IndexMap::new(),
            cutoffs2: Array2::zeros((0, 0)),
        }
    }

    /// Create a matrix using specific cutoffs for some pairs of species, and
    /// the `default` cutoff for all the others.
    #[allow(clippy::float_cmp)]
    pub fn new(default: f64, pairs: &[SpeciesPairCutoff]) -> Result<CutoffMatrix, Error> {
        let mut species = IndexMap::new();
        for pair in pairs {
            if !(pair.cutoff > 0.0 && pair.cutoff.is_finite()) {
                return Err(Error::InvalidParameter(format!(
                    "cutoff for species pair ({}, {}) must be a positive finite number, got {}",
                    pair.first, pair.second, pair.cutoff
                )));
            }

            let n_species = species.len();
            species.entry(pair.first).or_insert(n_species);
            let n_species = species.len();
            species.entry(pair.second).or_insert(n_species);
        }

        let default2 = default * default;
        let mut cutoffs2 = Array2::from_elem((species.len(), species.len()), default2);
        for pair in pairs {
            let first = species[&pair.first];
            let second = species[&pair.second];
            let cutoff2 = pair.cutoff * pair.cutoff;

            if cutoffs2[[first, second]] != default2 && cutoffs2[[first, second]] != cutoff2 {
                return Err(Error::InvalidParameter(format!(
                    "got multiple different cutoffs for species pair ({}, {})",
                    pair.first, pair.second
                )));
            }

            cutoffs2[[first, second]] = cutoff2;
            cutoffs2[[second, first]] = cutoff2;
        }

        return Ok(CutoffMatrix {
            default2: default2,
            species: species,
            cutoffs2: cutoffs2,
        });
    }

    /// Get the squared cutoff for a pair of species `first` and `second`
    #[inline]
    pub fn cutoff2(&self, first: i32, second: i32) -> f64 {
        if self.species.is_empty() {
            return self.default2;
        }

        match (self.species.get(&first), self.species.get(&second)) {
            (Some(&first), Some(&second)) => self.cutoffs2[[first, second]],
            _ => self.default2,
        }
    }

    /// Get the largest cutoff (not squared) used for any pair of species
    pub fn max_cutoff(&self) -> f64 {
        let max2 = self.cutoffs2.iter().fold(self.default2, |max, &value| f64::max(max, value));
        return f64::sqrt(max2);
    }
}
