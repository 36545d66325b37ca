#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Neighbor search for particles in a (possibly periodic) box.
//!
//! Particles live in a [`ParticleStore`], and [`LocalCellList`] finds all
//! pairs of particles closer than a cutoff, including periodic images. The
//! list is built with an additional skin and reused while particles move,
//! until they moved too much or the list is explicitly invalidated.

pub mod types;
pub use types::*;

mod errors;
pub use self::errors::{Error, ExternalModelError};

pub mod systems;
pub use systems::{ParticleStore, PeriodicCell};

pub mod neighbors;
pub use neighbors::{LocalCellList, ExternalNeighborList, ExternalModel};
pub use neighbors::{NeighborBuffers, NeighborListOptions, NeighborSource};
