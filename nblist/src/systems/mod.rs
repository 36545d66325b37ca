mod cell;
pub use self::cell::{PeriodicCell, CellShape};

mod generation;
pub use self::generation::GenerationToken;

mod store;
pub use self::store::ParticleStore;
