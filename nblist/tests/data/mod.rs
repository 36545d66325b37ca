#![allow(dead_code)]

use nblist::{ParticleStore, PeriodicCell, Vector3D};
use nblist::neighbors::CellShift;

/// Small linear congruential generator, giving reproducible pseudo-random
/// numbers in [0, 1)
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Lcg {
        Lcg(seed)
    }

    pub fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        return (self.0 >> 11) as f64 / (1u64 << 53) as f64;
    }
}

/// Create a store with `n_particles` particles at random positions inside
/// `cell`, alternating between species 1 and 2
pub fn random_store(cell: PeriodicCell, n_particles: usize, seed: u64) -> ParticleStore {
    let mut random = Lcg::new(seed);
    let mut store = ParticleStore::new(cell);
    for i in 0..n_particles {
        let fractional = Vector3D::new(random.next_f64(), random.next_f64(), random.next_f64());
        let species = if i % 2 == 0 { 1 } else { 2 };
        store.add_particle(species, cell.cartesian(fractional));
    }
    return store;
}

/// Find all neighbors of `center` closer than `cutoff` by looking at all
/// particles and all periodic images, returning `(neighbor, distance2)`
/// sorted pairs.
pub fn brute_force(store: &ParticleStore, center: usize, cutoff: f64) -> Vec<(usize, f64)> {
    let cell = store.cell();
    let matrix = cell.matrix();
    let distances = cell.distances_between_faces();
    let periodic = cell.periodic();

    let mut extent = [0; 3];
    for xyz in 0..3 {
        if periodic[xyz] {
            extent[xyz] = f64::ceil(cutoff / distances[xyz]) as i32 + 1;
        }
    }

    let positions = store.positions();
    let mut neighbors = Vec::new();
    for a in -extent[0]..=extent[0] {
        for b in -extent[1]..=extent[1] {
            for c in -extent[2]..=extent[2] {
                let shift = CellShift([a, b, c]);
                for (neighbor, &position) in positions.iter().enumerate() {
                    if neighbor == center && shift.is_zero() {
                        continue;
                    }

                    let vector = position - positions[center] + shift.cartesian(&matrix);
                    let distance2 = vector.norm2();
                    if distance2 < cutoff * cutoff {
                        neighbors.push((neighbor, distance2));
                    }
                }
            }
        }
    }

    sort_neighbors(&mut neighbors);
    return neighbors;
}

pub fn sort_neighbors(neighbors: &mut [(usize, f64)]) {
    neighbors.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
}
