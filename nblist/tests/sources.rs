//! Use both kinds of neighbor lists through the common `NeighborSource`
//! interface, checking they agree when the external model knows about the
//! same periodic images as the local cell list.

use approx::assert_relative_eq;

use nblist::{Error, ExternalModelError, Vector3D};
use nblist::{ExternalModel, ExternalNeighborList, LocalCellList, NeighborListOptions};
use nblist::{NeighborBuffers, NeighborSource, ParticleStore, PeriodicCell};

mod data;

/// External model keeping all periodic images of the particles in a store
/// closer than `cutoff` to the cell as ghosts, and using all particles as
/// candidates
struct GhostImages {
    cell: PeriodicCell,
    local: Vec<Vector3D>,
    cutoff: f64,
    positions: Vec<Vector3D>,
    /// local particle corresponding to each global position
    owners: Vec<usize>,
    candidates: Vec<usize>,
}

impl GhostImages {
    fn new(store: &ParticleStore, cutoff: f64) -> GhostImages {
        GhostImages {
            cell: *store.cell(),
            local: store.positions().to_vec(),
            cutoff: cutoff,
            positions: Vec::new(),
            owners: Vec::new(),
            candidates: Vec::new(),
        }
    }
}

impl ExternalModel for GhostImages {
    fn neighbor_candidates(&self, index: usize) -> Result<&[usize], ExternalModelError> {
        if index >= self.local.len() {
            return Err(ExternalModelError { code: 1, message: "not a local particle".into() });
        }
        Ok(&self.candidates)
    }

    fn global_positions(&self) -> Result<&[Vector3D], ExternalModelError> {
        Ok(&self.positions)
    }

    fn update_neighbor_list(&mut self) -> Result<(), ExternalModelError> {
        let matrix = self.cell.matrix();
        let distances = self.cell.distances_between_faces();
        let extent = [0, 1, 2].map(|xyz| f64::ceil(self.cutoff / distances[xyz]) as i32);

        self.positions = self.local.clone();
        self.owners = (0..self.local.len()).collect();
        for a in -extent[0]..=extent[0] {
            for b in -extent[1]..=extent[1] {
                for c in -extent[2]..=extent[2] {
                    let shift = nblist::neighbors::CellShift([a, b, c]);
                    if shift.is_zero() {
                        continue;
                    }

                    let translation = shift.cartesian(&matrix);
                    for (owner, &position) in self.local.iter().enumerate() {
                        self.positions.push(position + translation);
                        self.owners.push(owner);
                    }
                }
            }
        }

        self.candidates = (0..self.positions.len()).collect();
        Ok(())
    }
}

fn sorted_neighbors<S>(source: &mut S, particles: &mut S::Particles, center: usize, capacity: usize) -> Vec<(Vector3D, f64)>
    where S: NeighborSource + ?Sized
{
    source.check_and_update(particles).unwrap();

    let mut neighbors = vec![0; capacity];
    let mut vectors = vec![Vector3D::zero(); capacity];
    let mut distances2 = vec![0.0; capacity];
    let mut buffers = NeighborBuffers::new(&mut neighbors, &mut vectors, &mut distances2);
    let count = source.get_full_neighbors(particles, center, &mut buffers, None).unwrap();
    assert_eq!(count, buffers.len());

    let mut result = buffers.vectors().iter()
        .zip(buffers.distances2())
        .map(|(&vector, &distance2)| (vector, distance2))
        .collect::<Vec<_>>();
    result.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0[0].total_cmp(&b.0[0])));
    return result;
}

#[test]
fn local_and_external_agree() {
    let cutoff = 3.0;
    let mut store = data::random_store(PeriodicCell::cubic(7.0).unwrap(), 20, 77);

    let mut local = LocalCellList::new(NeighborListOptions::new(cutoff, 0.3)).unwrap();
    let mut external = ExternalNeighborList::new(cutoff).unwrap();
    let mut model = GhostImages::new(&store, cutoff);

    for center in 0..store.len() {
        let expected = sorted_neighbors(&mut local, &mut store, center, 200);

        let actual = sorted_neighbors::<ExternalNeighborList>(&mut external, &mut model, center, 200);

        assert_eq!(actual.len(), expected.len());
        for (actual, expected) in actual.iter().zip(&expected) {
            assert_relative_eq!(actual.1, expected.1, max_relative = 1e-10);
        }
    }

    // the ghost neighbors map back to the right local particles
    let center = 3;
    let indices = external.full_neighbor_indices(&model, center).unwrap();
    let mut owners = indices.iter().map(|&index| model.owners[index]).collect::<Vec<_>>();
    owners.sort_unstable();
    assert_eq!(owners, local.full_neighbor_indices(&store, center).unwrap());
}

#[test]
fn external_staleness() {
    let store = data::random_store(PeriodicCell::cubic(7.0).unwrap(), 5, 3);
    let mut model = GhostImages::new(&store, 2.0);
    let mut external = ExternalNeighborList::new(2.0).unwrap();

    assert!(external.check_and_update(&mut model).unwrap());
    assert!(external.full_neighbor_indices(&model, 0).is_ok());

    // changing the cutoff of the model changes the number of ghosts
    model.cutoff = 8.0;
    model.update_neighbor_list().unwrap();
    let result = external.full_neighbor_indices(&model, 0);
    assert!(matches!(result, Err(Error::StaleList(_))));

    assert!(external.check_and_update(&mut model).unwrap());
    assert!(external.full_neighbor_indices(&model, 0).is_ok());
}
