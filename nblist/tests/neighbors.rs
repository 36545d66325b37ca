use approx::assert_relative_eq;

use nblist::{Error, Matrix3, Vector3D};
use nblist::{LocalCellList, NeighborBuffers, NeighborListOptions, ParticleStore, PeriodicCell};
use nblist::neighbors::SpeciesPairCutoff;

mod data;

/// Owned storage for the buffers used in queries
struct Storage {
    neighbors: Vec<usize>,
    vectors: Vec<Vector3D>,
    distances2: Vec<f64>,
}

impl Storage {
    fn new(capacity: usize) -> Storage {
        Storage {
            neighbors: vec![0; capacity],
            vectors: vec![Vector3D::zero(); capacity],
            distances2: vec![0.0; capacity],
        }
    }

    fn buffers(&mut self) -> NeighborBuffers<'_> {
        NeighborBuffers::new(&mut self.neighbors, &mut self.vectors, &mut self.distances2)
    }
}

fn full_neighbors(list: &LocalCellList, store: &ParticleStore, center: usize) -> Vec<(usize, Vector3D, f64)> {
    let mut storage = Storage::new(list.max_neighbor_list_length());
    let mut buffers = storage.buffers();
    list.get_full_neighbors(store, center, &mut buffers, None).unwrap();

    return buffers.neighbors().iter()
        .zip(buffers.vectors())
        .zip(buffers.distances2())
        .map(|((&neighbor, &vector), &distance2)| (neighbor, vector, distance2))
        .collect();
}

fn check_brute_force(store: &ParticleStore, cutoff: f64, skin: f64) {
    let mut list = LocalCellList::new(NeighborListOptions::new(cutoff, skin)).unwrap();
    list.update(store).unwrap();

    for center in 0..store.len() {
        let mut actual = full_neighbors(&list, store, center).into_iter()
            .map(|(neighbor, _, distance2)| (neighbor, distance2))
            .collect::<Vec<_>>();
        data::sort_neighbors(&mut actual);

        let expected = data::brute_force(store, center, cutoff);
        assert_eq!(actual.len(), expected.len(), "wrong number of neighbors for particle {}", center);
        for (actual, expected) in actual.iter().zip(&expected) {
            assert_eq!(actual.0, expected.0);
            assert_relative_eq!(actual.1, expected.1, max_relative = 1e-10);
        }
    }
}

#[test]
fn periodic_image() {
    let mut store = ParticleStore::new(PeriodicCell::cubic(10.0).unwrap());
    store.add_particle(1, Vector3D::new(0.1, 0.0, 0.0));
    store.add_particle(1, Vector3D::new(5.0, 5.0, 5.0));
    store.add_particle(1, Vector3D::new(5.0, 5.0, 8.0));
    store.add_particle(1, Vector3D::new(9.95, 0.0, 0.0));

    let mut list = LocalCellList::new(NeighborListOptions::new(2.5, 0.3)).unwrap();
    list.update(&store).unwrap();

    let neighbors = full_neighbors(&list, &store, 0);
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].0, 3);
    assert_relative_eq!(neighbors[0].1, Vector3D::new(-0.15, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(neighbors[0].2, 0.0225, epsilon = 1e-12);

    let neighbors = full_neighbors(&list, &store, 3);
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].0, 0);
    assert_relative_eq!(neighbors[0].1, Vector3D::new(0.15, 0.0, 0.0), epsilon = 1e-12);

    assert!(full_neighbors(&list, &store, 1).is_empty());
}

#[test]
fn species_cutoffs() {
    let cell = PeriodicCell::cubic(20.0).unwrap().with_periodicity([false, false, false]);
    let mut store = ParticleStore::new(cell);
    store.add_particle(1, Vector3D::new(1.0, 1.0, 1.0));
    store.add_particle(1, Vector3D::new(3.5, 1.0, 1.0));
    store.add_particle(2, Vector3D::new(1.0, 3.5, 1.0));

    let options = NeighborListOptions {
        cutoff: 1.0,
        skin: Some(0.3),
        drift_factor: 0.5,
        species_cutoffs: vec![
            SpeciesPairCutoff { first: 1, second: 1, cutoff: 2.0 },
            SpeciesPairCutoff { first: 1, second: 2, cutoff: 3.0 },
        ],
    };
    let mut list = LocalCellList::new(options).unwrap();
    list.update(&store).unwrap();

    // A-A pair at 2.5 is outside of the 2.0 cutoff, A-B pair at 2.5 is
    // inside the 3.0 cutoff
    let neighbors = full_neighbors(&list, &store, 0);
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].0, 2);
    assert_relative_eq!(neighbors[0].2, 6.25, epsilon = 1e-12);

    assert_eq!(list.full_neighbor_indices(&store, 1).unwrap(), Vec::<usize>::new());
    assert_eq!(list.full_neighbor_indices(&store, 2).unwrap(), [0]);

    // the override ignores species
    let mut storage = Storage::new(4);
    let mut buffers = storage.buffers();
    assert_eq!(list.get_full_neighbors(&store, 0, &mut buffers, Some(2.6)).unwrap(), 2);
    let mut neighbors = buffers.neighbors().to_vec();
    neighbors.sort_unstable();
    assert_eq!(neighbors, [1, 2]);
}

#[test]
fn symmetry() {
    let store = data::random_store(PeriodicCell::cubic(8.0).unwrap(), 60, 1234);
    let mut list = LocalCellList::new(NeighborListOptions::new(3.0, 0.4)).unwrap();
    list.update(&store).unwrap();

    for center in 0..store.len() {
        for (neighbor, vector, distance2) in full_neighbors(&list, &store, center) {
            let reverse = full_neighbors(&list, &store, neighbor);
            let found = reverse.iter().any(|&(other, other_vector, other_distance2)| {
                other == center
                    && (other_vector + vector).norm() < 1e-10
                    && f64::abs(other_distance2 - distance2) < 1e-10
            });
            assert!(found, "pair {}-{} is not symmetric", center, neighbor);
        }
    }
}

#[test]
fn half_list() {
    let store = data::random_store(PeriodicCell::cubic(6.0).unwrap(), 30, 42);
    let mut list = LocalCellList::new(NeighborListOptions::new(2.5, 0.3)).unwrap();
    list.update(&store).unwrap();

    let mut storage = Storage::new(list.max_neighbor_list_length() * store.len());
    let mut buffers = storage.buffers();

    let mut n_half = 0;
    let mut n_full = 0;
    for center in 0..store.len() {
        n_half += list.get_half_neighbors(&store, center, &mut buffers).unwrap();
        n_full += list.full_neighbor_indices(&store, center).unwrap().len();
    }

    assert_eq!(2 * n_half, n_full);
    assert_eq!(buffers.len(), n_half);
}

#[test]
fn brute_force_triclinic() {
    let cell = PeriodicCell::triclinic(5.0, 6.0, 7.0, 75.0, 95.0, 110.0).unwrap();
    let store = data::random_store(cell, 50, 7);
    check_brute_force(&store, 3.2, 0.3);

    // cutoff larger than the cell
    let cell = PeriodicCell::triclinic(2.5, 3.0, 2.8, 80.0, 85.0, 100.0).unwrap();
    let store = data::random_store(cell, 6, 13);
    check_brute_force(&store, 4.0, 0.5);
}

#[test]
fn brute_force_mixed_periodicity() {
    let cell = PeriodicCell::orthorhombic(6.0, 7.0, 8.0).unwrap().with_periodicity([true, false, true]);
    let store = data::random_store(cell, 80, 99);
    check_brute_force(&store, 2.8, 0.2);

    let cell = PeriodicCell::new(Matrix3::new([
        [6.0, 0.0, 0.0],
        [1.5, 6.5, 0.0],
        [0.5, -1.0, 7.0],
    ]), [false, true, false]).unwrap();
    let store = data::random_store(cell, 60, 5);
    check_brute_force(&store, 3.0, 0.2);

    let cell = PeriodicCell::cubic(9.0).unwrap().with_periodicity([false, false, false]);
    let store = data::random_store(cell, 70, 3);
    check_brute_force(&store, 2.0, 0.5);
}

#[test]
fn capacity_threading() {
    let store = data::random_store(PeriodicCell::cubic(7.0).unwrap(), 40, 21);
    let mut list = LocalCellList::new(NeighborListOptions::new(2.5, 0.3)).unwrap();
    list.update(&store).unwrap();

    let counts = (0..store.len())
        .map(|center| list.full_neighbor_indices(&store, center).unwrap().len())
        .collect::<Vec<_>>();
    let total = counts.iter().sum::<usize>();
    assert!(total > 0);

    // all the neighbors fit in the buffers
    let mut storage = Storage::new(total);
    let mut buffers = storage.buffers();
    for (center, &count) in counts.iter().enumerate() {
        let start = buffers.len();
        assert_eq!(list.get_full_neighbors(&store, center, &mut buffers, None).unwrap(), count);
        assert_eq!(buffers.len(), start + count);
    }
    assert_eq!(buffers.remaining(), 0);

    // buffers are too small, queries fail without writing anything
    let mut storage = Storage::new(total - 1);
    let mut buffers = storage.buffers();
    let mut failed = false;
    for center in 0..store.len() {
        let before = buffers.len();
        match list.get_full_neighbors(&store, center, &mut buffers, None) {
            Ok(_) => assert!(buffers.len() <= buffers.capacity()),
            Err(Error::CapacityExceeded { required, capacity }) => {
                assert_eq!(required, counts[center]);
                assert_eq!(capacity, buffers.remaining());
                assert_eq!(buffers.len(), before);
                failed = true;
                break;
            }
            Err(error) => panic!("unexpected error: {}", error),
        }
    }
    assert!(failed);
}

#[test]
fn idempotence() {
    let store = data::random_store(PeriodicCell::cubic(7.0).unwrap(), 40, 8);
    let mut list = LocalCellList::new(NeighborListOptions::new(2.5, 0.3)).unwrap();
    assert!(list.check_and_update(&store).unwrap());

    let first = (0..store.len()).map(|center| full_neighbors(&list, &store, center)).collect::<Vec<_>>();

    assert!(!list.check_and_update(&store).unwrap());
    let second = (0..store.len()).map(|center| full_neighbors(&list, &store, center)).collect::<Vec<_>>();
    assert_eq!(first, second);

    // rebuilding without changes gives the same neighbors
    list.update(&store).unwrap();
    let third = (0..store.len()).map(|center| full_neighbors(&list, &store, center)).collect::<Vec<_>>();
    assert_eq!(first, third);
}

#[test]
fn options_from_json() {
    let options = NeighborListOptions::from_json(r#"{
        "cutoff": 2.5,
        "skin": 0.3,
        "species_cutoffs": [{"first": 1, "second": 2, "cutoff": 3.0}]
    }"#).unwrap();

    let list = LocalCellList::new(options).unwrap();
    assert_relative_eq!(list.build_cutoff(), 3.3, epsilon = 1e-12);

    let options = NeighborListOptions::new(-1.0, 0.3);
    assert!(matches!(LocalCellList::new(options), Err(Error::InvalidParameter(_))));
}

fn check_after_moves(cell: PeriodicCell, seed: u64) {
    let cutoff = 2.5;
    let skin = 0.6;
    let mut store = data::random_store(cell, 80, seed);
    let mut list = LocalCellList::new(NeighborListOptions::new(cutoff, skin)).unwrap();
    list.update(&store).unwrap();

    // each particle moves by less than 0.15 * sqrt(3) < drift_factor * skin
    let mut random = data::Lcg::new(seed + 1);
    for particle in 0..store.len() {
        let delta = Vector3D::new(
            0.3 * (random.next_f64() - 0.5),
            0.3 * (random.next_f64() - 0.5),
            0.3 * (random.next_f64() - 0.5),
        );
        store.displace(particle, delta).unwrap();
    }
    assert!(list.is_valid(&store));

    let mut storage = Storage::new(1000);
    for query in [None, Some(1.5), Some(2.5), Some(3.5), Some(4.2)] {
        let reference_cutoff = query.unwrap_or(cutoff);
        for center in 0..store.len() {
            let mut buffers = storage.buffers();
            list.get_full_neighbors(&store, center, &mut buffers, query).unwrap();

            let mut actual = buffers.neighbors().iter()
                .zip(buffers.distances2())
                .map(|(&neighbor, &distance2)| (neighbor, distance2))
                .collect::<Vec<_>>();
            data::sort_neighbors(&mut actual);

            let expected = data::brute_force(&store, center, reference_cutoff);
            assert_eq!(
                actual.len(), expected.len(),
                "wrong number of neighbors for particle {} with cutoff {}", center, reference_cutoff
            );
            for (actual, expected) in actual.iter().zip(&expected) {
                assert_eq!(actual.0, expected.0);
                assert_relative_eq!(actual.1, expected.1, max_relative = 1e-10);
            }
        }
    }
}

#[test]
fn brute_force_after_moves() {
    check_after_moves(PeriodicCell::cubic(7.0).unwrap(), 31);

    let cell = PeriodicCell::triclinic(6.5, 7.0, 7.5, 80.0, 95.0, 105.0).unwrap();
    check_after_moves(cell, 57);

    let cell = PeriodicCell::orthorhombic(6.0, 7.0, 8.0).unwrap().with_periodicity([true, false, true]);
    check_after_moves(cell, 83);
}
