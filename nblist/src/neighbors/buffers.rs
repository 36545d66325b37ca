use crate::Vector3D;

/// Caller-owned output buffers for neighbor queries.
///
/// This bundles three slices (neighbor indices, difference vectors from the
/// central particle to the neighbor, and squared length of these vectors)
/// together with the number of entries already written. Successive queries
/// append to the buffers, so the same buffers can be used to gather the
/// neighbors of multiple particles in one batch, until [`clear`] is called.
///
/// Queries never grow the buffers: if a query would need more entries than
/// [`NeighborBuffers::remaining`], it fails with
/// [`Error::CapacityExceeded`](crate::Error::CapacityExceeded) without writing
/// anything.
///
/// [`clear`]: NeighborBuffers::clear
#[derive(Debug)]
pub struct NeighborBuffers<'a> {
    neighbors: &'a mut [usize],
    vectors: &'a mut [Vector3D],
    distances2: &'a mut [f64],
    capacity: usize,
    len: usize,
}

impl<'a> NeighborBuffers<'a> {
    /// Create new buffers from the given slices. The capacity of the buffers
    /// is the length of the shortest slice.
    pub fn new(
        neighbors: &'a mut [usize],
        vectors: &'a mut [Vector3D],
        distances2: &'a mut [f64],
    ) -> NeighborBuffers<'a> {
        let capacity = neighbors.len().min(vectors.len()).min(distances2.len());
        NeighborBuffers {
            neighbors: neighbors,
            vectors: vectors,
            distances2: distances2,
            capacity: capacity,
            len: 0,
        }
    }

    /// Total number of entries these buffers can hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries already written to these buffers
    pub fn len(&self) -> usize {
        self.len
    }

    /// Are these buffers empty?
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of entries that can still be written to these buffers
    pub fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    /// Forget about all the entries written so far, making the whole capacity
    /// available again
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Get the indexes of the neighbors written so far
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors[..self.len]
    }

    /// Get the difference vectors written so far
    pub fn vectors(&self) -> &[Vector3D] {
        &self.vectors[..self.len]
    }

    /// Get the squared length of the difference vectors written so far
    pub fn distances2(&self) -> &[f64] {
        &self.distances2[..self.len]
    }

    /// Add a new entry to the buffers. Callers must check that there is enough
    /// space left first.
    #[inline]
    pub(crate) fn push(&mut self, neighbor: usize, vector: Vector3D, distance2: f64) {
        debug_assert!(self.len < self.capacity);
        self.neighbors[self.len] = neighbor;
        self.vectors[self.len] = vector;
        self.distances2[self.len] = distance2;
        self.len += 1;
    }
}
