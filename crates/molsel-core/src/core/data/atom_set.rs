use super::mask::Mask;
use crate::core::model::structure::Structure;
use nalgebra::{Point3, Vector3};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A bounding sphere around the atoms of a set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

/// A canonical, immutable set of atom indices.
///
/// Indices are stored ascending and deduplicated; equality is by content and
/// the hash code is precomputed at construction, so two sets built from
/// different orderings of the same indices are indistinguishable. Cloning is
/// cheap (shared storage).
#[derive(Debug, Clone)]
pub struct AtomSet {
    indices: Arc<[usize]>,
    hash: u64,
}

impl AtomSet {
    pub fn new(mut indices: Vec<usize>) -> AtomSet {
        indices.sort_unstable();
        indices.dedup();
        let hash = content_hash(&indices);
        AtomSet {
            indices: indices.into(),
            hash,
        }
    }

    pub fn empty() -> AtomSet {
        AtomSet::new(Vec::new())
    }

    pub fn singleton(atom: usize) -> AtomSet {
        AtomSet::new(vec![atom])
    }

    pub fn count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Ascending atom indices.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.indices.binary_search(&atom).is_ok()
    }

    pub fn mask(&self, universe: usize) -> Mask {
        Mask::from_indices(universe, &self.indices)
    }

    /// Centroid-centered bounding sphere. Empty sets yield a NaN sphere,
    /// which any distance comparison rejects.
    pub fn bounding_sphere(&self, structure: &Structure) -> BoundingSphere {
        if self.is_empty() {
            return BoundingSphere {
                center: Point3::new(f64::NAN, f64::NAN, f64::NAN),
                radius: f64::NAN,
            };
        }
        let mut sum = Vector3::zeros();
        for &a in self.indices.iter() {
            sum += structure.position(a).coords;
        }
        let center = Point3::from(sum / self.count() as f64);
        let radius = self
            .indices
            .iter()
            .map(|&a| (structure.position(a) - center).norm())
            .fold(0.0f64, f64::max);
        BoundingSphere { center, radius }
    }

    /// Minimal pairwise atom distance between two sets. NaN when either set
    /// is empty.
    pub fn distance(structure: &Structure, a: &AtomSet, b: &AtomSet) -> f64 {
        if a.is_empty() || b.is_empty() {
            return f64::NAN;
        }
        let mut best = f64::INFINITY;
        for &i in a.indices.iter() {
            let p = structure.position(i);
            for &j in b.indices.iter() {
                let d = (structure.position(j) - p).norm();
                if d < best {
                    best = d;
                }
            }
        }
        best
    }

    /// Union of two sets.
    pub fn union(a: &AtomSet, b: &AtomSet) -> AtomSet {
        let mut merged = Vec::with_capacity(a.count() + b.count());
        merged.extend_from_slice(&a.indices);
        merged.extend_from_slice(&b.indices);
        AtomSet::new(merged)
    }
}

fn content_hash(indices: &[usize]) -> u64 {
    // FNV-1a over the sorted indices; order independence follows from the
    // canonical ordering.
    let mut hash = 0xcbf29ce484222325u64;
    for &i in indices {
        hash ^= i as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

impl PartialEq for AtomSet {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.indices == other.indices
    }
}

impl Eq for AtomSet {}

impl Hash for AtomSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}
