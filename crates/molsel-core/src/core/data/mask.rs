use std::collections::HashSet;
use std::sync::Arc;

/// Density below which the sparse representation is chosen.
const SPARSE_THRESHOLD: f64 = 1.0 / 12.0;

/// A membership test over a universe of atom indices.
///
/// The representation is selected at construction from the ratio of selected
/// atoms to the universe size: below 1/12 density a hash set, otherwise a
/// dense bit array, with empty, singleton and full-universe shortcuts. The
/// choice is purely a space/speed trade-off; callers must never observe a
/// difference in membership semantics between representations.
#[derive(Debug, Clone)]
pub enum Mask {
    Empty,
    Singleton(usize),
    /// Every index below the stored universe size.
    All(usize),
    Dense {
        bits: Arc<Vec<u64>>,
        universe: usize,
        size: usize,
    },
    Sparse(Arc<HashSet<usize>>),
}

impl Mask {
    pub fn never() -> Mask {
        Mask::Empty
    }

    pub fn always(universe: usize) -> Mask {
        if universe == 0 {
            Mask::Empty
        } else {
            Mask::All(universe)
        }
    }

    /// Builds a mask over `0..universe` from member indices, applying the
    /// representation policy. Duplicate indices are tolerated; the reported
    /// size counts distinct members.
    pub fn from_indices(universe: usize, indices: &[usize]) -> Mask {
        match indices.len() {
            0 => Mask::Empty,
            1 => Mask::Singleton(indices[0]),
            len => {
                if universe > 0 && (len as f64 / universe as f64) < SPARSE_THRESHOLD {
                    Mask::Sparse(Arc::new(indices.iter().copied().collect()))
                } else {
                    let mut bits = vec![0u64; universe.div_ceil(64)];
                    let mut size = 0;
                    for &i in indices {
                        let word = &mut bits[i / 64];
                        let bit = 1 << (i % 64);
                        if *word & bit == 0 {
                            *word |= bit;
                            size += 1;
                        }
                    }
                    if size == universe {
                        return Mask::All(universe);
                    }
                    Mask::Dense {
                        bits: Arc::new(bits),
                        universe,
                        size,
                    }
                }
            }
        }
    }

    pub fn has(&self, i: usize) -> bool {
        match self {
            Mask::Empty => false,
            Mask::Singleton(member) => i == *member,
            Mask::All(universe) => i < *universe,
            Mask::Dense { bits, universe, .. } => {
                i < *universe && bits[i / 64] & (1 << (i % 64)) != 0
            }
            Mask::Sparse(set) => set.contains(&i),
        }
    }

    /// Number of member indices.
    pub fn size(&self) -> usize {
        match self {
            Mask::Empty => 0,
            Mask::Singleton(_) => 1,
            Mask::All(universe) => *universe,
            Mask::Dense { size, .. } => *size,
            Mask::Sparse(set) => set.len(),
        }
    }

    pub fn has_any(&self, indices: &[usize]) -> bool {
        indices.iter().any(|&i| self.has(i))
    }

    /// Member indices of `outer` that are not members of `self`, ascending.
    pub fn complement_within(&self, outer: &Mask, universe: usize) -> Vec<usize> {
        (0..universe)
            .filter(|&i| outer.has(i) && !self.has(i))
            .collect()
    }
}
