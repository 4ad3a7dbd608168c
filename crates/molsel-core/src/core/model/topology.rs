use super::structure::Structure;
use std::collections::{HashSet, VecDeque};

/// Rings larger than this are not reported; chemically relevant rings in
/// macromolecules stay well below it.
const MAX_RING_SIZE: usize = 8;

/// Detects closed bonded cycles in the structure's bond graph.
///
/// A BFS spanning forest identifies the chord edges (one per independent
/// cycle); for each chord the smallest ring through it is recovered as the
/// shortest path between its endpoints with the chord itself removed. Rings
/// above [`MAX_RING_SIZE`] are dropped and duplicates (the same atom set
/// reached through different chords, as in fused ring systems) collapse.
/// Returns each ring as an ascending-sorted atom index list, in discovery
/// order. A structure without a bond table has no rings.
pub fn find_rings(structure: &Structure) -> Vec<Vec<usize>> {
    let Some(bonds) = structure.bonds() else {
        return Vec::new();
    };
    let n = structure.atom_count();

    let mut visited = vec![false; n];
    let mut parent = vec![usize::MAX; n];
    let mut chords: Vec<(usize, usize, usize)> = Vec::new();

    for root in 0..n {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        parent[root] = root;
        let mut queue = VecDeque::from([root]);
        while let Some(u) = queue.pop_front() {
            for &(v, bond) in bonds.neighbors(u) {
                if !visited[v] {
                    visited[v] = true;
                    parent[v] = u;
                    queue.push_back(v);
                } else if v != parent[u] && u < v {
                    chords.push((u, v, bond));
                }
            }
        }
    }

    let mut rings = Vec::new();
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    for (u, v, bond) in chords {
        if let Some(mut ring) = shortest_cycle(structure, u, v, bond) {
            ring.sort_unstable();
            if seen.insert(ring.clone()) {
                rings.push(ring);
            }
        }
    }
    rings
}

/// The smallest cycle containing the bond `(u, v)`: the shortest path from
/// `u` to `v` that does not use the bond itself, bounded by the maximal ring
/// size.
fn shortest_cycle(structure: &Structure, u: usize, v: usize, chord: usize) -> Option<Vec<usize>> {
    let bonds = structure.bonds()?;
    let n = structure.atom_count();
    let mut prev = vec![usize::MAX; n];
    let mut dist = vec![usize::MAX; n];
    dist[u] = 0;
    let mut queue = VecDeque::from([u]);

    while let Some(a) = queue.pop_front() {
        if dist[a] + 1 >= MAX_RING_SIZE {
            continue;
        }
        for &(b, bond) in bonds.neighbors(a) {
            if bond == chord || dist[b] != usize::MAX {
                continue;
            }
            dist[b] = dist[a] + 1;
            prev[b] = a;
            if b == v {
                let mut path = vec![v];
                let mut at = v;
                while at != u {
                    at = prev[at];
                    path.push(at);
                }
                if path.len() < 3 {
                    return None;
                }
                return Some(path);
            }
            queue.push_back(b);
        }
    }
    None
}
