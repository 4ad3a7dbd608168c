use super::atom_set::AtomSet;
use super::mask::Mask;
use super::selection::AtomSelection;
use crate::core::model::structure::Structure;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;

/// Spatial index over the individual atoms admitted by a mask.
///
/// The tree stores exact coordinates, so radius queries against it need no
/// further confirmation step.
#[derive(Debug)]
pub struct AtomLookup {
    tree: Option<KdTree<f64, 3>>,
    atoms: Vec<usize>,
}

impl AtomLookup {
    pub fn new(structure: &Structure, mask: &Mask) -> AtomLookup {
        let mut atoms = Vec::with_capacity(mask.size());
        let mut positions = Vec::with_capacity(mask.size());
        for atom in 0..structure.atom_count() {
            if mask.has(atom) {
                let pos = structure.position(atom);
                atoms.push(atom);
                positions.push([pos.x, pos.y, pos.z]);
            }
        }
        let tree = if positions.is_empty() {
            None
        } else {
            Some((&positions).into())
        };
        AtomLookup { tree, atoms }
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Indexed atoms within `radius` of `point`, in arbitrary order.
    pub fn atoms_within(&self, point: &Point3<f64>, radius: f64) -> Vec<usize> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        let radius_sq = radius * radius;
        tree.within_unsorted::<SquaredEuclidean>(&[point.x, point.y, point.z], radius_sq)
            .into_iter()
            .map(|neighbour| self.atoms[neighbour.item as usize])
            .collect()
    }

    /// Whether any indexed atom lies within `radius` of `point`.
    pub fn any_within(&self, point: &Point3<f64>, radius: f64) -> bool {
        let Some(tree) = &self.tree else {
            return false;
        };
        let nearest = tree.nearest_one::<SquaredEuclidean>(&[point.x, point.y, point.z]);
        nearest.distance <= radius * radius
    }
}

/// Coarse spatial index over whole atom sets, keyed by their bounding-sphere
/// centers.
///
/// A center query over-approximates by the largest sphere radius in the
/// selection; callers confirm candidates with an exact pairwise distance.
#[derive(Debug)]
pub struct SelectionLookup {
    tree: Option<KdTree<f64, 3>>,
    max_set_radius: f64,
}

impl SelectionLookup {
    pub fn new(structure: &Structure, selection: &AtomSelection) -> SelectionLookup {
        let mut positions = Vec::with_capacity(selection.len());
        let mut max_set_radius = 0.0f64;
        for set in selection.sets() {
            let sphere = set.bounding_sphere(structure);
            positions.push([sphere.center.x, sphere.center.y, sphere.center.z]);
            if sphere.radius > max_set_radius {
                max_set_radius = sphere.radius;
            }
        }
        let tree = if positions.is_empty() {
            None
        } else {
            Some((&positions).into())
        };
        SelectionLookup {
            tree,
            max_set_radius,
        }
    }

    /// Indices of sets whose bounding sphere may intersect a probe sphere.
    ///
    /// The safety margin covers both the probe radius and the largest set
    /// radius, so no true neighbor is missed; false positives are expected.
    pub fn candidates(&self, center: &Point3<f64>, probe_radius: f64, max_distance: f64) -> Vec<usize> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        let reach = max_distance + probe_radius + self.max_set_radius;
        let reach_sq = reach * reach;
        tree.within_unsorted::<SquaredEuclidean>(&[center.x, center.y, center.z], reach_sq)
            .into_iter()
            .map(|neighbour| neighbour.item as usize)
            .collect()
    }

    /// Sets within `max_distance` of `probe`, confirmed by exact minimum
    /// pairwise atom distance.
    pub fn sets_within(
        &self,
        structure: &Structure,
        selection: &AtomSelection,
        probe: &AtomSet,
        max_distance: f64,
    ) -> Vec<usize> {
        if probe.is_empty() {
            return Vec::new();
        }
        let sphere = probe.bounding_sphere(structure);
        let mut hits: Vec<usize> = self
            .candidates(&sphere.center, sphere.radius, max_distance)
            .into_iter()
            .filter(|&i| {
                AtomSet::distance(structure, probe, &selection.sets()[i]) <= max_distance
            })
            .collect();
        hits.sort_unstable();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::builder::StructureBuilder;

    fn create_test_structure() -> Structure {
        let mut builder = StructureBuilder::new();
        builder.entity("1", "polymer");
        builder.chain("A").unwrap();
        builder.residue(1, "GLY").unwrap();
        builder
            .atom("C1", "C", Point3::new(0.0, 0.0, 0.0))
            .unwrap();
        builder
            .atom("C2", "C", Point3::new(3.0, 0.0, 0.0))
            .unwrap();
        builder
            .atom("C3", "C", Point3::new(10.0, 0.0, 0.0))
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn atom_lookup_finds_atoms_in_radius() {
        let structure = create_test_structure();
        let lookup = AtomLookup::new(&structure, &Mask::always(structure.atom_count()));
        let mut hits = lookup.atoms_within(&Point3::new(0.0, 0.0, 0.0), 4.0);
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1]);
        assert!(lookup.any_within(&Point3::new(9.5, 0.0, 0.0), 1.0));
        assert!(!lookup.any_within(&Point3::new(50.0, 0.0, 0.0), 1.0));
    }

    #[test]
    fn atom_lookup_respects_mask() {
        let structure = create_test_structure();
        let mask = Mask::from_indices(structure.atom_count(), &[2]);
        let lookup = AtomLookup::new(&structure, &mask);
        assert!(lookup.atoms_within(&Point3::new(0.0, 0.0, 0.0), 4.0).is_empty());
        assert!(lookup.any_within(&Point3::new(10.0, 0.0, 0.0), 0.5));
    }

    #[test]
    fn empty_lookup_answers_nothing() {
        let structure = create_test_structure();
        let lookup = AtomLookup::new(&structure, &Mask::never());
        assert!(lookup.is_empty());
        assert!(lookup.atoms_within(&Point3::new(0.0, 0.0, 0.0), 100.0).is_empty());
    }

    #[test]
    fn selection_lookup_confirms_with_exact_distance() {
        let structure = create_test_structure();
        let selection = AtomSelection::new(vec![
            AtomSet::new(vec![0, 1]),
            AtomSet::new(vec![2]),
        ]);
        let lookup = SelectionLookup::new(&structure, &selection);
        let probe = AtomSet::singleton(0);
        assert_eq!(lookup.sets_within(&structure, &selection, &probe, 4.0), vec![0]);
        assert_eq!(
            lookup.sets_within(&structure, &selection, &probe, 10.0),
            vec![0, 1]
        );
    }
}
