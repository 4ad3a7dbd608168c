use super::atom_set::AtomSet;
use super::mask::Mask;
use std::collections::HashSet;

/// An ordered sequence of atom sets, the general query result type.
///
/// Insertion order is significant and preserved; a selection may contain
/// duplicate sets unless it was produced through the unique builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomSelection {
    sets: Vec<AtomSet>,
}

impl AtomSelection {
    pub fn new(sets: Vec<AtomSet>) -> AtomSelection {
        AtomSelection { sets }
    }

    pub fn empty() -> AtomSelection {
        AtomSelection::default()
    }

    pub fn sets(&self) -> &[AtomSet] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Flattens the selection into a single set of all member atoms.
    pub fn to_atom_set(&self) -> AtomSet {
        match self.sets.len() {
            0 => AtomSet::empty(),
            1 => self.sets[0].clone(),
            _ => {
                let mut atoms = Vec::new();
                for set in &self.sets {
                    atoms.extend_from_slice(set.indices());
                }
                AtomSet::new(atoms)
            }
        }
    }

    /// Mask over the union of all member atoms, with the adaptive
    /// representation policy applied.
    pub fn mask(&self, universe: usize) -> Mask {
        match self.sets.len() {
            0 => Mask::never(),
            1 => self.sets[0].mask(universe),
            _ => self.to_atom_set().mask(universe),
        }
    }

    /// Builder that appends in O(1) without deduplication.
    pub fn linear_builder() -> SelectionBuilder {
        SelectionBuilder {
            sets: Vec::new(),
            seen: None,
        }
    }

    /// Builder that drops sets whose content was already added.
    pub fn unique_builder() -> SelectionBuilder {
        SelectionBuilder {
            sets: Vec::new(),
            seen: Some(HashSet::new()),
        }
    }
}

/// Accumulates atom sets into an [`AtomSelection`], preserving first-seen
/// order.
#[derive(Debug)]
pub struct SelectionBuilder {
    sets: Vec<AtomSet>,
    seen: Option<HashSet<AtomSet>>,
}

impl SelectionBuilder {
    pub fn add(&mut self, set: AtomSet) {
        if let Some(seen) = &mut self.seen {
            if !seen.insert(set.clone()) {
                return;
            }
        }
        self.sets.push(set);
    }

    pub fn build(self) -> AtomSelection {
        AtomSelection::new(self.sets)
    }
}

/// Content-hash membership index over whole atom sets.
#[derive(Debug, Default)]
pub struct SelectionSet {
    seen: HashSet<AtomSet>,
}

impl SelectionSet {
    pub fn of_selection(selection: &AtomSelection) -> SelectionSet {
        let mut set = SelectionSet::default();
        for atom_set in selection.sets() {
            set.add(atom_set.clone());
        }
        set
    }

    /// Returns `false` when an equal-content set was already present.
    pub fn add(&mut self, set: AtomSet) -> bool {
        self.seen.insert(set)
    }

    pub fn contains(&self, set: &AtomSet) -> bool {
        self.seen.contains(set)
    }
}
