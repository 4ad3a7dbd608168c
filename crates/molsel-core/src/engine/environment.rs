use crate::core::data::atom_set::AtomSet;
use crate::core::data::mask::Mask;
use crate::core::model::structure::Structure;
use crate::engine::error::QueryError;
use crate::engine::value::Value;

/// Fully resolved position of one atom in the structure hierarchy.
///
/// Property symbols read whichever layer they need without re-walking the
/// offset tables on every access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementAddress {
    pub atom: usize,
    pub residue: usize,
    pub chain: usize,
    pub entity: usize,
}

impl ElementAddress {
    /// Resolves the residue, chain, and entity layers for `atom`.
    pub fn of_atom(structure: &Structure, atom: usize) -> ElementAddress {
        let residue = structure.residue_of_atom(atom);
        let chain = structure.chain_of_residue(residue);
        let entity = structure.entity_of_chain(chain);
        ElementAddress {
            atom,
            residue,
            chain,
            entity,
        }
    }
}

/// The two endpoints of a bond under evaluation, plus its order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BondAddress {
    pub atom_a: usize,
    pub atom_b: usize,
    pub order: u8,
}

/// A single-owner evaluation slot.
///
/// A slot is locked for the duration of one iteration scope and unlocked
/// when that scope finishes; locking an already locked slot is an error
/// surfaced to the query author rather than a silent rebind.
#[derive(Debug)]
pub struct Slot<T> {
    name: &'static str,
    value: Option<T>,
}

impl<T> Slot<T> {
    fn new(name: &'static str) -> Slot<T> {
        Slot { name, value: None }
    }

    pub fn lock(&mut self, value: T) -> Result<(), QueryError> {
        if self.value.is_some() {
            return Err(QueryError::ReentrantSlot(self.name));
        }
        self.value = Some(value);
        Ok(())
    }

    pub fn unlock(&mut self) -> Option<T> {
        self.value.take()
    }

    pub fn is_locked(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Result<&T, QueryError> {
        self.value
            .as_ref()
            .ok_or(QueryError::ReentrantSlot(self.name))
    }

    pub fn get_mut(&mut self) -> Result<&mut T, QueryError> {
        self.value
            .as_mut()
            .ok_or(QueryError::ReentrantSlot(self.name))
    }

    /// Replaces the current value, keeping the slot locked. Used by
    /// iteration drivers that advance the slot between elements.
    pub fn set(&mut self, value: T) -> Result<(), QueryError> {
        if self.value.is_none() {
            return Err(QueryError::ReentrantSlot(self.name));
        }
        self.value = Some(value);
        Ok(())
    }
}

/// The mutable state threaded through one query evaluation.
///
/// Holds the structure under query, the candidate-atom mask generators
/// iterate over, and the iteration slots. Compiled closures receive only
/// this; all per-element context flows through the slots.
pub struct Environment<'a> {
    pub structure: &'a Structure,
    pub candidates: Mask,
    pub element: Slot<ElementAddress>,
    pub atom_set: Slot<AtomSet>,
    pub accumulator: Slot<Value>,
    pub bond: Slot<BondAddress>,
}

impl<'a> Environment<'a> {
    pub fn new(structure: &'a Structure) -> Environment<'a> {
        Environment::with_candidates(structure, Mask::always(structure.atom_count()))
    }

    pub fn with_candidates(structure: &'a Structure, candidates: Mask) -> Environment<'a> {
        Environment {
            structure,
            candidates,
            element: Slot::new("element"),
            atom_set: Slot::new("atom-set"),
            accumulator: Slot::new("accumulator"),
            bond: Slot::new("bond"),
        }
    }

    /// Fails when any iteration slot is locked. Operations that restart
    /// evaluation from a fresh atom universe must not run inside a
    /// per-element scope.
    pub fn assert_no_locked_slots(&self, symbol: &str) -> Result<(), QueryError> {
        for (locked, name) in [
            (self.element.is_locked(), "element"),
            (self.atom_set.is_locked(), "atom-set"),
            (self.accumulator.is_locked(), "accumulator"),
            (self.bond.is_locked(), "bond"),
        ] {
            if locked {
                return Err(QueryError::InvalidContext {
                    symbol: symbol.to_string(),
                    message: format!("slot '{}' is locked by an enclosing evaluation", name),
                });
            }
        }
        Ok(())
    }
}
