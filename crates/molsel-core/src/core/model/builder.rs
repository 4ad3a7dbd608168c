use super::structure::{
    AtomTable, BondTable, ChainTable, EntityTable, PropertyColumn, ResidueTable, Structure,
};
use nalgebra::Point3;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while constructing a [`Structure`].
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("a chain requires an open entity")]
    NoOpenEntity,

    #[error("a residue requires an open chain")]
    NoOpenChain,

    #[error("an atom requires an open residue")]
    NoOpenResidue,

    #[error("bond references atom index {0}, but only {1} atoms exist")]
    BondAtomOutOfRange(usize, usize),

    #[error("property '{name}' has {actual} values for {expected} atoms")]
    PropertyLength {
        name: String,
        actual: usize,
        expected: usize,
    },
}

/// Incremental, row-oriented builder for the columnar [`Structure`].
///
/// Rows must be appended hierarchy-first: an entity opens chains, a chain
/// opens residues, a residue receives atoms. Offset arrays are closed when
/// [`StructureBuilder::build`] runs, which guarantees every level range is
/// contiguous by construction.
#[derive(Debug, Default)]
pub struct StructureBuilder {
    atoms: AtomTable,
    residues: ResidueTable,
    chains: ChainTable,
    entities: EntityTable,
    bond_a: Vec<usize>,
    bond_b: Vec<usize>,
    bond_order: Vec<u8>,
    properties: HashMap<String, PropertyColumn>,
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new entity.
    pub fn entity(&mut self, id: &str, entity_type: &str) -> &mut Self {
        self.entities.chain_offset.push(self.chains.count);
        self.entities.id.push(id.to_string());
        self.entities.entity_type.push(entity_type.to_string());
        self.entities.count += 1;
        self
    }

    /// Opens a new chain within the current entity.
    pub fn chain(&mut self, asym_id: &str) -> Result<&mut Self, ModelError> {
        if self.entities.count == 0 {
            return Err(ModelError::NoOpenEntity);
        }
        self.chains.residue_offset.push(self.residues.count);
        self.chains.auth_asym_id.push(asym_id.to_string());
        self.chains.label_asym_id.push(asym_id.to_string());
        self.chains.entity_index.push(self.entities.count - 1);
        self.chains.count += 1;
        Ok(self)
    }

    /// Opens a new residue within the current chain. The auth and label
    /// identifiers are set to the same values; use the columns directly for
    /// structures where they differ.
    pub fn residue(&mut self, seq_id: i64, comp_id: &str) -> Result<&mut Self, ModelError> {
        if self.chains.count == 0 {
            return Err(ModelError::NoOpenChain);
        }
        self.residues.atom_offset.push(self.atoms.count);
        self.residues.auth_seq_id.push(seq_id);
        self.residues.label_seq_id.push(seq_id);
        self.residues.auth_comp_id.push(comp_id.to_string());
        self.residues.label_comp_id.push(comp_id.to_string());
        self.residues.chain_index.push(self.chains.count - 1);
        self.residues.count += 1;
        Ok(self)
    }

    /// Appends an atom to the current residue and returns its index.
    pub fn atom(
        &mut self,
        name: &str,
        element: &str,
        position: Point3<f64>,
    ) -> Result<usize, ModelError> {
        self.atom_ext(name, element, position, 1.0, 0.0)
    }

    pub fn atom_ext(
        &mut self,
        name: &str,
        element: &str,
        position: Point3<f64>,
        occupancy: f64,
        b_iso: f64,
    ) -> Result<usize, ModelError> {
        if self.residues.count == 0 {
            return Err(ModelError::NoOpenResidue);
        }
        let index = self.atoms.count;
        self.atoms.x.push(position.x);
        self.atoms.y.push(position.y);
        self.atoms.z.push(position.z);
        self.atoms.label_atom_id.push(name.to_string());
        self.atoms.type_symbol.push(element.to_string());
        self.atoms.occupancy.push(occupancy);
        self.atoms.b_iso.push(b_iso);
        self.atoms.residue_index.push(self.residues.count - 1);
        self.atoms.count += 1;
        Ok(index)
    }

    /// Records a bond between two existing atoms.
    pub fn bond(&mut self, a: usize, b: usize, order: u8) -> Result<&mut Self, ModelError> {
        for atom in [a, b] {
            if atom >= self.atoms.count {
                return Err(ModelError::BondAtomOutOfRange(atom, self.atoms.count));
            }
        }
        self.bond_a.push(a);
        self.bond_b.push(b);
        self.bond_order.push(order);
        Ok(self)
    }

    /// Attaches a named per-atom property column. The column length must
    /// match the final atom count at build time.
    pub fn property(&mut self, name: &str, column: PropertyColumn) -> &mut Self {
        self.properties.insert(name.to_string(), column);
        self
    }

    pub fn build(mut self) -> Result<Structure, ModelError> {
        self.entities.chain_offset.push(self.chains.count);
        self.chains.residue_offset.push(self.residues.count);
        self.residues.atom_offset.push(self.atoms.count);

        for (name, column) in &self.properties {
            if column.len() != self.atoms.count {
                return Err(ModelError::PropertyLength {
                    name: name.clone(),
                    actual: column.len(),
                    expected: self.atoms.count,
                });
            }
        }

        let bonds = if self.bond_a.is_empty() {
            None
        } else {
            Some(BondTable::new(
                self.atoms.count,
                self.bond_a,
                self.bond_b,
                self.bond_order,
            ))
        };

        Ok(Structure::new(
            self.atoms,
            self.residues,
            self.chains,
            self.entities,
            bonds,
            self.properties,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_structure() -> Structure {
        let mut b = StructureBuilder::new();
        b.entity("1", "polymer");
        b.chain("A").unwrap();
        b.residue(1, "ALA").unwrap();
        b.atom("N", "N", Point3::new(0.0, 0.0, 0.0)).unwrap();
        b.atom("CA", "C", Point3::new(1.5, 0.0, 0.0)).unwrap();
        b.residue(2, "GLY").unwrap();
        b.atom("CA", "C", Point3::new(3.0, 0.0, 0.0)).unwrap();
        b.chain("B").unwrap();
        b.residue(1, "HOH").unwrap();
        b.atom("O", "O", Point3::new(10.0, 0.0, 0.0)).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn offsets_describe_contiguous_ranges() {
        let s = simple_structure();
        assert_eq!(s.atom_count(), 4);
        assert_eq!(s.chain_range(0), 0..2);
        assert_eq!(s.residue_range(0), 0..2);
        assert_eq!(s.residue_range(1), 2..3);
        assert_eq!(s.atom_range(0), 0..2);
        assert_eq!(s.atom_range(1), 2..3);
        assert_eq!(s.atom_range(2), 3..4);
    }

    #[test]
    fn parent_indices_are_consistent_with_ranges() {
        let s = simple_structure();
        for residue in 0..s.residues.count {
            for atom in s.atom_range(residue) {
                assert_eq!(s.residue_of_atom(atom), residue);
            }
        }
        assert_eq!(s.chain_of_residue(2), 1);
        assert_eq!(s.entity_of_chain(1), 0);
    }

    #[test]
    fn atom_without_residue_is_rejected() {
        let mut b = StructureBuilder::new();
        let err = b.atom("CA", "C", Point3::origin()).unwrap_err();
        assert_eq!(err, ModelError::NoOpenResidue);
    }

    #[test]
    fn bond_to_missing_atom_is_rejected() {
        let mut b = StructureBuilder::new();
        b.entity("1", "polymer");
        b.chain("A").unwrap();
        b.residue(1, "ALA").unwrap();
        b.atom("CA", "C", Point3::origin()).unwrap();
        assert!(matches!(
            b.bond(0, 5, 1),
            Err(ModelError::BondAtomOutOfRange(5, 1))
        ));
    }

    #[test]
    fn mismatched_property_column_is_rejected_at_build() {
        let mut b = StructureBuilder::new();
        b.entity("1", "polymer");
        b.chain("A").unwrap();
        b.residue(1, "ALA").unwrap();
        b.atom("CA", "C", Point3::origin()).unwrap();
        b.property("charge", PropertyColumn::Float(vec![0.1, 0.2]));
        assert!(matches!(
            b.build(),
            Err(ModelError::PropertyLength { .. })
        ));
    }
}
