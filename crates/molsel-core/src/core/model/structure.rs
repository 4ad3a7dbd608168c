use nalgebra::Point3;
use std::collections::HashMap;
use std::ops::Range;

/// Per-atom columns of a structure.
///
/// All columns have length [`AtomTable::count`]. Atoms are stored
/// residue-major: the atoms of one residue occupy a contiguous index range.
#[derive(Debug, Clone, Default)]
pub struct AtomTable {
    pub count: usize,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// Atom name, e.g. "CA".
    pub label_atom_id: Vec<String>,
    /// Chemical element symbol, e.g. "C".
    pub type_symbol: Vec<String>,
    pub occupancy: Vec<f64>,
    pub b_iso: Vec<f64>,
    /// Index of the parent residue.
    pub residue_index: Vec<usize>,
}

/// Per-residue columns plus the contiguous atom range of each residue.
#[derive(Debug, Clone, Default)]
pub struct ResidueTable {
    pub count: usize,
    /// `count + 1` entries; residue `r` owns atoms `atom_offset[r]..atom_offset[r + 1]`.
    pub atom_offset: Vec<usize>,
    pub auth_seq_id: Vec<i64>,
    pub label_seq_id: Vec<i64>,
    pub auth_comp_id: Vec<String>,
    pub label_comp_id: Vec<String>,
    pub chain_index: Vec<usize>,
}

/// Per-chain columns plus the contiguous residue range of each chain.
#[derive(Debug, Clone, Default)]
pub struct ChainTable {
    pub count: usize,
    /// `count + 1` entries.
    pub residue_offset: Vec<usize>,
    pub auth_asym_id: Vec<String>,
    pub label_asym_id: Vec<String>,
    pub entity_index: Vec<usize>,
}

/// Per-entity columns plus the contiguous chain range of each entity.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    pub count: usize,
    /// `count + 1` entries.
    pub chain_offset: Vec<usize>,
    pub id: Vec<String>,
    /// mmCIF entity type, e.g. "polymer", "water".
    pub entity_type: Vec<String>,
}

/// Covalent bond list with a CSR adjacency index.
#[derive(Debug, Clone, Default)]
pub struct BondTable {
    pub atom_a: Vec<usize>,
    pub atom_b: Vec<usize>,
    pub order: Vec<u8>,
    /// `atom_count + 1` entries into [`BondTable::adjacency`].
    adjacency_offset: Vec<usize>,
    /// `(neighbor atom, bond index)` pairs, grouped per atom.
    adjacency: Vec<(usize, usize)>,
}

impl BondTable {
    pub fn new(atom_count: usize, atom_a: Vec<usize>, atom_b: Vec<usize>, order: Vec<u8>) -> Self {
        let mut degree = vec![0usize; atom_count];
        for (&a, &b) in atom_a.iter().zip(&atom_b) {
            degree[a] += 1;
            degree[b] += 1;
        }
        let mut adjacency_offset = Vec::with_capacity(atom_count + 1);
        let mut total = 0;
        adjacency_offset.push(0);
        for d in &degree {
            total += d;
            adjacency_offset.push(total);
        }
        let mut fill = vec![0usize; atom_count];
        let mut adjacency = vec![(0usize, 0usize); total];
        for (bond, (&a, &b)) in atom_a.iter().zip(&atom_b).enumerate() {
            adjacency[adjacency_offset[a] + fill[a]] = (b, bond);
            fill[a] += 1;
            adjacency[adjacency_offset[b] + fill[b]] = (a, bond);
            fill[b] += 1;
        }
        BondTable {
            atom_a,
            atom_b,
            order,
            adjacency_offset,
            adjacency,
        }
    }

    pub fn len(&self) -> usize {
        self.atom_a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atom_a.is_empty()
    }

    /// `(neighbor atom, bond index)` pairs of `atom`.
    pub fn neighbors(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[self.adjacency_offset[atom]..self.adjacency_offset[atom + 1]]
    }
}

/// A named per-atom property column.
#[derive(Debug, Clone)]
pub enum PropertyColumn {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl PropertyColumn {
    pub fn len(&self) -> usize {
        match self {
            PropertyColumn::Int(v) => v.len(),
            PropertyColumn::Float(v) => v.len(),
            PropertyColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An immutable, columnar molecular structure.
///
/// The hierarchy entity > chain > residue > atom is encoded through offset
/// arrays: each level stores, per element, the contiguous index range it owns
/// at the level below. The query engine only ever reads this model; all
/// construction goes through the builder.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    pub atoms: AtomTable,
    pub residues: ResidueTable,
    pub chains: ChainTable,
    pub entities: EntityTable,
    bonds: Option<BondTable>,
    properties: HashMap<String, PropertyColumn>,
}

impl Structure {
    pub(crate) fn new(
        atoms: AtomTable,
        residues: ResidueTable,
        chains: ChainTable,
        entities: EntityTable,
        bonds: Option<BondTable>,
        properties: HashMap<String, PropertyColumn>,
    ) -> Self {
        Structure {
            atoms,
            residues,
            chains,
            entities,
            bonds,
            properties,
        }
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.count
    }

    pub fn position(&self, atom: usize) -> Point3<f64> {
        Point3::new(self.atoms.x[atom], self.atoms.y[atom], self.atoms.z[atom])
    }

    pub fn chain_range(&self, entity: usize) -> Range<usize> {
        self.entities.chain_offset[entity]..self.entities.chain_offset[entity + 1]
    }

    pub fn residue_range(&self, chain: usize) -> Range<usize> {
        self.chains.residue_offset[chain]..self.chains.residue_offset[chain + 1]
    }

    pub fn atom_range(&self, residue: usize) -> Range<usize> {
        self.residues.atom_offset[residue]..self.residues.atom_offset[residue + 1]
    }

    pub fn residue_of_atom(&self, atom: usize) -> usize {
        self.atoms.residue_index[atom]
    }

    pub fn chain_of_residue(&self, residue: usize) -> usize {
        self.residues.chain_index[residue]
    }

    pub fn entity_of_chain(&self, chain: usize) -> usize {
        self.chains.entity_index[chain]
    }

    pub fn bonds(&self) -> Option<&BondTable> {
        self.bonds.as_ref()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyColumn> {
        self.properties.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bond_table_adjacency_is_symmetric() {
        // Triangle 0-1-2.
        let bonds = BondTable::new(3, vec![0, 1, 2], vec![1, 2, 0], vec![1, 1, 1]);
        assert_eq!(bonds.len(), 3);
        let mut n0: Vec<usize> = bonds.neighbors(0).iter().map(|&(n, _)| n).collect();
        n0.sort_unstable();
        assert_eq!(n0, vec![1, 2]);
        let bond_of = |a: usize, b: usize| {
            bonds
                .neighbors(a)
                .iter()
                .find(|&&(n, _)| n == b)
                .map(|&(_, i)| i)
        };
        assert_eq!(bond_of(0, 1), bond_of(1, 0));
    }

    #[test]
    fn bond_table_handles_isolated_atoms() {
        let bonds = BondTable::new(4, vec![0], vec![1], vec![1]);
        assert!(bonds.neighbors(2).is_empty());
        assert!(bonds.neighbors(3).is_empty());
    }
}
