#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub index: usize,                  // Zero-based position of the chain in its topology
    pub id: char,                      // Chain identifier from the source file (e.g., 'A')
    pub(crate) residues: Vec<usize>,   // Ordered residue indices belonging to this chain
}

impl Chain {
    pub(crate) fn new(index: usize, id: char) -> Self {
        Self {
            index,
            id,
            residues: Vec::new(),
        }
    }

    pub fn residues(&self) -> &[usize] {
        &self.residues
    }
}
