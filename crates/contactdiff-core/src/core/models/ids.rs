use std::fmt;

/// Identity of a residue across independently numbered topologies.
///
/// Ordering is by chain index first and then by sequence number, which is also the
/// order in which matched residues are assigned dense correspondence indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueKey {
    pub chain_index: usize,
    pub sequence_number: isize,
}

impl ResidueKey {
    pub fn new(chain_index: usize, sequence_number: isize) -> Self {
        Self {
            chain_index,
            sequence_number,
        }
    }
}

impl fmt::Display for ResidueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chain {}, ResSeq {}",
            self.chain_index, self.sequence_number
        )
    }
}
