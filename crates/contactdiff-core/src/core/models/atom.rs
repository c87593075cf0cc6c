use crate::core::utils::identifiers::is_hydrogen_symbol;

/// An atom of a topology.
///
/// Atoms carry no coordinates; positions live in a coordinate provider and are
/// addressed through [`Atom::index`], the atom's position in the topology's flat atom array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    /// Position within the owning topology's flat atom array.
    pub index: usize,
    /// Serial number from the source file, kept for reporting.
    pub serial: usize,
    /// The name of the atom (e.g., "CA", "N", "OG1").
    pub name: String,
    /// Element symbol (e.g., "C", "H").
    pub element: String,
    /// Index of the parent residue in the owning topology.
    pub residue_index: usize,
}

impl Atom {
    pub fn new(index: usize, serial: usize, name: &str, element: &str, residue_index: usize) -> Self {
        Self {
            index,
            serial,
            name: name.to_string(),
            element: element.to_string(),
            residue_index,
        }
    }

    /// Hydrogens are excluded from all contact geometry.
    pub fn is_hydrogen(&self) -> bool {
        is_hydrogen_symbol(&self.element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_stores_all_fields() {
        let atom = Atom::new(3, 17, "CA", "C", 1);
        assert_eq!(atom.index, 3);
        assert_eq!(atom.serial, 17);
        assert_eq!(atom.name, "CA");
        assert_eq!(atom.element, "C");
        assert_eq!(atom.residue_index, 1);
    }

    #[test]
    fn hydrogen_detection_uses_element_symbol_not_name() {
        assert!(Atom::new(0, 1, "HA", "H", 0).is_hydrogen());
        assert!(!Atom::new(1, 2, "HG", "Hg", 0).is_hydrogen());
        assert!(!Atom::new(2, 3, "CB", "C", 0).is_hydrogen());
    }
}
