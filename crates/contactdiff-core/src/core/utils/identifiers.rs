use phf::{Set, phf_set};

static PROTEIN_RESIDUE_NAMES: Set<&'static str> = phf_set! {
    "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE",
    "LEU", "LYS", "MET", "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL",
    // Protonation and terminal variants emitted by common MD engines
    "HID", "HIE", "HIP", "HSD", "HSE", "HSP", "CYX", "CYM", "ASH", "GLH", "LYN",
    "ACE", "NME", "NALA", "CALA", "MSE", "SEC", "PYL",
};

static HYDROGEN_SYMBOLS: Set<&'static str> = phf_set! { "H", "D" };

pub fn is_protein_residue(residue_name: &str) -> bool {
    PROTEIN_RESIDUE_NAMES.contains(residue_name.trim().to_ascii_uppercase().as_str())
}

pub fn is_hydrogen_symbol(element: &str) -> bool {
    HYDROGEN_SYMBOLS.contains(element.trim().to_ascii_uppercase().as_str())
}

/// Guesses an element symbol from a PDB-style atom name.
///
/// Leading digits are skipped (`1HB` -> `H`) and the first letter is taken as the symbol.
/// Deuterium is folded into hydrogen since both are excluded from contact geometry.
pub fn infer_element_from_name(atom_name: &str) -> String {
    let symbol = atom_name
        .trim()
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase());
    match symbol {
        Some('D') => "H".to_string(),
        Some(c) => c.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_protein_residue_recognizes_standard_amino_acids() {
        assert!(is_protein_residue("ALA"));
        assert!(is_protein_residue("GLY"));
        assert!(is_protein_residue("TRP"));
    }

    #[test]
    fn is_protein_residue_accepts_md_variants_and_is_case_insensitive() {
        assert!(is_protein_residue("HSD"));
        assert!(is_protein_residue("hie"));
        assert!(is_protein_residue(" CYX "));
    }

    #[test]
    fn is_protein_residue_rejects_solvent_ions_and_ligands() {
        assert!(!is_protein_residue("HOH"));
        assert!(!is_protein_residue("SOL"));
        assert!(!is_protein_residue("NA"));
        assert!(!is_protein_residue("LIG"));
        assert!(!is_protein_residue(""));
    }

    #[test]
    fn is_hydrogen_symbol_covers_hydrogen_and_deuterium() {
        assert!(is_hydrogen_symbol("H"));
        assert!(is_hydrogen_symbol("h"));
        assert!(is_hydrogen_symbol("D"));
        assert!(!is_hydrogen_symbol("HG"));
        assert!(!is_hydrogen_symbol("C"));
        assert!(!is_hydrogen_symbol(""));
    }

    #[test]
    fn infer_element_from_name_takes_first_letter() {
        assert_eq!(infer_element_from_name("CA"), "C");
        assert_eq!(infer_element_from_name(" OG1"), "O");
        assert_eq!(infer_element_from_name("SD"), "S");
    }

    #[test]
    fn infer_element_from_name_skips_leading_digits_and_maps_deuterium() {
        assert_eq!(infer_element_from_name("1HB"), "H");
        assert_eq!(infer_element_from_name("2HG1"), "H");
        assert_eq!(infer_element_from_name("DA"), "H");
        assert_eq!(infer_element_from_name("123"), "");
    }
}
