use crate::core::io::traits::StructureFile;
use crate::core::models::builder::{TopologyBuildError, TopologyBuilder};
use crate::core::models::topology::Topology;
use crate::core::models::trajectory::Trajectory;
use crate::core::utils::identifiers::infer_element_from_name;
use nalgebra::Point3;
use std::io::{self, BufRead};
use thiserror::Error;

/// PDB coordinates are in Angstroms; the engine works in nanometers.
const ANGSTROM_TO_NANOMETER: f64 = 0.1;

/// Coordinates end at column 54; anything shorter cannot be an atom record.
const MIN_ATOM_RECORD_LEN: usize = 54;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Topology construction failed on line {line}: {source}")]
    Topology {
        line: usize,
        #[source]
        source: TopologyBuildError,
    },
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

#[derive(Debug)]
struct AtomRecord {
    serial: Option<usize>,
    name: String,
    residue_name: String,
    chain_id: char,
    sequence_number: isize,
    insertion_code: char,
    element: String,
    position: Point3<f64>,
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_atom_record(line: &str, line_num: usize) -> Result<AtomRecord, PdbError> {
    if line.len() < MIN_ATOM_RECORD_LEN {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::LineTooShort,
        });
    }

    let name = slice_and_trim(line, 12, 16);
    if name.is_empty() {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::MissingRequiredField {
                columns: "13-16".into(),
            },
        });
    }

    // Large systems overflow the serial field ("*****"); the atom order is what matters.
    let serial = slice_and_trim(line, 6, 11).parse().ok();

    let res_seq_str = slice_and_trim(line, 22, 26);
    let sequence_number: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: "23-26".into(),
            value: res_seq_str.into(),
        },
    })?;

    let x = parse_float(line, line_num, 30, 38)?;
    let y = parse_float(line, line_num, 38, 46)?;
    let z = parse_float(line, line_num, 46, 54)?;

    let element = match slice_and_trim(line, 76, 78) {
        "" => infer_element_from_name(name),
        symbol => symbol.to_string(),
    };

    Ok(AtomRecord {
        serial,
        name: name.to_string(),
        residue_name: slice_and_trim(line, 17, 20).to_string(),
        chain_id: slice_and_trim(line, 21, 22).chars().next().unwrap_or(' '),
        sequence_number,
        insertion_code: line.get(26..27).and_then(|c| c.chars().next()).unwrap_or(' '),
        element,
        position: Point3::new(x, y, z) * ANGSTROM_TO_NANOMETER,
    })
}

/// Multi-model PDB reader.
///
/// Every `MODEL`/`ENDMDL` block is one frame; a file without `MODEL` records is a single
/// frame. The first model defines the topology and later models must list the same
/// atoms in the same order. A `TER` record closes the current chain even when the next
/// chain reuses its identifier.
pub struct PdbFile;

impl StructureFile for PdbFile {
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Topology, Trajectory), Self::Error> {
        let mut builder = TopologyBuilder::new();
        let mut frames: Vec<Vec<Point3<f64>>> = Vec::new();
        let mut current_frame: Vec<Point3<f64>> = Vec::new();

        let mut topology_complete = false;
        let mut in_model = false;
        let mut chain_terminated = false;
        let mut current_chain: Option<char> = None;
        let mut current_residue: Option<(isize, char, String)> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            // Bare `TER`/`END` lines are shorter than the record-name field.
            let record_name = line.get(0..6).unwrap_or(line.as_str()).trim();
            match record_name {
                "MODEL" => {
                    if in_model {
                        return Err(PdbError::Inconsistency(format!(
                            "MODEL on line {} opened before the previous ENDMDL",
                            line_num
                        )));
                    }
                    in_model = true;
                }
                "ENDMDL" => {
                    if !in_model {
                        return Err(PdbError::Inconsistency(format!(
                            "ENDMDL on line {} without a matching MODEL",
                            line_num
                        )));
                    }
                    close_frame(&mut frames, &mut current_frame)?;
                    in_model = false;
                    topology_complete = true;
                }
                "TER" => chain_terminated = true,
                "ATOM" | "HETATM" => {
                    let record = parse_atom_record(&line, line_num)?;
                    if !topology_complete {
                        if chain_terminated || current_chain != Some(record.chain_id) {
                            builder.start_chain(record.chain_id);
                            current_chain = Some(record.chain_id);
                            current_residue = None;
                            chain_terminated = false;
                        }
                        let residue_id = (
                            record.sequence_number,
                            record.insertion_code,
                            record.residue_name.clone(),
                        );
                        if current_residue.as_ref() != Some(&residue_id) {
                            builder
                                .end_residue()
                                .start_residue(record.sequence_number, &record.residue_name)
                                .map_err(|source| PdbError::Topology {
                                    line: line_num,
                                    source,
                                })?;
                            current_residue = Some(residue_id);
                        }
                        let serial = record.serial.unwrap_or(current_frame.len() + 1);
                        builder
                            .add_atom(serial, &record.name, &record.element)
                            .map_err(|source| PdbError::Topology {
                                line: line_num,
                                source,
                            })?;
                    }
                    current_frame.push(record.position);
                }
                "END" => break,
                _ => {}
            }
        }

        if !current_frame.is_empty() {
            close_frame(&mut frames, &mut current_frame)?;
        }

        let topology = builder.build();
        if topology.atom_count() == 0 {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }

        let trajectory = Trajectory::from_frames(topology.atom_count(), frames)
            .map_err(|e| PdbError::Inconsistency(e.to_string()))?;
        Ok((topology, trajectory))
    }
}

fn close_frame(
    frames: &mut Vec<Vec<Point3<f64>>>,
    current_frame: &mut Vec<Point3<f64>>,
) -> Result<(), PdbError> {
    if let Some(first) = frames.first() {
        if first.len() != current_frame.len() {
            return Err(PdbError::Inconsistency(format!(
                "Model {} has {} atoms, expected {}",
                frames.len() + 1,
                current_frame.len(),
                first.len()
            )));
        }
    }
    frames.push(std::mem::take(current_frame));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::trajectory::CoordinateProvider;
    use std::io::{Cursor, Write};

    #[allow(clippy::too_many_arguments)]
    fn atom_line(
        serial: usize,
        name: &str,
        res_name: &str,
        chain: char,
        res_seq: isize,
        x: f64,
        y: f64,
        z: f64,
        element: &str,
    ) -> String {
        format!(
            "{:<6}{:>5} {:<4} {:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
            "ATOM", serial, name, res_name, chain, res_seq, x, y, z, 1.0, 0.0, element
        )
    }

    fn read(content: &str) -> Result<(Topology, Trajectory), PdbError> {
        let mut cursor = Cursor::new(content.as_bytes());
        PdbFile::read_from(&mut cursor)
    }

    fn two_model_pdb() -> String {
        let mut lines = Vec::new();
        for (model, shift) in [(1, 0.0), (2, 10.0)] {
            lines.push(format!("MODEL     {:>4}", model));
            lines.push(atom_line(1, "N", "ALA", 'A', 1, shift, 0.0, 0.0, "N"));
            lines.push(atom_line(2, "H", "ALA", 'A', 1, 1.0, 0.0, 0.0, "H"));
            lines.push(atom_line(3, "CA", "ALA", 'A', 1, 2.0, 0.0, 0.0, "C"));
            lines.push(atom_line(4, "N", "GLY", 'A', 2, 3.0, 0.0, 0.0, "N"));
            lines.push("TER".to_string());
            lines.push(atom_line(5, "O", "HOH", 'A', 1, 4.0, 0.0, 0.0, ""));
            lines.push("ENDMDL".to_string());
        }
        lines.push("END".to_string());
        lines.join("\n")
    }

    #[test]
    fn reads_topology_from_first_model_and_all_frames() {
        let (topology, trajectory) = read(&two_model_pdb()).unwrap();

        assert_eq!(topology.atom_count(), 5);
        assert_eq!(topology.residue_count(), 3);
        assert_eq!(trajectory.frame_count(), 2);
        assert_eq!(trajectory.atom_count(), 5);

        let first = &topology.residues()[0];
        assert_eq!(first.name, "ALA");
        assert_eq!(first.sequence_number, 1);
        assert_eq!(first.atoms(), &[0, 1, 2]);
        assert!(topology.atoms()[1].is_hydrogen());
    }

    #[test]
    fn ter_record_starts_new_chain_even_with_same_identifier() {
        let (topology, _) = read(&two_model_pdb()).unwrap();
        assert_eq!(topology.chain_count(), 2);
        assert_eq!(topology.chains()[0].id, 'A');
        assert_eq!(topology.chains()[1].id, 'A');
        assert_eq!(topology.residues()[2].chain_index, 1);
        assert_eq!(topology.residues()[2].sequence_number, 1);
    }

    #[test]
    fn water_after_bare_ter_stays_out_of_protein_residue() {
        let content = [
            atom_line(1, "CA", "ALA", 'A', 1, 0.0, 0.0, 0.0, "C"),
            "TER".to_string(),
            atom_line(2, "OW", "HOH", 'A', 1, 3.0, 0.0, 0.0, "O"),
            "END".to_string(),
        ]
        .join("\n");
        let (topology, _) = read(&content).unwrap();

        assert_eq!(topology.chain_count(), 2);
        assert_eq!(topology.residue_count(), 2);
        assert_eq!(topology.residues()[0].name, "ALA");
        assert_eq!(topology.residues()[0].atoms(), &[0]);
        assert_eq!(topology.residues()[1].name, "HOH");

        let protein = topology.select(None, true);
        assert_eq!(protein.topology.atom_count(), 1);
        assert_eq!(protein.atom_map, vec![0]);
    }

    #[test]
    fn bare_end_stops_reading() {
        let content = [
            atom_line(1, "CA", "ALA", 'A', 1, 0.0, 0.0, 0.0, "C"),
            "END".to_string(),
            atom_line(2, "CA", "GLY", 'A', 2, 3.0, 0.0, 0.0, "C"),
        ]
        .join("\n");
        let (topology, trajectory) = read(&content).unwrap();
        assert_eq!(topology.atom_count(), 1);
        assert_eq!(trajectory.atom_count(), 1);
    }

    #[test]
    fn shared_sequence_number_with_different_names_gives_two_residues() {
        let content = [
            atom_line(1, "CA", "ALA", ' ', 9999, 0.0, 0.0, 0.0, "C"),
            atom_line(2, "CA", "LYS", ' ', 1, 3.0, 0.0, 0.0, "C"),
            atom_line(3, "OW", "SOL", ' ', 1, 6.0, 0.0, 0.0, "O"),
            atom_line(4, "HW1", "SOL", ' ', 1, 6.5, 0.0, 0.0, "H"),
        ]
        .join("\n");
        let (topology, _) = read(&content).unwrap();

        assert_eq!(topology.chain_count(), 1);
        assert_eq!(topology.residue_count(), 3);
        assert_eq!(topology.residues()[1].name, "LYS");
        assert_eq!(topology.residues()[1].atoms(), &[1]);
        assert_eq!(topology.residues()[2].name, "SOL");
        assert_eq!(topology.residues()[2].atoms(), &[2, 3]);
    }

    #[test]
    fn insertion_code_separates_residues() {
        let mut inserted = atom_line(2, "CA", "GLY", 'A', 52, 3.0, 0.0, 0.0, "C");
        inserted.replace_range(26..27, "A");
        let content = [
            atom_line(1, "CA", "GLY", 'A', 52, 0.0, 0.0, 0.0, "C"),
            inserted,
        ]
        .join("\n");
        let (topology, _) = read(&content).unwrap();

        assert_eq!(topology.residue_count(), 2);
        assert_eq!(topology.residues()[0].atoms(), &[0]);
        assert_eq!(topology.residues()[1].atoms(), &[1]);
    }

    #[test]
    fn coordinates_are_converted_to_nanometers() {
        let (_, trajectory) = read(&two_model_pdb()).unwrap();
        let p0 = trajectory.position(0, 2).unwrap();
        let p1 = trajectory.position(1, 0).unwrap();
        assert!((p0.x - 0.2).abs() < 1e-12);
        assert!((p1.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_element_column_is_inferred_from_atom_name() {
        let (topology, _) = read(&two_model_pdb()).unwrap();
        assert_eq!(topology.atoms()[4].element, "O");
    }

    #[test]
    fn file_without_model_records_is_a_single_frame() {
        let content = [
            atom_line(1, "CA", "LYS", 'B', 7, 0.0, 0.0, 0.0, "C"),
            atom_line(2, "CB", "LYS", 'B', 7, 1.5, 0.0, 0.0, "C"),
        ]
        .join("\n");
        let (topology, trajectory) = read(&content).unwrap();
        assert_eq!(topology.chain_count(), 1);
        assert_eq!(topology.residue_count(), 1);
        assert_eq!(trajectory.frame_count(), 1);
    }

    #[test]
    fn model_with_different_atom_count_is_rejected() {
        let content = [
            "MODEL        1".to_string(),
            atom_line(1, "CA", "LYS", 'A', 1, 0.0, 0.0, 0.0, "C"),
            atom_line(2, "CB", "LYS", 'A', 1, 1.0, 0.0, 0.0, "C"),
            "ENDMDL".to_string(),
            "MODEL        2".to_string(),
            atom_line(1, "CA", "LYS", 'A', 1, 0.0, 0.0, 0.0, "C"),
            "ENDMDL".to_string(),
        ]
        .join("\n");
        assert!(matches!(read(&content), Err(PdbError::Inconsistency(_))));
    }

    #[test]
    fn invalid_coordinate_reports_line_and_columns() {
        let mut line = atom_line(1, "CA", "LYS", 'A', 1, 0.0, 0.0, 0.0, "C");
        line.replace_range(30..38, "   abcde");
        match read(&line) {
            Err(PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::InvalidFloat { columns, .. },
            }) => assert_eq!(columns, "31-38"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn short_atom_line_is_rejected() {
        assert!(matches!(
            read("ATOM      1  CA  LYS A   1"),
            Err(PdbError::Parse {
                kind: PdbParseErrorKind::LineTooShort,
                ..
            })
        ));
    }

    #[test]
    fn file_without_atoms_is_rejected() {
        assert!(matches!(
            read("REMARK nothing here\nEND\n"),
            Err(PdbError::MissingRecord(_))
        ));
    }

    #[test]
    fn read_from_path_reads_file_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", two_model_pdb()).unwrap();
        let (topology, trajectory) = PdbFile::read_from_path(file.path()).unwrap();
        assert_eq!(topology.atom_count(), 5);
        assert_eq!(trajectory.frame_count(), 2);
    }
}
