use super::compare::ComparisonResult;
use crate::engine::correspondence::ResidueCorrespondence;
use crate::engine::tasks::clustering::ClusterAssignment;
use crate::engine::tasks::difference::SignificantPair;
use crate::engine::tasks::occupancy::{OccupancyMap, ResiduePair};
use crate::engine::tasks::transitions::AtomContactChange;
use nalgebra::DMatrix;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write table: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Stream(#[from] io::Error),
}

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer)
}

#[derive(Serialize)]
struct SignificantPairRow<'a> {
    #[serde(rename = "Index1")]
    index_1: usize,
    #[serde(rename = "Index2")]
    index_2: usize,
    #[serde(rename = "Delta")]
    delta: String,
    #[serde(rename = "Label1")]
    label_1: &'a str,
    #[serde(rename = "Label2")]
    label_2: &'a str,
    #[serde(rename = "SignedDelta")]
    signed_delta: String,
    #[serde(rename = "OccupancyBound")]
    occupancy_bound: String,
    #[serde(rename = "OccupancyUnbound")]
    occupancy_unbound: String,
}

/// Ranked pair list, tab-separated, in the order given.
pub fn write_significant_pairs<W: Write>(
    writer: W,
    pairs: &[SignificantPair],
) -> Result<(), TableError> {
    let mut wtr = tsv_writer(writer);
    if pairs.is_empty() {
        wtr.write_record([
            "Index1",
            "Index2",
            "Delta",
            "Label1",
            "Label2",
            "SignedDelta",
            "OccupancyBound",
            "OccupancyUnbound",
        ])?;
    }
    for pair in pairs {
        wtr.serialize(SignificantPairRow {
            index_1: pair.index_i,
            index_2: pair.index_j,
            delta: format!("{:.3}", pair.delta),
            label_1: &pair.label_i,
            label_2: &pair.label_j,
            signed_delta: format!("{:.3}", pair.signed_delta),
            occupancy_bound: format!("{:.3}", pair.occupancy_bound),
            occupancy_unbound: format!("{:.3}", pair.occupancy_unbound),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Dense matrix as comma-separated rows with six decimals and no header.
pub fn write_matrix<W: Write>(writer: W, matrix: &DMatrix<f64>) -> Result<(), TableError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for row in matrix.row_iter() {
        wtr.write_record(row.iter().map(|v| format!("{:.6}", v)))?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct OccupancyRow<'a> {
    #[serde(rename = "Index1")]
    index_1: usize,
    #[serde(rename = "Index2")]
    index_2: usize,
    #[serde(rename = "Label1")]
    label_1: &'a str,
    #[serde(rename = "Label2")]
    label_2: &'a str,
    #[serde(rename = "OccupancyBound")]
    occupancy_bound: String,
    #[serde(rename = "OccupancyUnbound")]
    occupancy_unbound: String,
}

/// Every pair with non-zero occupancy in either condition, in ascending pair order.
pub fn write_occupancy<W: Write>(
    writer: W,
    occ_bound: &OccupancyMap,
    occ_unbound: &OccupancyMap,
    correspondence: &ResidueCorrespondence,
) -> Result<(), TableError> {
    let pairs: BTreeSet<ResiduePair> = occ_bound
        .iter()
        .chain(occ_unbound.iter())
        .map(|(pair, _)| pair)
        .collect();

    let mut wtr = tsv_writer(writer);
    if pairs.is_empty() {
        wtr.write_record([
            "Index1",
            "Index2",
            "Label1",
            "Label2",
            "OccupancyBound",
            "OccupancyUnbound",
        ])?;
    }
    for pair in pairs {
        wtr.serialize(OccupancyRow {
            index_1: pair.i(),
            index_2: pair.j(),
            label_1: correspondence.label(pair.i()).unwrap_or_default(),
            label_2: correspondence.label(pair.j()).unwrap_or_default(),
            occupancy_bound: format!("{:.6}", occ_bound.get_pair(pair)),
            occupancy_unbound: format!("{:.6}", occ_unbound.get_pair(pair)),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// One line per matched residue: `"{index}: Chain {chain}, ResSeq {seq}"`.
pub fn write_matched_residues<W: Write>(
    mut writer: W,
    correspondence: &ResidueCorrespondence,
) -> Result<(), TableError> {
    for (index, key) in correspondence.keys().iter().enumerate() {
        writeln!(writer, "{}: {}", index, key)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ClusterRow<'a> {
    #[serde(rename = "Index")]
    index: usize,
    #[serde(rename = "Label")]
    label: &'a str,
    #[serde(rename = "Cluster")]
    cluster: usize,
    #[serde(rename = "PC1")]
    pc1: String,
    #[serde(rename = "PC2")]
    pc2: String,
}

pub fn write_clusters<W: Write>(
    writer: W,
    assignment: &ClusterAssignment,
    correspondence: &ResidueCorrespondence,
) -> Result<(), TableError> {
    let mut wtr = tsv_writer(writer);
    if assignment.is_empty() {
        wtr.write_record(["Index", "Label", "Cluster", "PC1", "PC2"])?;
    }
    for (row, (&index, &cluster)) in assignment
        .indices
        .iter()
        .zip(&assignment.labels)
        .enumerate()
    {
        wtr.serialize(ClusterRow {
            index,
            label: correspondence.label(index).unwrap_or_default(),
            cluster,
            pc1: format!("{:.6}", assignment.embedding[(row, 0)]),
            pc2: format!("{:.6}", assignment.embedding[(row, 1)]),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct TransitionRow<'a> {
    #[serde(rename = "Kind")]
    kind: &'static str,
    #[serde(rename = "Index1")]
    index_1: usize,
    #[serde(rename = "Label1")]
    label_1: &'a str,
    #[serde(rename = "Atom1")]
    atom_1: &'a str,
    #[serde(rename = "Index2")]
    index_2: usize,
    #[serde(rename = "Label2")]
    label_2: &'a str,
    #[serde(rename = "Atom2")]
    atom_2: &'a str,
    #[serde(rename = "DistanceBound")]
    distance_bound: String,
    #[serde(rename = "DistanceUnbound")]
    distance_unbound: String,
}

pub fn write_transitions<W: Write>(
    writer: W,
    changes: &[AtomContactChange],
) -> Result<(), TableError> {
    let mut wtr = tsv_writer(writer);
    if changes.is_empty() {
        wtr.write_record([
            "Kind",
            "Index1",
            "Label1",
            "Atom1",
            "Index2",
            "Label2",
            "Atom2",
            "DistanceBound",
            "DistanceUnbound",
        ])?;
    }
    for change in changes {
        wtr.serialize(TransitionRow {
            kind: change.kind.as_str(),
            index_1: change.residue_i,
            label_1: &change.label_i,
            atom_1: &change.atom_i,
            index_2: change.residue_j,
            label_2: &change.label_j,
            atom_2: &change.atom_j,
            distance_bound: format!("{:.3}", change.distance_bound),
            distance_unbound: format!("{:.3}", change.distance_unbound),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>, TableError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })
}

/// Writes every table of a comparison into `dir` and returns the paths written.
pub fn write_all(result: &ComparisonResult, dir: &Path) -> Result<Vec<PathBuf>, TableError> {
    fs::create_dir_all(dir).map_err(|source| TableError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    let mut written = Vec::new();
    let correspondence = &result.correspondence;

    let path = dir.join("matched_residues.txt");
    write_matched_residues(create(&path)?, correspondence)?;
    written.push(path);

    let path = dir.join("occupancy.tsv");
    write_occupancy(
        create(&path)?,
        &result.occupancy_bound,
        &result.occupancy_unbound,
        correspondence,
    )?;
    written.push(path);

    let path = dir.join("difference_matrix.csv");
    write_matrix(create(&path)?, result.difference.as_matrix())?;
    written.push(path);

    // Several policies of one kind may be configured; the position keeps their files apart.
    for (position, policy_result) in result.significant.iter().enumerate() {
        let path = dir.join(format!(
            "significant_{}_{}.tsv",
            position + 1,
            policy_result.policy.name()
        ));
        write_significant_pairs(create(&path)?, &policy_result.pairs)?;
        written.push(path);
    }

    if let Some(comm) = &result.communicability {
        for (name, matrix) in [("bound", &comm.bound), ("unbound", &comm.unbound)] {
            let path = dir.join(format!("communicability_{}.csv", name));
            write_matrix(create(&path)?, matrix.as_matrix())?;
            written.push(path);
        }
    }

    if let Some(assignment) = &result.clustering {
        let path = dir.join("clusters.tsv");
        write_clusters(create(&path)?, assignment, correspondence)?;
        written.push(path);
    }

    if let Some(changes) = &result.transitions {
        let path = dir.join("contact_transitions.tsv");
        write_transitions(create(&path)?, changes)?;
        written.push(path);
    }

    info!(
        files = written.len(),
        directory = %dir.display(),
        "Result tables written."
    );
    Ok(written)
}
