use crate::cli::CompareArgs;
use crate::config::{self, AppConfig};
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use contactdiff::{
    core::io::{pdb::PdbFile, traits::StructureFile},
    core::models::{
        topology::Topology,
        trajectory::{CoordinateProvider, Trajectory},
    },
    engine::progress::ProgressReporter,
    workflows::{
        self,
        compare::{ComparisonResult, Ensemble},
    },
};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn run(args: CompareArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = config::build_config(&args)?;
    let AppConfig {
        bound_path,
        unbound_path,
        output_dir,
        core_config,
    } = app_config;

    let (bound_topology, bound_trajectory) = load_ensemble(&bound_path)?;
    let (unbound_topology, unbound_trajectory) = load_ensemble(&unbound_path)?;

    let progress_handler = CliProgressHandler::new(ui_sender.clone());
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the core comparison workflow...");
    let result = tokio::task::block_in_place(|| {
        workflows::compare::run(
            Ensemble::new(&bound_topology, &bound_trajectory),
            Ensemble::new(&unbound_topology, &unbound_trajectory),
            &core_config,
            &reporter,
        )
    })?;

    if result.correspondence.is_empty() {
        warn!("No residues matched between the two ensembles; all outputs will be empty.");
    }

    info!("Writing result tables to {:?}", &output_dir);
    let written = workflows::report::write_all(&result, &output_dir)?;

    for line in summary_lines(&result) {
        send_log(&ui_sender, line).await;
    }
    send_log(
        &ui_sender,
        format!("Wrote {} files to {}", written.len(), output_dir.display()),
    )
    .await;

    Ok(())
}

fn load_ensemble(path: &Path) -> Result<(Topology, Trajectory)> {
    info!("Loading ensemble from {:?}", path);
    let (topology, trajectory) =
        PdbFile::read_from_path(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
    info!(
        residues = topology.residue_count(),
        atoms = topology.atom_count(),
        frames = trajectory.frame_count(),
        "Loaded ensemble."
    );
    Ok((topology, trajectory))
}

async fn send_log(sender: &mpsc::Sender<UiEvent>, line: String) {
    if sender.send(UiEvent::Log(line.clone())).await.is_err() {
        println!("{}", line);
    }
}

fn summary_lines(result: &ComparisonResult) -> Vec<String> {
    let mut lines = vec![format!(
        "Matched {} residues ({} bound frames, {} unbound frames)",
        result.correspondence.len(),
        result.frames_bound,
        result.frames_unbound
    )];
    for policy_result in &result.significant {
        let top = policy_result
            .pairs
            .first()
            .map(|p| format!(", top: {} - {} (Δ {:.3})", p.label_i, p.label_j, p.delta))
            .unwrap_or_default();
        lines.push(format!(
            "{}: {} significant pairs{}",
            policy_result.policy.name(),
            policy_result.pairs.len(),
            top
        ));
    }
    if let Some(clusters) = &result.clustering {
        lines.push(format!(
            "Clustered {} hot residues (inertia {:.3})",
            clusters.indices.len(),
            clusters.inertia
        ));
    }
    if let Some(changes) = &result.transitions {
        lines.push(format!("{} atom contact transitions", changes.len()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_ensemble_wraps_parse_errors_with_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ATOM      1  CA  ALA A   1      abc").unwrap();

        match load_ensemble(file.path()) {
            Err(CliError::FileParsing { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn load_ensemble_reports_missing_files() {
        let result = load_ensemble(Path::new("/nonexistent/bound.pdb"));
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
