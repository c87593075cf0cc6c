use crate::cli::InspectArgs;
use crate::error::{CliError, Result};
use contactdiff::core::io::{pdb::PdbFile, traits::StructureFile};
use contactdiff::core::models::topology::Topology;
use contactdiff::core::models::trajectory::CoordinateProvider;
use tracing::info;

pub async fn run(args: InspectArgs) -> Result<()> {
    info!("Loading structure from {:?}", &args.input);
    let (topology, trajectory) =
        PdbFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;

    if let Some(chains) = &args.chains {
        if let Some(&bad) = chains.iter().find(|&&c| c >= topology.chain_count()) {
            return Err(CliError::Argument(format!(
                "chain index {} is out of range ({} chains)",
                bad,
                topology.chain_count()
            )));
        }
    }

    println!(
        "{}: {} frames, {} atoms",
        args.input.display(),
        trajectory.frame_count(),
        topology.atom_count()
    );
    for line in chain_summary(&topology) {
        println!("{}", line);
    }
    println!(
        "{}",
        selection_summary(&topology, args.chains.as_deref(), !args.all_residues)
    );

    Ok(())
}

fn chain_summary(topology: &Topology) -> Vec<String> {
    topology
        .chains()
        .iter()
        .map(|chain| {
            let protein = chain
                .residues()
                .iter()
                .filter_map(|&idx| topology.residue(idx))
                .filter(|res| res.is_protein())
                .count();
            format!(
                "Chain {} ({}): {} residues, {} protein",
                chain.index,
                chain.id,
                chain.residues().len(),
                protein
            )
        })
        .collect()
}

fn selection_summary(topology: &Topology, chains: Option<&[usize]>, protein_only: bool) -> String {
    let slice = topology.select(chains, protein_only);
    format!(
        "Selection: {} atoms, {} residues, {} chains",
        slice.topology.atom_count(),
        slice.topology.residue_count(),
        slice.topology.chain_count()
    )
}
