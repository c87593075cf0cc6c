use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan",
    version,
    about = "contactdiff - Compare residue contact networks of ligand-bound and ligand-free simulation ensembles.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare contact occupancy between a bound and an unbound ensemble.
    Compare(CompareArgs),
    /// Summarize the chains and residues of a structure and preview a selection.
    Inspect(InspectArgs),
}

/// Significance policies selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyName {
    LongRange,
    HotResidueLocal,
    UnionOccupancy,
}

/// Arguments for the `compare` subcommand.
#[derive(Args, Debug)]
pub struct CompareArgs {
    // --- Core Arguments ---
    /// Multi-model PDB file of the ligand-bound ensemble.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub bound: PathBuf,

    /// Multi-model PDB file of the ligand-free ensemble.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub unbound: PathBuf,

    /// Directory receiving the result tables.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Selection Overrides ---
    /// Chain indices kept from the bound structure (comma-separated, zero-based).
    #[arg(long, value_name = "IDX", value_delimiter = ',')]
    pub bound_chains: Option<Vec<usize>>,

    /// Chain indices kept from the unbound structure (comma-separated, zero-based).
    #[arg(long, value_name = "IDX", value_delimiter = ',')]
    pub unbound_chains: Option<Vec<usize>>,

    /// Keep non-protein residues (solvent, ions, ligands) in both selections.
    #[arg(long)]
    pub all_residues: bool,

    // --- Analysis Overrides ---
    /// Override the contact distance cutoff, in nanometers.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Significance policies to evaluate. Can be used multiple times.
    #[arg(short, long = "policy", value_enum, value_name = "POLICY")]
    pub policies: Vec<PolicyName>,

    /// Override the occupancy-difference threshold of every selected policy.
    #[arg(short, long, value_name = "FLOAT")]
    pub threshold: Option<f64>,

    /// Override `communicability.enabled` from the config file.
    #[command(flatten)]
    pub communicability: CommunicabilityToggle,

    /// Override `clustering.enabled` from the config file.
    #[command(flatten)]
    pub clustering: ClusteringToggle,

    /// Residue sequence-number range for atom contact transitions, e.g. 52-77.
    /// Can be used multiple times; enables the transition analysis.
    #[arg(long = "transition-range", value_name = "START-END", value_parser = parse_range)]
    pub transition_ranges: Vec<(isize, isize)>,

    /// Frame used as the reference structure of each ensemble for transitions.
    #[arg(long, value_name = "INT")]
    pub reference_frame: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S clustering.n-clusters=3
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct CommunicabilityToggle {
    /// Force computation of the communicability matrices.
    #[arg(long)]
    pub communicability: bool,
    /// Skip the communicability matrices.
    #[arg(long)]
    pub no_communicability: bool,
}

#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct ClusteringToggle {
    /// Force clustering of hot residues.
    #[arg(long)]
    pub clustering: bool,
    /// Skip clustering.
    #[arg(long)]
    pub no_clustering: bool,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Structure file to summarize (PDB, optionally multi-model).
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Chain indices to preview as a selection (comma-separated, zero-based).
    #[arg(long, value_name = "IDX", value_delimiter = ',')]
    pub chains: Option<Vec<usize>>,

    /// Keep non-protein residues in the selection preview.
    #[arg(long)]
    pub all_residues: bool,
}

pub fn parse_range(value: &str) -> Result<(isize, isize), String> {
    let (start, end) = value
        .split_once('-')
        .filter(|(start, _)| !start.is_empty())
        .ok_or_else(|| format!("expected START-END, got '{}'", value))?;
    let start: isize = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid range start in '{}'", value))?;
    let end: isize = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid range end in '{}'", value))?;
    if start > end {
        return Err(format!("range '{}' has its start after its end", value));
    }
    Ok((start, end))
}
