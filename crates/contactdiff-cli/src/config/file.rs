use crate::error::{CliError, Result};
use contactdiff::engine::config as core_config;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileSelection {
    pub chains: Option<Vec<usize>>,
    #[serde(rename = "protein-only")]
    pub protein_only: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileSelectionConfig {
    pub bound: Option<FileSelection>,
    pub unbound: Option<FileSelection>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileContactConfig {
    pub cutoff: Option<f64>,
}

/// A significance policy entry; omitted parameters take the policy's defaults.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum FilePolicy {
    LongRange {
        threshold: Option<f64>,
        min_separation: Option<usize>,
    },
    HotResidueLocal {
        threshold: Option<f64>,
        max_distance: Option<usize>,
        percentile: Option<f64>,
    },
    UnionOccupancy {
        threshold: Option<f64>,
        sequence_gap_exclusion: Option<isize>,
    },
}

impl From<FilePolicy> for core_config::SignificancePolicy {
    fn from(p: FilePolicy) -> Self {
        match p {
            FilePolicy::LongRange {
                threshold,
                min_separation,
            } => Self::LongRange {
                threshold: threshold.unwrap_or(core_config::DEFAULT_SIGNIFICANCE_THRESHOLD),
                min_separation: min_separation.unwrap_or(core_config::DEFAULT_MIN_SEPARATION),
            },
            FilePolicy::HotResidueLocal {
                threshold,
                max_distance,
                percentile,
            } => Self::HotResidueLocal {
                threshold: threshold.unwrap_or(core_config::DEFAULT_SIGNIFICANCE_THRESHOLD),
                max_distance: max_distance.unwrap_or(core_config::DEFAULT_MAX_LOCAL_DISTANCE),
                percentile: percentile.unwrap_or(core_config::DEFAULT_HOT_PERCENTILE),
            },
            FilePolicy::UnionOccupancy {
                threshold,
                sequence_gap_exclusion,
            } => Self::UnionOccupancy {
                threshold: threshold.unwrap_or(core_config::DEFAULT_SIGNIFICANCE_THRESHOLD),
                sequence_gap_exclusion,
            },
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileCommunicabilityConfig {
    pub enabled: Option<bool>,
    pub threshold: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileClusteringConfig {
    pub enabled: Option<bool>,
    #[serde(rename = "n-clusters")]
    pub n_clusters: Option<usize>,
    pub percentile: Option<f64>,
    pub seed: Option<u64>,
    pub restarts: Option<usize>,
    #[serde(rename = "max-iterations")]
    pub max_iterations: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileTransitionConfig {
    pub ranges: Option<Vec<(isize, isize)>>,
    #[serde(rename = "reference-frame")]
    pub reference_frame: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub contact: Option<FileContactConfig>,
    pub selection: Option<FileSelectionConfig>,
    pub policies: Option<Vec<FilePolicy>>,
    pub communicability: Option<FileCommunicabilityConfig>,
    pub clustering: Option<FileClusteringConfig>,
    pub transitions: Option<FileTransitionConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
