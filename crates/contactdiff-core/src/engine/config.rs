use thiserror::Error;

pub const DEFAULT_CONTACT_CUTOFF_NM: f64 = 0.4;
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 0.5;
pub const DEFAULT_HOT_PERCENTILE: f64 = 75.0;
pub const DEFAULT_MIN_SEPARATION: usize = 11;
pub const DEFAULT_MAX_LOCAL_DISTANCE: usize = 10;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Requested {k} clusters but only {available} residues are available for clustering")]
    TooManyClusters { k: usize, available: usize },

    #[error(
        "Reference frame {frame} is out of range for the {condition} trajectory ({frame_count} frames)"
    )]
    FrameOutOfRange {
        frame: usize,
        condition: &'static str,
        frame_count: usize,
    },

    #[error("Residue pair ({i}, {j}) is invalid for {n} matched residues")]
    InvalidPair { i: usize, j: usize, n: usize },
}

pub(crate) fn validate_cutoff(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be a positive finite distance, got {}", value),
        })
    }
}

pub(crate) fn validate_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must lie in [0, 1], got {}", value),
        })
    }
}

pub(crate) fn validate_percentile(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must lie in [0, 100], got {}", value),
        })
    }
}

fn validate_nonzero(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidParameter {
            name,
            reason: "must be at least 1".into(),
        })
    } else {
        Ok(())
    }
}

/// Which part of a structure takes part in the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionConfig {
    /// Chain indices to keep (all chains when `None`).
    pub chains: Option<Vec<usize>>,
    /// Drop residues whose names are not amino acids (solvent, ions, ligands).
    pub protein_only: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            chains: None,
            protein_only: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactConfig {
    /// Heavy-atom distance below which two residues are in contact, in nanometers.
    pub cutoff: f64,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CONTACT_CUTOFF_NM,
        }
    }
}

/// Rule deciding which residue pairs of a difference matrix are reported.
///
/// Every policy compares `|Δ|` with its threshold strictly, treats missing occupancy as
/// zero, and ranks its pairs by descending `|Δ|` with ties broken by ascending `(i, j)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignificancePolicy {
    /// Pairs far apart in the matched-residue index space.
    LongRange {
        threshold: f64,
        min_separation: usize,
    },
    /// Nearby pairs among residues whose summed `|Δ|` is above a percentile.
    HotResidueLocal {
        threshold: f64,
        max_distance: usize,
        percentile: f64,
    },
    /// Pairs frequently in contact in at least one condition.
    UnionOccupancy {
        threshold: f64,
        /// Drop pairs whose sequence numbers differ by at most this many positions.
        sequence_gap_exclusion: Option<isize>,
    },
}

impl SignificancePolicy {
    pub fn long_range() -> Self {
        Self::LongRange {
            threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
            min_separation: DEFAULT_MIN_SEPARATION,
        }
    }

    pub fn hot_residue_local() -> Self {
        Self::HotResidueLocal {
            threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
            max_distance: DEFAULT_MAX_LOCAL_DISTANCE,
            percentile: DEFAULT_HOT_PERCENTILE,
        }
    }

    pub fn union_occupancy() -> Self {
        Self::UnionOccupancy {
            threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
            sequence_gap_exclusion: None,
        }
    }

    /// Stable kebab-case name, used for configuration keys and output file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LongRange { .. } => "long-range",
            Self::HotResidueLocal { .. } => "hot-residue-local",
            Self::UnionOccupancy { .. } => "union-occupancy",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::LongRange { threshold, .. } => validate_fraction("long-range.threshold", threshold),
            Self::HotResidueLocal {
                threshold,
                percentile,
                ..
            } => {
                validate_fraction("hot-residue-local.threshold", threshold)?;
                validate_percentile("hot-residue-local.percentile", percentile)
            }
            Self::UnionOccupancy {
                threshold,
                sequence_gap_exclusion,
            } => {
                validate_fraction("union-occupancy.threshold", threshold)?;
                match sequence_gap_exclusion {
                    Some(gap) if gap < 0 => Err(ConfigError::InvalidParameter {
                        name: "union-occupancy.sequence-gap-exclusion",
                        reason: format!("must not be negative, got {}", gap),
                    }),
                    _ => Ok(()),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommunicabilityConfig {
    /// Occupancy a pair must exceed to become an edge of the adjacency matrix.
    pub threshold: f64,
}

impl Default for CommunicabilityConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteringConfig {
    pub n_clusters: usize,
    /// Residues whose summed `|Δ|` exceeds this percentile form the clustered subset.
    pub percentile: f64,
    pub seed: u64,
    pub restarts: usize,
    pub max_iterations: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_clusters: 4,
            percentile: DEFAULT_HOT_PERCENTILE,
            seed: 42,
            restarts: 10,
            max_iterations: 300,
        }
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_nonzero("clustering.n-clusters", self.n_clusters)?;
        validate_nonzero("clustering.restarts", self.restarts)?;
        validate_nonzero("clustering.max-iterations", self.max_iterations)?;
        validate_percentile("clustering.percentile", self.percentile)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionConfig {
    /// Inclusive residue sequence-number ranges whose heavy atoms are compared.
    pub ranges: Vec<(isize, isize)>,
    /// Frame of each trajectory taken as the structure of its condition.
    pub reference_frame: usize,
}

impl TransitionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(&(start, end)) = self.ranges.iter().find(|(start, end)| start > end) {
            return Err(ConfigError::InvalidParameter {
                name: "transitions.ranges",
                reason: format!("range {}-{} has its start after its end", start, end),
            });
        }
        Ok(())
    }

    pub fn contains(&self, sequence_number: isize) -> bool {
        self.ranges
            .iter()
            .any(|&(start, end)| (start..=end).contains(&sequence_number))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub bound_selection: SelectionConfig,
    pub unbound_selection: SelectionConfig,
    pub contact: ContactConfig,
    pub policies: Vec<SignificancePolicy>,
    pub communicability: Option<CommunicabilityConfig>,
    pub clustering: Option<ClusteringConfig>,
    pub transitions: Option<TransitionConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bound_selection: SelectionConfig::default(),
            unbound_selection: SelectionConfig::default(),
            contact: ContactConfig::default(),
            policies: vec![SignificancePolicy::long_range()],
            communicability: None,
            clustering: None,
            transitions: None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_cutoff("contact.cutoff", self.contact.cutoff)?;
        for policy in &self.policies {
            policy.validate()?;
        }
        if let Some(communicability) = &self.communicability {
            validate_fraction("communicability.threshold", communicability.threshold)?;
        }
        if let Some(clustering) = &self.clustering {
            clustering.validate()?;
        }
        if let Some(transitions) = &self.transitions {
            transitions.validate()?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct AnalysisConfigBuilder {
    bound_selection: Option<SelectionConfig>,
    unbound_selection: Option<SelectionConfig>,
    cutoff: Option<f64>,
    policies: Vec<SignificancePolicy>,
    communicability: Option<CommunicabilityConfig>,
    clustering: Option<ClusteringConfig>,
    transitions: Option<TransitionConfig>,
}

impl AnalysisConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound_selection(mut self, selection: SelectionConfig) -> Self {
        self.bound_selection = Some(selection);
        self
    }
    pub fn unbound_selection(mut self, selection: SelectionConfig) -> Self {
        self.unbound_selection = Some(selection);
        self
    }
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn policy(mut self, policy: SignificancePolicy) -> Self {
        self.policies.push(policy);
        self
    }
    pub fn communicability(mut self, config: CommunicabilityConfig) -> Self {
        self.communicability = Some(config);
        self
    }
    pub fn clustering(mut self, config: ClusteringConfig) -> Self {
        self.clustering = Some(config);
        self
    }
    pub fn transitions(mut self, config: TransitionConfig) -> Self {
        self.transitions = Some(config);
        self
    }

    /// Assembles the configuration, falling back to the long-range policy when none was added.
    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let policies = if self.policies.is_empty() {
            vec![SignificancePolicy::long_range()]
        } else {
            self.policies
        };
        let config = AnalysisConfig {
            bound_selection: self.bound_selection.unwrap_or_default(),
            unbound_selection: self.unbound_selection.unwrap_or_default(),
            contact: ContactConfig {
                cutoff: self.cutoff.unwrap_or(DEFAULT_CONTACT_CUTOFF_NM),
            },
            policies,
            communicability: self.communicability,
            clustering: self.clustering,
            transitions: self.transitions,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_without_settings_yields_defaults() {
        let config = AnalysisConfigBuilder::new().build().unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.contact.cutoff, 0.4);
        assert_eq!(config.policies, vec![SignificancePolicy::long_range()]);
        assert!(config.bound_selection.protein_only);
    }

    #[test]
    fn policy_defaults_keep_their_distinct_parameters() {
        assert_eq!(
            SignificancePolicy::long_range(),
            SignificancePolicy::LongRange {
                threshold: 0.5,
                min_separation: 11
            }
        );
        assert_eq!(
            SignificancePolicy::hot_residue_local(),
            SignificancePolicy::HotResidueLocal {
                threshold: 0.5,
                max_distance: DEFAULT_MAX_LOCAL_DISTANCE,
                percentile: 75.0
            }
        );
        assert_eq!(SignificancePolicy::union_occupancy().name(), "union-occupancy");
    }

    #[test]
    fn non_positive_or_non_finite_cutoff_is_rejected() {
        for cutoff in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let result = AnalysisConfigBuilder::new().cutoff(cutoff).build();
            assert!(
                matches!(
                    result,
                    Err(ConfigError::InvalidParameter {
                        name: "contact.cutoff",
                        ..
                    })
                ),
                "cutoff {} should be rejected",
                cutoff
            );
        }
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        let result = AnalysisConfigBuilder::new()
            .policy(SignificancePolicy::LongRange {
                threshold: 1.5,
                min_separation: DEFAULT_MIN_SEPARATION,
            })
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));

        let result = AnalysisConfigBuilder::new()
            .communicability(CommunicabilityConfig { threshold: -0.1 })
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));
    }

    #[test]
    fn percentile_outside_range_is_rejected() {
        let result = AnalysisConfigBuilder::new()
            .policy(SignificancePolicy::HotResidueLocal {
                threshold: 0.5,
                max_distance: DEFAULT_MAX_LOCAL_DISTANCE,
                percentile: 101.0,
            })
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));
    }

    #[test]
    fn zero_clusters_restarts_or_iterations_are_rejected() {
        for config in [
            ClusteringConfig {
                n_clusters: 0,
                ..Default::default()
            },
            ClusteringConfig {
                restarts: 0,
                ..Default::default()
            },
            ClusteringConfig {
                max_iterations: 0,
                ..Default::default()
            },
        ] {
            assert!(AnalysisConfigBuilder::new().clustering(config).build().is_err());
        }
    }

    #[test]
    fn inverted_transition_range_is_rejected() {
        let config = TransitionConfig {
            ranges: vec![(29, 31), (77, 52)],
            reference_frame: 0,
        };
        assert!(AnalysisConfigBuilder::new().transitions(config).build().is_err());
    }

    #[test]
    fn transition_ranges_are_inclusive() {
        let config = TransitionConfig {
            ranges: vec![(29, 31), (85, 91)],
            reference_frame: 0,
        };
        assert!(config.contains(29));
        assert!(config.contains(31));
        assert!(config.contains(91));
        assert!(!config.contains(32));
    }

    #[test]
    fn multiple_policies_are_kept_in_order() {
        let config = AnalysisConfigBuilder::new()
            .policy(SignificancePolicy::union_occupancy())
            .policy(SignificancePolicy::long_range())
            .build()
            .unwrap();
        assert_eq!(config.policies.len(), 2);
        assert_eq!(config.policies[0].name(), "union-occupancy");
    }
}
