use contactdiff::engine::config::{
    CommunicabilityConfig, DEFAULT_CONTACT_CUTOFF_NM, SignificancePolicy,
};

pub struct DefaultsConfig {
    pub cutoff: f64,
    pub protein_only: bool,
    pub policies: Vec<SignificancePolicy>,
    pub communicability_enabled: bool,
    pub communicability_threshold: f64,
    pub clustering_enabled: bool,
    pub reference_frame: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CONTACT_CUTOFF_NM,
            protein_only: true,
            policies: vec![
                SignificancePolicy::long_range(),
                SignificancePolicy::hot_residue_local(),
                SignificancePolicy::union_occupancy(),
            ],
            communicability_enabled: true,
            communicability_threshold: CommunicabilityConfig::default().threshold,
            clustering_enabled: true,
            reference_frame: 0,
        }
    }
}
