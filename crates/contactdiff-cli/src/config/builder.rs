use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileSelection};
use super::models::AppConfig;
use crate::cli::{CompareArgs, PolicyName};
use crate::error::{CliError, Result};
use contactdiff::engine::config as core_config;
use std::str::FromStr;

pub fn build_config(args: &CompareArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let cutoff = args
        .cutoff
        .or(file_config.contact.take().and_then(|c| c.cutoff))
        .unwrap_or(defaults.cutoff);

    let selection_file = file_config.selection.take().unwrap_or_default();
    let bound_selection = merge_selection(
        args.bound_chains.as_deref(),
        args.all_residues,
        selection_file.bound,
        &defaults,
    );
    let unbound_selection = merge_selection(
        args.unbound_chains.as_deref(),
        args.all_residues,
        selection_file.unbound,
        &defaults,
    );

    let policies = merge_policies(
        &args.policies,
        args.threshold,
        file_config.policies.take(),
        &defaults,
    );

    let comm_file = file_config.communicability.take().unwrap_or_default();
    let communicability_enabled = match (
        args.communicability.communicability,
        args.communicability.no_communicability,
    ) {
        (true, false) => true,
        (false, true) => false,
        _ => comm_file
            .enabled
            .unwrap_or(defaults.communicability_enabled),
    };

    let clustering_file = file_config.clustering.take().unwrap_or_default();
    let clustering_enabled = match (args.clustering.clustering, args.clustering.no_clustering) {
        (true, false) => true,
        (false, true) => false,
        _ => clustering_file
            .enabled
            .unwrap_or(defaults.clustering_enabled),
    };

    let transitions_file = file_config.transitions.take().unwrap_or_default();
    let ranges = if args.transition_ranges.is_empty() {
        transitions_file.ranges.unwrap_or_default()
    } else {
        args.transition_ranges.clone()
    };
    let reference_frame = args
        .reference_frame
        .or(transitions_file.reference_frame)
        .unwrap_or(defaults.reference_frame);

    let mut builder = core_config::AnalysisConfigBuilder::new()
        .bound_selection(bound_selection)
        .unbound_selection(unbound_selection)
        .cutoff(cutoff);
    for policy in policies {
        builder = builder.policy(policy);
    }
    if communicability_enabled {
        builder = builder.communicability(core_config::CommunicabilityConfig {
            threshold: comm_file
                .threshold
                .unwrap_or(defaults.communicability_threshold),
        });
    }
    if clustering_enabled {
        let base = core_config::ClusteringConfig::default();
        builder = builder.clustering(core_config::ClusteringConfig {
            n_clusters: clustering_file.n_clusters.unwrap_or(base.n_clusters),
            percentile: clustering_file.percentile.unwrap_or(base.percentile),
            seed: clustering_file.seed.unwrap_or(base.seed),
            restarts: clustering_file.restarts.unwrap_or(base.restarts),
            max_iterations: clustering_file.max_iterations.unwrap_or(base.max_iterations),
        });
    }
    if !ranges.is_empty() {
        builder = builder.transitions(core_config::TransitionConfig {
            ranges,
            reference_frame,
        });
    }

    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        bound_path: args.bound.clone(),
        unbound_path: args.unbound.clone(),
        output_dir: args.output.clone(),
        core_config,
    })
}

fn merge_selection(
    cli_chains: Option<&[usize]>,
    cli_all_residues: bool,
    file_val: Option<FileSelection>,
    defaults: &DefaultsConfig,
) -> core_config::SelectionConfig {
    let file_val = file_val.unwrap_or_default();
    core_config::SelectionConfig {
        chains: cli_chains.map(<[usize]>::to_vec).or(file_val.chains),
        protein_only: if cli_all_residues {
            false
        } else {
            file_val.protein_only.unwrap_or(defaults.protein_only)
        },
    }
}

fn merge_policies(
    cli_names: &[PolicyName],
    cli_threshold: Option<f64>,
    file_val: Option<Vec<super::file::FilePolicy>>,
    defaults: &DefaultsConfig,
) -> Vec<core_config::SignificancePolicy> {
    let policies: Vec<core_config::SignificancePolicy> = if !cli_names.is_empty() {
        let from_file: Vec<core_config::SignificancePolicy> = file_val
            .map(|ps| ps.into_iter().map(Into::into).collect())
            .unwrap_or_default();
        cli_names
            .iter()
            .map(|name| {
                from_file
                    .iter()
                    .copied()
                    .find(|p| p.name() == policy_name(*name))
                    .unwrap_or_else(|| default_policy(*name))
            })
            .collect()
    } else if let Some(ps) = file_val.filter(|ps| !ps.is_empty()) {
        ps.into_iter().map(Into::into).collect()
    } else {
        defaults.policies.clone()
    };

    match cli_threshold {
        Some(t) => policies.into_iter().map(|p| with_threshold(p, t)).collect(),
        None => policies,
    }
}

fn policy_name(name: PolicyName) -> &'static str {
    default_policy(name).name()
}

fn default_policy(name: PolicyName) -> core_config::SignificancePolicy {
    match name {
        PolicyName::LongRange => core_config::SignificancePolicy::long_range(),
        PolicyName::HotResidueLocal => core_config::SignificancePolicy::hot_residue_local(),
        PolicyName::UnionOccupancy => core_config::SignificancePolicy::union_occupancy(),
    }
}

fn with_threshold(
    policy: core_config::SignificancePolicy,
    value: f64,
) -> core_config::SignificancePolicy {
    use core_config::SignificancePolicy as P;
    match policy {
        P::LongRange { min_separation, .. } => P::LongRange {
            threshold: value,
            min_separation,
        },
        P::HotResidueLocal {
            max_distance,
            percentile,
            ..
        } => P::HotResidueLocal {
            threshold: value,
            max_distance,
            percentile,
        },
        P::UnionOccupancy {
            sequence_gap_exclusion,
            ..
        } => P::UnionOccupancy {
            threshold: value,
            sequence_gap_exclusion,
        },
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
            CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            ))
        })?;

        match key {
            "contact.cutoff" => {
                config.contact.get_or_insert_with(Default::default).cutoff =
                    Some(parse_value(key, value_str, "float")?);
            }
            "selection.bound.protein-only" => {
                config
                    .selection
                    .get_or_insert_with(Default::default)
                    .bound
                    .get_or_insert_with(Default::default)
                    .protein_only = Some(parse_value(key, value_str, "boolean")?);
            }
            "selection.unbound.protein-only" => {
                config
                    .selection
                    .get_or_insert_with(Default::default)
                    .unbound
                    .get_or_insert_with(Default::default)
                    .protein_only = Some(parse_value(key, value_str, "boolean")?);
            }
            "communicability.enabled" => {
                config
                    .communicability
                    .get_or_insert_with(Default::default)
                    .enabled = Some(parse_value(key, value_str, "boolean")?);
            }
            "communicability.threshold" => {
                config
                    .communicability
                    .get_or_insert_with(Default::default)
                    .threshold = Some(parse_value(key, value_str, "float")?);
            }
            "clustering.enabled" => {
                config.clustering.get_or_insert_with(Default::default).enabled =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "clustering.n-clusters" => {
                config
                    .clustering
                    .get_or_insert_with(Default::default)
                    .n_clusters = Some(parse_value(key, value_str, "integer")?);
            }
            "clustering.percentile" => {
                config
                    .clustering
                    .get_or_insert_with(Default::default)
                    .percentile = Some(parse_value(key, value_str, "float")?);
            }
            "clustering.seed" => {
                config.clustering.get_or_insert_with(Default::default).seed =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "clustering.restarts" => {
                config.clustering.get_or_insert_with(Default::default).restarts =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "clustering.max-iterations" => {
                config
                    .clustering
                    .get_or_insert_with(Default::default)
                    .max_iterations = Some(parse_value(key, value_str, "integer")?);
            }
            "transitions.reference-frame" => {
                config
                    .transitions
                    .get_or_insert_with(Default::default)
                    .reference_frame = Some(parse_value(key, value_str, "integer")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
