use contactdiff::engine::config as core_config;
use std::path::PathBuf;

pub struct AppConfig {
    pub bound_path: PathBuf,
    pub unbound_path: PathBuf,
    pub output_dir: PathBuf,
    pub core_config: core_config::AnalysisConfig,
}
