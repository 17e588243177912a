use crate::cli::OutputFormat;
use cifbond::core::models::defaults::FieldDefaults;
use cifbond::core::models::structure::SortKey;
use cifbond::core::params::radii::CovalentRadiusTable;
use cifbond::engine::config::BondConfig;
use std::path::PathBuf;

/// Fully resolved settings for one `connect` run.
#[derive(Debug)]
pub struct AppConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub output_format: OutputFormat,
    pub sort_by: Option<SortKey>,
    /// `false` drops the periodic boundaries declared by the input.
    pub periodic: bool,
    pub print_bonds: bool,
    pub radii: CovalentRadiusTable,
    pub bond_config: BondConfig,
    pub field_defaults: FieldDefaults,
}
