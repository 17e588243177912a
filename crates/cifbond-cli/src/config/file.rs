use crate::error::{CliError, Result};
use cifbond::core::models::defaults::FieldDefaults;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub bonds: Option<FileBondConfig>,
    pub radii: Option<FileRadiiConfig>,
    pub structure: Option<FileStructureConfig>,
    pub output: Option<FileOutputConfig>,
    pub defaults: Option<FieldDefaults>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileBondConfig {
    pub tolerance: Option<f64>,
    pub pairs: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileRadiiConfig {
    pub file: Option<PathBuf>,
    /// Per-element radii applied on top of the built-in table and `file`.
    #[serde(default)]
    pub overrides: BTreeMap<String, f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileStructureConfig {
    pub sort_by: Option<String>,
    pub pbc: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOutputConfig {
    pub format: Option<String>,
    pub print_bonds: Option<bool>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::parsing(path, e))
    }
}
