use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::cell::CellError;
use crate::core::models::structure::StructureError;
use crate::core::params::radii::RadiusLoadError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unsupported cell: {source}")]
    UnsupportedCell {
        #[from]
        source: CellError,
    },

    #[error("Structure error: {source}")]
    Structure {
        #[from]
        source: StructureError,
    },

    #[error("Invalid bond configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Covalent radius table error: {source}")]
    Radii {
        #[from]
        source: RadiusLoadError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
