use super::config::ElementPair;
use std::fmt;

/// A recoverable condition met during a bond build.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildWarning {
    /// The element is not in the covalent-radius table and was given `radius`.
    UnknownElement { element: String, radius: f64 },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::UnknownElement { element, radius } => write!(
                f,
                "element '{}' has no covalent radius; using {:.2}",
                element, radius
            ),
        }
    }
}

/// Everything a build reports besides the bond network itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub warnings: Vec<BuildWarning>,
    /// Pairs left out because one side had no atoms.
    pub skipped_pairs: Vec<ElementPair>,
    pub pairs_scanned: usize,
    pub bond_count: usize,
    /// Number of lattice images searched per target atom.
    pub image_count: usize,
}

impl BuildReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn unknown_elements(&self) -> impl Iterator<Item = &str> {
        self.warnings.iter().map(|warning| match warning {
            BuildWarning::UnknownElement { element, .. } => element.as_str(),
        })
    }
}
