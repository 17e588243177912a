use phf::{Map, phf_map};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Radius used for any element the table does not list.
pub const UNKNOWN_ELEMENT_RADIUS: f64 = 0.0;

/// Single-bond covalent radii in Angstroms (Cordero et al., 2008).
pub static DEFAULT_COVALENT_RADII: Map<&'static str, f64> = phf_map! {
    "H" => 0.31,
    "B" => 0.84, "C" => 0.76, "N" => 0.71, "O" => 0.66, "F" => 0.57,
    "Na" => 1.66, "Mg" => 1.41, "Al" => 1.21, "Si" => 1.11, "P" => 1.07, "S" => 1.05, "Cl" => 1.02,
    "K" => 2.03, "Ca" => 1.76, "Ti" => 1.60, "Zn" => 1.22, "Ga" => 1.22, "Ge" => 1.20,
};

#[derive(Debug, Error)]
pub enum RadiusLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Covalent radius for '{element}' must be finite and non-negative (got {value})")]
    InvalidRadius { element: String, value: f64 },
    #[error("Unsupported radius file '{path}' (expected a .toml or .csv extension)")]
    UnsupportedExtension { path: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RadiusFile {
    radii: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct RadiusRow {
    element: String,
    radius: f64,
}

/// Element symbol to covalent radius lookup.
///
/// Symbols are matched exactly (after trimming), so `"Si"` and `"SI"` are different keys.
#[derive(Debug, Clone, PartialEq)]
pub struct CovalentRadiusTable {
    radii: BTreeMap<String, f64>,
}

impl Default for CovalentRadiusTable {
    fn default() -> Self {
        Self {
            radii: DEFAULT_COVALENT_RADII
                .entries()
                .map(|(element, radius)| (element.to_string(), *radius))
                .collect(),
        }
    }
}

impl CovalentRadiusTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            radii: BTreeMap::new(),
        }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, RadiusLoadError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut table = Self::empty();
        for (element, radius) in pairs {
            table.insert(element.as_ref(), radius)?;
        }
        Ok(table)
    }

    /// Loads a table from a `.toml` file with a `[radii]` section or a `.csv` file with
    /// `element,radius` columns. Only the file's entries are present in the result.
    pub fn load(path: &Path) -> Result<Self, RadiusLoadError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Self::load_toml(path),
            Some("csv") => Self::load_csv(path),
            _ => Err(RadiusLoadError::UnsupportedExtension {
                path: path.to_string_lossy().to_string(),
            }),
        }
    }

    fn load_toml(path: &Path) -> Result<Self, RadiusLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| RadiusLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: RadiusFile = toml::from_str(&content).map_err(|e| RadiusLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_pairs(file.radii)
    }

    fn load_csv(path: &Path) -> Result<Self, RadiusLoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| RadiusLoadError::Csv {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;

        let mut table = Self::empty();
        for result in reader.deserialize::<RadiusRow>() {
            let row = result.map_err(|e| RadiusLoadError::Csv {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
            table.insert(&row.element, row.radius)?;
        }
        Ok(table)
    }

    /// Sets the radius of `element`, returning the previous value if there was one.
    pub fn insert(&mut self, element: &str, radius: f64) -> Result<Option<f64>, RadiusLoadError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(RadiusLoadError::InvalidRadius {
                element: element.to_string(),
                value: radius,
            });
        }
        Ok(self.radii.insert(element.trim().to_string(), radius))
    }

    /// Applies every entry of `other` on top of this table.
    pub fn extend(&mut self, other: &CovalentRadiusTable) {
        for (element, radius) in &other.radii {
            self.radii.insert(element.clone(), *radius);
        }
    }

    pub fn get(&self, element: &str) -> Option<f64> {
        self.radii.get(element).copied()
    }

    pub fn contains(&self, element: &str) -> bool {
        self.radii.contains_key(element)
    }

    /// The radius of `element`, or [`UNKNOWN_ELEMENT_RADIUS`] when it is not listed.
    pub fn radius_or_default(&self, element: &str) -> f64 {
        self.get(element).unwrap_or(UNKNOWN_ELEMENT_RADIUS)
    }

    /// `radius(e1) + radius(e2) + tolerance`, with unlisted elements contributing zero.
    pub fn bond_threshold(&self, e1: &str, e2: &str, tolerance: f64) -> f64 {
        self.radius_or_default(e1) + self.radius_or_default(e2) + tolerance
    }

    /// Listed element symbols in sorted order.
    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.radii.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.radii.iter().map(|(e, r)| (e.as_str(), *r))
    }

    pub fn len(&self) -> usize {
        self.radii.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }
}
