use crate::core::params::radii::CovalentRadiusTable;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Distance added to the sum of covalent radii when no tolerance is configured.
pub const DEFAULT_TOLERANCE: f64 = 0.2;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Bond tolerance must be finite and non-negative (got {0})")]
    InvalidTolerance(f64),

    #[error("Invalid element pair '{0}': expected two element symbols joined by '-', e.g. 'Si-O'")]
    InvalidPair(String),

    #[error("An explicit pair selection must list at least one element pair")]
    EmptySelection,
}

/// An unordered pair of element symbols, stored with the lexically smaller symbol first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementPair {
    first: String,
    second: String,
}

impl ElementPair {
    pub fn new(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn is_homonuclear(&self) -> bool {
        self.first == self.second
    }
}

impl FromStr for ElementPair {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let is_symbol = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphabetic());
        match s.split('-').map(str::trim).collect::<Vec<_>>().as_slice() {
            [a, b] if is_symbol(a) && is_symbol(b) => Ok(Self::new(a, b)),
            _ => Err(ConfigError::InvalidPair(s.to_string())),
        }
    }
}

impl fmt::Display for ElementPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

/// Which element pairs a build considers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PairSelection {
    /// Every unordered pair over the radius table's elements, same-element pairs included.
    #[default]
    AllTableElements,
    /// Exactly these pairs; order and duplicates are irrelevant.
    List(Vec<ElementPair>),
}

impl PairSelection {
    /// The distinct pairs to scan, in canonical order.
    pub fn resolve(&self, radii: &CovalentRadiusTable) -> Vec<ElementPair> {
        match self {
            PairSelection::AllTableElements => {
                let elements: Vec<&str> = radii.elements().collect();
                elements
                    .iter()
                    .enumerate()
                    .flat_map(|(i, a)| elements[i..].iter().map(move |b| ElementPair::new(a, b)))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            }
            PairSelection::List(pairs) => pairs
                .iter()
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BondConfig {
    pub tolerance: f64,
    pub pairs: PairSelection,
}

impl Default for BondConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            pairs: PairSelection::AllTableElements,
        }
    }
}

impl BondConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if let PairSelection::List(pairs) = &self.pairs {
            if pairs.is_empty() {
                return Err(ConfigError::EmptySelection);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct BondConfigBuilder {
    tolerance: Option<f64>,
    pairs: Option<Vec<ElementPair>>,
}

impl BondConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Adds one pair to an explicit selection.
    pub fn pair(mut self, pair: ElementPair) -> Self {
        self.pairs.get_or_insert_with(Vec::new).push(pair);
        self
    }

    pub fn pairs(mut self, pairs: Vec<ElementPair>) -> Self {
        self.pairs = Some(pairs);
        self
    }

    pub fn build(self) -> Result<BondConfig, ConfigError> {
        let config = BondConfig {
            tolerance: self.tolerance.unwrap_or(DEFAULT_TOLERANCE),
            pairs: self
                .pairs
                .map_or(PairSelection::AllTableElements, PairSelection::List),
        };
        config.validate()?;
        Ok(config)
    }
}
