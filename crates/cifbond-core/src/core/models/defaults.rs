use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_RESIDUE_NAME: &str = "SIO";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DefaultsError {
    #[error("Default for '{field}' must not be blank")]
    Blank { field: &'static str },
    #[error("Default for '{field}' is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

/// Values substituted for atom-table fields that a source does not provide.
///
/// Every substitution made from these defaults is reported to the caller; nothing is filled
/// in silently.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FieldDefaults {
    pub residue_name: String,
    pub residue_number: usize,
    pub chain_id: char,
    pub occupancy: f64,
    pub temperature_factor: f64,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self {
            residue_name: DEFAULT_RESIDUE_NAME.to_string(),
            residue_number: 1,
            chain_id: 'A',
            occupancy: 1.0,
            temperature_factor: 0.0,
        }
    }
}

impl FieldDefaults {
    pub fn validate(&self) -> Result<(), DefaultsError> {
        if self.residue_name.trim().is_empty() {
            return Err(DefaultsError::Blank {
                field: "residue-name",
            });
        }
        if self.chain_id.is_whitespace() {
            return Err(DefaultsError::Blank { field: "chain-id" });
        }
        if !(0.0..=1.0).contains(&self.occupancy) {
            return Err(DefaultsError::OutOfRange {
                field: "occupancy",
                value: self.occupancy.to_string(),
            });
        }
        if !self.temperature_factor.is_finite() || self.temperature_factor < 0.0 {
            return Err(DefaultsError::OutOfRange {
                field: "temperature-factor",
                value: self.temperature_factor.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_are_valid() {
        let defaults = FieldDefaults::default();
        assert_eq!(defaults.residue_name, "SIO");
        assert_eq!(defaults.chain_id, 'A');
        assert!(defaults.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_and_out_of_range_values() {
        let blank = FieldDefaults {
            residue_name: "  ".into(),
            ..Default::default()
        };
        assert_eq!(
            blank.validate(),
            Err(DefaultsError::Blank {
                field: "residue-name"
            })
        );

        let occupancy = FieldDefaults {
            occupancy: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            occupancy.validate(),
            Err(DefaultsError::OutOfRange {
                field: "occupancy",
                ..
            })
        ));
    }

    #[test]
    fn deserializes_partial_tables_over_builtin_defaults() {
        let defaults: FieldDefaults = toml::from_str("residue-name = \"MOF\"\nchain-id = \"B\"").unwrap();
        assert_eq!(defaults.residue_name, "MOF");
        assert_eq!(defaults.chain_id, 'B');
        assert_eq!(defaults.residue_number, 1);
    }
}
