use cifbond::engine::config::ElementPair;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidAssignment(String),

    #[error("Empty key in --set value '{0}'.")]
    EmptyKey(String),

    #[error("Invalid element pair '{0}'. Expected two element symbols joined by '-' (e.g., 'Si-O').")]
    InvalidPair(String),

    #[error("Invalid boolean '{0}'. Expected true/false, yes/no or on/off.")]
    InvalidBool(String),
}

/// Splits a `KEY=VALUE` override at the first `=`, trimming both sides.
pub fn parse_assignment(raw: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| ParseError::InvalidAssignment(raw.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::EmptyKey(raw.to_string()));
    }
    Ok((key, value.trim()))
}

/// Parses element pairs given individually or as comma-separated lists.
pub fn parse_pairs<S: AsRef<str>>(values: &[S]) -> Result<Vec<ElementPair>, ParseError> {
    values
        .iter()
        .flat_map(|value| value.as_ref().split(','))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<ElementPair>()
                .map_err(|_| ParseError::InvalidPair(part.to_string()))
        })
        .collect()
}

pub fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ParseError::InvalidBool(value.to_string())),
    }
}
