use crate::core::io::traits::StructureFile;
use crate::core::models::builder::{IngestWarning, RawAtom, StructureBuilder};
use crate::core::models::cell::Periodicity;
use crate::core::models::defaults::FieldDefaults;
use crate::core::models::structure::{StructureError, StructureModel};
use nalgebra::Matrix3;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XyzMetadata {
    /// Free text of the header line, without the `Lattice`/`pbc` entries.
    pub comment: String,
    /// Substitutions made while ingesting the atom lines.
    pub warnings: Vec<IngestWarning>,
}

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("Header declares {expected} atoms but {found} atom lines were found")]
    CountMismatch { expected: usize, found: usize },
    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),
}

#[derive(Debug, Error, PartialEq)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count '{value}'")]
    InvalidCount { value: String },
    #[error("Missing header line")]
    MissingHeader,
    #[error("Invalid number for '{field}' (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Lattice must hold 3 or 9 numbers (value: '{value}')")]
    InvalidLattice { value: String },
    #[error("pbc must hold 3 flags (value: '{value}')")]
    InvalidPbc { value: String },
}

/// Splits an extended-XYZ header into `key=value` entries (keys lowercased, quotes removed)
/// and the remaining free text.
fn parse_header(line: &str) -> (BTreeMap<String, String>, String) {
    let mut entries = BTreeMap::new();
    let mut free = Vec::new();
    let mut chars = line.trim().chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut word = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
            word.push(c);
        }
        if chars.next_if_eq(&'=').is_none() {
            free.push(word);
            continue;
        }

        let mut value = String::new();
        match chars.next_if(|c| *c == '"' || *c == '\'') {
            Some(quote) => {
                for c in chars.by_ref() {
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
            }
            None => {
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    value.push(c);
                }
            }
        }
        entries.insert(word.to_ascii_lowercase(), value);
    }

    (entries, free.join(" "))
}

fn parse_float(token: &str, field: &'static str, line: usize) -> Result<f64, XyzError> {
    token.parse().map_err(|_| XyzError::Parse {
        line,
        kind: XyzParseErrorKind::InvalidFloat {
            field,
            value: token.to_string(),
        },
    })
}

fn parse_flag(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "t" | "true" | "1" => Some(true),
        "f" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn apply_header(
    builder: &mut StructureBuilder,
    entries: &BTreeMap<String, String>,
) -> Result<(), XyzError> {
    if let Some(lattice) = entries.get("lattice") {
        let invalid = || XyzError::Parse {
            line: 2,
            kind: XyzParseErrorKind::InvalidLattice {
                value: lattice.clone(),
            },
        };
        let values = lattice
            .split_whitespace()
            .map(|token| token.parse::<f64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match values.as_slice() {
            [a, b, c] => {
                builder.cell_lengths(*a, *b, *c);
            }
            nine if nine.len() == 9 => {
                builder.cell_matrix(Matrix3::from_row_slice(nine));
            }
            _ => return Err(invalid()),
        }
    }

    if let Some(pbc) = entries.get("pbc") {
        let flags = pbc
            .split_whitespace()
            .map(parse_flag)
            .collect::<Option<Vec<_>>>()
            .filter(|flags| flags.len() == 3)
            .ok_or_else(|| XyzError::Parse {
                line: 2,
                kind: XyzParseErrorKind::InvalidPbc { value: pbc.clone() },
            })?;
        builder.periodicity(Periodicity([flags[0], flags[1], flags[2]]));
    }
    Ok(())
}

/// Extended XYZ: atom count, a header line that may carry `Lattice="..."` and `pbc="..."`,
/// then one `<element> <x> <y> <z> [residue]` line per atom.
pub struct XyzFile;

impl StructureFile for XyzFile {
    type Metadata = XyzMetadata;
    type Error = XyzError;

    fn read_from(
        reader: &mut impl BufRead,
        defaults: &FieldDefaults,
    ) -> Result<(StructureModel, Self::Metadata), Self::Error> {
        let mut lines = reader.lines();

        let count_line = lines.next().transpose()?.unwrap_or_default();
        let count: usize = count_line.trim().parse().map_err(|_| XyzError::Parse {
            line: 1,
            kind: XyzParseErrorKind::InvalidCount {
                value: count_line.trim().to_string(),
            },
        })?;

        let header = lines.next().transpose()?.ok_or(XyzError::Parse {
            line: 2,
            kind: XyzParseErrorKind::MissingHeader,
        })?;
        let (entries, comment) = parse_header(&header);

        let mut builder = StructureBuilder::new();
        builder.defaults(defaults.clone());
        apply_header(&mut builder, &entries)?;

        let mut found = 0;
        for (offset, line) in lines.enumerate() {
            let line = line?;
            let line_num = offset + 3;
            if found == count {
                if line.trim().is_empty() {
                    continue;
                }
                break;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let coordinate = |index: usize, field: &'static str| {
                tokens
                    .get(index)
                    .map(|token| parse_float(token, field, line_num))
                    .transpose()
            };
            builder.add_raw(RawAtom {
                element: tokens.first().map(|s| s.to_string()),
                x: coordinate(1, "x")?,
                y: coordinate(2, "y")?,
                z: coordinate(3, "z")?,
                residue: tokens.get(4).map(|s| s.to_string()),
                charge: None,
            });
            found += 1;
        }

        if found != count {
            return Err(XyzError::CountMismatch {
                expected: count,
                found,
            });
        }

        let (structure, warnings) = builder.build()?;
        Ok((structure, XyzMetadata { comment, warnings }))
    }

    fn write_to(
        structure: &StructureModel,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", structure.len())?;

        let mut header = Vec::new();
        if let Some(cell) = structure.cell() {
            let [a, b, c] = cell.lengths();
            header.push(format!("Lattice=\"{} 0 0 0 {} 0 0 0 {}\"", a, b, c));
        }
        header.push(format!("pbc=\"{}\"", structure.periodicity()));
        if !metadata.comment.is_empty() {
            header.push(metadata.comment.clone());
        }
        writeln!(writer, "{}", header.join(" "))?;

        for (_, atom) in structure.atoms() {
            writeln!(
                writer,
                "{:<3} {:>15.8} {:>15.8} {:>15.8} {}",
                atom.element, atom.position.x, atom.position.y, atom.position.z, atom.residue
            )?;
        }
        Ok(())
    }
}
