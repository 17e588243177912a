use crate::core::models::atom::AtomRecord;
use crate::core::models::defaults::FieldDefaults;
use crate::core::models::structure::StructureModel;
use nalgebra::Point3;
use serde::Deserialize;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const TABLE_TITLE: &str = "cifbond";
const ANGSTROM_TO_NM: f64 = 0.1;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Unknown row format '{0}' (expected pdb, gro or xyz)")]
    UnknownFormat(String),
}

/// One atom row together with the defaults for fields the atom table does not carry.
///
/// This is the complete set of fields a row formatter may use.
#[derive(Debug, Clone, Copy)]
pub struct AtomRow<'a> {
    atom: &'a AtomRecord,
    defaults: &'a FieldDefaults,
}

impl<'a> AtomRow<'a> {
    pub fn new(atom: &'a AtomRecord, defaults: &'a FieldDefaults) -> Self {
        Self { atom, defaults }
    }

    /// 1-based position in the current row order.
    pub fn serial(&self) -> usize {
        self.atom.row + 1
    }

    pub fn label(&self) -> &str {
        self.atom.cif_name()
    }

    pub fn element(&self) -> &str {
        &self.atom.element
    }

    pub fn residue(&self) -> &str {
        &self.atom.residue
    }

    pub fn residue_number(&self) -> usize {
        self.defaults.residue_number
    }

    pub fn chain_id(&self) -> char {
        self.defaults.chain_id
    }

    pub fn position(&self) -> &Point3<f64> {
        &self.atom.position
    }

    pub fn occupancy(&self) -> f64 {
        self.defaults.occupancy
    }

    pub fn temperature_factor(&self) -> f64 {
        self.defaults.temperature_factor
    }

    pub fn charge(&self) -> Option<f64> {
        self.atom.charge
    }
}

/// A fixed-column text rendering of one atom row.
pub trait AtomRowFormat {
    /// Factor converting Angstroms into the format's length unit.
    const LENGTH_SCALE: f64 = 1.0;

    fn coordinate(value: f64) -> String {
        format!("{:8.3}", value * Self::LENGTH_SCALE)
    }

    fn coordinates(position: &Point3<f64>) -> String {
        format!(
            "{}{}{}",
            Self::coordinate(position.x),
            Self::coordinate(position.y),
            Self::coordinate(position.z)
        )
    }

    fn format_row(row: &AtomRow<'_>) -> String;
}

/// Protein Data Bank `ATOM` records.
pub struct PdbRow;

impl AtomRowFormat for PdbRow {
    fn format_row(row: &AtomRow<'_>) -> String {
        format!(
            "ATOM  {:5} {:<4}{:1}{:>3} {:1}{:4}{:1}   {}{:6.2}{:6.2}          {:<4}{:>2}{:<2}",
            row.serial() % 100_000,
            row.element(),
            ' ',
            row.residue(),
            row.chain_id(),
            row.residue_number() % 10_000,
            ' ',
            Self::coordinates(row.position()),
            row.occupancy(),
            row.temperature_factor(),
            "",
            row.element(),
            ""
        )
    }
}

/// GROMACS `.gro` atom lines; coordinates in nanometres.
pub struct GroRow;

impl AtomRowFormat for GroRow {
    const LENGTH_SCALE: f64 = ANGSTROM_TO_NM;

    fn format_row(row: &AtomRow<'_>) -> String {
        format!(
            "{:5}{:<5}{:<5}{:5}{}",
            row.residue_number() % 100_000,
            row.residue(),
            row.element(),
            row.serial() % 100_000,
            Self::coordinates(row.position())
        )
    }
}

/// Plain XYZ atom lines.
pub struct XyzRow;

impl AtomRowFormat for XyzRow {
    fn coordinates(position: &Point3<f64>) -> String {
        format!(
            "{} {} {}",
            Self::coordinate(position.x),
            Self::coordinate(position.y),
            Self::coordinate(position.z)
        )
    }

    fn format_row(row: &AtomRow<'_>) -> String {
        format!("{:<4} {}", row.element(), Self::coordinates(row.position()))
    }
}

/// Tabular output flavor, chosen by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowFormat {
    Pdb,
    Gro,
    Xyz,
}

impl RowFormat {
    pub fn format_row(self, row: &AtomRow<'_>) -> String {
        match self {
            RowFormat::Pdb => PdbRow::format_row(row),
            RowFormat::Gro => GroRow::format_row(row),
            RowFormat::Xyz => XyzRow::format_row(row),
        }
    }

    /// Picks the format matching a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl FromStr for RowFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdb" => Ok(RowFormat::Pdb),
            "gro" => Ok(RowFormat::Gro),
            "xyz" => Ok(RowFormat::Xyz),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for RowFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowFormat::Pdb => "pdb",
            RowFormat::Gro => "gro",
            RowFormat::Xyz => "xyz",
        };
        f.write_str(name)
    }
}

/// Writes the whole atom table in `format`, in current row order, with the format's
/// header and trailer lines.
pub fn write_table(
    structure: &StructureModel,
    format: RowFormat,
    defaults: &FieldDefaults,
    writer: &mut impl Write,
) -> Result<(), FormatError> {
    let lengths = structure.cell().map(|cell| cell.lengths());

    match format {
        RowFormat::Pdb => {
            if let Some([a, b, c]) = lengths {
                writeln!(
                    writer,
                    "CRYST1{:9.3}{:9.3}{:9.3}{:7.2}{:7.2}{:7.2} P 1           1",
                    a, b, c, 90.0, 90.0, 90.0
                )?;
            }
        }
        RowFormat::Gro => {
            writeln!(writer, "{}", TABLE_TITLE)?;
            writeln!(writer, "{:5}", structure.len())?;
        }
        RowFormat::Xyz => {
            writeln!(writer, "{}", structure.len())?;
            writeln!(writer, "{}", TABLE_TITLE)?;
        }
    }

    for (_, atom) in structure.atoms() {
        writeln!(writer, "{}", format.format_row(&AtomRow::new(atom, defaults)))?;
    }

    match format {
        RowFormat::Pdb => writeln!(writer, "END")?,
        RowFormat::Gro => {
            let [a, b, c] = lengths.unwrap_or([0.0; 3]);
            writeln!(
                writer,
                "{:10.5}{:10.5}{:10.5}",
                a * ANGSTROM_TO_NM,
                b * ANGSTROM_TO_NM,
                c * ANGSTROM_TO_NM
            )?;
        }
        RowFormat::Xyz => {}
    }
    Ok(())
}
