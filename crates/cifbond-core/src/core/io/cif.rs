use crate::core::io::traits::StructureFile;
use crate::core::models::builder::{IngestWarning, RawAtom, StructureBuilder};
use crate::core::models::cell::{Cell, CellError};
use crate::core::models::defaults::FieldDefaults;
use crate::core::models::structure::{StructureError, StructureModel};
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_DATA_BLOCK: &str = "cifbond";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CifMetadata {
    /// Name following `data_`.
    pub data_block: String,
    /// Substitutions made while ingesting the atom-site loop.
    pub warnings: Vec<IngestWarning>,
}

#[derive(Debug, Error)]
pub enum CifError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Missing required tag: {0}")]
    MissingTag(String),
    #[error("A CIF file requires a unit cell")]
    MissingCell,
    #[error("Invalid cell: {0}")]
    Cell(#[from] CellError),
    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    text: String,
    line: usize,
    quoted: bool,
}

/// Splits CIF text into value tokens, honoring quotes, `#` comments and `;` text fields.
fn tokenize(reader: &mut impl BufRead) -> Result<Vec<Token>, CifError> {
    let mut tokens = Vec::new();
    let mut text_field: Option<(usize, String)> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = index + 1;

        if let Some((start, mut text)) = text_field.take() {
            if line.starts_with(';') {
                tokens.push(Token {
                    text,
                    line: start,
                    quoted: true,
                });
            } else {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&line);
                text_field = Some((start, text));
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix(';') {
            text_field = Some((line_num, rest.to_string()));
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            if c == '#' {
                break;
            }
            if c == '\'' || c == '"' {
                let mut j = i + 1;
                while j < chars.len()
                    && !(chars[j] == c && chars.get(j + 1).is_none_or(|n| n.is_whitespace()))
                {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(CifError::Parse {
                        line: line_num,
                        message: "unterminated quoted value".into(),
                    });
                }
                tokens.push(Token {
                    text: chars[i + 1..j].iter().collect(),
                    line: line_num,
                    quoted: true,
                });
                i = j + 1;
                continue;
            }
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Token {
                text: chars[start..i].iter().collect(),
                line: line_num,
                quoted: false,
            });
        }
    }

    if let Some((start, _)) = text_field {
        return Err(CifError::Parse {
            line: start,
            message: "unterminated text field".into(),
        });
    }
    Ok(tokens)
}

fn is_reserved(token: &Token) -> bool {
    !token.quoted && {
        let lower = token.text.to_ascii_lowercase();
        token.text.starts_with('_') || lower == "loop_" || lower.starts_with("data_")
    }
}

#[derive(Debug, Default)]
struct CifBlock {
    name: String,
    items: HashMap<String, Token>,
    loops: Vec<CifLoop>,
}

#[derive(Debug)]
struct CifLoop {
    tags: Vec<String>,
    rows: Vec<Vec<Token>>,
}

impl CifLoop {
    fn column(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }
}

/// Reads the first data block. Tags are lowercased.
fn parse_block(tokens: Vec<Token>) -> Result<CifBlock, CifError> {
    let mut block = CifBlock::default();
    let mut tokens = tokens.into_iter().peekable();
    let mut seen_data = false;

    while let Some(token) = tokens.next() {
        let lower = token.text.to_ascii_lowercase();
        if !token.quoted && lower.starts_with("data_") {
            if seen_data {
                debug!(block = %token.text, "Ignoring additional data block.");
                break;
            }
            seen_data = true;
            block.name = token.text["data_".len()..].to_string();
        } else if !token.quoted && lower == "loop_" {
            let mut tags = Vec::new();
            while let Some(tag) =
                tokens.next_if(|t| !t.quoted && t.text.starts_with('_'))
            {
                tags.push(tag.text.to_ascii_lowercase());
            }
            if tags.is_empty() {
                return Err(CifError::Parse {
                    line: token.line,
                    message: "loop_ without tags".into(),
                });
            }
            let mut values = Vec::new();
            while let Some(value) = tokens.next_if(|t| !is_reserved(t)) {
                values.push(value);
            }
            if values.len() % tags.len() != 0 {
                return Err(CifError::Parse {
                    line: token.line,
                    message: format!(
                        "loop has {} values, not a multiple of its {} tags",
                        values.len(),
                        tags.len()
                    ),
                });
            }
            let rows = values.chunks(tags.len()).map(<[Token]>::to_vec).collect();
            block.loops.push(CifLoop { tags, rows });
        } else if !token.quoted && token.text.starts_with('_') {
            let value = tokens
                .next_if(|t| !is_reserved(t))
                .ok_or_else(|| CifError::Parse {
                    line: token.line,
                    message: format!("tag '{}' has no value", token.text),
                })?;
            block.items.insert(lower, value);
        } else {
            return Err(CifError::Parse {
                line: token.line,
                message: format!("unexpected value '{}'", token.text),
            });
        }
    }
    Ok(block)
}

fn is_unknown(token: &Token) -> bool {
    !token.quoted && (token.text == "?" || token.text == ".")
}

/// Parses a CIF number, dropping a trailing standard uncertainty such as `(3)`.
fn parse_number(token: &Token) -> Result<f64, CifError> {
    let text = token.text.split('(').next().unwrap_or_default();
    text.parse().map_err(|_| CifError::Parse {
        line: token.line,
        message: format!("invalid number '{}'", token.text),
    })
}

/// Element symbol from a type symbol or label: a capital letter and any following
/// lowercase letters (`"Si4+"` and `"Si12"` both give `"Si"`).
fn element_from(text: &str) -> Option<String> {
    let mut chars = text.chars().skip_while(|c| !c.is_ascii_alphabetic());
    let first = chars.next()?.to_ascii_uppercase();
    let mut symbol = first.to_string();
    symbol.extend(chars.take_while(|c| c.is_ascii_lowercase()));
    Some(symbol)
}

fn read_cell(block: &CifBlock) -> Result<Option<Cell>, CifError> {
    let number = |tag: &str| -> Result<Option<f64>, CifError> {
        match block.items.get(tag) {
            Some(token) if !is_unknown(token) => parse_number(token).map(Some),
            _ => Ok(None),
        }
    };

    let lengths = [
        number("_cell_length_a")?,
        number("_cell_length_b")?,
        number("_cell_length_c")?,
    ];
    if lengths.iter().all(Option::is_none) {
        return Ok(None);
    }
    let mut resolved = [0.0; 3];
    for (slot, (value, axis)) in resolved.iter_mut().zip(lengths.iter().zip(['a', 'b', 'c'])) {
        *slot = value.ok_or_else(|| CifError::MissingTag(format!("_cell_length_{}", axis)))?;
    }
    let angles = [
        number("_cell_angle_alpha")?.unwrap_or(90.0),
        number("_cell_angle_beta")?.unwrap_or(90.0),
        number("_cell_angle_gamma")?.unwrap_or(90.0),
    ];
    Ok(Some(Cell::from_parameters(resolved, angles)?))
}

fn warn_on_symmetry(block: &CifBlock) {
    let space_group = ["_symmetry_space_group_name_h-m", "_space_group_name_h-m_alt"]
        .iter()
        .find_map(|tag| block.items.get(*tag));
    if let Some(group) = space_group {
        let compact: String = group.text.split_whitespace().collect();
        if !compact.eq_ignore_ascii_case("p1") {
            warn!(
                space_group = %group.text,
                "Symmetry operators are not applied; only the listed atom sites are read."
            );
        }
    }
}

/// P1 crystallographic information files: the cell, the atom-site loop and, on output, the
/// geometric bond loop.
pub struct CifFile;

impl CifFile {
    /// Like [`StructureFile::write_to`], but fails with
    /// [`StructureError::PrematureSerialization`] instead of omitting the bond loop when no
    /// bond network has been built.
    pub fn write_with_bonds(
        structure: &StructureModel,
        metadata: &CifMetadata,
        writer: &mut impl Write,
    ) -> Result<(), CifError> {
        let bond_block = structure.geom_bond_block()?;
        Self::write_sites(structure, metadata, writer)?;
        writeln!(writer)?;
        write!(writer, "{}", bond_block)?;
        Ok(())
    }

    fn write_sites(
        structure: &StructureModel,
        metadata: &CifMetadata,
        writer: &mut impl Write,
    ) -> Result<(), CifError> {
        let cell = structure.cell().ok_or(CifError::MissingCell)?;
        let [a, b, c] = cell.lengths();
        let name = if metadata.data_block.is_empty() {
            DEFAULT_DATA_BLOCK
        } else {
            metadata.data_block.as_str()
        };

        writeln!(writer, "data_{}", name)?;
        writeln!(writer, "_symmetry_space_group_name_H-M    'P 1'")?;
        writeln!(writer, "_symmetry_Int_Tables_number       1")?;
        writeln!(writer)?;
        writeln!(writer, "_cell_length_a       {:.6}", a)?;
        writeln!(writer, "_cell_length_b       {:.6}", b)?;
        writeln!(writer, "_cell_length_c       {:.6}", c)?;
        writeln!(writer, "_cell_angle_alpha    {:.6}", 90.0)?;
        writeln!(writer, "_cell_angle_beta     {:.6}", 90.0)?;
        writeln!(writer, "_cell_angle_gamma    {:.6}", 90.0)?;
        writeln!(writer)?;
        writeln!(writer, "loop_")?;
        writeln!(writer, "_atom_site_label")?;
        writeln!(writer, "_atom_site_type_symbol")?;
        writeln!(writer, "_atom_site_fract_x")?;
        writeln!(writer, "_atom_site_fract_y")?;
        writeln!(writer, "_atom_site_fract_z")?;
        for (_, atom) in structure.atoms() {
            let fractional = cell.to_fractional(&atom.position);
            writeln!(
                writer,
                "  {:<8} {:<4} {:>12.8} {:>12.8} {:>12.8}",
                atom.cif_name(),
                atom.element,
                fractional.x,
                fractional.y,
                fractional.z
            )?;
        }
        Ok(())
    }
}

impl StructureFile for CifFile {
    type Metadata = CifMetadata;
    type Error = CifError;

    fn read_from(
        reader: &mut impl BufRead,
        defaults: &FieldDefaults,
    ) -> Result<(StructureModel, Self::Metadata), Self::Error> {
        let block = parse_block(tokenize(reader)?)?;
        warn_on_symmetry(&block);
        let cell = read_cell(&block)?;

        let sites = block
            .loops
            .iter()
            .find(|l| {
                l.column("_atom_site_fract_x").is_some() || l.column("_atom_site_cartn_x").is_some()
            })
            .ok_or_else(|| CifError::MissingTag("_atom_site_fract_x".into()))?;

        let fractional = sites.column("_atom_site_fract_x").is_some();
        let axes = if fractional {
            ["_atom_site_fract_x", "_atom_site_fract_y", "_atom_site_fract_z"]
        } else {
            ["_atom_site_cartn_x", "_atom_site_cartn_y", "_atom_site_cartn_z"]
        };
        let axis_columns = axes
            .iter()
            .map(|tag| sites.column(tag).ok_or_else(|| CifError::MissingTag(tag.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        if fractional && cell.is_none() {
            return Err(CifError::MissingTag("_cell_length_a".into()));
        }

        let symbol_column = sites.column("_atom_site_type_symbol");
        let label_column = sites.column("_atom_site_label");

        let mut builder = StructureBuilder::new();
        builder.defaults(defaults.clone());
        if let Some(cell) = cell {
            builder.cell(cell);
        }

        for row in &sites.rows {
            let element = [symbol_column, label_column]
                .into_iter()
                .flatten()
                .map(|column| &row[column])
                .find(|token| !is_unknown(token))
                .and_then(|token| element_from(&token.text));

            let mut coordinates = [None; 3];
            for (slot, &column) in coordinates.iter_mut().zip(&axis_columns) {
                let token = &row[column];
                if !is_unknown(token) {
                    *slot = Some(parse_number(token)?);
                }
            }
            if let (true, Some(cell), [Some(x), Some(y), Some(z)]) =
                (fractional, cell.as_ref(), coordinates)
            {
                let cartesian = cell.to_cartesian(&Point3::new(x, y, z));
                coordinates = [Some(cartesian.x), Some(cartesian.y), Some(cartesian.z)];
            }

            builder.add_raw(RawAtom {
                element,
                x: coordinates[0],
                y: coordinates[1],
                z: coordinates[2],
                residue: None,
                charge: None,
            });
        }

        let (structure, warnings) = builder.build()?;
        debug!(atoms = structure.len(), block = %block.name, "Read CIF atom sites.");
        Ok((
            structure,
            CifMetadata {
                data_block: block.name,
                warnings,
            },
        ))
    }

    /// Writes the cell and atom sites, followed by the geometric bond loop when a bond
    /// network is installed.
    fn write_to(
        structure: &StructureModel,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        if structure.bonds().is_some() {
            Self::write_with_bonds(structure, metadata, writer)
        } else {
            Self::write_sites(structure, metadata, writer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::Periodicity;
    use crate::core::models::graph::{BondNetwork, GEOM_BOND_LOOP_HEADER};
    use std::io::Cursor;

    const QUARTZ_LIKE: &str = "\
data_test
_symmetry_space_group_name_H-M 'P 1'
_cell_length_a 10.0(2)
_cell_length_b 10.0
_cell_length_c 5.0
_cell_angle_alpha 90
_cell_angle_beta 90.0
_cell_angle_gamma 90
# atom sites
loop_
_atom_site_label
_atom_site_type_symbol
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Si1 Si 0.0 0.0 0.0
O1 O2- 0.16 0.0 0.0
O2 ? 0.5 0.5 0.5
";

    fn read(content: &str) -> Result<(StructureModel, CifMetadata), CifError> {
        CifFile::read_from(&mut Cursor::new(content), &FieldDefaults::default())
    }

    #[test]
    fn tokenizer_handles_quotes_comments_and_text_fields() {
        let content = "_a 'it''s here' # note\n_b \"x y\"\n;\nline one\nline two\n;\n";
        let tokens = tokenize(&mut Cursor::new(content)).unwrap();
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["_a", "it''s here", "_b", "x y", "line one\nline two"]);
        assert_eq!(tokens[4].line, 3);
    }

    #[test]
    fn element_symbols_are_taken_from_type_symbols_and_labels() {
        assert_eq!(element_from("Si4+").as_deref(), Some("Si"));
        assert_eq!(element_from("O12A").as_deref(), Some("O"));
        assert_eq!(element_from("si").as_deref(), Some("Si"));
        assert_eq!(element_from("123"), None);
    }

    #[test]
    fn reads_cell_and_fractional_sites() {
        let (structure, metadata) = read(QUARTZ_LIKE).unwrap();
        assert_eq!(metadata.data_block, "test");
        assert_eq!(metadata.warnings.len(), 3);
        assert_eq!(structure.cell().unwrap().lengths(), [10.0, 10.0, 5.0]);
        assert_eq!(structure.periodicity(), Periodicity::ALL);

        let atoms: Vec<_> = structure
            .atoms()
            .map(|(_, a)| (a.element.clone(), a.position))
            .collect();
        assert_eq!(atoms[0], ("Si".to_string(), Point3::new(0.0, 0.0, 0.0)));
        assert_eq!(atoms[1].0, "O");
        assert!((atoms[1].1.x - 1.6).abs() < 1e-12);
        assert_eq!(atoms[2], ("O".to_string(), Point3::new(5.0, 5.0, 2.5)));
    }

    #[test]
    fn cartesian_sites_without_a_cell_are_non_periodic() {
        let content = "data_x\nloop_\n_atom_site_label\n_atom_site_Cartn_x\n_atom_site_Cartn_y\n_atom_site_Cartn_z\nC1 1.0 2.0 3.0\n";
        let (structure, _) = read(content).unwrap();
        assert!(structure.cell().is_none());
        assert_eq!(structure.periodicity(), Periodicity::NONE);
        assert_eq!(structure.atoms().next().unwrap().1.position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn oblique_cells_are_rejected() {
        let content = QUARTZ_LIKE.replace("_cell_angle_gamma 90", "_cell_angle_gamma 120");
        assert!(matches!(
            read(&content).unwrap_err(),
            CifError::Cell(CellError::NonOrthogonal { angle: "gamma", .. })
        ));
    }

    #[test]
    fn fractional_sites_require_a_cell() {
        let content = "data_x\nloop_\n_atom_site_label\n_atom_site_fract_x\n_atom_site_fract_y\n_atom_site_fract_z\nC1 0.1 0.2 0.3\n";
        assert!(matches!(read(content).unwrap_err(), CifError::MissingTag(_)));
    }

    #[test]
    fn unknown_coordinate_is_a_missing_field() {
        let content = QUARTZ_LIKE.replace("O2 ? 0.5 0.5 0.5", "O2 O 0.5 ? 0.5");
        assert!(matches!(
            read(&content).unwrap_err(),
            CifError::Structure(StructureError::MissingField { row: 2, field: "y" })
        ));
    }

    #[test]
    fn ragged_loops_are_parse_errors() {
        let content = QUARTZ_LIKE.replace("O2 ? 0.5 0.5 0.5", "O2 ? 0.5 0.5");
        assert!(matches!(read(&content).unwrap_err(), CifError::Parse { .. }));
    }

    #[test]
    fn write_with_bonds_requires_a_build() {
        let (structure, metadata) = read(QUARTZ_LIKE).unwrap();
        let mut buffer = Vec::<u8>::new();
        assert!(matches!(
            CifFile::write_with_bonds(&structure, &metadata, &mut buffer),
            Err(CifError::Structure(StructureError::PrematureSerialization))
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn written_file_carries_sites_and_bond_loop() {
        let (mut structure, metadata) = read(QUARTZ_LIKE).unwrap();
        structure.ensure_node_names();
        let mut network = BondNetwork::new();
        network.insert((0, "Si_0"), (1, "O_1"), 1.6);
        structure.install_bonds(network).unwrap();

        let mut buffer = Vec::new();
        CifFile::write_to(&structure, &metadata, &mut buffer).unwrap();
        let written = String::from_utf8(buffer).unwrap();

        assert!(written.starts_with("data_test\n"));
        assert!(written.contains("_cell_length_c       5.000000\n"));
        assert!(written.contains("  O2       O      0.50000000   0.50000000   0.50000000\n"));
        let expected_tail = format!(
            "\n{}Si1        O1             1.6000\n",
            GEOM_BOND_LOOP_HEADER
        );
        assert!(written.ends_with(&expected_tail));

        let (reread, _) = read(&written).unwrap();
        assert_eq!(reread.len(), 3);
        assert_eq!(reread.cell(), structure.cell());
    }

    #[test]
    fn writing_without_a_cell_fails() {
        let content = "data_x\nloop_\n_atom_site_label\n_atom_site_Cartn_x\n_atom_site_Cartn_y\n_atom_site_Cartn_z\nC1 1.0 2.0 3.0\n";
        let (structure, metadata) = read(content).unwrap();
        assert!(matches!(
            CifFile::write_to(&structure, &metadata, &mut Vec::<u8>::new()),
            Err(CifError::MissingCell)
        ));
    }
}
