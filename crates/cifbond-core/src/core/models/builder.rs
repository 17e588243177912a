use super::cell::{Cell, CellError, Periodicity};
use super::defaults::FieldDefaults;
use super::structure::{StructureError, StructureModel};
use nalgebra::{Matrix3, Point3};
use std::fmt;
use tracing::warn;

/// One row of raw tabular input. Every field may be absent; the builder decides which
/// absences are fatal and which are filled from [`FieldDefaults`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAtom {
    pub element: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub residue: Option<String>,
    pub charge: Option<f64>,
}

impl RawAtom {
    pub fn new(element: &str, position: [f64; 3]) -> Self {
        Self {
            element: Some(element.to_string()),
            x: Some(position[0]),
            y: Some(position[1]),
            z: Some(position[2]),
            ..Default::default()
        }
    }

    pub fn with_residue(mut self, residue: &str) -> Self {
        self.residue = Some(residue.to_string());
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = Some(charge);
        self
    }
}

/// A recoverable condition met while ingesting rows.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestWarning {
    /// An absent optional field was filled with a configured default.
    DefaultedField {
        row: usize,
        field: &'static str,
        value: String,
    },
}

impl fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestWarning::DefaultedField { row, field, value } => {
                write!(f, "row {}: '{}' is missing, using default '{}'", row, field, value)
            }
        }
    }
}

#[derive(Debug, Clone)]
enum CellSource {
    Lengths([f64; 3]),
    Matrix(Matrix3<f64>),
    Resolved(Cell),
}

impl CellSource {
    fn resolve(&self) -> Result<Cell, CellError> {
        match self {
            CellSource::Lengths([a, b, c]) => Cell::orthorhombic(*a, *b, *c),
            CellSource::Matrix(matrix) => Cell::from_matrix(matrix),
            CellSource::Resolved(cell) => Ok(*cell),
        }
    }
}

/// Collects raw rows, a cell and periodic flags, and validates them into a
/// [`StructureModel`] in one step.
#[derive(Debug, Clone, Default)]
pub struct StructureBuilder {
    rows: Vec<RawAtom>,
    cell: Option<CellSource>,
    periodicity: Option<Periodicity>,
    defaults: FieldDefaults,
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defaults(&mut self, defaults: FieldDefaults) -> &mut Self {
        self.defaults = defaults;
        self
    }

    pub fn cell(&mut self, cell: Cell) -> &mut Self {
        self.cell = Some(CellSource::Resolved(cell));
        self
    }

    pub fn cell_lengths(&mut self, a: f64, b: f64, c: f64) -> &mut Self {
        self.cell = Some(CellSource::Lengths([a, b, c]));
        self
    }

    /// Sets the cell from a row-vector lattice matrix; shear components are rejected at
    /// [`build`](Self::build) time.
    pub fn cell_matrix(&mut self, matrix: Matrix3<f64>) -> &mut Self {
        self.cell = Some(CellSource::Matrix(matrix));
        self
    }

    /// Overrides the periodic flags. Without this, a structure with a cell is periodic
    /// along every axis and one without is not periodic at all.
    pub fn periodicity(&mut self, periodicity: Periodicity) -> &mut Self {
        self.periodicity = Some(periodicity);
        self
    }

    pub fn add_raw(&mut self, row: RawAtom) -> &mut Self {
        self.rows.push(row);
        self
    }

    pub fn add_atom(&mut self, element: &str, position: [f64; 3]) -> &mut Self {
        self.add_raw(RawAtom::new(element, position))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn build(self) -> Result<(StructureModel, Vec<IngestWarning>), StructureError> {
        let cell = self.cell.as_ref().map(CellSource::resolve).transpose()?;
        let periodicity = self.periodicity.unwrap_or(if cell.is_some() {
            Periodicity::ALL
        } else {
            Periodicity::NONE
        });
        if periodicity.any() && cell.is_none() {
            return Err(CellError::Missing.into());
        }

        let mut structure = StructureModel::new(cell, periodicity);
        let mut warnings = Vec::new();

        for (row, raw) in self.rows.into_iter().enumerate() {
            let element = raw
                .element
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .ok_or(StructureError::MissingField {
                    row,
                    field: "element",
                })?;
            let x = raw.x.ok_or(StructureError::MissingField { row, field: "x" })?;
            let y = raw.y.ok_or(StructureError::MissingField { row, field: "y" })?;
            let z = raw.z.ok_or(StructureError::MissingField { row, field: "z" })?;

            let residue = match raw.residue.as_deref().map(str::trim) {
                Some(residue) if !residue.is_empty() => residue.to_string(),
                _ => {
                    warnings.push(IngestWarning::DefaultedField {
                        row,
                        field: "residue",
                        value: self.defaults.residue_name.clone(),
                    });
                    self.defaults.residue_name.clone()
                }
            };

            let id = structure.add_atom(element, Point3::new(x, y, z), &residue)?;
            if let Some(atom) = structure.atom_mut(id) {
                atom.charge = raw.charge;
            }
        }

        if !warnings.is_empty() {
            warn!(
                rows = warnings.len(),
                residue = %self.defaults.residue_name,
                "Rows without a residue name were given the default residue name."
            );
        }

        Ok((structure, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::structure::StructureState;

    #[test]
    fn builds_a_periodic_structure_when_a_cell_is_given() {
        let mut builder = StructureBuilder::new();
        builder
            .cell_lengths(10.0, 10.0, 10.0)
            .add_raw(RawAtom::new("Si", [0.0, 0.0, 0.0]).with_residue("QTZ"))
            .add_raw(RawAtom::new("O", [1.6, 0.0, 0.0]).with_residue("QTZ").with_charge(-1.2));
        let (structure, warnings) = builder.build().unwrap();

        assert!(warnings.is_empty());
        assert_eq!(structure.len(), 2);
        assert_eq!(structure.periodicity(), Periodicity::ALL);
        assert_eq!(structure.cell().unwrap().lengths(), [10.0, 10.0, 10.0]);
        assert_eq!(structure.state(), StructureState::Loaded);

        let atoms: Vec<_> = structure.atoms().map(|(_, a)| a.clone()).collect();
        assert_eq!(atoms[0].serial, 0);
        assert_eq!(atoms[1].serial, 1);
        assert_eq!(atoms[1].charge, Some(-1.2));
        assert_eq!(atoms[1].residue, "QTZ");
    }

    #[test]
    fn missing_residue_is_defaulted_and_reported() {
        let mut builder = StructureBuilder::new();
        builder.add_atom("O", [0.0, 0.0, 0.0]);
        let (structure, warnings) = builder.build().unwrap();

        assert_eq!(structure.periodicity(), Periodicity::NONE);
        assert_eq!(
            warnings,
            vec![IngestWarning::DefaultedField {
                row: 0,
                field: "residue",
                value: "SIO".into()
            }]
        );
        assert_eq!(structure.atoms().next().unwrap().1.residue, "SIO");
    }

    #[test]
    fn missing_coordinate_is_a_hard_failure() {
        let mut builder = StructureBuilder::new();
        builder.add_atom("O", [0.0, 0.0, 0.0]).add_raw(RawAtom {
            element: Some("Si".into()),
            x: Some(1.0),
            y: None,
            z: Some(1.0),
            ..Default::default()
        });
        assert_eq!(
            builder.build().unwrap_err(),
            StructureError::MissingField { row: 1, field: "y" }
        );
    }

    #[test]
    fn blank_element_is_a_hard_failure() {
        let mut builder = StructureBuilder::new();
        builder.add_atom("  ", [0.0, 0.0, 0.0]);
        assert_eq!(
            builder.build().unwrap_err(),
            StructureError::MissingField {
                row: 0,
                field: "element"
            }
        );
    }

    #[test]
    fn sheared_cell_matrix_is_rejected() {
        let mut builder = StructureBuilder::new();
        builder.cell_matrix(Matrix3::new(5.0, 0.5, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 5.0));
        assert!(matches!(
            builder.build(),
            Err(StructureError::Cell(CellError::NonDiagonal { row: 0, col: 1, .. }))
        ));
    }

    #[test]
    fn periodic_flags_without_a_cell_are_rejected() {
        let mut builder = StructureBuilder::new();
        builder.periodicity(Periodicity([true, false, false]));
        assert_eq!(
            builder.build().unwrap_err(),
            StructureError::Cell(CellError::Missing)
        );
    }

    #[test]
    fn custom_residue_default_is_used() {
        let mut builder = StructureBuilder::new();
        builder
            .defaults(FieldDefaults {
                residue_name: "ZEO".into(),
                ..Default::default()
            })
            .add_atom("Si", [0.0, 0.0, 0.0]);
        let (structure, warnings) = builder.build().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(structure.atoms().next().unwrap().1.residue, "ZEO");
    }
}
