use itertools::iproduct;
use nalgebra::{Matrix3, Point3, Vector3};
use std::fmt;
use thiserror::Error;

/// Largest magnitude an off-diagonal cell component may have before the cell is
/// treated as non-orthorhombic.
pub const OFF_DIAGONAL_TOLERANCE: f64 = 1e-8;

/// Largest deviation from 90 degrees accepted for a cell angle.
pub const RIGHT_ANGLE_TOLERANCE: f64 = 1e-6;

const AXIS_NAMES: [char; 3] = ['a', 'b', 'c'];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CellError {
    #[error("Cell matrix has a non-zero off-diagonal component {value} at ({row}, {col}); only orthorhombic cells are supported")]
    NonDiagonal { row: usize, col: usize, value: f64 },

    #[error("Cell angle {angle} is {value} degrees; only orthorhombic cells are supported")]
    NonOrthogonal { angle: &'static str, value: f64 },

    #[error("Cell length along '{axis}' must be positive and finite (got {value})")]
    InvalidLength { axis: char, value: f64 },

    #[error("Periodic boundaries were requested but no cell is defined")]
    Missing,
}

/// Per-axis periodic boundary flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Periodicity(pub [bool; 3]);

impl Periodicity {
    pub const ALL: Self = Self([true, true, true]);
    pub const NONE: Self = Self([false, false, false]);

    #[inline]
    pub fn is_periodic(&self, axis: usize) -> bool {
        self.0[axis]
    }

    #[inline]
    pub fn any(&self) -> bool {
        self.0.iter().any(|&flag| flag)
    }

    fn shift_range(&self, axis: usize) -> std::ops::RangeInclusive<i32> {
        if self.0[axis] { -1..=1 } else { 0..=0 }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |b: bool| if b { 'T' } else { 'F' };
        write!(f, "{} {} {}", flag(self.0[0]), flag(self.0[1]), flag(self.0[2]))
    }
}

/// An orthorhombic simulation cell described by its three edge lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    lengths: Vector3<f64>,
}

impl Cell {
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<Self, CellError> {
        for (axis, value) in AXIS_NAMES.iter().zip([a, b, c]) {
            if !value.is_finite() || value <= 0.0 {
                return Err(CellError::InvalidLength { axis: *axis, value });
            }
        }
        Ok(Self {
            lengths: Vector3::new(a, b, c),
        })
    }

    /// Builds a cell from row-vector lattice matrix, rejecting any shear component.
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Result<Self, CellError> {
        for row in 0..3 {
            for col in 0..3 {
                let value = matrix[(row, col)];
                if row != col && value.abs() > OFF_DIAGONAL_TOLERANCE {
                    return Err(CellError::NonDiagonal { row, col, value });
                }
            }
        }
        Self::orthorhombic(matrix[(0, 0)], matrix[(1, 1)], matrix[(2, 2)])
    }

    /// Builds a cell from crystallographic parameters; all angles must be right angles.
    pub fn from_parameters(lengths: [f64; 3], angles: [f64; 3]) -> Result<Self, CellError> {
        for (name, value) in ["alpha", "beta", "gamma"].into_iter().zip(angles) {
            if (value - 90.0).abs() > RIGHT_ANGLE_TOLERANCE {
                return Err(CellError::NonOrthogonal { angle: name, value });
            }
        }
        Self::orthorhombic(lengths[0], lengths[1], lengths[2])
    }

    #[inline]
    pub fn lengths(&self) -> [f64; 3] {
        [self.lengths.x, self.lengths.y, self.lengths.z]
    }

    pub fn to_fractional(&self, position: &Point3<f64>) -> Point3<f64> {
        Point3::from(position.coords.component_div(&self.lengths))
    }

    pub fn to_cartesian(&self, fractional: &Point3<f64>) -> Point3<f64> {
        Point3::from(fractional.coords.component_mul(&self.lengths))
    }

    /// Lattice translations `(dx·a, dy·b, dz·c)` for every image considered under
    /// `periodicity`, with `dx, dy, dz ∈ {-1, 0, 1}` on periodic axes and `0` elsewhere.
    pub fn image_shifts(&self, periodicity: Periodicity) -> Vec<Vector3<f64>> {
        iproduct!(
            periodicity.shift_range(0),
            periodicity.shift_range(1),
            periodicity.shift_range(2)
        )
        .map(|(dx, dy, dz)| {
            Vector3::new(
                dx as f64 * self.lengths.x,
                dy as f64 * self.lengths.y,
                dz as f64 * self.lengths.z,
            )
        })
        .collect()
    }

    /// `position` folded into `[0, L)` along each periodic axis; other axes are untouched.
    pub fn wrap(&self, position: &Point3<f64>, periodicity: Periodicity) -> Point3<f64> {
        let mut wrapped = *position;
        for axis in 0..3 {
            if periodicity.is_periodic(axis) {
                wrapped[axis] = position[axis].rem_euclid(self.lengths[axis]);
            }
        }
        wrapped
    }

    /// Smallest distance from `a` to any image of `b` within the shift set of `periodicity`.
    /// Both points are wrapped first, so they may lie any number of cells away.
    pub fn minimum_image_distance(
        &self,
        a: &Point3<f64>,
        b: &Point3<f64>,
        periodicity: Periodicity,
    ) -> f64 {
        let (a, b) = (self.wrap(a, periodicity), self.wrap(b, periodicity));
        self.image_shifts(periodicity)
            .iter()
            .map(|shift| (a - (b + shift)).norm())
            .fold(f64::INFINITY, f64::min)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4} x {:.4} x {:.4}",
            self.lengths.x, self.lengths.y, self.lengths.z
        )
    }
}
