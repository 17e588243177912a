//! Element parameters used to decide bonding.
//!
//! - [`radii`] - Covalent radii, their built-in defaults and file loaders

pub mod radii;
