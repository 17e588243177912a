//! Reading and writing periodic structures.
//!
//! [`traits::StructureFile`] is the common interface for full-structure formats
//! ([`xyz`] and [`cif`]); every reader ingests through the validated structure builder.
//! [`format`] renders the atom table as PDB, GRO or plain XYZ rows through one row
//! formatting interface.

pub mod cif;
pub mod format;
pub mod traits;
pub mod xyz;
