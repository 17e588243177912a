//! # Core Module
//!
//! The foundation layer: data models, element parameters, geometry and file I/O.
//!
//! ## Architecture
//!
//! - **Structure Representation** ([`models`]) - Atoms, cells, the structure model and bond networks
//! - **Element Parameters** ([`params`]) - Covalent radii with built-in defaults and file loaders
//! - **Geometry** ([`geometry`]) - Periodic minimum-image neighbor search
//! - **File I/O** ([`io`]) - XYZ and CIF structure files and PDB/GRO/XYZ row tables
//!
//! Nothing in this layer keeps state between calls; the only stored result is the bond
//! network a caller installs into a structure model.

pub mod geometry;
pub mod io;
pub mod models;
pub mod params;
