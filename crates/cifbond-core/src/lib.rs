//! # cifbond Core Library
//!
//! Bond perception for periodic crystal structures with orthorhombic cells: atoms closer than
//! the sum of their covalent radii plus a tolerance, measured under the minimum-image
//! convention, are bonded, and the resulting network is serialized as a CIF geometric bond
//! loop.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split throughout.
//!
//! - **[`core`]: The Foundation.** Data models (`StructureModel`, `BondNetwork`), covalent
//!   radii, the periodic neighbor search and file I/O.
//!
//! - **[`engine`]: The Logic Core.** `BondGraphBuilder` scans element pairs and produces a new
//!   bond network and build report on every call.
//!
//! - **[`workflows`]: The Public API.** `connect::run` names atoms, builds and installs the
//!   network in one step.

pub mod core;
pub mod engine;
pub mod workflows;
