//! # Core Models Module
//!
//! Data structures describing a periodic structure and the bond network derived from it.
//!
//! ## Overview
//!
//! A [`structure::StructureModel`] owns an arena of [`atom::AtomRecord`]s together with an
//! orthorhombic [`cell::Cell`] and per-axis [`cell::Periodicity`] flags. Each atom carries two
//! identities:
//!
//! - **node name** - `"<element>_<serial>"`, assigned once and used to key bond graphs
//! - **CIF name** - `"<element><n>"`, renumbered per element whenever rows are reordered
//!
//! A bond build produces a [`graph::BondNetwork`] (undirected graph plus canonical distance
//! map) which the structure stores wholesale and serializes through its CIF names.
//!
//! ## Key Components
//!
//! - [`atom`] - Atom rows and their two identity schemes
//! - [`cell`] - Orthorhombic cells, periodic flags and image shifts
//! - [`structure`] - The atom table, its row order and lifecycle state
//! - [`graph`] - Bond graph, distance map and bond-record lines
//! - [`builder`] - Validated ingestion of raw tabular rows
//! - [`defaults`] - Configured values for absent atom-table fields
//! - [`ids`] - Arena key types
//!
//! ## Usage
//!
//! ```ignore
//! use cifbond::core::models::builder::StructureBuilder;
//!
//! let mut builder = StructureBuilder::new();
//! builder.cell_lengths(10.0, 10.0, 10.0).add_atom("O", [0.0, 0.0, 0.0]);
//! let (mut structure, warnings) = builder.build()?;
//! structure.ensure_node_names();
//! ```

pub mod atom;
pub mod builder;
pub mod cell;
pub mod defaults;
pub mod graph;
pub mod ids;
pub mod structure;
