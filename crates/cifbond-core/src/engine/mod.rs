//! # Engine Module
//!
//! Bond-graph construction for periodic structures.
//!
//! ## Overview
//!
//! The engine turns a [`StructureModel`](crate::core::models::structure::StructureModel) and a
//! covalent-radius table into a [`BondNetwork`](crate::core::models::graph::BondNetwork). For
//! every configured element pair it runs one periodic neighbor search with the threshold
//! `radius(e1) + radius(e2) + tolerance` and records each bonded pair exactly once.
//!
//! ## Architecture
//!
//! - **Construction** ([`builder`]) - The per-pair scan and canonical bond bookkeeping
//! - **Configuration** ([`config`]) - Tolerance and element-pair selection
//! - **Reporting** ([`report`]) - Warnings and statistics returned with each build
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! Builds are synchronous and single-threaded. A build only reads the structure (apart from
//! assigning missing node names) and returns its result by value; storing that result is
//! left to the caller.

pub mod builder;
pub mod config;
pub mod error;
pub mod progress;
pub mod report;
