//! # Workflows Module
//!
//! High-level entry points that tie the [`engine`](crate::engine) and
//! [`core`](crate::core) layers together.
//!
//! - **Connect Workflow** ([`connect`]) - Names atoms, builds the bond network and installs
//!   it into the structure, ready for serialization.

pub mod connect;
