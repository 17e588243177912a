//! Geometric primitives.
//!
//! - [`periodic`] - Minimum-image neighbor search over orthorhombic periodic images

pub mod periodic;
