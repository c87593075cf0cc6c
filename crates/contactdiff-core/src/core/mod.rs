//! # Core Module
//!
//! Fundamental data structures shared by the engine and the workflows.
//!
//! - **Molecular Representation** ([`models`]) - Topologies (chains, residues, atoms), residue
//!   keys, and per-frame coordinates behind the [`models::trajectory::CoordinateProvider`] trait
//! - **File I/O** ([`io`]) - Structure readers producing a topology and its trajectory
//! - **Identifiers** ([`utils`]) - Residue name sets and element helpers
//!
//! Nothing in this module performs analysis; it only describes what was simulated.

pub mod io;
pub mod models;
pub mod utils;
