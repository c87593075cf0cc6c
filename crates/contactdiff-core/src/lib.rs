//! # contactdiff Core Library
//!
//! Comparative residue contact network analysis for pairs of molecular simulation
//! ensembles, typically a ligand-bound and a ligand-free state of the same protein.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture so that each layer can be tested
//! on its own and the numerical engine never touches the filesystem.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Topology`, `Trajectory`,
//!   `ResidueKey`), the `CoordinateProvider` abstraction, residue identifiers, and a
//!   multi-model PDB reader.
//!
//! - **[`engine`]: The Logic Core.** Residue matching, contact occupancy, the differential
//!   contact network with its significance policies, communicability, clustering, and atom
//!   contact transitions. Every task is a pure function of its inputs and a progress reporter.
//!
//! - **[`workflows`]: The Public API.** Runs a complete two-condition comparison and writes
//!   its results as delimited tables.

pub mod core;
pub mod engine;
pub mod workflows;
