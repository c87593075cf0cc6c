//! # Core Models Module
//!
//! Data structures describing the systems being compared: a [`topology::Topology`]
//! (chains, residues, atoms with element symbols) and a coordinate provider
//! ([`trajectory::CoordinateProvider`]) that supplies per-frame atomic positions.
//!
//! ## Key Components
//!
//! - [`atom`] - Atom identity (flat index, name, element)
//! - [`residue`] - Residues with their atoms, identity key and report label
//! - [`chain`] - Ordered residue groupings
//! - [`topology`] - The immutable topology and chain/protein selection
//! - [`builder`] - Incremental topology construction used by readers
//! - [`ids`] - The cross-topology [`ids::ResidueKey`]
//! - [`trajectory`] - Coordinate provider trait and the in-memory trajectory
//!
//! ## Usage
//!
//! ```ignore
//! use contactdiff::core::models::builder::TopologyBuilder;
//!
//! let mut builder = TopologyBuilder::new();
//! builder.start_chain('A');
//! builder.start_residue(1, "ALA")?;
//! builder.add_atom(1, "CA", "C")?;
//! let topology = builder.build();
//! ```

pub mod atom;
pub mod builder;
pub mod chain;
pub mod ids;
pub mod residue;
pub mod topology;
pub mod trajectory;
