//! Provides input functionality for structure and trajectory file formats.
//!
//! Readers turn a file into a [`Topology`](crate::core::models::topology::Topology) plus an
//! in-memory [`Trajectory`](crate::core::models::trajectory::Trajectory) behind the
//! [`traits::StructureFile`] interface.

pub mod pdb;
pub mod traits;
