//! # Engine Module
//!
//! The analysis engine: everything between a pair of loaded structures and the tables a
//! comparison reports.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Typed parameters with validated defaults and a builder
//! - **Residue Matching** ([`correspondence`]) - Shared index space over two topologies
//! - **Tasks** ([`tasks`]) - Occupancy, differential network, communicability, clustering,
//!   and atom contact transitions
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! Pairwise occupancy runs on the rayon thread pool when the `parallel` feature is enabled;
//! results are merged in pair order, so they do not depend on the number of threads.

pub mod config;
pub mod correspondence;
pub mod error;
pub mod progress;
pub mod tasks;
