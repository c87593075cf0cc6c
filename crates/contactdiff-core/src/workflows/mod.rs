//! # Workflows Module
//!
//! High-level entry points that tie the [`crate::engine`] tasks together.
//!
//! - **Comparison Workflow** ([`compare`]) - Selection, residue matching, occupancy for both
//!   conditions, the differential network under each configured policy, and the optional
//!   communicability, clustering, and contact-transition phases
//! - **Reports** ([`report`]) - Delimited-text tables for every result of a comparison

pub mod compare;
pub mod report;
