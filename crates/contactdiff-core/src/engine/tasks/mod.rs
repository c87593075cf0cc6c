//! Computational units of a contact comparison.
//!
//! Each task is a pure function of its inputs (plus an optional progress reporter) and
//! validates its own parameters, so tasks can be composed freely outside the workflows.

pub mod clustering;
pub mod communicability;
pub mod difference;
pub mod occupancy;
pub mod transitions;
