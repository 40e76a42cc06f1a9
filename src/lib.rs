//! Compound-interest solvers for "when will my savings cross a target".
//!
//! [`core`] holds the pure numerics: a closed-form crossing time for two
//! compounding curves, a Newton's-method solver for principal plus regular
//! contributions racing an inflation-adjusted target, and curve projection.
//! The remaining modules load configuration, render charts, persist history
//! and expose the CLI and HTTP front ends.

pub mod api;
pub mod config;
pub mod core;
pub mod plot;
pub mod store;
