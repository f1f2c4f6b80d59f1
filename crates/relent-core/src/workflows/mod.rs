//! # Workflows Module
//!
//! High-level entry points that run a complete parameter fit.
//!
//! ## Overview
//!
//! Workflows tie the `engine` and `core` layers together. They build the optimizer from
//! configuration, run it against an objective with progress reporting, and collect the
//! outcome into a report.
//!
//! ## Architecture
//!
//! - **Fit Workflow** ([`fit`]) - Minimizes an objective function over its design variables
//!   with the configured descent method.

pub mod fit;
