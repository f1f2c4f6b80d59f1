//! # Core Module
//!
//! This module provides the stateless building blocks of the library: the variable graph,
//! pair coefficient storage, pair potentials, ensembles, and the numerical routines they
//! share.
//!
//! ## Overview
//!
//! Everything the optimizer adjusts is a variable in a single arena. Pair potentials read
//! their coefficients through that arena, so a change to one variable is seen by every
//! potential and every dependent variable built on it. Derivatives with respect to any
//! variable flow through the dependency graph and the coefficient slots by the chain rule.
//!
//! ## Architecture
//!
//! - **Variables** ([`variable`]) - Free and dependent variables with chain-rule derivatives
//! - **Pair Parameters** ([`pair`]) - Per-pair coefficient matrices with shared defaults and TOML persistence
//! - **Potentials** ([`potential`]) - Pair interactions with common cutoff and shift handling, and tabulation
//! - **Ensembles** ([`ensemble`]) - Thermodynamic state, simulation boxes, and radial distribution functions
//! - **Math** ([`math`]) - Akima interpolation and trapezoid integration
//! - **File I/O** ([`io`]) - Scoped output directories for diagnostics
//!
//! ## Key Capabilities
//!
//! - **Arena-backed dependency graph** with bounds, constants and aliases
//! - **Analytic parameter derivatives** for Lennard-Jones, Yukawa, depletion and spline potentials
//! - **Table regularization** for force capping, tail cutoff and energy shifting
//! - **Triclinic volumes** computed from box edge vectors

pub mod ensemble;
pub mod io;
pub mod math;
pub mod pair;
pub mod potential;
pub mod variable;
