//! # Relent
//!
//! A library for fitting parametrized pair potentials so that a model reproduces the
//! structure of a target ensemble, by minimizing the relative entropy between the two.
//!
//! ## Architectural Philosophy
//!
//! The library follows a layered architecture that keeps the physics, the optimization
//! state, and the user-facing procedures apart.
//!
//! - **[`core`]: The Foundation.** Stateless models: the variable arena and its dependency
//!   graph, pair coefficient matrices, pair potentials and their tabulation, ensembles, and
//!   the interpolation and integration routines they share.
//!
//! - **[`simulate`]: The Collaborator Contract.** The [`simulate::Simulation`] trait a
//!   backend implements to turn tabulated potentials into radial distribution functions,
//!   together with a dilute-limit backend.
//!
//! - **[`engine`]: The Logic Core.** Objective functions, the line search, and the
//!   steepest-descent and fixed-step-descent optimizers that adjust design variables.
//!
//! - **[`workflows`]: The Public API.** Complete fits driven by configuration, with progress
//!   reporting.

pub mod core;
pub mod engine;
#[cfg(feature = "logging")]
pub mod logging;
pub mod simulate;
pub mod workflows;
