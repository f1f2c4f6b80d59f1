//! # Engine Module
//!
//! This module implements the optimization engine for fitting pair-potential parameters:
//! the objective-function contract, line search, and gradient-descent methods that move
//! design variables toward a minimum.
//!
//! ## Overview
//!
//! The engine is the stateful layer of the library. Objective functions read the variable
//! arena by shared reference and report a value and a gradient; the optimizers are the only
//! writers, stepping the design variables and re-evaluating until the gradient falls within
//! tolerance or the iteration budget runs out.
//!
//! ## Architecture
//!
//! - **Objectives** ([`objective`]) - The [`objective::ObjectiveFunction`] contract, evaluation
//!   results, and the relative-entropy objective
//! - **Line Search** ([`line_search`]) - Secant refinement of a descent step
//! - **Descent Methods** ([`descent`]) - Steepest descent and fixed-step descent
//! - **Configuration** ([`config`]) - Optimizer settings from a builder or a TOML file
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! ## Key Capabilities
//!
//! - **Per-variable scaling** so parameters of different magnitude converge together
//! - **Per-variable tolerances** for the convergence test
//! - **Optional line search** after every descent step
//! - **Scoped diagnostics** written into per-iteration output directories

pub mod config;
pub mod descent;
pub mod error;
pub mod line_search;
pub mod objective;
pub mod progress;
