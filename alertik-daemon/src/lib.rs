//! Alertik daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, the `alertik` binary (main.rs) is used.

pub mod cli;
pub mod health;
pub mod logging;
pub mod orchestrator;
