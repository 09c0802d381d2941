//! Shared test fixtures for ScoreForge crates.
//!
//! This crate provides data types and pure functions for testing.
//! It does NOT depend on `scoreforge-scoring` to avoid circular dependencies.
//!
//! - [`cloud`] - Cloud balancing facts and a [`FactSource`](scoreforge_core::FactSource) solution
//! - [`strategies`] - proptest strategies for random solutions and move sequences
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! scoreforge-test = { workspace = true }
//! ```
//!
//! Then import the fixtures you need:
//!
//! ```ignore
//! use scoreforge_test::cloud::{CloudBalance, COMPUTER, PROCESS};
//! use scoreforge_test::strategies::cloud_balance;
//! ```

pub mod cloud;
pub mod strategies;

pub use cloud::{
    AppliedMove, CloudBalance, CloudMove, Computer, Process, ASSIGNED, COMPUTER, COST, CPU, MEMORY,
    NETWORK, PROCESS,
};
