//! Configuration module for a harvesting run
//!
//! This module provides the `HarvestConfig` struct and its type-safe builder.
//! The page cap and every timeout are workspace-imposed values that may drift,
//! so they live here with documented defaults instead of being hard-coded.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::{HarvestConfigBuilder, WithQuery};
pub use types::HarvestConfig;
