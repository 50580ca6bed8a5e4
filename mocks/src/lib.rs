//! Mock implementations and test utilities for task management
//!
//! This crate provides testing infrastructure including:
//! - An in-memory implementation of every capability trait
//! - Builders and fixtures for desired configurations
//! - Custom assertion helpers for status graphs
//! - Random generators and property-based testing strategies
//! - Contract test helpers

pub mod api;
pub mod assertions;
pub mod builders;
pub mod contracts;
pub mod fixtures;
pub mod generators;

pub use api::MockTaskManagementApi;
pub use assertions::*;
pub use builders::*;
pub use contracts::*;
pub use fixtures::*;
pub use generators::*;
