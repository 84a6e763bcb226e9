//! Testing utilities for the Migration Mind workspace
//!
//! Shared test helpers: an in-memory backend and sample fixtures.

#![allow(missing_docs)]

pub mod fixtures;
pub mod mock;

pub use fixtures::*;
pub use mock::{Call, Endpoint, MockBackend};
