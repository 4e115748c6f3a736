//! Test utilities for nsforest
//!
//! Fixtures for building namespace forests and an in-memory backing store
//! whose failures can be switched on from the test.

pub mod fixtures;
pub mod memory_store;

pub use fixtures::*;
pub use memory_store::{FaultHandle, MemoryBackingStore};
