//! Storage abstraction and implementations for Digital Defenders.
//!
//! This crate provides a trait-based key-value interface with a JSON file
//! implementation and an in-memory one.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{KeyValueStore, StorageError, Result};
pub use json_storage::JsonFileStore;
pub use memory::MemoryStore;
