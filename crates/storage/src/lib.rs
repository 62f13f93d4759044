//! Storage abstraction and implementations for goaltrack.
//!
//! This crate provides a trait-based storage interface with a JSON file
//! implementation and an in-memory one.

#![warn(missing_docs)]

pub mod json_storage;
pub mod memory;
pub mod trait_;

pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;
pub use trait_::{Result, Storage, StorageError};
