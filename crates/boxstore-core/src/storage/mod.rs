//! Storage layer for BoxStore.
//!
//! This module provides a sled-based document collection with named
//! secondary indexes.

mod collection;
mod config;
mod document;
mod filter;

pub mod key;

pub use collection::{Collection, DeleteResult, IndexSpec, UpdateResult};
pub use config::{StoreConfig, DEFAULT_DATA_PATH};
pub use document::{Document, ID_FIELD};
pub use filter::Filter;
