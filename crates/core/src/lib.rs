//! Order Stream Core - Shared order model.
//!
//! This crate provides the types shared by every order-stream component:
//! - `service` - Ingestion consumer, persistent store, cache, and lookup API
//! - `cli` - Command-line tools for migrations, publishing, and inspection
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no broker clients. This keeps it lightweight and allows it to be
//! used anywhere, including by producers that publish orders.
//!
//! # Modules
//!
//! - [`types`] - The order aggregate, its identifier, and the validation gate

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
