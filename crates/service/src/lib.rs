//! Order ingestion service library.
//!
//! This crate provides the service functionality as a library, allowing it
//! to be tested and reused by the CLI and integration tests.
//!
//! # Data flow
//!
//! ```text
//! NATS JetStream -> ingest -> db (PostgreSQL) -> cache -> routes
//!                                      |
//!                                      +-> rehydrate (startup) -> cache
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod rehydrate;
pub mod routes;
pub mod state;
