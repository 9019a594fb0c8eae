//! Core types for Order Stream.
//!
//! This module provides the order aggregate as it travels over the wire and
//! through the store, plus a type-safe wrapper for its identifier.

pub mod id;
pub mod order;
pub mod sample;

pub use id::{OrderUid, OrderUidError};
pub use order::{Delivery, Item, Order, Payment, ValidationError};
pub use sample::sample_order;
