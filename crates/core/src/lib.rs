//! Tourline Core - Shared types library.
//!
//! This crate provides the common types used across the Tourline
//! order-fulfillment service:
//!
//! - Newtype IDs for type-safe entity references
//! - A validated [`Email`] address type
//! - The [`OrderStatus`] enumeration and its legal transition table
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. Enabling the `postgres` feature adds sqlx `Type`/`Encode`/`Decode`
//! implementations so the types can be bound and decoded directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
