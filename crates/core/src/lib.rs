//! Tangelo Core - Shared domain types.
//!
//! This crate provides common types used across the Tangelo components:
//! - `client` - the commerce state core consumed by the storefront UI
//! - the storefront and admin applications built on top of it
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no storage access. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`models`] - Domain models shared with the REST backend (cart lines, orders, addresses)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
