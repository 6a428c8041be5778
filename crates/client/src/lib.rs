//! Tangelo commerce client core.
//!
//! This crate owns the client-side commerce state of the Tangelo product:
//! the shopping cart, the wishlist, the session identity, the address book,
//! and the order history. It keeps those slices consistent across three
//! sources of truth - in-memory state, the persisted local store, and the
//! per-user remote store - through the transitions of anonymous browsing,
//! login, logout, and network failure.
//!
//! # Architecture
//!
//! - [`store`] - durable key/value persistence for cart/wishlist/session slices
//! - [`api`] - REST client for the Tangelo backend, one method per resource/verb
//! - [`session`] - the session gate: identity state machine and its transitions
//! - [`cart`] / [`wishlist`] - reconciliation engines with optimistic mutation
//! - [`orders`] - order lifecycle and the per-item return workflow
//! - [`addresses`] - saved shipping addresses with client-side guards
//! - [`app`] - the composition root wiring session transitions to the engines
//!
//! The UI layers (storefront and admin) consume this crate; nothing in here
//! renders, routes, or validates forms.
//!
//! # Consistency model
//!
//! Local mutations always complete synchronously before any network I/O, so
//! the UI never waits on the network for a cart change to appear. Remote
//! mirror calls are fire-and-forget: failures are logged and recorded, never
//! rolled back locally. Authoritative truth is re-established by
//! fetch-and-replace at defined reconciliation points (login, logout,
//! post-checkout, post-return-request).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod addresses;
pub mod api;
pub mod app;
pub mod cart;
pub mod config;
pub mod error;
pub mod orders;
pub mod session;
pub mod store;
pub mod wishlist;

pub use addresses::{AddressBook, AddressError};
pub use api::{ApiError, CommerceApi, HttpCommerceApi};
pub use app::CommerceApp;
pub use cart::{CartEngine, MutationOutcome};
pub use config::{ApiConfig, ClientConfig, ConfigError};
pub use error::{CommerceError, Result};
pub use orders::{OrderError, OrderManager, can_request_return};
pub use session::{AuthError, SessionGate, SessionIdentity, SessionTransition};
pub use store::{FileStore, StateStore};
pub use wishlist::WishlistEngine;
