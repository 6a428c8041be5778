//! Remote commerce client for the Tangelo REST backend.
//!
//! One method per resource/verb pair, scoped by the authenticated user's id
//! or an order/item id pair. The client performs no retries: a failed
//! mutation leaves local state as the sole record until the next full
//! refetch. Fire-and-forget semantics for cart/wishlist mirrors live in the
//! engines, not here - every method reports its real outcome.

mod http;

#[cfg(test)]
pub mod mock;

pub use http::HttpCommerceApi;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tangelo_core::{
    Address, AddressId, CartLine, Email, LineItemId, NewAddress, Order, OrderDraft, OrderId,
    ProductId, ProductSummary, UserId,
};

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connect, timeout, TLS).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request.
    #[error("api error: {status} - {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },

    /// Missing or invalid bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Request path could not be joined onto the base URL.
    #[error("invalid request url: {0}")]
    Url(String),
}

/// A successfully authenticated session as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user_id: UserId,
    pub email: Email,
    /// Bearer token for subsequent authenticated calls.
    pub token: String,
}

/// The REST surface of the Tangelo backend (spec'd endpoints only).
///
/// The trait seam exists so the engines can be driven against a recording
/// fake in tests; production code uses [`HttpCommerceApi`].
//
// The client is single-threaded and event-driven, so futures returned here
// are awaited in place and need no Send bound.
#[allow(async_fn_in_trait)]
pub trait CommerceApi {
    /// Install or clear the bearer token used for authenticated calls.
    ///
    /// With no token, all cart/wishlist operations run local-only in the
    /// engines and never reach this client.
    fn set_bearer(&self, token: Option<&str>);

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    /// `POST /auth/login`
    async fn login(&self, email: &Email, password: &str) -> Result<AuthSession, ApiError>;

    /// `POST /auth/register`
    async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, ApiError>;

    // ------------------------------------------------------------------
    // Cart
    // ------------------------------------------------------------------

    /// `GET /cart/{userId}`
    async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>, ApiError>;

    /// `POST /cart` - quantity delta semantics; the snapshot is included so
    /// the server can create the line if it does not exist yet.
    async fn add_cart_item(
        &self,
        user_id: &UserId,
        product: &ProductSummary,
        quantity_delta: i32,
    ) -> Result<(), ApiError>;

    /// `DELETE /cart/{userId}/{productId}`
    async fn remove_cart_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<(), ApiError>;

    /// `DELETE /cart/{userId}`
    async fn clear_cart(&self, user_id: &UserId) -> Result<(), ApiError>;

    // ------------------------------------------------------------------
    // Wishlist
    // ------------------------------------------------------------------

    /// `GET /wishlist/{userId}`
    async fn fetch_wishlist(&self, user_id: &UserId) -> Result<Vec<ProductSummary>, ApiError>;

    /// `POST /wishlist`
    async fn add_wishlist_item(
        &self,
        user_id: &UserId,
        product: &ProductSummary,
    ) -> Result<(), ApiError>;

    /// `DELETE /wishlist/{userId}/{productId}`
    async fn remove_wishlist_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<(), ApiError>;

    /// `DELETE /wishlist/{userId}/all`
    async fn clear_wishlist(&self, user_id: &UserId) -> Result<(), ApiError>;

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// `POST /order`
    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, ApiError>;

    /// `GET /order/user?email=`
    async fn fetch_orders_by_email(&self, email: &Email) -> Result<Vec<Order>, ApiError>;

    /// `PUT /order/{id}/items/{itemId}/return`
    async fn request_item_return(
        &self,
        order_id: &OrderId,
        item_id: &LineItemId,
        reason: &str,
    ) -> Result<Order, ApiError>;

    // ------------------------------------------------------------------
    // Addresses
    // ------------------------------------------------------------------

    /// `GET /addresses?userId=`
    async fn fetch_addresses(&self, user_id: &UserId) -> Result<Vec<Address>, ApiError>;

    /// `POST /addresses`
    async fn create_address(
        &self,
        user_id: &UserId,
        address: &NewAddress,
    ) -> Result<Address, ApiError>;

    /// `PUT /addresses/{id}`
    async fn update_address(&self, id: &AddressId, address: &NewAddress)
    -> Result<Address, ApiError>;

    /// `DELETE /addresses/{id}`
    async fn delete_address(&self, id: &AddressId) -> Result<(), ApiError>;

    /// `PATCH /addresses/{id}/default`
    async fn set_default_address(&self, id: &AddressId) -> Result<(), ApiError>;
}
