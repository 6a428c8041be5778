//! `reqwest`-backed implementation of [`CommerceApi`].

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use tangelo_core::{
    Address, AddressId, CartLine, Email, LineItemId, NewAddress, Order, OrderDraft, OrderId,
    ProductId, ProductSummary, UserId,
};

use super::{ApiError, AuthSession, CommerceApi};
use crate::config::ApiConfig;

/// REST client for the Tangelo backend.
///
/// Cheaply cloneable via `Arc`. The bearer token is installed by the session
/// gate on identity transitions; all other components share this client.
#[derive(Clone)]
pub struct HttpCommerceApi {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    base_url: Url,
    bearer: RwLock<Option<SecretString>>,
}

impl HttpCommerceApi {
    /// Create a new client against the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url: config.base_url.clone(),
                bearer: RwLock::new(None),
            }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::Url(format!("{path}: {e}")))
    }

    /// Issue a request and decode a JSON response body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let response = self.dispatch(method, path, body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                path,
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "failed to parse backend response"
            );
            ApiError::Parse(e.to_string())
        })
    }

    /// Issue a request and discard the response body.
    async fn send_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), ApiError> {
        self.dispatch(method, path, body).await.map(|_| ())
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path)?;
        let mut request = self.inner.client.request(method, url);

        let bearer = self
            .inner
            .bearer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(token) = bearer {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path.to_owned())),
            s if !s.is_success() => {
                let message = response.text().await.unwrap_or_default();
                Err(ApiError::Status {
                    status: s.as_u16(),
                    message: message.chars().take(200).collect(),
                })
            }
            _ => Ok(response),
        }
    }
}

impl CommerceApi for HttpCommerceApi {
    fn set_bearer(&self, token: Option<&str>) {
        *self
            .inner
            .bearer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token.map(SecretString::from);
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: &Email, password: &str) -> Result<AuthSession, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.send_json(Method::POST, "auth/login", Some(body)).await
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, ApiError> {
        let body = serde_json::json!({ "name": name, "email": email, "password": password });
        self.send_json(Method::POST, "auth/register", Some(body))
            .await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>, ApiError> {
        self.send_json(Method::GET, &format!("cart/{user_id}"), None)
            .await
    }

    #[instrument(skip(self, product), fields(user_id = %user_id, product_id = %product.id))]
    async fn add_cart_item(
        &self,
        user_id: &UserId,
        product: &ProductSummary,
        quantity_delta: i32,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "userId": user_id,
            "product": product,
            "quantityDelta": quantity_delta,
        });
        self.send_empty(Method::POST, "cart", Some(body)).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    async fn remove_cart_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("cart/{user_id}/{product_id}"), None)
            .await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn clear_cart(&self, user_id: &UserId) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("cart/{user_id}"), None)
            .await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn fetch_wishlist(&self, user_id: &UserId) -> Result<Vec<ProductSummary>, ApiError> {
        self.send_json(Method::GET, &format!("wishlist/{user_id}"), None)
            .await
    }

    #[instrument(skip(self, product), fields(user_id = %user_id, product_id = %product.id))]
    async fn add_wishlist_item(
        &self,
        user_id: &UserId,
        product: &ProductSummary,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({ "userId": user_id, "product": product });
        self.send_empty(Method::POST, "wishlist", Some(body)).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    async fn remove_wishlist_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        self.send_empty(
            Method::DELETE,
            &format!("wishlist/{user_id}/{product_id}"),
            None,
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn clear_wishlist(&self, user_id: &UserId) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("wishlist/{user_id}/all"), None)
            .await
    }

    #[instrument(skip(self, draft), fields(email = %draft.email))]
    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, ApiError> {
        let body = serde_json::to_value(draft).map_err(|e| ApiError::Parse(e.to_string()))?;
        self.send_json(Method::POST, "order", Some(body)).await
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn fetch_orders_by_email(&self, email: &Email) -> Result<Vec<Order>, ApiError> {
        let mut url = String::from("order/user?email=");
        url.push_str(&urlencoding::encode(email.as_str()));
        self.send_json(Method::GET, &url, None).await
    }

    #[instrument(skip(self, reason), fields(order_id = %order_id, item_id = %item_id))]
    async fn request_item_return(
        &self,
        order_id: &OrderId,
        item_id: &LineItemId,
        reason: &str,
    ) -> Result<Order, ApiError> {
        let body = serde_json::json!({ "reason": reason });
        self.send_json(
            Method::PUT,
            &format!("order/{order_id}/items/{item_id}/return"),
            Some(body),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn fetch_addresses(&self, user_id: &UserId) -> Result<Vec<Address>, ApiError> {
        let mut url = String::from("addresses?userId=");
        url.push_str(&urlencoding::encode(user_id.as_str()));
        self.send_json(Method::GET, &url, None).await
    }

    #[instrument(skip(self, address), fields(user_id = %user_id))]
    async fn create_address(
        &self,
        user_id: &UserId,
        address: &NewAddress,
    ) -> Result<Address, ApiError> {
        let body = serde_json::json!({ "userId": user_id, "address": address });
        self.send_json(Method::POST, "addresses", Some(body)).await
    }

    #[instrument(skip(self, address), fields(address_id = %id))]
    async fn update_address(
        &self,
        id: &AddressId,
        address: &NewAddress,
    ) -> Result<Address, ApiError> {
        let body = serde_json::to_value(address).map_err(|e| ApiError::Parse(e.to_string()))?;
        self.send_json(Method::PUT, &format!("addresses/{id}"), Some(body))
            .await
    }

    #[instrument(skip(self), fields(address_id = %id))]
    async fn delete_address(&self, id: &AddressId) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("addresses/{id}"), None)
            .await
    }

    #[instrument(skip(self), fields(address_id = %id))]
    async fn set_default_address(&self, id: &AddressId) -> Result<(), ApiError> {
        self.send_empty(Method::PATCH, &format!("addresses/{id}/default"), None)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    #[test]
    fn test_query_value_encoding() {
        assert_eq!(
            urlencoding::encode("shopper@tangelo.shop"),
            "shopper%40tangelo.shop"
        );
    }
}
