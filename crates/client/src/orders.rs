//! Order lifecycle manager.
//!
//! Orders are server-owned: the client holds a replace-on-fetch cache keyed
//! by the account email and never persists it locally. Unlike the cart and
//! wishlist mirrors, order mutations are not fire-and-forget - placing an
//! order and requesting a return both propagate failures to the caller and
//! leave the cache untouched on failure.
//!
//! Return requests are guarded client-side: a line that already has a
//! request, or whose order is older than the return window, is rejected
//! before any network call is made.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::watch;

use tangelo_core::{Email, LineItemId, Order, OrderDraft, OrderId, OrderLine};

use crate::api::{ApiError, CommerceApi};

/// Days after order creation during which a return may be requested.
pub const RETURN_WINDOW_DAYS: i64 = 30;

/// Errors that can occur in the order lifecycle.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Checkout was attempted with no cart lines.
    #[error("cannot place an order with an empty cart")]
    EmptyCart,

    /// The order is not in the fetched list.
    #[error("unknown order: {0}")]
    UnknownOrder(OrderId),

    /// The line is not part of the order.
    #[error("unknown order item: {0}")]
    UnknownItem(LineItemId),

    /// A return was already requested for this line.
    #[error("a return has already been requested for this item")]
    AlreadyRequested,

    /// The order is older than the return window.
    #[error("the {RETURN_WINDOW_DAYS}-day return window for this order has closed")]
    WindowClosed,

    /// Backend call failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

/// Whether a return may still be requested for `line` of an order created at
/// `order_date`, as of `now`.
///
/// Pure so the UI can grey out the button with the same rule the manager
/// enforces.
#[must_use]
pub fn can_request_return(line: &OrderLine, order_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    !line.return_requested() && now - order_date <= Duration::days(RETURN_WINDOW_DAYS)
}

/// The order lifecycle manager.
pub struct OrderManager<A> {
    api: Arc<A>,
    /// Account email the cache belongs to; set by the first fetch or
    /// placement and used to re-pull the list after a return is accepted.
    email: Option<Email>,
    orders: Vec<Order>,
    revision: watch::Sender<u64>,
}

impl<A: CommerceApi> OrderManager<A> {
    /// Create a manager with an empty cache; call [`Self::refresh`] once an
    /// authenticated email is known.
    #[must_use]
    pub fn new(api: Arc<A>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            api,
            email: None,
            orders: Vec::new(),
            revision,
        }
    }

    /// The cached orders, newest first (server order).
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Look up a cached order by id.
    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.id == id)
    }

    /// Subscribe to change notifications; the revision bumps only on actual
    /// mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Replace the cache with the account's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Api` if the fetch fails; the cache is untouched.
    pub async fn refresh(&mut self, email: &Email) -> Result<(), OrderError> {
        let remote = self.api.fetch_orders_by_email(email).await?;
        tracing::debug!(orders = remote.len(), "refreshed order list");
        self.email = Some(email.clone());
        if remote != self.orders {
            self.orders = remote;
            self.notify();
        }
        Ok(())
    }

    /// Drop the cached orders, e.g. on logout. Nothing remote is touched.
    pub fn forget(&mut self) {
        self.email = None;
        if !self.orders.is_empty() {
            self.orders.clear();
            self.notify();
        }
    }

    /// Place an order. On success the created order is prepended to the
    /// cache and returned; clearing the cart afterwards is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` before any network call if the draft
    /// has no lines, or `OrderError::Api` if the backend rejects the order -
    /// in which case the cache (and the caller's cart) are unchanged.
    pub async fn place_order(&mut self, draft: OrderDraft) -> Result<Order, OrderError> {
        if draft.items.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let order = self.api.create_order(&draft).await?;
        tracing::info!(order_id = %order.id, total = %order.total, "order placed");
        self.email = Some(order.email.clone());
        self.orders.insert(0, order.clone());
        self.notify();
        Ok(order)
    }

    /// Request a return for one line of a cached order.
    ///
    /// The eligibility guard runs entirely locally; an ineligible request
    /// never reaches the backend. On success the whole order list is
    /// re-fetched rather than the single item patched in locally, so
    /// `requested_at`, the request status, and any server-side movement on
    /// other orders all land at once.
    ///
    /// # Errors
    ///
    /// `UnknownOrder`/`UnknownItem` for stale ids, `AlreadyRequested` or
    /// `WindowClosed` when the guard rejects, `Api` when the backend does.
    pub async fn request_return(
        &mut self,
        order_id: &OrderId,
        item_id: &LineItemId,
        reason: &str,
    ) -> Result<(), OrderError> {
        let order = self
            .order(order_id)
            .ok_or_else(|| OrderError::UnknownOrder(order_id.clone()))?;
        let line = order
            .items
            .iter()
            .find(|line| &line.id == item_id)
            .ok_or_else(|| OrderError::UnknownItem(item_id.clone()))?;

        if line.return_requested() {
            return Err(OrderError::AlreadyRequested);
        }
        if !can_request_return(line, order.created_at, Utc::now()) {
            return Err(OrderError::WindowClosed);
        }

        let updated = self.api.request_item_return(order_id, item_id, reason).await?;
        match self.email.clone() {
            Some(email) => {
                // The request was accepted; a failed refetch must not undo
                // that, so fall back to the order the endpoint returned.
                if let Err(e) = self.refresh(&email).await {
                    tracing::warn!(error = %e, "order refetch failed after return request");
                    self.swap_cached(updated);
                }
            }
            None => self.swap_cached(updated),
        }
        Ok(())
    }

    fn swap_cached(&mut self, updated: Order) {
        if let Some(cached) = self.orders.iter_mut().find(|o| o.id == updated.id) {
            *cached = updated;
            self.notify();
        }
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}
