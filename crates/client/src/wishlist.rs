//! Wishlist reconciliation engine.
//!
//! Structurally a sibling of the cart engine with set semantics instead of
//! quantities: membership is keyed by product id, adding a product that is
//! already present is a no-op, and there is nothing to count. The same
//! local-first rules apply - mutate and persist before any network I/O,
//! mirror fire-and-forget when authenticated, reconcile server-wins on
//! login, clear on logout.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;

use tangelo_core::{ProductId, ProductSummary, UserId};

use crate::api::{ApiError, CommerceApi};
use crate::cart::MutationOutcome;
use crate::session::SessionTransition;
use crate::store::{StateStore, clear_slice, keys, load_slice, save_slice};

/// The wishlist reconciliation engine.
pub struct WishlistEngine<A, S> {
    api: Arc<A>,
    store: Arc<S>,
    items: Vec<ProductSummary>,
    user: Option<UserId>,
    unconfirmed: HashSet<ProductId>,
    revision: watch::Sender<u64>,
}

impl<A: CommerceApi, S: StateStore> WishlistEngine<A, S> {
    /// Create the engine, loading the persisted wishlist immediately so the
    /// first paint has data before the session identity is known.
    pub fn new(api: Arc<A>, store: Arc<S>) -> Self {
        let items: Vec<ProductSummary> = load_slice(&*store, keys::WISHLIST);
        let (revision, _) = watch::channel(0);
        Self {
            api,
            store,
            items,
            user: None,
            unconfirmed: HashSet::new(),
            revision,
        }
    }

    /// The wishlisted products, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[ProductSummary] {
        &self.items
    }

    /// Whether the wishlist is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `product_id` is wishlisted. This is the predicate toggling UI
    /// reads on every render.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|item| &item.id == product_id)
    }

    /// Products whose last mirror call failed and which the next
    /// reconciliation will correct.
    #[must_use]
    pub const fn unconfirmed(&self) -> &HashSet<ProductId> {
        &self.unconfirmed
    }

    /// Subscribe to change notifications; the revision bumps only on actual
    /// mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Add `product` to the wishlist. No-op (no notification, no network
    /// call) if already present.
    pub async fn add(&mut self, product: ProductSummary) -> MutationOutcome {
        if self.contains(&product.id) {
            return MutationOutcome::Applied;
        }
        self.items.push(product.clone());
        self.persist_and_notify();

        let Some(user) = self.user.clone() else {
            return MutationOutcome::Applied;
        };
        match self.api.add_wishlist_item(&user, &product).await {
            Ok(()) => MutationOutcome::Applied,
            Err(e) => self.sync_failed(product.id, &e),
        }
    }

    /// Remove `product_id` from the wishlist. No-op if absent.
    pub async fn remove(&mut self, product_id: &ProductId) -> MutationOutcome {
        let Some(pos) = self.items.iter().position(|item| &item.id == product_id) else {
            return MutationOutcome::Applied;
        };
        self.items.remove(pos);
        self.persist_and_notify();

        let Some(user) = self.user.clone() else {
            return MutationOutcome::Applied;
        };
        match self.api.remove_wishlist_item(&user, product_id).await {
            Ok(()) => MutationOutcome::Applied,
            Err(e) => self.sync_failed(product_id.clone(), &e),
        }
    }

    /// Add `product` if absent, remove it if present. One call per heart
    /// icon press.
    pub async fn toggle(&mut self, product: ProductSummary) -> MutationOutcome {
        if self.contains(&product.id) {
            let id = product.id;
            self.remove(&id).await
        } else {
            self.add(product).await
        }
    }

    /// Empty the wishlist. The local clear always succeeds, even if the
    /// remote clear later fails.
    pub async fn clear(&mut self) -> MutationOutcome {
        let cleared: Vec<ProductId> = self.items.iter().map(|item| item.id.clone()).collect();
        if !self.items.is_empty() {
            self.items.clear();
            self.persist_and_notify();
        }

        // The remote clear goes out even when local is already empty; see
        // the cart engine for the rationale.
        let Some(user) = self.user.clone() else {
            return MutationOutcome::Applied;
        };
        match self.api.clear_wishlist(&user).await {
            Ok(()) => MutationOutcome::Applied,
            Err(e) => {
                tracing::warn!(error = %e, "remote wishlist clear failed; local wishlist already empty");
                self.unconfirmed.extend(cleared);
                MutationOutcome::RemoteSyncFailed
            }
        }
    }

    /// React to a session transition; same policy as the cart engine (server
    /// wins on login, clear on logout).
    pub async fn handle_transition(&mut self, transition: &SessionTransition) {
        match transition {
            SessionTransition::Restored { user_id } | SessionTransition::LoggedIn { user_id } => {
                self.user = Some(user_id.clone());
                self.unconfirmed.clear();
                match self.api.fetch_wishlist(user_id).await {
                    Ok(remote) => {
                        tracing::debug!(items = remote.len(), "reconciled wishlist from remote");
                        let changed = remote != self.items;
                        self.items = remote;
                        save_slice(&*self.store, keys::WISHLIST, &self.items);
                        if changed {
                            self.notify();
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "wishlist fetch failed on login; keeping local items");
                    }
                }
            }
            SessionTransition::LoggedOut => {
                self.user = None;
                self.unconfirmed.clear();
                clear_slice(&*self.store, keys::WISHLIST);
                if !self.items.is_empty() {
                    self.items.clear();
                    self.notify();
                }
            }
            SessionTransition::StayedAnonymous => {}
        }
    }

    fn persist_and_notify(&mut self) {
        save_slice(&*self.store, keys::WISHLIST, &self.items);
        self.notify();
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn sync_failed(&mut self, product_id: ProductId, error: &ApiError) -> MutationOutcome {
        tracing::warn!(
            product_id = %product_id,
            error = %error,
            "remote wishlist mirror failed; keeping optimistic local state"
        );
        self.unconfirmed.insert(product_id);
        MutationOutcome::RemoteSyncFailed
    }
}
