//! Cart reconciliation engine.
//!
//! Owns the authoritative in-memory cart: one ordered list of lines, keyed
//! by product id, that every other component reads. Mutations are optimistic
//! and local-first - the in-memory change and the write-through persist
//! complete synchronously before any network I/O starts, so rapid repeated
//! actions land in call order and the UI never waits on the network. When
//! authenticated, each mutation is mirrored to the user's remote cart
//! fire-and-forget: a failed mirror is logged and recorded, never rolled
//! back.
//!
//! Reconciliation happens once per session transition: on login the remote
//! cart replaces local state (server wins), on logout both in-memory and
//! persisted state are cleared without any remote call.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;

use tangelo_core::{CartLine, ProductId, ProductSummary, UserId};

use crate::api::{ApiError, CommerceApi};
use crate::session::SessionTransition;
use crate::store::{StateStore, clear_slice, keys, load_slice, save_slice};

/// Outcome of an optimistic cart or wishlist mutation.
///
/// The local change has already been applied in both cases; the tag records
/// whether the remote mirror confirmed it, so a later reconciliation pass
/// knows which mutations are unconfirmed instead of the failure being
/// discarded entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum MutationOutcome {
    /// Local state mutated; the remote mirror (if one was needed) confirmed.
    Applied,
    /// Local state mutated, but the remote mirror failed. The product is
    /// recorded as unconfirmed until the next reconciliation point.
    RemoteSyncFailed,
}

/// The cart reconciliation engine.
pub struct CartEngine<A, S> {
    api: Arc<A>,
    store: Arc<S>,
    lines: Vec<CartLine>,
    user: Option<UserId>,
    unconfirmed: HashSet<ProductId>,
    revision: watch::Sender<u64>,
}

impl<A: CommerceApi, S: StateStore> CartEngine<A, S> {
    /// Create the engine, loading the persisted cart immediately so the
    /// first paint has data before the session identity is known.
    pub fn new(api: Arc<A>, store: Arc<S>) -> Self {
        let lines: Vec<CartLine> = load_slice(&*store, keys::CART);
        let (revision, _) = watch::channel(0);
        Self {
            api,
            store,
            lines,
            user: None,
            unconfirmed: HashSet::new(),
            revision,
        }
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// The cart lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Subtotal computed on read as the sum of line totals. No precomputed
    /// total is stored, so cached and live figures cannot drift.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Quantity of the line for `product_id`, if present.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.lines
            .iter()
            .find(|line| line.product_id() == product_id)
            .map(|line| line.quantity)
    }

    /// Products whose last mirror call failed and which the next
    /// reconciliation will correct.
    #[must_use]
    pub const fn unconfirmed(&self) -> &HashSet<ProductId> {
        &self.unconfirmed
    }

    /// Subscribe to change notifications. The revision in the channel bumps
    /// only when the owned state actually mutates; no-op operations are
    /// silent.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ------------------------------------------------------------------
    // Mutations (optimistic, local-first)
    // ------------------------------------------------------------------

    /// Add one unit of `product`: increments the existing line or appends a
    /// new one at quantity 1.
    pub async fn add_item(&mut self, product: ProductSummary) -> MutationOutcome {
        match self
            .lines
            .iter_mut()
            .find(|line| line.product.id == product.id)
        {
            Some(line) => line.quantity += 1,
            None => self.lines.push(CartLine::single(product.clone())),
        }
        self.persist_and_notify();
        self.mirror_delta(product, 1).await
    }

    /// Remove the line for `product_id`. No-op (and no notification, no
    /// network call) if no such line exists.
    pub async fn remove_item(&mut self, product_id: &ProductId) -> MutationOutcome {
        let Some(pos) = self
            .lines
            .iter()
            .position(|line| line.product_id() == product_id)
        else {
            return MutationOutcome::Applied;
        };
        self.lines.remove(pos);
        self.persist_and_notify();
        self.mirror_remove(product_id.clone()).await
    }

    /// Increment the quantity of an existing line. No-op if absent.
    pub async fn increase_quantity(&mut self, product_id: &ProductId) -> MutationOutcome {
        let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id() == product_id)
        else {
            return MutationOutcome::Applied;
        };
        line.quantity += 1;
        let product = line.product.clone();
        self.persist_and_notify();
        self.mirror_delta(product, 1).await
    }

    /// Decrement the quantity of an existing line. A line at quantity 1 is
    /// removed outright - the boundary case mirrors a delete, not a -1
    /// delta, and a zero-quantity line is never held or persisted.
    pub async fn decrease_quantity(&mut self, product_id: &ProductId) -> MutationOutcome {
        let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id() == product_id)
        else {
            return MutationOutcome::Applied;
        };
        if line.quantity == 1 {
            return self.remove_item(product_id).await;
        }
        line.quantity -= 1;
        let product = line.product.clone();
        self.persist_and_notify();
        self.mirror_delta(product, -1).await
    }

    /// Empty the cart. The local clear always succeeds, even if the remote
    /// clear later fails.
    pub async fn clear(&mut self) -> MutationOutcome {
        let cleared: Vec<ProductId> = self.lines.iter().map(|l| l.product.id.clone()).collect();
        if !self.lines.is_empty() {
            self.lines.clear();
            self.persist_and_notify();
        }

        // The remote clear goes out even when local is already empty: a
        // failed mirror may have left lines on the server.
        let Some(user) = self.user.clone() else {
            return MutationOutcome::Applied;
        };
        match self.api.clear_cart(&user).await {
            Ok(()) => MutationOutcome::Applied,
            Err(e) => {
                tracing::warn!(error = %e, "remote cart clear failed; local cart already empty");
                // Those lines may still exist remotely until the next fetch.
                self.unconfirmed.extend(cleared);
                MutationOutcome::RemoteSyncFailed
            }
        }
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// React to a session transition. Called exactly once per transition by
    /// the composition root.
    ///
    /// On login/restore the remote cart replaces both in-memory and
    /// persisted state (server wins). Additions made while anonymous are not
    /// pushed to the server before the overwrite; see DESIGN.md for why that
    /// policy is kept as-is. On logout everything is cleared locally with no
    /// remote call.
    pub async fn handle_transition(&mut self, transition: &SessionTransition) {
        match transition {
            SessionTransition::Restored { user_id } | SessionTransition::LoggedIn { user_id } => {
                self.user = Some(user_id.clone());
                self.unconfirmed.clear();
                match self.api.fetch_cart(user_id).await {
                    Ok(remote) => {
                        tracing::debug!(lines = remote.len(), "reconciled cart from remote");
                        let changed = remote != self.lines;
                        self.lines = remote;
                        save_slice(&*self.store, keys::CART, &self.lines);
                        if changed {
                            self.notify();
                        }
                    }
                    Err(e) => {
                        // Local state stays the sole record until the next
                        // reconciliation point.
                        tracing::warn!(error = %e, "cart fetch failed on login; keeping local lines");
                    }
                }
            }
            SessionTransition::LoggedOut => {
                self.user = None;
                self.unconfirmed.clear();
                clear_slice(&*self.store, keys::CART);
                if !self.lines.is_empty() {
                    self.lines.clear();
                    self.notify();
                }
            }
            SessionTransition::StayedAnonymous => {}
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn persist_and_notify(&mut self) {
        save_slice(&*self.store, keys::CART, &self.lines);
        self.notify();
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    async fn mirror_delta(&mut self, product: ProductSummary, delta: i32) -> MutationOutcome {
        let Some(user) = self.user.clone() else {
            return MutationOutcome::Applied;
        };
        match self.api.add_cart_item(&user, &product, delta).await {
            Ok(()) => MutationOutcome::Applied,
            Err(e) => self.sync_failed(product.id, &e),
        }
    }

    async fn mirror_remove(&mut self, product_id: ProductId) -> MutationOutcome {
        let Some(user) = self.user.clone() else {
            return MutationOutcome::Applied;
        };
        match self.api.remove_cart_item(&user, &product_id).await {
            Ok(()) => MutationOutcome::Applied,
            Err(e) => self.sync_failed(product_id, &e),
        }
    }

    fn sync_failed(&mut self, product_id: ProductId, error: &ApiError) -> MutationOutcome {
        tracing::warn!(
            product_id = %product_id,
            error = %error,
            "remote cart mirror failed; keeping optimistic local state"
        );
        self.unconfirmed.insert(product_id);
        MutationOutcome::RemoteSyncFailed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use rust_decimal::Decimal;

    use tangelo_core::{CurrencyCode, Price};

    use super::*;
    use crate::api::mock::MockApi;
    use crate::store::MemoryStore;

    fn product(id: &str, dollars: i64) -> ProductSummary {
        ProductSummary {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: Price::new(Decimal::from(dollars), CurrencyCode::USD),
            image_url: None,
        }
    }

    fn setup() -> (Arc<MockApi>, Arc<MemoryStore>, CartEngine<MockApi, MemoryStore>) {
        let api = Arc::new(MockApi::new());
        let store = Arc::new(MemoryStore::new());
        let engine = CartEngine::new(Arc::clone(&api), Arc::clone(&store));
        (api, store, engine)
    }

    async fn login(engine: &mut CartEngine<MockApi, MemoryStore>) {
        engine
            .handle_transition(&SessionTransition::LoggedIn {
                user_id: UserId::new("u-1"),
            })
            .await;
    }

    #[tokio::test]
    async fn test_add_then_remove_round_trips_to_empty() {
        let (_, store, mut engine) = setup();

        assert_eq!(engine.add_item(product("p1", 10)).await, MutationOutcome::Applied);
        assert_eq!(
            engine.remove_item(&ProductId::new("p1")).await,
            MutationOutcome::Applied
        );

        assert!(engine.is_empty());
        let persisted: Vec<CartLine> = crate::store::load_slice(&*store, keys::CART);
        assert!(persisted.is_empty());
    }

    #[tokio::test]
    async fn test_add_increments_existing_line() {
        let (_, _, mut engine) = setup();

        let _ = engine.add_item(product("p1", 10)).await;
        let _ = engine.add_item(product("p1", 10)).await;

        assert_eq!(engine.lines().len(), 1);
        assert_eq!(engine.quantity_of(&ProductId::new("p1")), Some(2));
    }

    #[tokio::test]
    async fn test_no_line_ever_reaches_zero_quantity() {
        let (_, _, mut engine) = setup();
        let p1 = ProductId::new("p1");

        let _ = engine.add_item(product("p1", 10)).await;
        let _ = engine.decrease_quantity(&p1).await;
        let _ = engine.decrease_quantity(&p1).await;
        let _ = engine.remove_item(&p1).await;
        let _ = engine.increase_quantity(&p1).await;

        assert!(engine.lines().iter().all(|line| line.quantity >= 1));
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_decrease_at_quantity_one_removes_line() {
        let (api, _, mut engine) = setup();
        login(&mut engine).await;

        let _ = engine.add_item(product("p1", 10)).await;
        let _ = engine.decrease_quantity(&ProductId::new("p1")).await;

        assert!(engine.is_empty());
        // The boundary case mirrors a delete, not a -1 delta.
        assert_eq!(api.calls_matching("remove_cart_item p1"), 1);
        assert_eq!(api.calls_matching("add_cart_item p1 -1"), 0);
    }

    #[tokio::test]
    async fn test_increase_quantity_updates_subtotal() {
        let (_, _, mut engine) = setup();
        let p1 = ProductId::new("p1");

        let _ = engine.add_item(product("p1", 100)).await;
        let _ = engine.add_item(product("p1", 100)).await;
        assert_eq!(engine.subtotal(), Decimal::from(200));

        let _ = engine.increase_quantity(&p1).await;
        assert_eq!(engine.quantity_of(&p1), Some(3));
        assert_eq!(engine.subtotal(), Decimal::from(300));
    }

    #[tokio::test]
    async fn test_server_wins_on_login() {
        let (_, store, mut engine) = setup();

        let _ = engine.add_item(product("p1", 10)).await;
        let _ = engine.add_item(product("p2", 20)).await;

        // Remote cart is empty; local anonymous additions are not merged.
        login(&mut engine).await;

        assert!(engine.is_empty());
        let persisted: Vec<CartLine> = crate::store::load_slice(&*store, keys::CART);
        assert!(persisted.is_empty());
    }

    #[tokio::test]
    async fn test_login_pulls_remote_cart() {
        let (api, _, mut engine) = setup();
        *api.remote_cart.lock().unwrap() = vec![CartLine {
            product: product("p9", 42),
            quantity: 2,
        }];

        login(&mut engine).await;

        assert_eq!(engine.quantity_of(&ProductId::new("p9")), Some(2));
        assert_eq!(engine.subtotal(), Decimal::from(84));
    }

    #[tokio::test]
    async fn test_login_fetch_failure_keeps_local_lines() {
        let (api, _, mut engine) = setup();
        let _ = engine.add_item(product("p1", 10)).await;
        api.fail_fetches.store(true, Ordering::Relaxed);

        login(&mut engine).await;

        assert_eq!(engine.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_memory_and_store() {
        let (_, store, mut engine) = setup();
        login(&mut engine).await;
        let _ = engine.add_item(product("p1", 10)).await;

        engine.handle_transition(&SessionTransition::LoggedOut).await;

        assert!(engine.is_empty());
        assert!(store.load(keys::CART).is_none());
    }

    #[tokio::test]
    async fn test_anonymous_mutations_touch_no_network() {
        let (api, _, mut engine) = setup();

        let _ = engine.add_item(product("p1", 10)).await;
        let _ = engine.increase_quantity(&ProductId::new("p1")).await;
        let _ = engine.remove_item(&ProductId::new("p1")).await;

        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mirror_failure_keeps_local_state() {
        let (api, _, mut engine) = setup();
        login(&mut engine).await;
        api.fail_mutations.store(true, Ordering::Relaxed);

        let outcome = engine.add_item(product("p1", 10)).await;

        assert_eq!(outcome, MutationOutcome::RemoteSyncFailed);
        assert_eq!(engine.quantity_of(&ProductId::new("p1")), Some(1));
        assert!(engine.unconfirmed().contains(&ProductId::new("p1")));
    }

    #[tokio::test]
    async fn test_reconciliation_clears_unconfirmed_record() {
        let (api, _, mut engine) = setup();
        login(&mut engine).await;
        api.fail_mutations.store(true, Ordering::Relaxed);
        let _ = engine.add_item(product("p1", 10)).await;
        assert!(!engine.unconfirmed().is_empty());

        api.fail_mutations.store(false, Ordering::Relaxed);
        login(&mut engine).await;

        assert!(engine.unconfirmed().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_never_blocks_mutation() {
        let api = Arc::new(MockApi::new());
        let store = Arc::new(MemoryStore::failing());
        let mut engine = CartEngine::new(Arc::clone(&api), store);

        let outcome = engine.add_item(product("p1", 10)).await;

        assert_eq!(outcome, MutationOutcome::Applied);
        assert_eq!(engine.quantity_of(&ProductId::new("p1")), Some(1));
    }

    #[tokio::test]
    async fn test_persisted_cart_survives_restart() {
        let api = Arc::new(MockApi::new());
        let store = Arc::new(MemoryStore::new());

        let mut engine = CartEngine::new(Arc::clone(&api), Arc::clone(&store));
        let _ = engine.add_item(product("p1", 10)).await;
        drop(engine);

        // A fresh engine over the same store has data before any identity
        // is known.
        let engine = CartEngine::new(api, store);
        assert_eq!(engine.quantity_of(&ProductId::new("p1")), Some(1));
    }

    #[tokio::test]
    async fn test_noop_operations_do_not_notify() {
        let (_, _, mut engine) = setup();
        let mut rx = engine.subscribe();
        assert!(!rx.has_changed().unwrap());

        let _ = engine.remove_item(&ProductId::new("ghost")).await;
        let _ = engine.decrease_quantity(&ProductId::new("ghost")).await;
        let _ = engine.clear().await;
        assert!(!rx.has_changed().unwrap());

        let _ = engine.add_item(product("p1", 10)).await;
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_clear_reaches_backend_even_when_local_is_empty() {
        let (api, _, mut engine) = setup();
        login(&mut engine).await;
        assert!(engine.is_empty());
        let mut rx = engine.subscribe();

        let outcome = engine.clear().await;

        // Failed mirrors may have left lines on the server; the remote
        // clear is not gated on local contents.
        assert_eq!(outcome, MutationOutcome::Applied);
        assert_eq!(api.calls_matching("clear_cart"), 1);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_clear_failure_records_cleared_lines() {
        let (api, _, mut engine) = setup();
        login(&mut engine).await;
        let _ = engine.add_item(product("p1", 10)).await;
        api.fail_mutations.store(true, Ordering::Relaxed);

        let outcome = engine.clear().await;

        assert_eq!(outcome, MutationOutcome::RemoteSyncFailed);
        assert!(engine.is_empty());
        assert!(engine.unconfirmed().contains(&ProductId::new("p1")));
    }
}
