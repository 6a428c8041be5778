//! Composition root wiring the session gate to the engines.
//!
//! [`CommerceApp`] owns one instance of every component and is the only
//! place session transitions are dispatched, so each engine sees each
//! transition exactly once. It also sequences the two multi-component
//! flows: login (reconcile every slice) and checkout (place the order,
//! then clear the cart).

use std::sync::Arc;

use tangelo_core::{Address, Email, Order, OrderDraft};

use crate::addresses::AddressBook;
use crate::api::{CommerceApi, HttpCommerceApi};
use crate::cart::CartEngine;
use crate::config::{ClientConfig, ConfigError};
use crate::error::Result;
use crate::orders::OrderManager;
use crate::session::{AuthError, SessionGate, SessionIdentity, SessionTransition};
use crate::store::{FileStore, StateStore};
use crate::wishlist::WishlistEngine;

/// The assembled commerce client.
pub struct CommerceApp<A, S> {
    gate: SessionGate<A, S>,
    cart: CartEngine<A, S>,
    wishlist: WishlistEngine<A, S>,
    orders: OrderManager<A>,
    addresses: AddressBook<A>,
}

impl CommerceApp<HttpCommerceApi, FileStore> {
    /// Build the production pairing (REST backend, file-backed store) from
    /// environment configuration.
    ///
    /// # Errors
    ///
    /// Returns a config error when required variables are missing or the
    /// data directory cannot be created, or an API error if the HTTP client
    /// fails to build.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        let api = HttpCommerceApi::new(&config.api)?;
        let store = FileStore::new(&config.data_dir).map_err(|e| {
            ConfigError::InvalidEnvVar("TANGELO_DATA_DIR".to_owned(), e.to_string())
        })?;
        Ok(Self::new(Arc::new(api), Arc::new(store)))
    }
}

impl<A: CommerceApi, S: StateStore> CommerceApp<A, S> {
    /// Assemble the components over a shared backend client and store.
    ///
    /// Cart and wishlist load their persisted slices here, before any
    /// identity is known; call [`Self::start`] to restore the session.
    pub fn new(api: Arc<A>, store: Arc<S>) -> Self {
        Self {
            gate: SessionGate::new(Arc::clone(&api), Arc::clone(&store)),
            cart: CartEngine::new(Arc::clone(&api), Arc::clone(&store)),
            wishlist: WishlistEngine::new(Arc::clone(&api), Arc::clone(&store)),
            orders: OrderManager::new(Arc::clone(&api)),
            addresses: AddressBook::new(api),
        }
    }

    /// Restore a persisted session, if any, and reconcile all slices.
    /// Call once at startup.
    pub async fn start(&mut self) -> SessionTransition {
        let transition = self.gate.restore();
        self.dispatch(&transition).await;
        transition
    }

    /// Log in and reconcile every slice against the account's remote state.
    ///
    /// # Errors
    ///
    /// Authentication failures surface here; reconciliation failures after
    /// a successful login are logged per-slice and do not fail the login.
    pub async fn login(&mut self, email: &Email, password: &str) -> Result<()> {
        let transition = self.gate.login(email, password).await?;
        self.dispatch(&transition).await;
        Ok(())
    }

    /// Register a new account; on success the user is logged in and all
    /// slices are reconciled.
    ///
    /// # Errors
    ///
    /// Same failure surface as [`Self::login`].
    pub async fn register(&mut self, name: &str, email: &Email, password: &str) -> Result<()> {
        let transition = self.gate.register(name, email, password).await?;
        self.dispatch(&transition).await;
        Ok(())
    }

    /// Log out. Local, unconditional, cannot fail: every slice is cleared
    /// and no remote call is made.
    pub async fn logout(&mut self) {
        let transition = self.gate.logout();
        self.dispatch(&transition).await;
    }

    /// Place an order for the current cart, then empty the cart.
    ///
    /// The cart is cleared only after the backend accepts the order; a
    /// rejected checkout leaves it intact for retry.
    ///
    /// # Errors
    ///
    /// Requires an authenticated session and a non-empty cart; both are
    /// checked before any network call. Backend rejection surfaces as an
    /// order error.
    pub async fn checkout(
        &mut self,
        shipping_address: Address,
        payment_method: &str,
    ) -> Result<Order> {
        let email = self
            .gate
            .identity()
            .email()
            .cloned()
            .ok_or(AuthError::NotAuthenticated)?;
        let draft =
            OrderDraft::from_cart(email, self.cart.lines(), shipping_address, payment_method);
        let order = self.orders.place_order(draft).await?;
        let _ = self.cart.clear().await;
        Ok(order)
    }

    /// Hand each engine the transition exactly once. Reconciliation
    /// failures inside the engines are their own concern; nothing here
    /// aborts partway.
    async fn dispatch(&mut self, transition: &SessionTransition) {
        self.cart.handle_transition(transition).await;
        self.wishlist.handle_transition(transition).await;
        match transition {
            SessionTransition::Restored { user_id } | SessionTransition::LoggedIn { user_id } => {
                if let Some(email) = self.gate.identity().email().cloned() {
                    if let Err(e) = self.orders.refresh(&email).await {
                        tracing::warn!(error = %e, "order refresh failed on login");
                    }
                }
                if let Err(e) = self.addresses.refresh(user_id).await {
                    tracing::warn!(error = %e, "address refresh failed on login");
                }
            }
            SessionTransition::LoggedOut => {
                self.orders.forget();
                self.addresses.forget();
            }
            SessionTransition::StayedAnonymous => {}
        }
    }

    // ------------------------------------------------------------------
    // Component access
    // ------------------------------------------------------------------

    /// The current session identity.
    #[must_use]
    pub const fn identity(&self) -> &SessionIdentity {
        self.gate.identity()
    }

    /// The cart engine.
    #[must_use]
    pub const fn cart(&self) -> &CartEngine<A, S> {
        &self.cart
    }

    /// The cart engine, for mutations.
    pub const fn cart_mut(&mut self) -> &mut CartEngine<A, S> {
        &mut self.cart
    }

    /// The wishlist engine.
    #[must_use]
    pub const fn wishlist(&self) -> &WishlistEngine<A, S> {
        &self.wishlist
    }

    /// The wishlist engine, for mutations.
    pub const fn wishlist_mut(&mut self) -> &mut WishlistEngine<A, S> {
        &mut self.wishlist
    }

    /// The order manager.
    #[must_use]
    pub const fn orders(&self) -> &OrderManager<A> {
        &self.orders
    }

    /// The order manager, for mutations.
    pub const fn orders_mut(&mut self) -> &mut OrderManager<A> {
        &mut self.orders
    }

    /// The address book.
    #[must_use]
    pub const fn addresses(&self) -> &AddressBook<A> {
        &self.addresses
    }

    /// The address book, for mutations.
    pub const fn addresses_mut(&mut self) -> &mut AddressBook<A> {
        &mut self.addresses
    }
}
