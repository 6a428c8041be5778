//! Recording fake backend for engine tests.
//!
//! Every call is appended to a log so tests can assert not only on state but
//! on which network calls were (or were not) made - e.g. that a guard
//! rejection never reaches the backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;

use tangelo_core::{
    Address, AddressId, CartLine, Email, LineItemId, NewAddress, Order, OrderDraft, OrderId,
    OrderLine, OrderStatus, PaymentStatus, ProductId, ProductSummary, ReturnRequest, ReturnStatus,
    UserId,
};

use super::{ApiError, AuthSession, CommerceApi};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`CommerceApi`] with a call log and failure switches.
#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<String>>,
    pub remote_cart: Mutex<Vec<CartLine>>,
    pub remote_wishlist: Mutex<Vec<ProductSummary>>,
    pub remote_orders: Mutex<Vec<Order>>,
    pub remote_addresses: Mutex<Vec<Address>>,
    pub bearer: Mutex<Option<String>>,
    /// When set, cart/wishlist/address mutations fail with a 500.
    pub fail_mutations: AtomicBool,
    /// When set, fetches fail with a 500.
    pub fail_fetches: AtomicBool,
    /// When set, `login`/`register` fail as unauthorized.
    pub fail_login: AtomicBool,
    /// When set, `create_order`/`request_item_return` fail with a 500.
    pub fail_orders: AtomicBool,
    next_id: AtomicU64,
}

impl MockApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: impl Into<String>) {
        lock(&self.calls).push(call.into());
    }

    /// Snapshot of the call log.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Number of logged calls whose name starts with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: 500,
            message: "simulated failure".to_owned(),
        }
    }

    fn mutation_result(&self) -> Result<(), ApiError> {
        if self.fail_mutations.load(Ordering::Relaxed) {
            Err(Self::server_error())
        } else {
            Ok(())
        }
    }

    fn fetch_guard(&self) -> Result<(), ApiError> {
        if self.fail_fetches.load(Ordering::Relaxed) {
            Err(Self::server_error())
        } else {
            Ok(())
        }
    }
}

impl CommerceApi for MockApi {
    fn set_bearer(&self, token: Option<&str>) {
        *lock(&self.bearer) = token.map(str::to_owned);
    }

    async fn login(&self, email: &Email, _password: &str) -> Result<AuthSession, ApiError> {
        self.record(format!("login {email}"));
        if self.fail_login.load(Ordering::Relaxed) {
            return Err(ApiError::Unauthorized);
        }
        Ok(AuthSession {
            user_id: UserId::new("u-1"),
            email: email.clone(),
            token: "tok-mock".to_owned(),
        })
    }

    async fn register(
        &self,
        _name: &str,
        email: &Email,
        _password: &str,
    ) -> Result<AuthSession, ApiError> {
        self.record(format!("register {email}"));
        if self.fail_login.load(Ordering::Relaxed) {
            return Err(ApiError::Unauthorized);
        }
        Ok(AuthSession {
            user_id: UserId::new("u-1"),
            email: email.clone(),
            token: "tok-mock".to_owned(),
        })
    }

    async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>, ApiError> {
        self.record(format!("fetch_cart {user_id}"));
        self.fetch_guard()?;
        Ok(lock(&self.remote_cart).clone())
    }

    async fn add_cart_item(
        &self,
        _user_id: &UserId,
        product: &ProductSummary,
        quantity_delta: i32,
    ) -> Result<(), ApiError> {
        self.record(format!("add_cart_item {} {quantity_delta:+}", product.id));
        self.mutation_result()
    }

    async fn remove_cart_item(
        &self,
        _user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        self.record(format!("remove_cart_item {product_id}"));
        self.mutation_result()
    }

    async fn clear_cart(&self, user_id: &UserId) -> Result<(), ApiError> {
        self.record(format!("clear_cart {user_id}"));
        self.mutation_result()
    }

    async fn fetch_wishlist(&self, user_id: &UserId) -> Result<Vec<ProductSummary>, ApiError> {
        self.record(format!("fetch_wishlist {user_id}"));
        self.fetch_guard()?;
        Ok(lock(&self.remote_wishlist).clone())
    }

    async fn add_wishlist_item(
        &self,
        _user_id: &UserId,
        product: &ProductSummary,
    ) -> Result<(), ApiError> {
        self.record(format!("add_wishlist_item {}", product.id));
        self.mutation_result()
    }

    async fn remove_wishlist_item(
        &self,
        _user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        self.record(format!("remove_wishlist_item {product_id}"));
        self.mutation_result()
    }

    async fn clear_wishlist(&self, user_id: &UserId) -> Result<(), ApiError> {
        self.record(format!("clear_wishlist {user_id}"));
        self.mutation_result()
    }

    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, ApiError> {
        self.record(format!("create_order {}", draft.email));
        if self.fail_orders.load(Ordering::Relaxed) {
            return Err(Self::server_error());
        }
        let order = Order {
            id: OrderId::new(format!("ord-{}", self.next())),
            email: draft.email.clone(),
            items: draft
                .items
                .iter()
                .map(|line| OrderLine {
                    id: LineItemId::new(format!("li-{}", line.product.id)),
                    product: line.product.clone(),
                    quantity: line.quantity,
                    return_request: None,
                })
                .collect(),
            shipping_address: draft.shipping_address.clone(),
            payment_method: draft.payment_method.clone(),
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            subtotal: draft.subtotal(),
            shipping: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: draft.subtotal(),
            created_at: Utc::now(),
        };
        lock(&self.remote_orders).insert(0, order.clone());
        Ok(order)
    }

    async fn fetch_orders_by_email(&self, email: &Email) -> Result<Vec<Order>, ApiError> {
        self.record(format!("fetch_orders_by_email {email}"));
        self.fetch_guard()?;
        Ok(lock(&self.remote_orders).clone())
    }

    async fn request_item_return(
        &self,
        order_id: &OrderId,
        item_id: &LineItemId,
        reason: &str,
    ) -> Result<Order, ApiError> {
        self.record(format!("request_item_return {order_id} {item_id}"));
        if self.fail_orders.load(Ordering::Relaxed) {
            return Err(Self::server_error());
        }
        let mut orders = lock(&self.remote_orders);
        let order = orders
            .iter_mut()
            .find(|o| &o.id == order_id)
            .ok_or_else(|| ApiError::NotFound(order_id.to_string()))?;
        let line = order
            .items
            .iter_mut()
            .find(|l| &l.id == item_id)
            .ok_or_else(|| ApiError::NotFound(item_id.to_string()))?;
        line.return_request = Some(ReturnRequest {
            reason: reason.to_owned(),
            status: ReturnStatus::Pending,
            requested_at: Utc::now(),
        });
        Ok(order.clone())
    }

    async fn fetch_addresses(&self, user_id: &UserId) -> Result<Vec<Address>, ApiError> {
        self.record(format!("fetch_addresses {user_id}"));
        self.fetch_guard()?;
        Ok(lock(&self.remote_addresses).clone())
    }

    async fn create_address(
        &self,
        _user_id: &UserId,
        address: &NewAddress,
    ) -> Result<Address, ApiError> {
        self.record(format!("create_address {}", address.zip));
        self.mutation_result()?;
        let mut addresses = lock(&self.remote_addresses);
        let created = Address {
            id: AddressId::new(format!("addr-{}", self.next())),
            first_name: address.first_name.clone(),
            last_name: address.last_name.clone(),
            address: address.address.clone(),
            apartment: address.apartment.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            zip: address.zip.clone(),
            phone: address.phone.clone(),
            is_default: addresses.is_empty(),
        };
        addresses.push(created.clone());
        Ok(created)
    }

    async fn update_address(
        &self,
        id: &AddressId,
        address: &NewAddress,
    ) -> Result<Address, ApiError> {
        self.record(format!("update_address {id}"));
        self.mutation_result()?;
        let mut addresses = lock(&self.remote_addresses);
        let existing = addresses
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        existing.first_name = address.first_name.clone();
        existing.last_name = address.last_name.clone();
        existing.address = address.address.clone();
        existing.apartment = address.apartment.clone();
        existing.city = address.city.clone();
        existing.state = address.state.clone();
        existing.zip = address.zip.clone();
        existing.phone = address.phone.clone();
        Ok(existing.clone())
    }

    async fn delete_address(&self, id: &AddressId) -> Result<(), ApiError> {
        self.record(format!("delete_address {id}"));
        self.mutation_result()?;
        lock(&self.remote_addresses).retain(|a| &a.id != id);
        Ok(())
    }

    async fn set_default_address(&self, id: &AddressId) -> Result<(), ApiError> {
        self.record(format!("set_default_address {id}"));
        self.mutation_result()?;
        for address in lock(&self.remote_addresses).iter_mut() {
            address.is_default = &address.id == id;
        }
        Ok(())
    }
}
