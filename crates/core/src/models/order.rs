//! Order models and the order draft sent at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::address::Address;
use crate::models::cart::{CartLine, ProductSummary};
use crate::types::{Email, LineItemId, OrderId, OrderStatus, PaymentStatus, ReturnStatus};

/// A return request attached to an order line.
///
/// Absence of a request is modeled as `OrderLine::return_request == None`;
/// once present it is never removed by the client, and `status` only ever
/// moves forward (see [`ReturnStatus::is_forward`]). `requested_at` and
/// `status` are server-assigned - the client refetches the order list after
/// a request is accepted rather than patching them in locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub reason: String,
    pub status: ReturnStatus,
    pub requested_at: DateTime<Utc>,
}

/// One line of an order: a product snapshot, a quantity, and an optional
/// return request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Server-assigned id for this line within its order.
    pub id: LineItemId,
    #[serde(flatten)]
    pub product: ProductSummary,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_request: Option<ReturnRequest>,
}

impl OrderLine {
    /// Whether a return has been requested for this line.
    #[must_use]
    pub const fn return_requested(&self) -> bool {
        self.return_request.is_some()
    }
}

/// A placed order.
///
/// Created once at checkout and immutable on the client except for `status`,
/// `payment_status`, and per-line return requests, all of which change only
/// when the server says so. Orders are never deleted client-side. The
/// monetary aggregates are server-computed; the client displays them as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub email: Email,
    pub items: Vec<OrderLine>,
    pub shipping_address: Address,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// The checkout payload: a cart snapshot plus shipping and payment metadata.
///
/// The server computes the authoritative totals; [`OrderDraft::subtotal`]
/// exists only so the UI can show a figure while the request is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub email: Email,
    pub items: Vec<CartLine>,
    pub shipping_address: Address,
    pub payment_method: String,
}

impl OrderDraft {
    /// Build a draft from a cart snapshot.
    #[must_use]
    pub fn from_cart(
        email: Email,
        lines: &[CartLine],
        shipping_address: Address,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            email,
            items: lines.to_vec(),
            shipping_address,
            payment_method: payment_method.into(),
        }
    }

    /// Display subtotal computed from the snapshot lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartLine::line_total).sum()
    }
}
