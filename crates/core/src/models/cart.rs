//! Cart and wishlist models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// The product fields snapshotted into carts, wishlists, and order lines.
///
/// A snapshot is taken when the product is added so that later catalog edits
/// do not rewrite what the customer saw. Wishlist entries are exactly this
/// snapshot (set semantics keyed by `id`, no quantity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A single cart line.
///
/// Identity is the product id; the cart never holds two lines for the same
/// product. Quantity is always at least 1 - a line that would reach zero is
/// removed instead, so a zero-quantity line is never held in memory or
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub product: ProductSummary,
    pub quantity: u32,
}

impl CartLine {
    /// Create a line for one unit of `product`.
    #[must_use]
    pub const fn single(product: ProductSummary) -> Self {
        Self {
            product,
            quantity: 1,
        }
    }

    /// The product this line is for.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Extended total for this line (unit price x quantity), computed on read.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.unit_price.times(self.quantity)
    }
}
