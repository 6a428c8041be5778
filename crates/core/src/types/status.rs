//! Status enums for orders, payments, and return requests.
//!
//! All statuses are driven by the server and observed by the client; the
//! transition helpers here exist so the client never *applies* a change the
//! server would not, and never regresses a state it has already observed.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// Lifecycle: `Pending -> Processing -> Shipped -> Delivered`, with
/// `Cancelled` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether the server may move an order from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Processing)
            | (Self::Processing, Self::Shipped)
            | (Self::Shipped, Self::Delivered) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Processing => write!(f, "Processing"),
            Self::Shipped => write!(f, "Shipped"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Status of a per-line-item return request.
///
/// Moves forward only: once the client has observed a status it never
/// displays an earlier one, mirroring server authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum ReturnStatus {
    #[default]
    Pending,
    Processing,
    Approved,
    Rejected,
}

impl ReturnStatus {
    /// Position in the forward-only progression. `Approved` and `Rejected`
    /// share the final rank; they are alternative outcomes, not a sequence.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Approved | Self::Rejected => 2,
        }
    }

    /// Whether observing `next` after `self` is a forward move.
    #[must_use]
    pub const fn is_forward(self, next: Self) -> bool {
        next.rank() >= self.rank()
    }

    /// Whether the request has reached a final outcome.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}
