//! Unified error type for the commerce client.
//!
//! The per-module errors stay precise at their seams; `CommerceError` is the
//! single type the consuming UI layer matches on. Note the deliberate
//! asymmetry of the error taxonomy: storage failures and remote-mirror
//! failures never surface here at all (they are logged and swallowed inside
//! the engines), only transactional and validation failures do.

use thiserror::Error;

use crate::addresses::AddressError;
use crate::api::ApiError;
use crate::config::ConfigError;
use crate::orders::OrderError;
use crate::session::AuthError;

/// Application-level error type for the commerce client.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Configuration loading failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A remote call that the caller is actively waiting on failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Authentication failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order creation or return request failed.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// Address book operation failed.
    #[error("address error: {0}")]
    Address(#[from] AddressError),
}

/// Result type alias for `CommerceError`.
pub type Result<T> = std::result::Result<T, CommerceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommerceError::from(AddressError::LimitReached);
        assert_eq!(
            err.to_string(),
            "address error: address book is full (at most 2 addresses)"
        );

        let err = CommerceError::from(AuthError::InvalidCredentials);
        assert_eq!(err.to_string(), "auth error: invalid credentials");
    }
}
