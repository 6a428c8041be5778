//! Address book.
//!
//! A small server-owned set with one hard client-side rule: at most two
//! addresses per account. The limit is enforced before any network call so
//! the backend never sees a third address. Every mutation is a passthrough
//! followed by a refetch - the server's list is authoritative and the
//! client never patches entries in place.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use tangelo_core::{Address, AddressId, NewAddress, UserId};

use crate::api::{ApiError, CommerceApi};

/// Maximum number of addresses an account may hold.
pub const MAX_ADDRESSES: usize = 2;

/// Errors that can occur managing the address book.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The account already holds the maximum number of addresses.
    #[error("address book is full (at most {MAX_ADDRESSES} addresses)")]
    LimitReached,

    /// The address is not in the fetched set.
    #[error("unknown address: {0}")]
    UnknownAddress(AddressId),

    /// Backend call failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

/// The address book.
pub struct AddressBook<A> {
    api: Arc<A>,
    addresses: Vec<Address>,
    revision: watch::Sender<u64>,
}

impl<A: CommerceApi> AddressBook<A> {
    /// Create an empty book; call [`Self::refresh`] once an authenticated
    /// user id is known.
    #[must_use]
    pub fn new(api: Arc<A>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            api,
            addresses: Vec::new(),
            revision,
        }
    }

    /// The fetched addresses.
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// The default address, if any are held.
    #[must_use]
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.is_default)
    }

    /// Whether another address can still be added.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.addresses.len() >= MAX_ADDRESSES
    }

    /// Subscribe to change notifications; the revision bumps only on actual
    /// mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Replace the local set with the account's addresses.
    ///
    /// A fetched set with no default flag gets its first entry promoted to
    /// default. The promotion is a local view fix only, never written back.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Api` if the fetch fails; the local set is
    /// untouched.
    pub async fn refresh(&mut self, user_id: &UserId) -> Result<(), AddressError> {
        let mut remote = self.api.fetch_addresses(user_id).await?;
        if !remote.iter().any(|a| a.is_default) {
            if let Some(first) = remote.first_mut() {
                first.is_default = true;
            }
        }
        tracing::debug!(addresses = remote.len(), "refreshed address book");
        if remote != self.addresses {
            self.addresses = remote;
            self.notify();
        }
        Ok(())
    }

    /// Drop the local set, e.g. on logout. Nothing remote is touched.
    pub fn forget(&mut self) {
        if !self.addresses.is_empty() {
            self.addresses.clear();
            self.notify();
        }
    }

    /// Add an address, then refetch.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::LimitReached` before any network call when the
    /// book is full, or `AddressError::Api` when the backend rejects.
    pub async fn add(
        &mut self,
        user_id: &UserId,
        address: &NewAddress,
    ) -> Result<Address, AddressError> {
        if self.is_full() {
            return Err(AddressError::LimitReached);
        }
        let created = self.api.create_address(user_id, address).await?;
        tracing::info!(address_id = %created.id, "address created");
        self.refresh(user_id).await?;
        Ok(created)
    }

    /// Update an existing address, then refetch.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::UnknownAddress` for an id not in the local
    /// set, or `AddressError::Api` when the backend rejects.
    pub async fn update(
        &mut self,
        user_id: &UserId,
        id: &AddressId,
        address: &NewAddress,
    ) -> Result<Address, AddressError> {
        self.require_known(id)?;
        let updated = self.api.update_address(id, address).await?;
        self.refresh(user_id).await?;
        Ok(updated)
    }

    /// Delete an address, then refetch. If the deleted address was the
    /// default, the refetch promotion picks the remaining entry.
    ///
    /// # Errors
    ///
    /// Same failure surface as [`Self::update`].
    pub async fn remove(&mut self, user_id: &UserId, id: &AddressId) -> Result<(), AddressError> {
        self.require_known(id)?;
        self.api.delete_address(id).await?;
        tracing::info!(address_id = %id, "address deleted");
        self.refresh(user_id).await
    }

    /// Mark an address as the default, then refetch.
    ///
    /// # Errors
    ///
    /// Same failure surface as [`Self::update`].
    pub async fn set_default(
        &mut self,
        user_id: &UserId,
        id: &AddressId,
    ) -> Result<(), AddressError> {
        self.require_known(id)?;
        self.api.set_default_address(id).await?;
        self.refresh(user_id).await
    }

    fn require_known(&self, id: &AddressId) -> Result<(), AddressError> {
        if self.addresses.iter().any(|a| &a.id == id) {
            Ok(())
        } else {
            Err(AddressError::UnknownAddress(id.clone()))
        }
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}
