//! Store credentials and the combined [`Store`] trait.
//!
//! Workers authenticate once at startup. A rejected login is fatal for
//! that worker: it must not start accepting connections.

use std::fmt;
use std::future::Future;

use crate::{BoardDirectory, EventLog, StoreError};

/// User name and password presented to the store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Store user.
    pub user: String,
    /// Store password.
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("admin", "admin")
    }
}

// Keeps the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Everything a worker needs from the persistent store.
///
/// # Example
///
/// ```rust
/// use boardrelay_store::{Credentials, MemoryStore, Store, StoreConfig};
///
/// # tokio_test_block(async {
/// let store = MemoryStore::new(StoreConfig::default());
/// store.authenticate(&Credentials::default()).await.unwrap();
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
/// # }
/// ```
pub trait Store: BoardDirectory + EventLog {
    /// Checks `credentials` against the store.
    ///
    /// # Errors
    /// - [`StoreError::AuthenticationFailed`]: credentials rejected
    /// - [`StoreError::Unavailable`]: store unreachable
    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
