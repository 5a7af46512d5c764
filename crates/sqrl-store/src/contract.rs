use super::*;
use sqrl_core::AuthStatus;
use sqrl_core::IdentityFlag;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Storage failures. Required-entity misses and cardinality violations are
/// contract errors; anything else is backend-specific and carried opaquely.
/// All of them escalate to an internal error at the session boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found for key {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("{0}")]
    Conflict(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: &str) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Hands out scoped units of work. One transaction per processing phase;
/// the request path opens two (process, then reply) as independent commit
/// points.
pub trait Persistence {
    type Txn<'a>: Transaction
    where
        Self: 'a;
    fn begin(&self) -> Result<Self::Txn<'_>, StoreError>;
}

/// One scoped unit of work against the store.
///
/// Dropping a transaction without calling [`Transaction::commit`] rolls it
/// back; release on every exit path is structural, not a convention.
pub trait Transaction {
    // identity operations
    fn identity(&mut self, idk: &str) -> Result<Option<Identity>, StoreError>;
    fn identity_by_xref(&mut self, xref: &str) -> Result<Option<Identity>, StoreError>;
    /// Creates a new identity with auth enabled.
    fn create_identity(&mut self, idk: &str) -> Result<(), StoreError>;
    /// Key rotation: rewrites the identity's primary key in place.
    fn rekey_identity(&mut self, pidk: &str, idk: &str) -> Result<(), StoreError>;
    fn delete_identity(&mut self, idk: &str) -> Result<(), StoreError>;
    fn flag(&mut self, idk: &str, flag: IdentityFlag) -> Result<bool, StoreError>;
    fn set_flag(&mut self, idk: &str, flag: IdentityFlag, enabled: bool)
    -> Result<(), StoreError>;
    fn store_identity_data(
        &mut self,
        idk: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), StoreError>;
    fn identity_data_item(&mut self, idk: &str, name: &str) -> Result<Option<String>, StoreError>;
    fn set_native_xref(&mut self, idk: &str, xref: &str) -> Result<(), StoreError>;

    // correlator operations
    fn create_correlator(&mut self, value: &str, expires_at_ms: u64) -> Result<(), StoreError>;
    fn correlator(&mut self, value: &str) -> Result<Option<Correlator>, StoreError>;
    fn delete_correlator(&mut self, value: &str) -> Result<(), StoreError>;
    fn correlators(
        &mut self,
        values: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Correlator>, StoreError>;
    /// Poll support: statuses that changed relative to the caller's
    /// last-known values, per [`AuthStatus::reportable`].
    fn status_updates(
        &mut self,
        known: &BTreeMap<String, AuthStatus>,
    ) -> Result<BTreeMap<String, AuthStatus>, StoreError>;
    fn set_auth_status(&mut self, value: &str, status: AuthStatus) -> Result<(), StoreError>;
    /// Marks authentication complete and links the identity.
    fn authenticate(&mut self, idk: &str, correlator: &str) -> Result<(), StoreError>;
    fn set_transient(&mut self, correlator: &str, name: &str, value: &str)
    -> Result<(), StoreError>;
    fn transient(&mut self, correlator: &str, name: &str) -> Result<Option<String>, StoreError>;
    fn take_transient(
        &mut self,
        correlator: &str,
        name: &str,
    ) -> Result<Option<String>, StoreError>;

    // replay guard
    /// Atomically records the encoded nut as used. Returns false when it
    /// was already present, which the validator reports as a replay.
    fn mark_token_used(&mut self, token: &str, expires_at_ms: u64) -> Result<bool, StoreError>;

    // housekeeping
    /// Deletes expired correlators and used tokens. Returns the deleted
    /// counts (correlators, tokens).
    fn purge_expired(&mut self, now_ms: u64) -> Result<(usize, usize), StoreError>;

    fn commit(self) -> Result<(), StoreError>;

    // provided lookups with required-or-error semantics
    fn identity_exists(&mut self, idk: &str) -> Result<bool, StoreError> {
        self.identity(idk).map(|opt| opt.is_some())
    }
    fn identity_required(&mut self, idk: &str) -> Result<Identity, StoreError>
    where
        Self: Sized,
    {
        self.identity(idk)?
            .ok_or_else(|| StoreError::not_found("identity", idk))
    }
    fn correlator_required(&mut self, value: &str) -> Result<Correlator, StoreError>
    where
        Self: Sized,
    {
        self.correlator(value)?
            .ok_or_else(|| StoreError::not_found("correlator", value))
    }
}
