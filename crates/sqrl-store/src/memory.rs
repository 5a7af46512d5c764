use super::*;
use sqrl_core::AuthStatus;
use sqrl_core::IdentityFlag;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// In-memory reference store. Transactions take the store lock for their
/// whole scope and snapshot the state at begin, so rollback is a restore
/// and concurrent sessions serialize on the lock. Suitable for tests and
/// single-process embeddings.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default, Clone)]
struct State {
    identities: BTreeMap<String, Identity>,
    correlators: BTreeMap<String, Correlator>,
    used_tokens: BTreeMap<String, u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for MemoryStore {
    type Txn<'a> = MemoryTransaction<'a>;
    fn begin(&self) -> Result<Self::Txn<'_>, StoreError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Backend(String::from("store lock poisoned")))?;
        let snapshot = guard.clone();
        Ok(MemoryTransaction {
            guard,
            snapshot: Some(snapshot),
        })
    }
}

/// Scoped unit of work over [`MemoryStore`]. Dropping without commit
/// restores the begin-time snapshot.
pub struct MemoryTransaction<'a> {
    guard: MutexGuard<'a, State>,
    snapshot: Option<State>,
}

impl MemoryTransaction<'_> {
    fn identity_mut(&mut self, idk: &str) -> Result<&mut Identity, StoreError> {
        self.guard
            .identities
            .get_mut(idk)
            .ok_or_else(|| StoreError::not_found("identity", idk))
    }
    fn correlator_mut(&mut self, value: &str) -> Result<&mut Correlator, StoreError> {
        self.guard
            .correlators
            .get_mut(value)
            .ok_or_else(|| StoreError::not_found("correlator", value))
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        // Snapshot still present means commit never ran.
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn identity(&mut self, idk: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.guard.identities.get(idk).cloned())
    }

    fn identity_by_xref(&mut self, xref: &str) -> Result<Option<Identity>, StoreError> {
        let mut matches = self
            .guard
            .identities
            .values()
            .filter(|i| i.native_xref() == Some(xref));
        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(StoreError::Conflict(format!(
                "multiple identities share native xref {}",
                xref
            )));
        }
        Ok(first)
    }

    fn create_identity(&mut self, idk: &str) -> Result<(), StoreError> {
        if self.guard.identities.contains_key(idk) {
            return Err(StoreError::Conflict(format!(
                "identity already exists for idk {}",
                idk
            )));
        }
        self.guard
            .identities
            .insert(idk.to_string(), Identity::new(idk.to_string()));
        Ok(())
    }

    fn rekey_identity(&mut self, pidk: &str, idk: &str) -> Result<(), StoreError> {
        let mut identity = self
            .guard
            .identities
            .remove(pidk)
            .ok_or_else(|| StoreError::not_found("identity", pidk))?;
        identity.set_idk(idk.to_string());
        self.guard.identities.insert(idk.to_string(), identity);
        Ok(())
    }

    fn delete_identity(&mut self, idk: &str) -> Result<(), StoreError> {
        if self.guard.identities.remove(idk).is_none() {
            log::warn!("[store] can't find idk {} to delete", idk);
        }
        Ok(())
    }

    fn flag(&mut self, idk: &str, flag: IdentityFlag) -> Result<bool, StoreError> {
        Ok(self.identity_mut(idk)?.flag(flag))
    }

    fn set_flag(
        &mut self,
        idk: &str,
        flag: IdentityFlag,
        enabled: bool,
    ) -> Result<(), StoreError> {
        if !self.identity_mut(idk)?.set_flag(flag, enabled) {
            log::warn!(
                "[store] flag {:?} for idk {} was already {}",
                flag,
                idk,
                enabled
            );
        }
        Ok(())
    }

    fn store_identity_data(
        &mut self,
        idk: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.identity_mut(idk)?.store_data(data);
        Ok(())
    }

    fn identity_data_item(&mut self, idk: &str, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.identity_mut(idk)?.data_item(name).map(str::to_string))
    }

    fn set_native_xref(&mut self, idk: &str, xref: &str) -> Result<(), StoreError> {
        self.identity_mut(idk)?.set_native_xref(xref.to_string());
        Ok(())
    }

    fn create_correlator(&mut self, value: &str, expires_at_ms: u64) -> Result<(), StoreError> {
        if self.guard.correlators.contains_key(value) {
            return Err(StoreError::Conflict(format!(
                "correlator already exists: {}",
                value
            )));
        }
        self.guard.correlators.insert(
            value.to_string(),
            Correlator::new(value.to_string(), expires_at_ms),
        );
        Ok(())
    }

    fn correlator(&mut self, value: &str) -> Result<Option<Correlator>, StoreError> {
        Ok(self.guard.correlators.get(value).cloned())
    }

    fn delete_correlator(&mut self, value: &str) -> Result<(), StoreError> {
        if self.guard.correlators.remove(value).is_none() {
            log::debug!("[store] attempt to remove correlator that doesn't exist");
        }
        Ok(())
    }

    fn correlators(
        &mut self,
        values: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Correlator>, StoreError> {
        Ok(self
            .guard
            .correlators
            .iter()
            .filter(|(value, _)| values.contains(*value))
            .map(|(value, correlator)| (value.clone(), correlator.clone()))
            .collect())
    }

    fn status_updates(
        &mut self,
        known: &BTreeMap<String, AuthStatus>,
    ) -> Result<BTreeMap<String, AuthStatus>, StoreError> {
        Ok(known
            .iter()
            .filter_map(|(value, last_known)| {
                self.guard
                    .correlators
                    .get(value)
                    .map(|c| (value, *last_known, c.status()))
            })
            .filter(|(_, last_known, current)| AuthStatus::reportable(*last_known, *current))
            .map(|(value, _, current)| (value.clone(), current))
            .collect())
    }

    fn set_auth_status(&mut self, value: &str, status: AuthStatus) -> Result<(), StoreError> {
        self.correlator_mut(value)?.set_status(status);
        Ok(())
    }

    fn authenticate(&mut self, idk: &str, correlator: &str) -> Result<(), StoreError> {
        if !self.guard.identities.contains_key(idk) {
            return Err(StoreError::not_found("identity", idk));
        }
        let correlator = self.correlator_mut(correlator)?;
        correlator.set_status(AuthStatus::Complete);
        correlator.link_identity(idk.to_string());
        Ok(())
    }

    fn set_transient(
        &mut self,
        correlator: &str,
        name: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.correlator_mut(correlator)?
            .set_transient(name.to_string(), value.to_string());
        Ok(())
    }

    fn transient(&mut self, correlator: &str, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .correlator_mut(correlator)?
            .transient(name)
            .map(str::to_string))
    }

    fn take_transient(
        &mut self,
        correlator: &str,
        name: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(self.correlator_mut(correlator)?.take_transient(name))
    }

    fn mark_token_used(&mut self, token: &str, expires_at_ms: u64) -> Result<bool, StoreError> {
        if self.guard.used_tokens.contains_key(token) {
            return Ok(false);
        }
        self.guard
            .used_tokens
            .insert(token.to_string(), expires_at_ms);
        Ok(true)
    }

    fn purge_expired(&mut self, now_ms: u64) -> Result<(usize, usize), StoreError> {
        let correlators_before = self.guard.correlators.len();
        let tokens_before = self.guard.used_tokens.len();
        self.guard.correlators.retain(|_, c| c.expires_at_ms() >= now_ms);
        self.guard.used_tokens.retain(|_, expiry| *expiry >= now_ms);
        let purged = (
            correlators_before - self.guard.correlators.len(),
            tokens_before - self.guard.used_tokens.len(),
        );
        if purged.0 > 0 || purged.1 > 0 {
            log::info!(
                "[store] purged {} correlators and {} used tokens",
                purged.0,
                purged.1
            );
        }
        Ok(purged)
    }

    fn commit(mut self) -> Result<(), StoreError> {
        // Discarding the snapshot makes the drop a no-op.
        self.snapshot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_persists_across_transactions() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.create_identity("IDK1").unwrap();
        txn.commit().unwrap();
        let mut txn = store.begin().unwrap();
        assert!(txn.identity_exists("IDK1").unwrap());
    }

    #[test]
    fn drop_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut txn = store.begin().unwrap();
            txn.create_identity("IDK1").unwrap();
            // txn dropped without commit
        }
        let mut txn = store.begin().unwrap();
        assert!(!txn.identity_exists("IDK1").unwrap());
    }

    #[test]
    fn rekey_moves_identity() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.create_identity("OLD").unwrap();
        txn.rekey_identity("OLD", "NEW").unwrap();
        assert!(!txn.identity_exists("OLD").unwrap());
        let identity = txn.identity_required("NEW").unwrap();
        assert_eq!(identity.idk(), "NEW");
    }

    #[test]
    fn duplicate_identity_conflicts() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.create_identity("IDK1").unwrap();
        assert!(matches!(
            txn.create_identity("IDK1"),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn mark_token_used_is_insert_once() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        assert!(txn.mark_token_used("NUT1", 1000).unwrap());
        assert!(!txn.mark_token_used("NUT1", 1000).unwrap());
    }

    #[test]
    fn purge_drops_only_expired() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.create_correlator("OLD", 500).unwrap();
        txn.create_correlator("LIVE", 5000).unwrap();
        txn.mark_token_used("STALE", 100).unwrap();
        txn.mark_token_used("FRESH", 9000).unwrap();
        assert_eq!(txn.purge_expired(1000).unwrap(), (1, 1));
        assert!(txn.correlator("LIVE").unwrap().is_some());
        assert!(txn.correlator("OLD").unwrap().is_none());
    }

    #[test]
    fn authenticate_completes_and_links() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.create_identity("IDK1").unwrap();
        txn.create_correlator("COR", 9000).unwrap();
        txn.authenticate("IDK1", "COR").unwrap();
        let correlator = txn.correlator_required("COR").unwrap();
        assert_eq!(correlator.status(), AuthStatus::Complete);
        assert_eq!(correlator.authenticated_idk(), Some("IDK1"));
    }

    #[test]
    fn required_lookup_escalates() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        assert!(matches!(
            txn.identity_required("MISSING"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn xref_lookup_conflicts_on_duplicates() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.create_identity("A").unwrap();
        txn.create_identity("B").unwrap();
        txn.set_native_xref("A", "user-1").unwrap();
        txn.set_native_xref("B", "user-1").unwrap();
        assert!(matches!(
            txn.identity_by_xref("user-1"),
            Err(StoreError::Conflict(_))
        ));
    }
}
