use super::*;
use sqrl_core::AuthStatus;
use sqrl_store::Correlator;
use sqrl_store::Persistence;
use sqrl_store::Transaction;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Answers a browser poll: given the statuses the poller last saw, returns
/// only the attempts whose status is worth reporting now. A vanished
/// correlator reports as an internal error so the poller stops waiting on
/// it.
pub fn status_changes<P>(
    store: &P,
    known: &BTreeMap<String, AuthStatus>,
) -> Result<BTreeMap<String, AuthStatus>, SqrlError>
where
    P: Persistence,
{
    let mut txn = store.begin()?;
    let mut changes = txn.status_updates(known)?;
    for value in known.keys() {
        if !changes.contains_key(value) && txn.correlator(value)?.is_none() {
            log::warn!("[poll] correlator {} no longer exists", value);
            changes.insert(value.clone(), AuthStatus::ErrorInternal);
        }
    }
    txn.commit()?;
    Ok(changes)
}

/// Bulk correlator fetch for embedding applications inspecting attempts.
pub fn correlators<P>(
    store: &P,
    values: &BTreeSet<String>,
) -> Result<BTreeMap<String, Correlator>, SqrlError>
where
    P: Persistence,
{
    let mut txn = store.begin()?;
    let found = txn.correlators(values)?;
    txn.commit()?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqrl_store::MemoryStore;

    fn store_with(values: &[(&str, AuthStatus)]) -> MemoryStore {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        for (value, status) in values {
            txn.create_correlator(value, u64::MAX).unwrap();
            txn.set_auth_status(value, *status).unwrap();
        }
        txn.commit().unwrap();
        store
    }

    #[test]
    fn unchanged_status_not_reported() {
        let store = store_with(&[("A", AuthStatus::Pending)]);
        let known = BTreeMap::from([(String::from("A"), AuthStatus::Pending)]);
        assert!(status_changes(&store, &known).unwrap().is_empty());
    }

    #[test]
    fn changed_status_reported() {
        let store = store_with(&[("A", AuthStatus::InProgress)]);
        let known = BTreeMap::from([(String::from("A"), AuthStatus::Pending)]);
        let changes = status_changes(&store, &known).unwrap();
        assert_eq!(changes.get("A"), Some(&AuthStatus::InProgress));
    }

    #[test]
    fn terminal_status_always_reported() {
        let store = store_with(&[("A", AuthStatus::Complete)]);
        let known = BTreeMap::from([(String::from("A"), AuthStatus::Complete)]);
        let changes = status_changes(&store, &known).unwrap();
        assert_eq!(changes.get("A"), Some(&AuthStatus::Complete));
    }

    #[test]
    fn only_the_changed_attempt_is_reported() {
        let store = store_with(&[
            ("A", AuthStatus::Pending),
            ("B", AuthStatus::Complete),
        ]);
        let known = BTreeMap::from([
            (String::from("A"), AuthStatus::Pending),
            (String::from("B"), AuthStatus::Pending),
        ]);
        let changes = status_changes(&store, &known).unwrap();
        assert_eq!(
            changes,
            BTreeMap::from([(String::from("B"), AuthStatus::Complete)])
        );
    }

    #[test]
    fn missing_correlator_reports_internal_error() {
        let store = store_with(&[]);
        let known = BTreeMap::from([(String::from("GONE"), AuthStatus::Pending)]);
        let changes = status_changes(&store, &known).unwrap();
        assert_eq!(changes.get("GONE"), Some(&AuthStatus::ErrorInternal));
    }

    #[test]
    fn bulk_fetch_skips_unknown_values() {
        let store = store_with(&[("A", AuthStatus::Pending)]);
        let values = BTreeSet::from([String::from("A"), String::from("B")]);
        let found = correlators(&store, &values).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("A"));
    }
}
