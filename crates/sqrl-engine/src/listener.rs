use super::*;
use sqrl_core::AuthStatus;
use sqrl_store::Persistence;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

/// Callback surface for embedding applications that want pushed status
/// updates instead of polling the store themselves.
pub trait AuthStateListener: Send + Sync {
    fn status_changed(&self, correlator: &str, status: AuthStatus);
}

/// Tracks login attempts on behalf of a listener and notifies it whenever
/// a watched attempt's status becomes reportable. Driven by periodic calls
/// to [`AuthStateMonitor::tick`] from the host's housekeeping task.
pub struct AuthStateMonitor {
    watched: Mutex<BTreeMap<String, AuthStatus>>,
    listener: Arc<dyn AuthStateListener>,
}

impl AuthStateMonitor {
    pub fn new(listener: Arc<dyn AuthStateListener>) -> Self {
        Self {
            watched: Mutex::new(BTreeMap::new()),
            listener,
        }
    }

    /// Starts watching an attempt from the given last-known status.
    pub fn watch(&self, correlator: String, last_known: AuthStatus) {
        self.watched
            .lock()
            .expect("monitor mutex poisoned")
            .insert(correlator, last_known);
    }

    pub fn watched(&self) -> usize {
        self.watched.lock().expect("monitor mutex poisoned").len()
    }

    /// One reconciliation round. Every reportable change is delivered to
    /// the listener; attempts that reached a terminal or error status stop
    /// being watched, everything else keeps its updated status as the new
    /// baseline. Returns how many notifications were delivered.
    pub fn tick<P>(&self, store: &P) -> Result<usize, SqrlError>
    where
        P: Persistence,
    {
        let known = self.watched.lock().expect("monitor mutex poisoned").clone();
        if known.is_empty() {
            return Ok(0);
        }
        let changes = poll::status_changes(store, &known)?;
        let mut watched = self.watched.lock().expect("monitor mutex poisoned");
        for (correlator, status) in &changes {
            log::debug!("[monitor] {} now {:?}", correlator, status);
            self.listener.status_changed(correlator, *status);
            if status.is_terminal() || status.is_error() {
                watched.remove(correlator);
            } else {
                watched.insert(correlator.clone(), *status);
            }
        }
        Ok(changes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqrl_store::MemoryStore;
    use sqrl_store::Transaction;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, AuthStatus)>>,
    }

    impl AuthStateListener for Recorder {
        fn status_changed(&self, correlator: &str, status: AuthStatus) {
            self.seen
                .lock()
                .unwrap()
                .push((correlator.to_string(), status));
        }
    }

    fn store_with(value: &str, status: AuthStatus) -> MemoryStore {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.create_correlator(value, u64::MAX).unwrap();
        txn.set_auth_status(value, status).unwrap();
        txn.commit().unwrap();
        store
    }

    #[test]
    fn notifies_on_change_and_keeps_watching() {
        let store = store_with("A", AuthStatus::InProgress);
        let recorder = Arc::new(Recorder::default());
        let monitor = AuthStateMonitor::new(recorder.clone());
        monitor.watch(String::from("A"), AuthStatus::Pending);
        assert_eq!(monitor.tick(&store).unwrap(), 1);
        assert_eq!(
            recorder.seen.lock().unwrap().as_slice(),
            [(String::from("A"), AuthStatus::InProgress)]
        );
        assert_eq!(monitor.watched(), 1);
        // baseline advanced, so the same status is quiet next round
        assert_eq!(monitor.tick(&store).unwrap(), 0);
    }

    #[test]
    fn terminal_status_stops_the_watch() {
        let store = store_with("A", AuthStatus::Complete);
        let monitor = AuthStateMonitor::new(Arc::new(Recorder::default()));
        monitor.watch(String::from("A"), AuthStatus::Pending);
        assert_eq!(monitor.tick(&store).unwrap(), 1);
        assert_eq!(monitor.watched(), 0);
        assert_eq!(monitor.tick(&store).unwrap(), 0);
    }

    #[test]
    fn vanished_correlator_reports_error_and_stops() {
        let store = MemoryStore::new();
        let recorder = Arc::new(Recorder::default());
        let monitor = AuthStateMonitor::new(recorder.clone());
        monitor.watch(String::from("GONE"), AuthStatus::Pending);
        assert_eq!(monitor.tick(&store).unwrap(), 1);
        assert_eq!(
            recorder.seen.lock().unwrap().as_slice(),
            [(String::from("GONE"), AuthStatus::ErrorInternal)]
        );
        assert_eq!(monitor.watched(), 0);
    }
}
