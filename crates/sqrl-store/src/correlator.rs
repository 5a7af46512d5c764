use sqrl_core::AuthStatus;
use std::collections::BTreeMap;

/// One browser-side login attempt, keyed by the hash of its first nut.
/// Created when the login page is prepared, polled by the browser, deleted
/// by the consuming application once the login flow finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlator {
    value: String,
    expires_at_ms: u64,
    status: AuthStatus,
    transient: BTreeMap<String, String>,
    authenticated_idk: Option<String>,
}

impl Correlator {
    pub fn new(value: String, expires_at_ms: u64) -> Self {
        Self {
            value,
            expires_at_ms,
            status: AuthStatus::Pending,
            transient: BTreeMap::new(),
            authenticated_idk: None,
        }
    }
    pub fn value(&self) -> &str {
        &self.value
    }
    pub fn expires_at_ms(&self) -> u64 {
        self.expires_at_ms
    }
    pub fn status(&self) -> AuthStatus {
        self.status
    }
    pub fn set_status(&mut self, status: AuthStatus) {
        self.status = status;
    }
    pub fn transient(&self, name: &str) -> Option<&str> {
        self.transient.get(name).map(String::as_str)
    }
    pub fn set_transient(&mut self, name: String, value: String) {
        self.transient.insert(name, value);
    }
    pub fn take_transient(&mut self, name: &str) -> Option<String> {
        self.transient.remove(name)
    }
    /// The identity that completed authentication on this attempt.
    pub fn authenticated_idk(&self) -> Option<&str> {
        self.authenticated_idk.as_deref()
    }
    pub fn link_identity(&mut self, idk: String) {
        self.authenticated_idk = Some(idk);
    }
}
