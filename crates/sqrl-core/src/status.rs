use serde::Deserialize;
use serde::Serialize;

/// Lifecycle of one browser-side login attempt, polled by the browser via
/// its correlator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// Correlator issued, no client contact yet.
    Pending,
    /// At least one backchannel round trip has occurred.
    InProgress,
    /// Authentication completed; the consuming application may log the
    /// user in and delete the correlator.
    Complete,
    /// The client sent a malformed or unauthorized request.
    ErrorBadRequest,
    /// The server failed internally while processing.
    ErrorInternal,
    /// The identity exists but SQRL auth is disabled for it.
    UserDisabled,
}

impl AuthStatus {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ErrorBadRequest | Self::ErrorInternal | Self::UserDisabled
        )
    }
    /// Complete is terminal and idempotent: a poller that missed the
    /// transition must still converge, so it is always resurfaced.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
    /// Whether a poll with `last_known` should report `current`. The store
    /// contract and the poll reconciler both defer to this rule.
    pub fn reportable(last_known: AuthStatus, current: AuthStatus) -> bool {
        current.is_terminal() || last_known != current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_status_not_reported() {
        assert!(!AuthStatus::reportable(
            AuthStatus::Pending,
            AuthStatus::Pending
        ));
        assert!(AuthStatus::reportable(
            AuthStatus::Pending,
            AuthStatus::InProgress
        ));
    }

    #[test]
    fn complete_always_resurfaces() {
        assert!(AuthStatus::reportable(
            AuthStatus::Complete,
            AuthStatus::Complete
        ));
    }
}
