use sqrl_core::NutError;
use sqrl_core::ParseError;
use sqrl_core::TifFlag;
use sqrl_store::StoreError;

/// Request-scoped protocol failures. Every variant is fully recovered at
/// the session boundary: the transaction rolls back, the client receives a
/// well-formed error-path reply, and the next request is unaffected.
#[derive(Debug, thiserror::Error)]
pub enum SqrlError {
    /// Malformed, expired, or replayed nut.
    #[error(transparent)]
    Nut(#[from] NutError),
    /// Malformed request parameters.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Invalid or unauthorized command, optionally carrying an extra TIF
    /// flag to merge into the error reply.
    #[error("{reason}")]
    Request {
        tif: Option<TifFlag>,
        reason: String,
    },
    /// Storage contract violation; maps to a generic internal error reply.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SqrlError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Request {
            tif: None,
            reason: reason.into(),
        }
    }
    pub fn invalid_with_tif(tif: TifFlag, reason: impl Into<String>) -> Self {
        Self::Request {
            tif: Some(tif),
            reason: reason.into(),
        }
    }
    /// Whether the client caused this (bad request) as opposed to an
    /// internal failure; decides the correlator's error status.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::Nut(_) | Self::Parse(_) | Self::Request { .. })
    }
    pub fn tif_to_add(&self) -> Option<TifFlag> {
        match self {
            Self::Request { tif, .. } => *tif,
            _ => None,
        }
    }
}
