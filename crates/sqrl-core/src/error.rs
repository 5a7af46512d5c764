/// Failures while decoding or validating a nut token.
///
/// Decode failures never panic; adversarial input surfaces as a variant the
/// session boundary maps to a bad-request reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NutError {
    #[error("nut is not valid base64")]
    Base64,
    #[error("nut ciphertext has wrong length")]
    Length,
    #[error("nut failed to decrypt")]
    Decrypt,
    #[error("nut issued {age_ms}ms ago exceeds validity window")]
    Expired { age_ms: u64 },
    #[error("nut timestamp is in the future")]
    FromFuture,
    #[error("nut has already been used")]
    Replayed,
}

/// Construction-time configuration failures. Fatal at startup, never per
/// request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("nut validity window must be nonzero")]
    ZeroValidityWindow,
    #[error("cleanup interval must be nonzero when set")]
    ZeroCleanupInterval,
    #[error("backchannel path must start with '/'")]
    BadBackchannelPath,
}
