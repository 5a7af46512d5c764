use super::*;
use std::time::Duration;

/// Server-side SQRL settings. Plain data; validated once at construction of
/// the operations object, so a bad config fails fast rather than per
/// request.
#[derive(Debug, Clone)]
pub struct SqrlConfig {
    /// Symmetric key under which nut tokens are encrypted.
    pub nut_key: [u8; 32],
    /// How long a minted nut is accepted for.
    pub nut_validity: Duration,
    /// Whether the embedded IP is compared against the requester's IP.
    /// A match is informational either way; only the TIF flag changes.
    pub ip_matching: bool,
    /// Display name embedded in the login URL. Computed from the
    /// backchannel host when unset.
    pub server_friendly_name: Option<String>,
    /// Path of the backchannel endpoint, e.g. "/sqrlbc".
    pub backchannel_path: String,
    /// Interval for the expired-entry purge task, None to disable.
    pub cleanup_interval: Option<Duration>,
    /// Cookie names set by the page preparation step.
    pub correlator_cookie: String,
    pub first_nut_cookie: String,
    /// Extra lifetime the correlator cookie gets beyond nut validity.
    pub correlator_cookie_grace: Duration,
}

impl Default for SqrlConfig {
    fn default() -> Self {
        Self {
            nut_key: [0u8; 32],
            nut_validity: Duration::from_secs(15 * 60),
            ip_matching: true,
            server_friendly_name: None,
            backchannel_path: String::from("/sqrlbc"),
            cleanup_interval: Some(Duration::from_secs(15 * 60)),
            correlator_cookie: String::from("sqrlcorrelator"),
            first_nut_cookie: String::from("sqrlfirstnut"),
            correlator_cookie_grace: Duration::from_secs(120),
        }
    }
}

impl SqrlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nut_validity.is_zero() {
            return Err(ConfigError::ZeroValidityWindow);
        }
        if self.cleanup_interval.is_some_and(|i| i.is_zero()) {
            return Err(ConfigError::ZeroCleanupInterval);
        }
        if !self.backchannel_path.starts_with('/') {
            return Err(ConfigError::BadBackchannelPath);
        }
        Ok(())
    }
    pub fn nut_validity_ms(&self) -> u64 {
        self.nut_validity.as_millis() as u64
    }
}
