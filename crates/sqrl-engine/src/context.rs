use sqrl_core::*;
use std::net::IpAddr;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

/// Shared per-server state the engine components need: the validated
/// config, the nut codec, and the mint counter. Owned by the session
/// orchestrator and passed down explicitly; there is no global state.
pub struct SqrlContext {
    config: SqrlConfig,
    codec: NutCodec,
    counter: AtomicU32,
}

impl SqrlContext {
    pub fn new(config: SqrlConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let codec = NutCodec::new(&config.nut_key);
        Ok(Self {
            config,
            codec,
            counter: AtomicU32::new(0),
        })
    }

    pub fn config(&self) -> &SqrlConfig {
        &self.config
    }

    /// Mints a fresh nut for the given requester. The counter is a
    /// process-wide atomic: concurrent mints never share a value, which
    /// combined with the random field makes every nut unique.
    pub fn mint(&self, requester: IpAddr, now_ms: u64) -> NutToken {
        use rand::Rng;
        NutToken::new(
            ip_to_u32(requester),
            self.counter.fetch_add(1, Ordering::SeqCst),
            now_ms,
            rand::rng().random(),
        )
    }

    pub fn encode(&self, token: &NutToken) -> String {
        self.codec.encode(token)
    }

    pub fn decode(&self, encoded: &str) -> Result<NutToken, NutError> {
        self.codec.decode(encoded)
    }

    /// Derives the correlator string for a login attempt from its first
    /// nut: base64url of the SHA-256 of the encoded token, so correlators
    /// inherit nut uniqueness.
    pub fn correlator_for(encoded_nut: &str) -> String {
        use sha2::Digest;
        util::b64_encode(&sha2::Sha256::digest(encoded_nut.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn context() -> SqrlContext {
        SqrlContext::new(SqrlConfig::default()).unwrap()
    }

    #[test]
    fn counter_is_monotonic() {
        let context = context();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let first = context.mint(ip, 1000);
        let second = context.mint(ip, 1000);
        assert!(second.counter() > first.counter());
    }

    #[test]
    fn concurrent_mints_never_collide() {
        let context = Arc::new(context());
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let handles = (0..8)
            .map(|_| {
                let context = Arc::clone(&context);
                std::thread::spawn(move || {
                    (0..100).map(|_| context.mint(ip, 1).counter()).collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();
        let mut seen = HashSet::new();
        for handle in handles {
            for counter in handle.join().unwrap() {
                assert!(seen.insert(counter), "duplicate counter {}", counter);
            }
        }
    }

    #[test]
    fn correlator_is_deterministic() {
        assert_eq!(
            SqrlContext::correlator_for("NUT"),
            SqrlContext::correlator_for("NUT")
        );
        assert_ne!(
            SqrlContext::correlator_for("NUT"),
            SqrlContext::correlator_for("TUN")
        );
    }

    #[test]
    fn invalid_config_fails_construction() {
        let mut config = SqrlConfig::default();
        config.nut_validity = std::time::Duration::ZERO;
        assert!(SqrlContext::new(config).is_err());
    }
}
