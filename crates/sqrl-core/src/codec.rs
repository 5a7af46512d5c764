use super::*;
use aes_gcm::Aes256Gcm;
use aes_gcm::Key;
use aes_gcm::Nonce;
use aes_gcm::aead::Aead;
use aes_gcm::aead::KeyInit;

const NONCE_LEN: usize = 12;

/// Encrypted wire codec for nut tokens.
///
/// The packed layout is sealed with AES-256-GCM under the configured key
/// and a fresh random nonce, then rendered as unpadded url-safe base64 of
/// nonce || ciphertext. The auth tag makes forged or truncated nuts fail
/// decryption rather than decode into garbage fields.
pub struct NutCodec {
    cipher: Aes256Gcm,
}

impl NutCodec {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    pub fn encode(&self, token: &NutToken) -> String {
        use rand::Rng;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let sealed = self
            .cipher
            .encrypt(nonce, token.pack().as_slice())
            .expect("aes-gcm encrypt is infallible for in-memory buffers");
        let mut wire = Vec::with_capacity(NONCE_LEN + sealed.len());
        wire.extend_from_slice(&nonce_bytes);
        wire.extend_from_slice(&sealed);
        util::b64_encode(&wire)
    }

    pub fn decode(&self, encoded: &str) -> Result<NutToken, NutError> {
        let wire = util::b64_decode(encoded).ok_or(NutError::Base64)?;
        if wire.len() <= NONCE_LEN {
            return Err(NutError::Length);
        }
        let (nonce_bytes, sealed) = wire.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let opened = self
            .cipher
            .decrypt(nonce, sealed)
            .map_err(|_| NutError::Decrypt)?;
        NutToken::unpack(&opened).ok_or(NutError::Length)
    }
}
