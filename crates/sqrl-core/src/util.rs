use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// URL-safe unpadded base64, the encoding used for every opaque SQRL value.
pub fn b64_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn b64_decode(s: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(s).ok()
}

/// Decodes to a UTF-8 string, or None if either layer is malformed.
pub fn b64_decode_str(s: &str) -> Option<String> {
    b64_decode(s).and_then(|bytes| String::from_utf8(bytes).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpadded_url_safe() {
        let encoded = b64_encode(b"sqrl");
        assert!(!encoded.contains('='));
        assert_eq!(b64_decode(&encoded).unwrap(), b"sqrl");
    }

    #[test]
    fn rejects_garbage() {
        assert!(b64_decode("not!!base64").is_none());
    }
}
