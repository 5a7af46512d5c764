use byteorder::BigEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;
use std::net::IpAddr;

/// Serialized length of the plaintext layout: ip + counter + timestamp + random.
pub const NUT_LEN: usize = 4 + 4 + 8 + 4;

/// The single-use login token. One is minted per page load and per reply;
/// uniqueness is guaranteed by the monotonic counter combined with the
/// random field, so no two encodings ever collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NutToken {
    ip: u32,
    counter: u32,
    timestamp_ms: u64,
    random: u32,
}

impl NutToken {
    pub fn new(ip: u32, counter: u32, timestamp_ms: u64, random: u32) -> Self {
        Self {
            ip,
            counter,
            timestamp_ms,
            random,
        }
    }
    pub fn ip(&self) -> u32 {
        self.ip
    }
    pub fn counter(&self) -> u32 {
        self.counter
    }
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
    pub fn random(&self) -> u32 {
        self.random
    }
    /// Instant after which the token fails validation.
    pub fn expires_at_ms(&self, validity_ms: u64) -> u64 {
        self.timestamp_ms.saturating_add(validity_ms)
    }

    /// Fixed-width big-endian layout, encrypted by the codec before hitting
    /// the wire.
    pub fn pack(&self) -> [u8; NUT_LEN] {
        let mut buf = Vec::with_capacity(NUT_LEN);
        buf.write_u32::<BigEndian>(self.ip).expect("vec write");
        buf.write_u32::<BigEndian>(self.counter).expect("vec write");
        buf.write_u64::<BigEndian>(self.timestamp_ms)
            .expect("vec write");
        buf.write_u32::<BigEndian>(self.random).expect("vec write");
        buf.try_into().expect("fixed layout")
    }

    pub fn unpack(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != NUT_LEN {
            return None;
        }
        let mut cursor = std::io::Cursor::new(bytes);
        Some(Self {
            ip: cursor.read_u32::<BigEndian>().ok()?,
            counter: cursor.read_u32::<BigEndian>().ok()?,
            timestamp_ms: cursor.read_u64::<BigEndian>().ok()?,
            random: cursor.read_u32::<BigEndian>().ok()?,
        })
    }
}

/// Collapses an IP address to the 4-byte representation embedded in nuts.
/// IPv4 maps directly; IPv6 takes the leading bytes of a SHA-256 over the
/// full address, which is stable and good enough for the informational
/// IP-matched flag.
pub fn ip_to_u32(addr: IpAddr) -> u32 {
    match addr {
        IpAddr::V4(v4) => u32::from_be_bytes(v4.octets()),
        IpAddr::V6(v6) => {
            use sha2::Digest;
            let digest = sha2::Sha256::digest(v6.octets());
            u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
        }
    }
}
