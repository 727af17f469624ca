use chrono::{DateTime, Utc};
use serde::Serialize;

/// The local ZeroTier node, as reported by the daemon's status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// 10-hex-digit node address.
    pub address: String,
    /// First 64 bits of the public key, `xxxx:xxxx:xxxx:xxxx`.
    pub public_key_fingerprint: Option<String>,
    pub online: bool,
    pub version: Option<String>,
    pub tcp_fallback: bool,
    pub primary_port: Option<u16>,
    /// Daemon clock at the time of the read.
    pub clock: Option<DateTime<Utc>>,
}

/// Derive the display fingerprint from a `publicIdentity` string
/// (`address:0:publickeyhex[:privatekeyhex]`).
pub(crate) fn fingerprint(public_identity: &str) -> Option<String> {
    let key = public_identity.split(':').nth(2)?;
    if key.len() < 16 || !key.is_ascii() || !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let head = key.get(..16)?.to_ascii_lowercase();
    let groups: Vec<&str> = (0..4).filter_map(|i| head.get(i * 4..i * 4 + 4)).collect();
    Some(groups.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_groups_first_sixteen_digits() {
        let identity = "89e92ceee5:0:9E4B3A1F0C2D7E8855AA66BB77CC88DD";
        assert_eq!(fingerprint(identity).as_deref(), Some("9e4b:3a1f:0c2d:7e88"));
    }

    #[test]
    fn fingerprint_needs_a_key_part() {
        assert_eq!(fingerprint("89e92ceee5"), None);
        assert_eq!(fingerprint("89e92ceee5:0:abc"), None);
        assert_eq!(fingerprint("89e92ceee5:0:zzzzzzzzzzzzzzzzzz"), None);
    }
}
