//! MAC address mapper.
//!
//! spec.md treats a MAC as a 48-bit unsigned integer and reuses the bounded
//! integer mapper wholesale rather than a separate engine (mirrored from
//! `examples/original_source/src/anon.c`'s `mac_lex`/`map_mac`, which funnel
//! into the same `anon_uint64_*` calls as `uint64` after a 48-bit shift).

use crate::bounded_int::BoundedIntMapper;
use crate::error::AnonResult;
use crate::key::Key;

/// Highest representable 48-bit value, `2^48 - 1`.
const MAC_MAX: u64 = (1u64 << 48) - 1;

fn mac_to_u64(mac: [u8; 6]) -> u64 {
    let mut buf = [0u8; 8];
    buf[2..8].copy_from_slice(&mac);
    u64::from_be_bytes(buf)
}

fn u64_to_mac(v: u64) -> [u8; 6] {
    let buf = v.to_be_bytes();
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&buf[2..8]);
    mac
}

/// Order-preserving injection over 48-bit MAC addresses, implemented as a
/// `BoundedIntMapper<u64>` over `[0, 2^48 - 1]`.
pub struct MacMapper {
    inner: BoundedIntMapper<u64>,
}

impl MacMapper {
    /// Create a new, unkeyed mapper.
    pub fn new() -> AnonResult<Self> {
        Ok(Self { inner: BoundedIntMapper::new(0, MAC_MAX)? })
    }

    /// Seed this mapper's PRNG from `key`.
    pub fn set_key(&mut self, key: &Key) {
        self.inner.set_key(key);
    }

    /// Declare `mac` as part of the used set. Only legal in `INIT`.
    pub fn set_used(&mut self, mac: [u8; 6]) -> AnonResult<()> {
        self.inner.set_used(mac_to_u64(mac))
    }

    /// Non-lex mapping.
    pub fn map(&mut self, mac: [u8; 6]) -> AnonResult<[u8; 6]> {
        Ok(u64_to_mac(self.inner.map(mac_to_u64(mac))?))
    }

    /// Lex (order-preserving) mapping.
    pub fn map_lex(&mut self, mac: [u8; 6]) -> AnonResult<[u8; 6]> {
        Ok(u64_to_mac(self.inner.map_lex(mac_to_u64(mac))?))
    }
}

impl Default for MacMapper {
    fn default() -> Self {
        Self::new().expect("[0, 2^48 - 1] is always a valid range")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(passphrase: &str) -> MacMapper {
        let mut m = MacMapper::new().unwrap();
        let mut key = Key::new();
        key.set_passphrase(passphrase);
        m.set_key(&key);
        m
    }

    #[test]
    fn round_trip_conversion_is_exact() {
        let mac = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01];
        assert_eq!(u64_to_mac(mac_to_u64(mac)), mac);
        assert_eq!(mac_to_u64([0, 0, 0, 0, 0, 0]), 0);
        assert_eq!(mac_to_u64([0xff; 6]), MAC_MAX);
    }

    #[test]
    fn non_lex_is_idempotent_and_unique() {
        let mut m = keyed("mac-non-lex");
        let a = [0, 0, 0, 0, 0, 1];
        let b = [0, 0, 0, 0, 0, 2];
        let x1 = m.map(a).unwrap();
        let x2 = m.map(a).unwrap();
        let y = m.map(b).unwrap();
        assert_eq!(x1, x2);
        assert_ne!(x1, y);
    }

    #[test]
    fn lex_preserves_numeric_mac_order() {
        let mut m = keyed("mac-lex");
        let macs = [[0, 0, 0, 0, 0, 3], [0, 0, 0, 0, 0, 1], [0, 0, 0, 0, 0, 9]];
        for mac in macs {
            m.set_used(mac).unwrap();
        }
        let lo = m.map_lex([0, 0, 0, 0, 0, 1]).unwrap();
        let mid = m.map_lex([0, 0, 0, 0, 0, 3]).unwrap();
        let hi = m.map_lex([0, 0, 0, 0, 0, 9]).unwrap();
        assert!(mac_to_u64(lo) < mac_to_u64(mid));
        assert!(mac_to_u64(mid) < mac_to_u64(hi));
    }

    #[test]
    fn mode_lock_forbids_crossing() {
        let mut m = keyed("mac-mode-lock");
        m.map([0, 0, 0, 0, 0, 1]).unwrap();
        assert!(matches!(
            m.map_lex([0, 0, 0, 0, 0, 1]).unwrap_err(),
            crate::error::AnonError::PreconditionViolation(_)
        ));
    }
}
