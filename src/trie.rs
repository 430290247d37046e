//! Prefix-preserving IP address mapper (the Xu/Fan/Ammar/Moon construction)
//! and its prefix- and lex-order-preserving variant.
//!
//! A binary trie over address bits, arena-indexed (`Vec<Node>` with
//! `Option<u32>` child links) rather than owned subtree pointers — the
//! representation spec.md §9 recommends for the large IPv6 case, and in the
//! same style as the teacher's index newtypes (`BlockIdx`/`RowIdx` in
//! `stream.rs`) over raw integers.
//!
//! `map_pref` computes each output bit from a PRNG bit keyed on the address
//! prefix up to that bit — never on later bits — which yields prefix
//! preservation by construction. `map_pref_lex` additionally preserves the
//! order of the used set: see `finalize` for the swap-decision algorithm.

use crate::error::{AnonError, AnonResult};
use crate::key::Key;
use crate::lifecycle::Mode;
use crate::prng::Prng;

struct Node {
    children: [Option<u32>; 2],
    used: bool,
    /// Cached `map_pref` flip bit for this node, lazily computed.
    flip: Option<u8>,
    /// Cached `map_pref_lex` child-swap decision, computed once at
    /// finalization.
    swap: Option<bool>,
    /// Count of used-marked descendants (inclusive of this node), valid
    /// only after finalization.
    used_count: u32,
}

impl Node {
    fn new() -> Self {
        Self { children: [None, None], used: false, flip: None, swap: None, used_count: 0 }
    }
}

fn get_bit(addr: &[u8], i: u32) -> u8 {
    (addr[(i / 8) as usize] >> (7 - (i % 8))) & 1
}

fn set_bit(addr: &mut [u8], i: u32, bit: u8) {
    let mask = 1u8 << (7 - (i % 8));
    let byte = &mut addr[(i / 8) as usize];
    if bit & 1 == 1 {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

/// Pack a sequence of 0/1 values (MSB first) into bytes, for feeding to
/// `Prng::bit` as a path prefix.
fn pack_bits(bits: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, b) in bits.iter().enumerate() {
        set_bit(&mut out, i as u32, *b);
    }
    out
}

/// A binary trie over `BITS`-bit addresses (`BYTES = BITS / 8`).
pub struct Trie<const BYTES: usize> {
    nodes: Vec<Node>,
    mode: Mode,
    prng: Prng,
    finalized: bool,
}

impl<const BYTES: usize> Trie<BYTES> {
    const BITS: u32 = (BYTES * 8) as u32;
    /// `Prng::bit` role tag for a node's `map_pref` flip decision.
    const ROLE_FLIP: u8 = 0;
    /// `Prng::bit` role tag for a node's lex-finalization swap decision.
    const ROLE_SWAP: u8 = 1;

    /// A fresh, unkeyed trie (root node only).
    pub fn new() -> Self {
        Self { nodes: vec![Node::new()], mode: Mode::Init, prng: Prng::from_key(&Key::new()), finalized: false }
    }

    /// Seed this trie's PRNG from `key`.
    pub fn set_key(&mut self, key: &Key) {
        self.prng.reseed(key);
    }

    /// Current number of allocated trie nodes, including the root.
    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    fn child_or_create(&mut self, at: u32, bit: u8) -> u32 {
        if let Some(c) = self.nodes[at as usize].children[bit as usize] {
            return c;
        }
        let idx = self.nodes.len() as u32;
        self.nodes.push(Node::new());
        self.nodes[at as usize].children[bit as usize] = Some(idx);
        idx
    }

    /// Mark the leaf at depth `prefix_len` along `addr` as used. Only legal
    /// in `INIT`.
    pub fn set_used(&mut self, addr: &[u8; BYTES], prefix_len: u32) -> AnonResult<()> {
        self.mode.require_init("set_used")?;
        assert!(prefix_len <= Self::BITS, "prefix_len out of range");
        let mut at = 0u32;
        for i in 0..prefix_len {
            let bit = get_bit(addr, i);
            at = self.child_or_create(at, bit);
        }
        self.nodes[at as usize].used = true;
        Ok(())
    }

    /// Prefix-preserving (non-lex) map: descending the tree along `addr`,
    /// create missing children and record the flip at each visited node.
    pub fn map_pref(&mut self, addr: &[u8; BYTES]) -> AnonResult<[u8; BYTES]> {
        self.mode.enter_non_lex()?;
        let mut out = [0u8; BYTES];
        let mut at = 0u32;
        let mut path = Vec::with_capacity(Self::BITS as usize);
        for i in 0..Self::BITS {
            let input_bit = get_bit(addr, i);
            let flip = match self.nodes[at as usize].flip {
                Some(f) => f,
                None => {
                    let packed = pack_bits(&path);
                    let f = self.prng.bit(Self::ROLE_FLIP, &packed, i);
                    self.nodes[at as usize].flip = Some(f);
                    f
                }
            };
            set_bit(&mut out, i, input_bit ^ flip);
            path.push(input_bit);
            at = self.child_or_create(at, input_bit);
        }
        Ok(out)
    }

    /// Prefix- and lex-order-preserving map. Requires `addr` to have been
    /// pre-marked with `set_used` at its full (`BITS`-bit) length.
    pub fn map_pref_lex(&mut self, addr: &[u8; BYTES]) -> AnonResult<[u8; BYTES]> {
        self.mode.enter_lex()?;
        if !self.finalized {
            self.finalize();
        }

        // The full-length leaf must exist and be marked used: the
        // precondition that every address of interest was pre-marked.
        let mut at = 0u32;
        for i in 0..Self::BITS {
            let bit = get_bit(addr, i);
            at = match self.nodes[at as usize].children[bit as usize] {
                Some(c) => c,
                None => {
                    return Err(AnonError::PreconditionViolation(format!(
                        "map_pref_lex called on an address not marked with set_used (diverged at bit {i})"
                    )))
                }
            };
        }
        if !self.nodes[at as usize].used {
            return Err(AnonError::PreconditionViolation(
                "map_pref_lex called on an address not marked with set_used".into(),
            ));
        }

        let mut out = [0u8; BYTES];
        let mut at = 0u32;
        for i in 0..Self::BITS {
            let input_bit = get_bit(addr, i);
            let swap = self.nodes[at as usize].swap.unwrap_or(false);
            set_bit(&mut out, i, input_bit ^ (swap as u8));
            at = self.nodes[at as usize].children[input_bit as usize].expect("path verified above");
        }
        Ok(out)
    }

    /// Finalize the used-set ordering: a post-order traversal computing,
    /// for every node, the count of used descendants under each child and a
    /// stable swap decision.
    ///
    /// When both children have at least one used descendant, any pair of
    /// marked addresses diverging here must keep the natural order (`0`
    /// before `1`) or their relative order would be violated — so no swap
    /// is possible. Otherwise no marked pair diverges at this node and the
    /// choice is free; it is driven by the PRNG bit keyed on this node's
    /// path, for the same diffusion `map_pref` gets everywhere else.
    fn finalize(&mut self) {
        let mut path = Vec::with_capacity(Self::BITS as usize);
        self.finalize_node(0, &mut path);
        self.finalized = true;
    }

    fn finalize_node(&mut self, at: u32, path: &mut Vec<u8>) -> u32 {
        let children = self.nodes[at as usize].children;
        let mut counts = [0u32; 2];
        for (bit, child) in children.into_iter().enumerate() {
            if let Some(c) = child {
                path.push(bit as u8);
                counts[bit] = self.finalize_node(c, path);
                path.pop();
            }
        }
        let self_used = self.nodes[at as usize].used as u32;
        let total = counts[0] + counts[1] + self_used;
        self.nodes[at as usize].used_count = total;

        let both_populated =
            children[0].is_some() && counts[0] > 0 && children[1].is_some() && counts[1] > 0;
        let swap = if both_populated {
            false
        } else {
            let packed = pack_bits(path);
            self.prng.bit(Self::ROLE_SWAP, &packed, path.len() as u32) == 1
        };
        self.nodes[at as usize].swap = Some(swap);
        total
    }
}

impl<const BYTES: usize> Default for Trie<BYTES> {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix-preserving IPv4 mapper.
pub type IpV4Trie = Trie<4>;
/// Prefix-preserving IPv6 mapper.
pub type IpV6Trie = Trie<16>;

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed<const N: usize>(passphrase: &str) -> Trie<N> {
        let mut t = Trie::<N>::new();
        let mut key = Key::new();
        key.set_passphrase(passphrase);
        t.set_key(&key);
        t
    }

    #[test]
    fn scenario_1_ipv4_prefix_shared_and_independent_bits() {
        let mut t: Trie<4> = keyed("passphrase");
        let a = [10, 0, 0, 1];
        let b = [10, 0, 0, 2];
        let c = [192, 168, 1, 1];

        let oa = t.map_pref(&a).unwrap();
        let ob = t.map_pref(&b).unwrap();
        let oc = t.map_pref(&c).unwrap();

        // a and b share a 30-bit prefix; outputs must too.
        for i in 0..30 {
            assert_eq!(get_bit(&oa, i), get_bit(&ob, i));
        }
        // a and c differ at bit 0; outputs must differ at bit 0.
        assert_ne!(get_bit(&oa, 0), get_bit(&oc, 0));
    }

    #[test]
    fn prefix_preservation_general() {
        let mut t: Trie<4> = keyed("generic");
        let a = [172, 16, 5, 9];
        let b = [172, 16, 5, 200];
        let oa = t.map_pref(&a).unwrap();
        let ob = t.map_pref(&b).unwrap();
        // a, b agree on the first 24 bits.
        for i in 0..24 {
            assert_eq!(get_bit(&oa, i), get_bit(&ob, i));
        }
    }

    #[test]
    fn scenario_2_lex_shares_prefix_and_preserves_order() {
        let mut t: Trie<4> = keyed("passphrase");
        let addrs = [[10, 0, 0, 1], [10, 0, 0, 2], [10, 0, 0, 3]];
        for a in &addrs {
            t.set_used(a, 32).unwrap();
        }

        let outs: Vec<_> = addrs.iter().map(|a| t.map_pref_lex(a).unwrap()).collect();

        // All distinct.
        let mut as_u32: Vec<u32> = outs.iter().map(|o| u32::from_be_bytes(*o)).collect();
        let mut dedup = as_u32.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 3);

        // Sorted-ascending input pairing matches sorted-ascending output.
        as_u32.sort();
        assert!(as_u32[0] < as_u32[1]);
        assert!(as_u32[1] < as_u32[2]);

        // Shared 30-bit prefix across all three outputs.
        for i in 0..30 {
            let bits: Vec<u8> = outs.iter().map(|o| get_bit(o, i)).collect();
            assert!(bits.windows(2).all(|w| w[0] == w[1]));
        }
    }

    #[test]
    fn map_pref_lex_rejects_unmarked_address() {
        let mut t: Trie<4> = keyed("unmarked");
        t.set_used(&[10, 0, 0, 1], 32).unwrap();
        let err = t.map_pref_lex(&[10, 0, 0, 2]).unwrap_err();
        assert!(matches!(err, AnonError::PreconditionViolation(_)));
    }

    #[test]
    fn mode_lock_forbids_crossing() {
        let mut t: Trie<4> = keyed("mode-lock");
        t.map_pref(&[1, 2, 3, 4]).unwrap();
        assert!(matches!(
            t.map_pref_lex(&[1, 2, 3, 4]).unwrap_err(),
            AnonError::PreconditionViolation(_)
        ));
    }

    #[test]
    fn map_pref_is_idempotent() {
        let mut t: Trie<4> = keyed("idempotent");
        let addr = [192, 0, 2, 1];
        let first = t.map_pref(&addr).unwrap();
        let second = t.map_pref(&addr).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn determinism_across_independent_tries() {
        let mut t1: Trie<4> = keyed("determinism");
        let mut t2: Trie<4> = keyed("determinism");
        let addr = [8, 8, 8, 8];
        assert_eq!(t1.map_pref(&addr).unwrap(), t2.map_pref(&addr).unwrap());
    }

    #[test]
    fn set_used_forbidden_after_first_map() {
        let mut t: Trie<4> = keyed("set-used-lock");
        t.map_pref(&[1, 2, 3, 4]).unwrap();
        assert!(matches!(
            t.set_used(&[5, 6, 7, 8], 32).unwrap_err(),
            AnonError::PreconditionViolation(_)
        ));
    }

    #[test]
    fn nodes_count_grows_with_distinct_prefixes() {
        let mut t: Trie<4> = keyed("nodes");
        assert_eq!(t.nodes_count(), 1);
        t.map_pref(&[1, 2, 3, 4]).unwrap();
        assert_eq!(t.nodes_count(), 33);
        t.map_pref(&[1, 2, 3, 4]).unwrap();
        assert_eq!(t.nodes_count(), 33);
    }
}
