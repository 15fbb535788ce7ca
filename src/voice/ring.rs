//! Consistent-hash ring over voice indices.
//!
//! Every index gets [`POINTS_PER_INDEX`] md5-derived digests, each of which
//! contributes three 32-bit points on the ring.  A caller is mapped to the
//! first point strictly after the hash of its name, wrapping around at the
//! end.  Adding or removing an index only moves the callers whose nearest
//! point belonged to that index.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

/// Digests generated per ring member.
pub const POINTS_PER_INDEX: usize = 40;

/// Immutable hash ring mapping arbitrary keys to an index in `0..len`.
#[derive(Debug, Clone)]
pub struct HashRing {
    points: BTreeMap<u32, usize>,
}

impl HashRing {
    /// Build a ring over the indices `0..len`.
    ///
    /// A ring over zero indices is empty and [`HashRing::get`] returns `None`.
    pub fn new(len: usize) -> Self {
        let mut points = BTreeMap::new();
        for index in 0..len {
            for replica in 0..POINTS_PER_INDEX {
                let digest = md5::compute(format!("{index}-{replica}"));
                for word in 0..3 {
                    points.insert(point(&digest.0, word * 4), index);
                }
            }
        }
        Self { points }
    }

    /// The index responsible for `key`.
    pub fn get(&self, key: &str) -> Option<usize> {
        let digest = md5::compute(key.as_bytes());
        let hash = point(&digest.0, 0);
        self.points
            .range((Excluded(hash), Unbounded))
            .next()
            .or_else(|| self.points.iter().next())
            .map(|(_, &index)| index)
    }

    /// Number of points on the ring.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Little-endian 32-bit word of `digest` starting at `offset`.
fn point(digest: &[u8; 16], offset: usize) -> u32 {
    u32::from_le_bytes([
        digest[offset],
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callers() -> Vec<String> {
        (0..500).map(|i| format!("viewer_{i}")).collect()
    }

    #[test]
    fn empty_ring_has_no_owner() {
        let ring = HashRing::new(0);
        assert!(ring.is_empty());
        assert_eq!(ring.get("anyone"), None);
    }

    #[test]
    fn single_index_owns_everything() {
        let ring = HashRing::new(1);
        for caller in callers() {
            assert_eq!(ring.get(&caller), Some(0));
        }
    }

    #[test]
    fn lookups_are_stable_across_rebuilds() {
        let a = HashRing::new(5);
        let b = HashRing::new(5);
        for caller in callers() {
            assert_eq!(a.get(&caller), b.get(&caller));
        }
    }

    #[test]
    fn every_index_receives_callers() {
        let ring = HashRing::new(4);
        let mut seen = [0usize; 4];
        for caller in callers() {
            seen[ring.get(&caller).expect("owner")] += 1;
        }
        assert!(seen.iter().all(|&n| n > 0), "{seen:?}");
    }

    #[test]
    fn growing_the_ring_moves_a_bounded_share() {
        let before = HashRing::new(4);
        let after = HashRing::new(5);
        let all = callers();
        let moved = all
            .iter()
            .filter(|c| before.get(c) != after.get(c))
            .count();
        // Ideal is 1/5 of callers; allow generous slack for hash variance.
        assert!(moved < all.len() / 2, "moved {moved} of {}", all.len());
        // Every moved caller must land on the new index.
        for caller in &all {
            if before.get(caller) != after.get(caller) {
                assert_eq!(after.get(caller), Some(4));
            }
        }
    }

    #[test]
    fn point_is_little_endian() {
        let mut digest = [0u8; 16];
        digest[4..8].copy_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(point(&digest, 4), 0x0403_0201);
    }
}
