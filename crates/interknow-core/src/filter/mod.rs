//! Approximate membership filter for concept keys
//!
//! A fixed-capacity Bloom filter answering "possibly seen" or "definitely not
//! seen". The filter never resizes: once more than `expected_elements` keys are
//! added the false-positive rate degrades, but no state is ever corrupted and
//! previously added keys are always reported as present.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Bloom filter sized from an expected element count and a target
/// false-positive rate
#[derive(Debug, Clone)]
pub struct MembershipFilter {
    /// Bit array packed into 64-bit words
    bits: Vec<u64>,
    /// Number of addressable bits (m)
    num_bits: usize,
    /// Number of hash rounds (k)
    num_hashes: usize,
    /// Number of `add` calls so far
    inserted: usize,
}

impl MembershipFilter {
    /// Create a new filter
    ///
    /// # Arguments
    /// * `expected_elements` - Expected number of distinct keys (n)
    /// * `false_positive_rate` - Target false positive rate (p), strictly between 0 and 1
    pub fn new(expected_elements: usize, false_positive_rate: f64) -> Result<Self> {
        if expected_elements == 0 {
            return Err(Error::InvalidFilterConfig(
                "expected_elements must be greater than zero".to_string(),
            ));
        }
        if !false_positive_rate.is_finite()
            || false_positive_rate <= 0.0
            || false_positive_rate >= 1.0
        {
            return Err(Error::InvalidFilterConfig(format!(
                "false_positive_rate must be in (0, 1), got {}",
                false_positive_rate
            )));
        }

        let num_bits = optimal_num_bits(expected_elements, false_positive_rate);
        let num_hashes = optimal_num_hashes(expected_elements, num_bits);

        Ok(Self {
            bits: vec![0; num_bits.div_ceil(64)],
            num_bits,
            num_hashes,
            inserted: 0,
        })
    }

    /// Create a filter from configuration
    pub fn from_config(config: &crate::config::FilterConfig) -> Result<Self> {
        Self::new(config.expected_elements, config.false_positive_rate)
    }

    /// Register a key. Only ever sets bits.
    pub fn add(&mut self, key: &str) {
        for round in 0..self.num_hashes {
            let bit = self.bit_index(key, round);
            self.bits[bit / 64] |= 1u64 << (bit % 64);
        }
        self.inserted += 1;
    }

    /// Check whether a key might have been added
    ///
    /// Returns false only if the key was definitely never added.
    pub fn contains(&self, key: &str) -> bool {
        (0..self.num_hashes).all(|round| {
            let bit = self.bit_index(key, round);
            self.bits[bit / 64] & (1u64 << (bit % 64)) != 0
        })
    }

    /// Number of bits in the array (m)
    pub fn bit_len(&self) -> usize {
        self.num_bits
    }

    /// Number of hash rounds per key (k)
    pub fn hash_rounds(&self) -> usize {
        self.num_hashes
    }

    /// Number of `add` calls, including repeated keys
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Memory used by the bit array in bytes
    pub fn memory_usage(&self) -> usize {
        self.bits.len() * std::mem::size_of::<u64>()
    }

    /// Estimate the current false positive rate from bit saturation
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let set_bits: u64 = self.bits.iter().map(|w| u64::from(w.count_ones())).sum();
        let fill = set_bits as f64 / self.num_bits as f64;
        fill.powi(self.num_hashes as i32)
    }

    /// Bit position for one hash round: SHA-256 over the key salted with the
    /// round index, reduced modulo m
    fn bit_index(&self, key: &str, round: usize) -> usize {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update((round as u64).to_le_bytes());
        let digest = hasher.finalize();

        let mut prefix = [0u8; 16];
        prefix.copy_from_slice(&digest[..16]);
        (u128::from_be_bytes(prefix) % self.num_bits as u128) as usize
    }
}

/// m = ceil(-n·ln(p) / (ln 2)²), at least 1
fn optimal_num_bits(n: usize, p: f64) -> usize {
    let ln2 = std::f64::consts::LN_2;
    let m = (-(n as f64) * p.ln() / (ln2 * ln2)).ceil() as usize;
    m.max(1)
}

/// k = ceil((m/n)·ln 2), at least 1
fn optimal_num_hashes(n: usize, m: usize) -> usize {
    let k = ((m as f64 / n as f64) * std::f64::consts::LN_2).ceil() as usize;
    k.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizing_matches_formula() {
        let filter = MembershipFilter::new(100, 0.01).unwrap();
        assert_eq!(filter.bit_len(), 959);
        assert_eq!(filter.hash_rounds(), 7);
        assert_eq!(filter.memory_usage(), 15 * 8);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(
            MembershipFilter::new(0, 0.01),
            Err(Error::InvalidFilterConfig(_))
        ));
        assert!(MembershipFilter::new(10, 0.0).is_err());
        assert!(MembershipFilter::new(10, 1.0).is_err());
        assert!(MembershipFilter::new(10, -0.5).is_err());
        assert!(MembershipFilter::new(10, f64::NAN).is_err());
    }

    #[test]
    fn test_add_and_contains() {
        let mut filter = MembershipFilter::new(100, 0.01).unwrap();
        filter.add("熵");
        filter.add("最小二乘");
        filter.add("神经网络");

        assert!(filter.contains("熵"));
        assert!(filter.contains("最小二乘"));
        assert!(filter.contains("神经网络"));
        assert_eq!(filter.inserted(), 3);
    }

    #[test]
    fn test_no_false_negatives_under_overload() {
        let mut filter = MembershipFilter::new(10, 0.01).unwrap();
        let keys: Vec<String> = (0..500).map(|i| format!("concept-{}", i)).collect();

        for (i, key) in keys.iter().enumerate() {
            filter.add(key);
            // Every earlier key must survive later inserts
            assert!(keys[..=i].iter().all(|k| filter.contains(k)));
        }
    }

    #[test]
    fn test_false_positive_rate_near_target() {
        let mut filter = MembershipFilter::new(100, 0.01).unwrap();
        for i in 0..100 {
            filter.add(&format!("test_{}", i));
        }

        let probes = 1000;
        let false_positives = (100..100 + probes)
            .filter(|i| filter.contains(&format!("test_{}", i)))
            .count();

        let rate = false_positives as f64 / probes as f64;
        assert!(rate <= 0.05, "False positive rate too high: {}", rate);
    }

    #[test]
    fn test_empty_filter_contains_nothing() {
        let filter = MembershipFilter::new(100, 0.01).unwrap();
        assert!(!filter.contains("anything"));
        assert_eq!(filter.estimated_false_positive_rate(), 0.0);
    }

    #[test]
    fn test_tiny_filter_is_still_usable() {
        let mut filter = MembershipFilter::new(1, 0.99).unwrap();
        assert!(filter.bit_len() >= 1);
        assert!(filter.hash_rounds() >= 1);
        filter.add("only");
        assert!(filter.contains("only"));
    }
}
