//! Shannon-entropy check for the CSPRNG.
//!
//! Samples `sample_len`-byte values from [`secure_random_bytes`] and measures
//! the entropy of their frequency distribution. A uniform generator yields a
//! value just under `8 * sample_len` bits once the iteration count is large
//! enough to populate the sample space.

use crate::error::CryptoResult;
use crate::security::secure_random_bytes;
use std::collections::HashMap;

/// Shannon entropy, in bits, of a distribution given by occurrence counts.
///
/// Zero counts contribute nothing. An empty or all-zero input has entropy 0.
pub fn shannon_entropy<I>(counts: I) -> f64
where
    I: IntoIterator<Item = u64>,
{
    let counts: Vec<u64> = counts.into_iter().filter(|c| *c > 0).collect();
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Draws `iterations` random samples of `sample_len` bytes each and returns
/// the entropy of the observed distribution, in bits.
pub fn sample_entropy(sample_len: usize, iterations: usize) -> CryptoResult<f64> {
    let mut counts: HashMap<Vec<u8>, u64> = HashMap::new();
    let mut sample = vec![0u8; sample_len];
    for _ in 0..iterations {
        secure_random_bytes(&mut sample)?;
        *counts.entry(sample.clone()).or_default() += 1;
    }
    Ok(shannon_entropy(counts.into_values()))
}
