//! Digest, fractal hash, and entropy primitives.
//!
//! Pure fingerprinting utilities behind run identity and agent origins.
//! Digests are opaque: compared and displayed, never decoded. Entropy here
//! is a scoring signal over hash strings, not a security property.

use std::collections::HashMap;

/// Width of each nested round's contribution to a fractal hash.
const ROUND_WIDTH: usize = 16;

/// Width of the final folded fractal hash.
const FRACTAL_WIDTH: usize = 32;

/// Hex digest of a string. Deterministic for identical input.
pub fn digest(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Pseudo-hierarchical hash: `depth` nested re-encodings of `seed`, each
/// narrowed to [`ROUND_WIDTH`] characters, concatenated, folded once more
/// and truncated to [`FRACTAL_WIDTH`].
///
/// Deterministic for a fixed `seed` and `depth`. Callers wanting uniqueness
/// across calls fold a timestamp and a per-agent identifier into `seed`.
pub fn fractal_hash(seed: &str, depth: u32) -> String {
    let mut layer = seed.to_string();
    let mut folded = String::with_capacity(ROUND_WIDTH * depth as usize);
    for _ in 0..depth {
        layer = digest(&layer)[..ROUND_WIDTH].to_string();
        folded.push_str(&layer);
    }
    digest(&folded)[..FRACTAL_WIDTH].to_string()
}

/// Shannon entropy in bits over the character distribution of `s`.
///
/// For each distinct character with empirical probability `p`, accumulates
/// `-p * log2(p)`. Empty input has no terms and yields `0.0`. Total: no
/// failure mode.
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0u32;
    for ch in s.chars() {
        *counts.entry(ch).or_insert(0) += 1;
        total += 1;
    }

    let total = f64::from(total);
    counts
        .values()
        .map(|&count| {
            let p = f64::from(count) / total;
            -p * p.log2()
        })
        .sum()
}
