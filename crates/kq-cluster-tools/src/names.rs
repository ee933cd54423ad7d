//! Resource name simplification.
//!
//! Controllers append generated segments to the names they create:
//! a Deployment's ReplicaSet gets a pod-template hash (`web-56c598c8fc`)
//! and its pods get a further random suffix (`web-56c598c8fc-x7z2p`).
//! `simplify_name` strips those trailing segments to recover the name a
//! user would recognize, while leaving hand-chosen dashed names alone.
//!
//! A segment is only treated as generated when every character comes from
//! the alphabet Kubernetes uses for generated identifiers (no vowels, no
//! `0`, `1`, `3`), so words like `backend`, `redis`, or `https` survive.

/// Characters Kubernetes uses when encoding generated names.
const SAFE_ALPHABET: &str = "bcdfghjklmnpqrstvwxz2456789";

/// Length of the random suffix appended to pod names.
const RANDOM_SUFFIX_LEN: usize = 5;

/// Length range of hash segments (template hashes, revision hashes, pod suffixes).
const HASH_MIN_LEN: usize = 5;
const HASH_MAX_LEN: usize = 10;

fn is_safe_encoded(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| SAFE_ALPHABET.contains(c))
}

/// A generated hash: safe alphabet, 5–10 chars, at least one digit.
fn is_hash_segment(segment: &str) -> bool {
    (HASH_MIN_LEN..=HASH_MAX_LEN).contains(&segment.len())
        && is_safe_encoded(segment)
        && segment.chars().any(|c| c.is_ascii_digit())
}

/// A pod random suffix: safe alphabet, exactly 5 chars (may be all letters).
fn is_random_suffix(segment: &str) -> bool {
    segment.len() == RANDOM_SUFFIX_LEN && is_safe_encoded(segment)
}

/// Strip generated hash suffixes from a resource name.
///
/// Pure and idempotent. The first segment is never removed.
pub fn simplify_name(full_name: &str) -> &str {
    let parts: Vec<&str> = full_name.split('-').collect();
    let mut keep = parts.len();

    while keep > 1 {
        let last = parts[keep - 1];
        if is_hash_segment(last) {
            keep -= 1;
        } else if keep > 2 && is_random_suffix(last) && is_hash_segment(parts[keep - 2]) {
            keep -= 2;
        } else {
            break;
        }
    }

    if keep == parts.len() {
        return full_name;
    }
    // `keep` segments plus the dashes between them.
    let end = parts[..keep].iter().map(|p| p.len()).sum::<usize>() + keep - 1;
    &full_name[..end]
}
