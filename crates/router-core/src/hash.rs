use sha2::{Digest, Sha256};

/// Stable rollout-gate hash (spec.md §3, §4.4, §9)
///
/// SHA-256 of `family_id + ":" + request_id`, taking the first 8 bytes as a
/// big-endian `u64` mod 100. Deterministic across process restarts (unlike
/// `DefaultHasher`, which only guarantees stability within one process), so
/// a given family observes a stable exposure to a partial rollout as the
/// fairness requirement in spec.md §4.4 demands.
#[must_use]
pub fn rollout_bucket(family_id: &str, request_id: &str) -> u8 {
    let mut hasher = Sha256::new();
    hasher.update(family_id.as_bytes());
    hasher.update(b":");
    hasher.update(request_id.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let value = u64::from_be_bytes(bytes);

    // mod 100 always fits in u8
    u8::try_from(value % 100).unwrap_or(0)
}

/// Whether a rollout percentage admits this family/request pair
#[must_use]
pub fn passes_rollout(family_id: &str, request_id: &str, rollout_percentage: u8) -> bool {
    rollout_bucket(family_id, request_id) < rollout_percentage.min(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let a = rollout_bucket("fam-1", "req-1");
        let b = rollout_bucket("fam-1", "req-1");
        assert_eq!(a, b);
    }

    #[test]
    fn zero_percent_never_passes() {
        for i in 0..50 {
            let req = format!("req-{i}");
            assert!(!passes_rollout("fam-1", &req, 0));
        }
    }

    #[test]
    fn hundred_percent_always_passes() {
        for i in 0..50 {
            let req = format!("req-{i}");
            assert!(passes_rollout("fam-1", &req, 100));
        }
    }

    #[test]
    fn bucket_always_in_range() {
        for i in 0..200 {
            let req = format!("req-{i}");
            assert!(rollout_bucket("fam-1", &req) < 100);
        }
    }
}
