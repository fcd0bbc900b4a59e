use histcache_core::{stable_signature, CacheKey, STABLE_SIGNATURE_PREFIX};

#[test]
fn identical_inputs_identical_signature() {
    let a = stable_signature("test-session-123", 38, 50);
    let b = stable_signature("test-session-123", 38, 50);
    assert_eq!(a, b);
}

#[test]
fn total_count_changes_signature() {
    let a = stable_signature("test-session-123", 38, 50);
    let b = stable_signature("test-session-123", 38, 51);
    assert_ne!(a, b);
}

#[test]
fn stable_count_changes_signature() {
    let a = stable_signature("s1", 38, 50);
    let b = stable_signature("s1", 37, 50);
    assert_ne!(a, b);
}

#[test]
fn session_changes_signature() {
    assert_ne!(stable_signature("s1", 10, 12), stable_signature("s2", 10, 12));
}

#[test]
fn delimiter_prevents_concatenation_collisions() {
    // "s1" + "23" vs "s12" + "3" must not hash the same input.
    assert_ne!(stable_signature("s1", 23, 40), stable_signature("s12", 3, 40));
    assert_ne!(stable_signature("s", 1, 23), stable_signature("s", 12, 3));
}

#[test]
fn signature_shape() {
    let sig = stable_signature("abc", 1, 3);
    let (prefix, digest) = sig.split_once(':').unwrap();
    assert_eq!(prefix, STABLE_SIGNATURE_PREFIX);
    // 128 bits of hex.
    assert_eq!(digest.len(), 32);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn known_value_is_stable_across_runs() {
    // Recomputing from scratch inside the same test guards against any
    // per-process seeding sneaking into the hash.
    let first = stable_signature("session-a", 38, 40);
    for _ in 0..10 {
        assert_eq!(stable_signature("session-a", 38, 40), first);
    }
}

#[test]
fn cache_key_display() {
    let key = CacheKey::new("history_stable", "s1", "stable:abcd");
    assert_eq!(key.to_string(), "history_stable:s1:stable:abcd");
}
