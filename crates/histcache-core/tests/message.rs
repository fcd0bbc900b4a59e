use std::str::FromStr;

use histcache_core::{CachedSegment, HistoryError, Message, Role};

#[test]
fn role_serializes_lowercase() {
    let msg = Message::assistant(3, "hi");
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["role"], "assistant");
    assert_eq!(json["position"], 3);
    assert_eq!(json["content"], "hi");
}

#[test]
fn role_from_str_roundtrip() {
    for role in [Role::System, Role::User, Role::Assistant] {
        assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
    }
}

#[test]
fn role_from_str_rejects_unknown() {
    let err = Role::from_str("robot").unwrap_err();
    assert!(matches!(err, HistoryError::Serialization(_)));
}

#[test]
fn message_constructors() {
    let m = Message::user(0, "hello");
    assert_eq!(m.role(), Role::User);
    assert_eq!(m.content(), "hello");
    assert_eq!(Message::system(1, "x").role(), Role::System);
}

#[test]
fn cached_segment_deserializes_from_stored_json() {
    let raw = r#"{
        "session_id": "s1",
        "stable_count": 1,
        "total_count": 3,
        "messages": [{"position": 0, "role": "user", "content": "a"}],
        "created_at": 0
    }"#;
    let segment: CachedSegment = serde_json::from_str(raw).unwrap();
    assert_eq!(segment.messages, vec![Message::user(0, "a")]);
    assert!(segment.age().as_secs() > 0);
}

#[test]
fn fresh_segment_has_zero_age() {
    let segment = CachedSegment::new("s1", 0, 2, Vec::new());
    assert!(segment.age().as_secs() <= 1);
}

#[test]
fn cache_fault_classification() {
    assert!(HistoryError::Cache("down".into()).is_cache_fault());
    assert!(HistoryError::Timeout("slow".into()).is_cache_fault());
    assert!(HistoryError::Serialization("bad".into()).is_cache_fault());
    assert!(!HistoryError::MessageStore("db".into()).is_cache_fault());
    assert!(!HistoryError::Config("cfg".into()).is_cache_fault());
}
