use super::*;
use std::collections::HashMap;

#[test]
fn defaults_match_portal_conventions() {
    let c = PortalConfig::default();
    assert_eq!(c.namespace, "civic_connect");
    assert_eq!(c.min_password_len, 6);
    assert_eq!(c.demo_password, "demo123");
    assert!(c.seed_demo);
    assert_eq!(c.digest, DigestScheme::Sha256);
    assert_eq!(c.ids, IdScheme::Uuid);
}

#[test]
fn partial_file_inherits_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("civic.json");
    std::fs::write(&p, r#"{ "namespace": "town", "ids": "counter", "snapshot_format": "bincode" }"#).unwrap();
    let c = PortalConfig::from_file(&p).unwrap();
    assert_eq!(c.namespace, "town");
    assert_eq!(c.ids, IdScheme::Counter);
    assert_eq!(c.snapshot_format, SnapshotFormat::Bincode);
    assert_eq!(c.min_password_len, 6);
}

#[test]
fn bad_file_is_user_error() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("civic.json");
    std::fs::write(&p, r#"{ "digest": "md5" }"#).unwrap();
    let err = PortalConfig::from_file(&p).unwrap_err();
    assert_eq!(err.code_str(), "bad_config");
}

#[test]
fn overrides_apply_on_top() {
    let env: HashMap<&str, &str> = [
        ("CIVIC_NAMESPACE", "ward7"),
        ("CIVIC_MIN_PASSWORD_LEN", "10"),
        ("CIVIC_SEED_DEMO", "off"),
        ("CIVIC_DIGEST", "Argon2"),
        ("CIVIC_IDS", "counter"),
    ].into_iter().collect();
    let mut c = PortalConfig::default();
    c.apply_overrides(|k| env.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(c.namespace, "ward7");
    assert_eq!(c.min_password_len, 10);
    assert!(!c.seed_demo);
    assert_eq!(c.digest, DigestScheme::Argon2);
    assert_eq!(c.ids, IdScheme::Counter);
}

#[test]
fn unparsable_override_is_rejected() {
    let mut c = PortalConfig::default();
    let err = c.apply_overrides(|k| (k == "CIVIC_MIN_PASSWORD_LEN").then(|| "six".to_string())).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(c.min_password_len, 6);
}
