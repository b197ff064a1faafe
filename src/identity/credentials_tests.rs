use super::*;
use std::sync::Arc;

use crate::config::{DigestScheme, IdScheme};
use crate::identity::digest::{Argon2Digest, Sha256Digest};
use crate::identity::ids::CounterIds;
use crate::storage::failing::FailingKv;
use crate::storage::KvStore;

fn fresh(config: PortalConfig) -> (Arc<KvStore>, CredentialStore) {
    let kv = Arc::new(KvStore::in_memory("test"));
    let store = CredentialStore::new(kv.clone(), config);
    (kv, store)
}

fn booted() -> (Arc<KvStore>, CredentialStore) {
    let (kv, store) = fresh(PortalConfig::default());
    store.bootstrap().unwrap();
    (kv, store)
}

#[test]
fn starts_loading_until_bootstrap() {
    let (_kv, store) = fresh(PortalConfig::default());
    assert!(store.is_loading());
    store.bootstrap().unwrap();
    assert!(!store.is_loading());
    assert_eq!(store.current(), None);
}

#[test]
fn register_then_login_round_trips() {
    let (_kv, store) = booted();
    for (i, role) in [Role::Citizen, Role::Politician].into_iter().enumerate() {
        let email = format!("person{}@town.org", i);
        let acct = store.register("Person", &email, "hunter22", role).unwrap();
        assert_eq!(store.current().as_ref(), Some(&acct));
        store.logout().unwrap();

        let back = store.login(&email, "hunter22").unwrap().expect("login should succeed");
        assert_eq!(back.email, email);
        assert_eq!(back.role, role);
        assert_eq!(back.id, acct.id);
        assert!(store.session().is_authenticated());
    }
}

#[test]
fn register_writes_all_three_slots() {
    let (kv, store) = booted();
    let acct = store.register("Ann", "ann@town.org", "abcdef", Role::Citizen).unwrap();
    let keys = Keys::default();
    let users: Vec<Account> = crate::storage::read_json_or_default(kv.as_ref(), &keys.users()).unwrap();
    assert!(users.iter().any(|u| u.id == acct.id));
    let creds: CredentialMap = crate::storage::read_json_or_default(kv.as_ref(), &keys.credentials()).unwrap();
    assert_eq!(creds.get(&acct.id), Some(&Sha256Digest::hex("abcdef")));
    let sess: Option<Account> = crate::storage::read_json(kv.as_ref(), &keys.session()).unwrap();
    assert_eq!(sess, Some(acct));
}

#[test]
fn duplicate_email_leaves_storage_untouched() {
    let (kv, store) = booted();
    store.register("Ann", "ann@town.org", "abcdef", Role::Citizen).unwrap();
    let before = kv.snapshot();
    let err = store.register("Other Ann", "ann@town.org", "zzzzzzzz", Role::Politician).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.code_str(), "email_exists");
    assert_eq!(kv.snapshot(), before);
}

#[test]
fn duplicate_of_seeded_email_is_rejected() {
    let (_kv, store) = booted();
    let err = store.register("Impostor", "admin@civic.com", "abcdef", Role::Citizen).unwrap_err();
    assert_eq!(err.code_str(), "email_exists");
}

#[test]
fn short_password_and_bad_role_are_rejected() {
    let (kv, store) = booted();
    let before = kv.snapshot();
    let err = store.register("Bob", "bob@town.org", "12345", Role::Citizen).unwrap_err();
    assert_eq!(err.code_str(), "password_too_short");
    let err = store.register("Bob", "bob@town.org", "123456", Role::Admin).unwrap_err();
    assert_eq!(err.code_str(), "role_not_allowed");
    let err = store.register("", "bob@town.org", "123456", Role::Citizen).unwrap_err();
    assert_eq!(err.code_str(), "missing_field");
    assert_eq!(kv.snapshot(), before);
    assert_eq!(store.current(), None);
}

#[test]
fn wrong_password_and_unknown_email_are_silent() {
    let (_kv, store) = booted();
    store.register("Cat", "cat@town.org", "meowmeow", Role::Citizen).unwrap();
    store.logout().unwrap();
    assert_eq!(store.login("cat@town.org", "woofwoof").unwrap(), None);
    assert_eq!(store.login("nobody@town.org", "meowmeow").unwrap(), None);
    // exact, case-sensitive email match
    assert_eq!(store.login("CAT@town.org", "meowmeow").unwrap(), None);
    assert!(!store.session().is_authenticated());
}

#[test]
fn missing_credential_record_fails_login() {
    let (kv, store) = booted();
    let keys = Keys::default();
    write_json(kv.as_ref(), &keys.credentials(), &CredentialMap::new()).unwrap();
    assert_eq!(store.login("admin@civic.com", "demo123").unwrap(), None);
}

#[test]
fn demo_accounts_log_in_with_shared_password() {
    let (_kv, store) = booted();
    for email in ["admin@civic.com", "citizen@civic.com", "politician@civic.com", "moderator@civic.com"] {
        let a = store.login(email, "demo123").unwrap();
        assert!(a.is_some(), "{}", email);
    }
    let admin = store.login("admin@civic.com", "demo123").unwrap().unwrap();
    assert_eq!(admin.id, "1");
    assert_eq!(admin.role, Role::Admin);
}

#[test]
fn bootstrap_twice_seeds_once() {
    let (kv, store) = booted();
    assert!(!store.bootstrap().unwrap());
    let again = CredentialStore::new(kv.clone(), PortalConfig::default());
    assert!(!again.bootstrap().unwrap());
    let users = again.list_accounts().unwrap();
    assert_eq!(users.len(), 4);
    for email in ["admin@civic.com", "citizen@civic.com", "politician@civic.com", "moderator@civic.com"] {
        assert_eq!(users.iter().filter(|u| u.email == email).count(), 1);
    }
}

#[test]
fn bootstrap_never_overwrites_existing_accounts() {
    let (kv, store) = booted();
    let acct = store.register("Dee", "dee@town.org", "abcdef", Role::Citizen).unwrap();
    let reopened = CredentialStore::new(kv.clone(), PortalConfig::default());
    reopened.bootstrap().unwrap();
    assert_eq!(reopened.list_accounts().unwrap().len(), 5);
    // session survives the reload
    assert_eq!(reopened.current(), Some(acct));
}

#[test]
fn empty_users_slot_counts_as_existing() {
    let kv = Arc::new(KvStore::in_memory("t"));
    kv.set("civic_connect_users", "[]".into()).unwrap();
    let store = CredentialStore::new(kv.clone(), PortalConfig::default());
    assert!(!store.bootstrap().unwrap());
    assert!(store.list_accounts().unwrap().is_empty());
}

#[test]
fn seeding_can_be_disabled() {
    let cfg = PortalConfig { seed_demo: false, ..PortalConfig::default() };
    let (kv, store) = fresh(cfg);
    assert!(!store.bootstrap().unwrap());
    assert!(kv.is_empty());
}

#[test]
fn change_password_then_relogin() {
    let (_kv, store) = booted();
    store.register("Eve", "eve@town.org", "oldpass", Role::Citizen).unwrap();
    store.change_password("oldpass", "newpass1", "newpass1").unwrap();
    store.logout().unwrap();
    assert!(store.login("eve@town.org", "newpass1").unwrap().is_some());
    store.logout().unwrap();
    assert!(store.login("eve@town.org", "oldpass").unwrap().is_none());
}

#[test]
fn change_password_validations_do_not_mutate() {
    let (kv, store) = booted();
    store.register("Fay", "fay@town.org", "oldpass", Role::Citizen).unwrap();
    let before = kv.snapshot();

    let err = store.change_password("oldpass", "short", "short").unwrap_err();
    assert_eq!(err.code_str(), "password_too_short");
    let err = store.change_password("oldpass", "newpass1", "newpass2").unwrap_err();
    assert_eq!(err.code_str(), "password_mismatch");
    let err = store.change_password("wrongpass", "newpass1", "newpass1").unwrap_err();
    assert_eq!(err.code_str(), "incorrect_password");

    assert_eq!(kv.snapshot(), before);
}

#[test]
fn change_password_requires_session() {
    let (_kv, store) = booted();
    let err = store.change_password("demo123", "newpass1", "newpass1").unwrap_err();
    assert!(matches!(err, AppError::Auth { .. }));
}

#[test]
fn profile_edit_updates_users_and_session() {
    let (_kv, store) = booted();
    let me = store.register("Gil", "gil@town.org", "abcdef", Role::Politician).unwrap();
    let updated = store.update_profile("Gil Mayor", "mayor@town.org").unwrap();
    assert_eq!(updated.id, me.id);
    assert_eq!(store.current().unwrap().email, "mayor@town.org");
    assert_eq!(store.find_account(&me.id).unwrap().unwrap().name, "Gil Mayor");
    store.logout().unwrap();
    assert!(store.login("mayor@town.org", "abcdef").unwrap().is_some());
    assert!(store.login("gil@town.org", "abcdef").unwrap().is_none());
}

#[test]
fn profile_edit_rejects_taken_email() {
    let (_kv, store) = booted();
    store.register("Hal", "hal@town.org", "abcdef", Role::Citizen).unwrap();
    let err = store.update_profile("Hal", "citizen@civic.com").unwrap_err();
    assert_eq!(err.code_str(), "email_exists");
    // keeping one's own email is fine
    assert!(store.update_profile("Hal H.", "hal@town.org").is_ok());
}

#[test]
fn set_role_is_admin_only() {
    let (_kv, store) = booted();
    let admin = store.login("admin@civic.com", "demo123").unwrap().unwrap();
    let citizen = store.find_account("2").unwrap().unwrap();

    let err = store.set_role(&citizen, "3", Role::Citizen).unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }));

    let promoted = store.set_role(&admin, "2", Role::Moderator).unwrap();
    assert_eq!(promoted.role, Role::Moderator);
    assert_eq!(store.find_account("2").unwrap().unwrap().role, Role::Moderator);

    let err = store.set_role(&admin, "404", Role::Citizen).unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[test]
fn remove_account_drops_credential_and_session() {
    let (_kv, store) = booted();
    let ivy = store.register("Ivy", "ivy@town.org", "abcdef", Role::Citizen).unwrap();
    assert!(store.has_credential(&ivy.id).unwrap());
    store.remove_account(&ivy.id).unwrap();
    assert!(!store.has_credential(&ivy.id).unwrap());
    assert_eq!(store.current(), None);
    assert_eq!(store.login("ivy@town.org", "abcdef").unwrap(), None);
}

#[test]
fn counter_ids_follow_demo_ids() {
    let cfg = PortalConfig { ids: IdScheme::Counter, ..PortalConfig::default() };
    let (_kv, store) = fresh(cfg);
    store.bootstrap().unwrap();
    let a = store.register("J", "j@town.org", "abcdef", Role::Citizen).unwrap();
    let b = store.register("K", "k@town.org", "abcdef", Role::Citizen).unwrap();
    assert_eq!(a.id, "5");
    assert_eq!(b.id, "6");
}

#[test]
fn injected_allocator_replaces_configured_one() {
    let kv = Arc::new(KvStore::in_memory("t"));
    let store = CredentialStore::new(kv.clone(), PortalConfig::default())
        .with_ids(Box::new(CounterIds::new("town_seq", 100)));
    store.bootstrap().unwrap();
    let a = store.register("M", "m@town.org", "abcdef", Role::Citizen).unwrap();
    assert_eq!(a.id, "101");
    assert_eq!(kv.get("town_seq").unwrap().as_deref(), Some("101"));
}

#[test]
fn argon2_digest_round_trips() {
    let kv = Arc::new(KvStore::in_memory("t"));
    let store = CredentialStore::new(kv.clone(), PortalConfig::default()).with_digest(Box::new(Argon2Digest));
    store.bootstrap().unwrap();
    assert!(store.login("moderator@civic.com", "demo123").unwrap().is_some());
    let lu = store.register("Lu", "lu@town.org", "abcdef", Role::Citizen).unwrap();
    let creds: CredentialMap = crate::storage::read_json_or_default(kv.as_ref(), &Keys::default().credentials()).unwrap();
    assert!(creds[&lu.id].starts_with("$argon2"));
    store.logout().unwrap();
    assert!(store.login("lu@town.org", "abcdef").unwrap().is_some());
    assert!(store.login("lu@town.org", "abcdeg").unwrap().is_none());
}

#[test]
fn argon2_selected_by_config() {
    let cfg = PortalConfig { digest: DigestScheme::Argon2, ..PortalConfig::default() };
    let (_kv, store) = fresh(cfg);
    store.bootstrap().unwrap();
    assert!(store.login("admin@civic.com", "demo123").unwrap().is_some());
}

#[test]
fn password_length_counts_utf16_units() {
    let (_kv, store) = booted();
    // three astral-plane characters are six UTF-16 units
    store.register("Emo", "emo@town.org", "😀😀😀", Role::Citizen).unwrap();
    let err = store.register("Ana", "ana@town.org", "ábcde", Role::Citizen).unwrap_err();
    assert_eq!(err.code_str(), "password_too_short");
    store.change_password("😀😀😀", "😀😀x", "😀😀x").unwrap_err();
    store.change_password("😀😀😀", "😀😀xy", "😀😀xy").unwrap();
}

#[test]
fn failed_credential_write_leaves_no_account() {
    let kv = Arc::new(FailingKv::new());
    let store = CredentialStore::new(kv.clone(), PortalConfig::default());
    store.bootstrap().unwrap();
    let keys = Keys::default();
    kv.fail_writes_to(&keys.credentials());

    let err = store.register("Zed", "zed@town.org", "abcdef", Role::Citizen).unwrap_err();
    assert!(matches!(err, AppError::Io { .. }));
    assert!(store.list_accounts().unwrap().iter().all(|u| u.email != "zed@town.org"));
    assert_eq!(store.current(), None);

    kv.heal();
    let zed = store.register("Zed", "zed@town.org", "abcdef", Role::Citizen).unwrap();
    store.logout().unwrap();
    assert_eq!(store.login("zed@town.org", "abcdef").unwrap(), Some(zed));
}

#[test]
fn failed_users_write_drops_the_new_credential() {
    let kv = Arc::new(FailingKv::new());
    let store = CredentialStore::new(kv.clone(), PortalConfig::default());
    store.bootstrap().unwrap();
    let keys = Keys::default();
    let creds_before = kv.get(&keys.credentials()).unwrap();
    kv.fail_writes_to(&keys.users());

    let err = store.register("Yan", "yan@town.org", "abcdef", Role::Citizen).unwrap_err();
    assert!(matches!(err, AppError::Io { .. }));
    assert_eq!(kv.get(&keys.credentials()).unwrap(), creds_before);

    kv.heal();
    assert!(store.register("Yan", "yan@town.org", "abcdef", Role::Citizen).is_ok());
}

#[test]
fn failed_seed_is_retried_on_next_bootstrap() {
    let kv = Arc::new(FailingKv::new());
    let keys = Keys::default();
    kv.fail_writes_to(&keys.users());
    let store = CredentialStore::new(kv.clone(), PortalConfig::default());
    assert!(store.bootstrap().is_err());

    kv.heal();
    let again = CredentialStore::new(kv.clone(), PortalConfig::default());
    assert!(again.bootstrap().unwrap());
    assert!(again.login("citizen@civic.com", "demo123").unwrap().is_some());
}

#[test]
fn corrupt_users_slot_surfaces_on_login() {
    let (kv, store) = booted();
    kv.set(&Keys::default().users(), "{not json".into()).unwrap();
    let err = store.login("admin@civic.com", "demo123").unwrap_err();
    assert!(matches!(err, AppError::Corrupt { .. }));
}
