use std::sync::Arc;

use certinject::config::CryptoApiConfig;
use certinject::stores::cryptoapi::{
    CryptoApiStore, MemoryHive, RegistryHive, RegistryKey, RegistryValue, RootKey, BLOB_VALUE_NAME,
    MARKER_VALUE_NAME,
};
use certinject::stores::{ExpiryPolicy, ManualClock, TrustStore};
use certinject::Certificate;
use chrono::TimeDelta;

use super::support::{manual_clock, self_signed};

const CURRENT_USER_CA: &str = r"SOFTWARE\Microsoft\SystemCertificates\CA\Certificates";

fn current_user_store(expire_seconds: u64) -> (CryptoApiStore<MemoryHive>, ManualClock) {
    let clock = manual_clock();
    let hive = MemoryHive::new(Arc::new(clock.clone()));
    hive.ensure_key(RootKey::CurrentUser, CURRENT_USER_CA);
    let config = CryptoApiConfig { scope: "current-user".into(), logical_store: "CA".into() };
    let store = CryptoApiStore::new(hive, config, ExpiryPolicy::from_seconds(expire_seconds))
        .with_clock(Arc::new(clock.clone()));
    (store, clock)
}

fn entry(cert: &Certificate) -> String {
    format!(r"{}\{}", CURRENT_USER_CA, cert.fingerprint_hex().to_uppercase())
}

#[test]
fn fresh_entry_survives_and_stale_entry_is_removed() {
    let (store, clock) = current_user_store(1800);
    let cert = self_signed("example.bit");

    store.inject(cert.raw()).unwrap();
    store.clean().unwrap();
    assert!(store.hive().key_exists(RootKey::CurrentUser, &entry(&cert)));

    clock.advance(TimeDelta::hours(1));
    store.clean().unwrap();
    assert!(!store.hive().key_exists(RootKey::CurrentUser, &entry(&cert)));
}

#[test]
fn pem_input_is_accepted() {
    let (store, _) = current_user_store(1800);
    let cert = self_signed("example.bit");

    store.inject(cert.to_pem().as_bytes()).unwrap();

    assert_eq!(
        store.hive().value(RootKey::CurrentUser, &entry(&cert), BLOB_VALUE_NAME),
        Some(RegistryValue::Binary(cert.to_registry_blob()))
    );
}

#[test]
fn reinjection_keeps_entry_fresh() {
    let (store, clock) = current_user_store(1800);
    let cert = self_signed("example.bit");
    store.inject(cert.raw()).unwrap();

    for _ in 0..3 {
        clock.advance(TimeDelta::seconds(1500));
        store.inject(cert.raw()).unwrap();
        store.clean().unwrap();
    }

    assert!(store.hive().key_exists(RootKey::CurrentUser, &entry(&cert)));
}

#[test]
fn future_timestamps_count_as_stale() {
    let (store, clock) = current_user_store(1800);
    let cert = self_signed("example.bit");

    clock.advance(TimeDelta::hours(2));
    store.inject(cert.raw()).unwrap();
    clock.advance(TimeDelta::hours(-2));

    store.clean().unwrap();
    assert!(!store.hive().key_exists(RootKey::CurrentUser, &entry(&cert)));
}

#[test]
fn unowned_entries_are_never_removed() {
    let (store, clock) = current_user_store(1);
    let store_key = store.hive().open_key(RootKey::CurrentUser, CURRENT_USER_CA).unwrap();
    let foreign = self_signed("foreign.example");
    let name = foreign.fingerprint_hex().to_uppercase();
    store_key.create_subkey(&name).unwrap().set_binary(BLOB_VALUE_NAME, &foreign.to_registry_blob()).unwrap();

    clock.advance(TimeDelta::days(365));
    store.clean().unwrap();

    assert!(store.hive().key_exists(RootKey::CurrentUser, &entry(&foreign)));
    assert_eq!(store.hive().value(RootKey::CurrentUser, &entry(&foreign), MARKER_VALUE_NAME), None);
}
