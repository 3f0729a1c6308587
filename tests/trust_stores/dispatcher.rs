use std::sync::Arc;

use certinject::config::CryptoApiConfig;
use certinject::stores::cryptoapi::{CryptoApiStore, MemoryHive, RootKey};
use certinject::stores::nss::NssStore;
use certinject::stores::{ExpiryPolicy, TrustStoreDispatcher, TrustStoreType};
use certinject::{CertInjectError, ErrorKind, InjectConfig};
use chrono::TimeDelta;

use super::support::{clock_at_now, exists, self_signed, NssDirs, ScriptedTool};

const SYSTEM_ROOT: &str = r"SOFTWARE\Microsoft\SystemCertificates\Root\Certificates";

#[test]
fn empty_dispatcher_reports_no_store() {
    let dispatcher = TrustStoreDispatcher::new();
    let err = dispatcher.inject(self_signed("example.bit").raw()).unwrap_err();
    assert!(matches!(err, CertInjectError::NoStoreSelected));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn routes_to_every_enabled_store() {
    let clock = clock_at_now();
    let dirs = NssDirs::new();
    let tool = ScriptedTool::default();
    let hive = MemoryHive::new(Arc::new(clock.clone()));
    hive.ensure_key(RootKey::LocalMachine, SYSTEM_ROOT);

    let expiry = ExpiryPolicy::from_seconds(1800);
    let mut dispatcher = TrustStoreDispatcher::new();
    dispatcher.register(Box::new(
        NssStore::new(tool.clone(), dirs.config(), expiry).with_clock(Arc::new(clock.clone())),
    ));
    dispatcher.register(Box::new(
        CryptoApiStore::new(hive.clone(), CryptoApiConfig::default(), expiry)
            .with_clock(Arc::new(clock.clone())),
    ));
    assert_eq!(dispatcher.registered_stores(), vec![TrustStoreType::Nss, TrustStoreType::CryptoApi]);

    let cert = self_signed("example.bit");
    let registry_entry = format!(r"{}\{}", SYSTEM_ROOT, cert.fingerprint_hex().to_uppercase());

    dispatcher.inject(cert.raw()).unwrap();
    assert!(exists(&dirs.mirror_path(&cert)));
    assert!(hive.key_exists(RootKey::LocalMachine, &registry_entry));

    clock.advance(TimeDelta::hours(1));
    dispatcher.clean().unwrap();
    assert!(!exists(&dirs.mirror_path(&cert)));
    assert!(!hive.key_exists(RootKey::LocalMachine, &registry_entry));
}

#[test]
fn from_config_rejects_incomplete_nss_selection() {
    let config = InjectConfig { stores: vec![TrustStoreType::Nss], ..Default::default() };
    let err = TrustStoreDispatcher::from_config(&config).unwrap_err();
    assert!(err.to_string().contains("Empty nsscertdir configuration."));
}
