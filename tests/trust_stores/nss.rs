use std::fs::{self, File};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use certinject::config::NssConfig;
use certinject::stores::nss::{NssStore, ToolOutput};
use certinject::stores::{ExpiryPolicy, ManualClock, TrustStore};
use certinject::{CertInjectError, Certificate, ErrorKind};
use chrono::TimeDelta;

use super::support::{
    already_absent, clock_at_now, exists, self_signed, transient_failure, NssDirs, ScriptedTool,
};

fn store(tool: &ScriptedTool, config: NssConfig) -> (NssStore<ScriptedTool>, ManualClock) {
    let clock = clock_at_now();
    let store = NssStore::new(tool.clone(), config, ExpiryPolicy::from_seconds(1800))
        .with_clock(Arc::new(clock.clone()));
    (store, clock)
}

#[test]
fn inject_then_clean_lifecycle() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::default();
    let (store, clock) = store(&tool, dirs.config());
    let cert = self_signed("example.bit");

    store.inject(cert.raw()).unwrap();
    assert_eq!(dirs.mirror_files(), vec![format!("{}.pem", cert.sha256_hex())]);

    store.clean().unwrap();
    assert!(exists(&dirs.mirror_path(&cert)));
    assert_eq!(tool.calls().len(), 1, "fresh entries must not reach certutil");

    clock.advance(TimeDelta::seconds(1801));
    store.clean().unwrap();

    assert!(dirs.mirror_files().is_empty());
    let calls = tool.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].args[2], "-D");
    assert_eq!(calls[1].args[4], format!("Namecoin-{}", cert.sha256_hex()));
}

#[test]
fn reinjection_keeps_one_mirror_file() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::default();
    let (store, _) = store(&tool, dirs.config());
    let cert = self_signed("example.bit");

    store.inject(cert.raw()).unwrap();
    store.inject(cert.to_pem().as_bytes()).unwrap();

    assert_eq!(dirs.mirror_files().len(), 1);
    assert_eq!(Certificate::from_file(dirs.mirror_path(&cert)).unwrap(), cert);
}

#[test]
fn reinjection_advances_mirror_mtime() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::default();
    let (store, _) = store(&tool, dirs.config());
    let cert = self_signed("example.bit");
    let path = dirs.mirror_path(&cert);

    store.inject(cert.raw()).unwrap();
    let backdated = SystemTime::now() - Duration::from_secs(3600);
    File::options().write(true).open(&path).unwrap().set_modified(backdated).unwrap();
    let before = fs::metadata(&path).unwrap().modified().unwrap();

    store.inject(cert.raw()).unwrap();

    let after = fs::metadata(&path).unwrap().modified().unwrap();
    assert!(after > before, "mirror mtime must move forward on re-inject");
    assert_eq!(dirs.mirror_files().len(), 1);
}

#[test]
fn transient_import_failure_is_retried_with_intact_mirror() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::new([transient_failure(), transient_failure(), transient_failure()]);
    let (store, _) = store(&tool, dirs.config());
    let cert = self_signed("example.bit");

    store.inject(cert.raw()).unwrap();

    let calls = tool.calls();
    assert_eq!(calls.len(), 4);
    for call in &calls {
        let input = call.input.as_deref().expect("mirror file present during import");
        assert_eq!(Certificate::from_bytes(input.as_bytes()).unwrap(), cert);
    }
}

#[test]
fn bounded_import_retries_report_transient_error() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::new(std::iter::repeat_with(transient_failure).take(5));
    let config = NssConfig { inject_max_retries: Some(2), ..dirs.config() };
    let (store, _) = store(&tool, config);

    let err = store.inject(self_signed("example.bit").raw()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientBackend);
    assert_eq!(tool.calls().len(), 3);
}

#[test]
fn already_absent_during_clean_removes_mirror_without_error() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::default();
    let (store, clock) = store(&tool, dirs.config());
    let cert = self_signed("example.bit");
    store.inject(cert.raw()).unwrap();

    tool.push([already_absent()]);
    clock.advance(TimeDelta::hours(1));

    store.clean().unwrap();
    assert!(!exists(&dirs.mirror_path(&cert)));
}

#[test]
fn transient_delete_retried_once() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::default();
    let (store, clock) = store(&tool, dirs.config());
    let cert = self_signed("example.bit");
    store.inject(cert.raw()).unwrap();
    tool.clear_calls();

    tool.push([transient_failure()]);
    clock.advance(TimeDelta::hours(1));
    store.clean().unwrap();

    assert_eq!(tool.calls().len(), 2);
    assert!(!exists(&dirs.mirror_path(&cert)));
}

#[test]
fn failed_delete_retry_keeps_mirror_and_aggregates() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::default();
    let (store, clock) = store(&tool, dirs.config());
    let stuck = self_signed("stuck.example");
    let gone = self_signed("gone.example");
    store.inject(stuck.raw()).unwrap();
    store.inject(gone.raw()).unwrap();

    // Directory order is unspecified: one entry hits two transient failures,
    // the other deletes cleanly.
    tool.push([transient_failure(), transient_failure()]);
    clock.advance(TimeDelta::hours(1));

    let err = store.clean().unwrap_err();
    let CertInjectError::Aggregate(errors) = &err else {
        panic!("expected aggregate error, got {err:?}");
    };
    assert_eq!(errors.len(), 1);
    assert!(err.to_string().starts_with("1 errors found"));
    assert_eq!(dirs.mirror_files().len(), 1);
}

#[test]
fn unknown_delete_failure_aborts_clean() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::default();
    let (store, clock) = store(&tool, dirs.config());
    let cert = self_signed("example.bit");
    store.inject(cert.raw()).unwrap();

    tool.push([ToolOutput::failure(255, "certutil: SEC_ERROR_BAD_DATABASE")]);
    clock.advance(TimeDelta::hours(1));

    let err = store.clean().unwrap_err();
    assert!(matches!(err, CertInjectError::Tool { .. }));
    assert!(exists(&dirs.mirror_path(&cert)));
}

#[test]
fn foreign_files_are_never_removed() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::default();
    let (store, clock) = store(&tool, dirs.config());
    std::fs::write(dirs.cert_dir.join("README.txt"), "not ours").unwrap();
    std::fs::write(dirs.cert_dir.join(format!("{}.pem", "F".repeat(64))), "not ours").unwrap();
    std::fs::create_dir(dirs.cert_dir.join(format!("{}.pem", "a".repeat(64)))).unwrap();

    clock.advance(TimeDelta::days(30));
    store.clean().unwrap();

    assert_eq!(dirs.mirror_files().len(), 3);
    assert!(tool.calls().is_empty());
}

#[test]
fn missing_mirror_directory_is_an_error() {
    let dirs = NssDirs::new();
    let tool = ScriptedTool::default();
    let config = NssConfig { cert_dir: dirs.cert_dir.join("missing"), ..dirs.config() };
    let (store, _) = store(&tool, config);

    assert!(matches!(store.clean(), Err(CertInjectError::Io(_))));
}
