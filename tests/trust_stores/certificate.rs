use certinject::certificate::{pem_encode, registry_blob, sha1_fingerprint, REGISTRY_BLOB_HEADER_LEN};
use certinject::{CertInjectError, Certificate};
use proptest::prelude::*;

use super::support::self_signed_der;

#[test]
fn der_and_pem_inputs_agree() {
    let der = self_signed_der("example.bit");
    let from_der = Certificate::from_bytes(&der).unwrap();
    let from_pem = Certificate::from_bytes(from_der.to_pem().as_bytes()).unwrap();

    assert_eq!(from_der.raw(), der.as_slice());
    assert_eq!(from_pem, from_der);
    assert_eq!(from_pem.fingerprint_hex(), from_der.fingerprint_hex());
}

#[test]
fn pem_with_wrong_label_is_rejected() {
    let der = self_signed_der("example.bit");
    let pem = pem_encode("PRIVATE KEY", &der);

    let err = Certificate::from_bytes(pem.as_bytes()).unwrap_err();
    assert!(matches!(err, CertInjectError::UnexpectedPemType { .. }));
    assert_eq!(err.kind(), certinject::ErrorKind::Format);
}

#[test]
fn registry_blob_wraps_der() {
    let cert = Certificate::from_bytes(&self_signed_der("example.bit")).unwrap();
    let blob = cert.to_registry_blob();

    assert_eq!(&blob[..8], &[0x20, 0, 0, 0, 0x01, 0, 0, 0]);
    assert_eq!(&blob[REGISTRY_BLOB_HEADER_LEN..], cert.raw());
}

proptest! {
    #[test]
    fn registry_blob_length_law(bytes in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let blob = registry_blob(&bytes);
        prop_assert_eq!(blob.len(), bytes.len() + REGISTRY_BLOB_HEADER_LEN);
        let len = u32::from_le_bytes([blob[8], blob[9], blob[10], blob[11]]);
        prop_assert_eq!(len as usize, bytes.len());
    }

    #[test]
    fn fingerprint_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(sha1_fingerprint(&bytes), sha1_fingerprint(&bytes.clone()));
    }

    #[test]
    fn fingerprint_distinguishes_inputs(
        a in proptest::collection::vec(any::<u8>(), 1..256),
        b in proptest::collection::vec(any::<u8>(), 1..256),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(sha1_fingerprint(&a), sha1_fingerprint(&b));
    }
}
