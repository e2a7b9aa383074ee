use budgetsync_cloud::error::{DecryptFailureKind, SyncError};
use budgetsync_cloud::payload::{
    LARGE_DATA_SIZE, MAX_DATA_SIZE, validate_encrypted_payload, validate_envelope,
};
use budgetsync_crypto::{EncodedEnvelope, EncryptedEnvelope};

fn envelope(data_len: usize, iv_len: usize) -> EncryptedEnvelope {
    EncryptedEnvelope::new(vec![0xAB; data_len], vec![0x01; iv_len])
}

#[test]
fn exactly_minimum_sizes_pass() {
    let report = validate_encrypted_payload(&envelope(16, 12).encode(), "test");
    assert!(report.is_valid, "{:?}", report.errors);
    assert_eq!(report.data_size, 16);
    assert_eq!(report.iv_size, 12);
    assert!(report.into_envelope().is_ok());
}

#[test]
fn short_ciphertext_fails_as_truncated() {
    let report = validate_encrypted_payload(&envelope(15, 12).encode(), "test");
    assert!(!report.is_valid);
    assert_eq!(report.failure_kind(), Some(DecryptFailureKind::Truncated));
    assert!(report.errors[0].contains("too small"));
}

#[test]
fn short_iv_fails_as_truncated() {
    let report = validate_encrypted_payload(&envelope(64, 11).encode(), "test");
    assert!(!report.is_valid);
    assert_eq!(report.failure_kind(), Some(DecryptFailureKind::Truncated));
    assert!(matches!(report.into_envelope(), Err(SyncError::Validation(_))));
}

#[test]
fn absent_fields_fail() {
    let missing_iv = EncodedEnvelope {
        data: envelope(32, 12).encode().data,
        iv: None,
    };
    let report = validate_encrypted_payload(&missing_iv, "test");
    assert!(!report.is_valid);
    assert_eq!(report.errors, vec!["Missing encrypted iv"]);
    assert_eq!(report.failure_kind(), Some(DecryptFailureKind::Malformed));

    let report = validate_encrypted_payload(&EncodedEnvelope::default(), "test");
    assert_eq!(report.errors.len(), 2);
}

#[test]
fn empty_string_field_counts_as_zero_bytes() {
    let encoded = EncodedEnvelope {
        data: Some(String::new()),
        iv: envelope(16, 12).encode().iv,
    };
    let report = validate_encrypted_payload(&encoded, "test");
    assert!(!report.is_valid);
    assert_eq!(report.data_size, 0);
    assert_eq!(report.failure_kind(), Some(DecryptFailureKind::Truncated));
}

#[test]
fn invalid_base64_is_malformed() {
    let encoded = EncodedEnvelope {
        data: Some("!!not base64!!".into()),
        iv: envelope(16, 12).encode().iv,
    };
    let report = validate_encrypted_payload(&encoded, "test");
    assert!(!report.is_valid);
    assert_eq!(report.failure_kind(), Some(DecryptFailureKind::Malformed));
}

#[test]
fn oversized_payload_fails() {
    let report = validate_envelope(&envelope(MAX_DATA_SIZE + 1, 12), "test");
    assert!(!report.is_valid);
    assert!(report.errors[0].contains("too large"));
}

#[test]
fn large_payload_warns() {
    let report = validate_envelope(&envelope(LARGE_DATA_SIZE + 1, 12), "test");
    assert!(report.is_valid);
    assert_eq!(report.warnings.len(), 1);

    let report = validate_envelope(&envelope(LARGE_DATA_SIZE, 12), "test");
    assert!(report.warnings.is_empty());
}
