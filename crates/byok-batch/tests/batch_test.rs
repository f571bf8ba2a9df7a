//! Batch runs over real folders.

use byok_batch::{process_all, BatchError};
use byok_core::defaults::HDR_DATAKEY;
use byok_crypto::{generate_key_pair, RsaKeyPair};
use byok_eml::{parse_message, EnvelopeEncrypter, EnvelopeSettings, Part};
use std::sync::OnceLock;
use tempfile::tempdir;

fn encrypter() -> &'static EnvelopeEncrypter {
    static ENCRYPTER: OnceLock<EnvelopeEncrypter> = OnceLock::new();
    ENCRYPTER.get_or_init(|| {
        let keys: RsaKeyPair = generate_key_pair(2048).unwrap();
        EnvelopeEncrypter::new(
            keys,
            EnvelopeSettings {
                key_id: "batch-key".into(),
                integrity: "batch-integrity".into(),
                verify_key_header: true,
            },
        )
    })
}

const GOOD: &[u8] = b"From: a@example.com\r\n\
Subject: good\r\n\
Content-Type: multipart/mixed; boundary=\"sep\"\r\n\
\r\n\
--sep\r\n\
Content-Type: text/plain\r\n\
\r\n\
body\r\n\
--sep\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"data.bin\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
AAECAw==\r\n\
--sep--\r\n";

const CORRUPT: &[u8] = b"From: a@example.com\r\n\
Subject: corrupt\r\n\
Content-Type: multipart/mixed\r\n\
\r\n\
no boundary anywhere\r\n";

#[test]
fn test_good_and_corrupt_files() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    std::fs::write(input.path().join("01-good.eml"), GOOD).unwrap();
    std::fs::write(input.path().join("02-corrupt.eml"), CORRUPT).unwrap();
    std::fs::write(input.path().join("readme.txt"), b"ignored").unwrap();

    let summary = process_all(input.path(), output.path(), encrypter()).unwrap();

    assert_eq!(summary.processed, vec!["01-good.eml".to_string()]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].file, "02-corrupt.eml");

    assert!(!output.path().join("02-corrupt.eml").exists());
    assert!(!output.path().join("readme.txt").exists());

    let written = std::fs::read(output.path().join("01-good.eml")).unwrap();
    let message = parse_message(&written).unwrap();
    assert!(message.headers.get(HDR_DATAKEY).unwrap().starts_with("V2.0#: "));
    let Part::Container(root) = &message.body else {
        panic!("expected container");
    };
    assert_eq!(root.children.len(), 2);

    // Only the finished output file is left behind
    let entries = std::fs::read_dir(output.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn test_output_folder_is_created() {
    let input = tempdir().unwrap();
    let base = tempdir().unwrap();
    let output = base.path().join("nested").join("out");
    std::fs::write(input.path().join("m.eml"), GOOD).unwrap();

    let summary = process_all(input.path(), &output, encrypter()).unwrap();

    assert_eq!(summary.processed.len(), 1);
    assert!(output.join("m.eml").is_file());
}

#[test]
fn test_input_must_be_directory() {
    let base = tempdir().unwrap();
    let file = base.path().join("not-a-dir.eml");
    std::fs::write(&file, GOOD).unwrap();

    let result = process_all(&file, &base.path().join("out"), encrypter());
    assert!(matches!(result, Err(BatchError::NotADirectory(_))));
}

#[test]
fn test_existing_output_is_replaced() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    std::fs::write(input.path().join("m.eml"), GOOD).unwrap();
    std::fs::write(output.path().join("m.eml"), b"stale").unwrap();

    process_all(input.path(), output.path(), encrypter()).unwrap();

    let written = std::fs::read(output.path().join("m.eml")).unwrap();
    assert_ne!(written, b"stale");
}
