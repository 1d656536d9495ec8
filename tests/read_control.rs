use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use pg_controldata::consts::{CONTROL_FILE_REL, CONTROL_RECORD_SIZE, FIELD_COUNT, OFF_BLCKSZ};
use pg_controldata::{
    control_data, read_control_file, read_control_record, read_control_record_with,
    ControlConfig, ControlError, ControlRecord, DbState, IoErrorKind,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pgcdtest-{prefix}-{pid}-{t}-{id}"))
}

/// Data directory with global/pg_control padded to 8 KiB, as the engine writes it.
fn make_data_dir(prefix: &str, rec: &ControlRecord) -> Result<PathBuf> {
    let root = unique_root(prefix);
    fs::create_dir_all(root.join("global"))?;
    let mut bytes = rec.to_bytes();
    bytes.resize(8192, 0);
    fs::write(root.join(CONTROL_FILE_REL), &bytes)?;
    Ok(root)
}

fn sample() -> ControlRecord {
    ControlRecord {
        system_identifier: 123456789012345,
        state: DbState::ShutDown,
        time: 1_283_343_600,
        ..ControlRecord::default()
    }
}

#[test]
fn reads_record_from_data_directory() -> Result<()> {
    let root = make_data_dir("ok", &sample())?;

    let rec = read_control_record(&root)?;
    assert_eq!(rec.system_identifier, 123456789012345);
    assert_eq!(rec.state, DbState::ShutDown);

    let out = control_data(&ControlConfig::for_data_dir(&root))?;
    assert_eq!(out.len(), FIELD_COUNT);
    assert_eq!(out[2].setting, "123456789012345");
    Ok(())
}

#[test]
fn missing_file_is_not_found_with_os_text() {
    let root = unique_root("missing");
    let err = read_control_record(&root).unwrap_err();
    assert_eq!(err.io_kind(), Some(IoErrorKind::NotFound));
    let msg = err.to_string();
    assert!(msg.contains("could not open file"), "{msg}");
    assert!(msg.contains("pg_control"), "{msg}");
    match &err {
        ControlError::Io { detail, .. } => assert!(!detail.is_empty()),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[test]
fn short_file_is_truncated_io_error() -> Result<()> {
    let root = unique_root("short");
    fs::create_dir_all(root.join("global"))?;
    let bytes = sample().to_bytes();
    fs::write(root.join(CONTROL_FILE_REL), &bytes[..CONTROL_RECORD_SIZE / 2])?;

    let err = read_control_record(&root).unwrap_err();
    assert_eq!(err.io_kind(), Some(IoErrorKind::Truncated));
    assert!(err.to_string().contains("read 96 of 192 bytes"), "{err}");

    // пустой файл: тоже Truncated
    fs::write(root.join(CONTROL_FILE_REL), b"")?;
    let err = read_control_record(&root).unwrap_err();
    assert_eq!(err.io_kind(), Some(IoErrorKind::Truncated));
    Ok(())
}

#[test]
fn directory_in_place_of_file_is_an_io_error() -> Result<()> {
    let root = unique_root("isdir");
    fs::create_dir_all(root.join(CONTROL_FILE_REL))?;
    let err = read_control_record(&root).unwrap_err();
    assert!(
        matches!(err, ControlError::Io { .. }),
        "expected io error, got {err:?}"
    );
    Ok(())
}

#[test]
fn corrupted_file_is_retryable_checksum_error() -> Result<()> {
    let root = make_data_dir("corrupt", &sample())?;
    let path = root.join(CONTROL_FILE_REL);
    let mut bytes = fs::read(&path)?;
    bytes[OFF_BLCKSZ + 1] ^= 0x80;
    fs::write(&path, &bytes)?;

    let err = read_control_file(&path).unwrap_err();
    assert!(matches!(err, ControlError::Checksum { .. }), "{err:?}");
    assert!(err.is_retryable());
    assert!(err
        .to_string()
        .starts_with("calculated CRC checksum does not match value stored in file"));

    // после «перезаписи» владельцем повтор проходит
    fs::write(&path, sample().to_bytes())?;
    assert!(read_control_file(&path).is_ok());
    Ok(())
}

#[test]
fn custom_location_and_budget_from_config() -> Result<()> {
    let root = unique_root("custom");
    fs::create_dir_all(root.join("alt"))?;
    fs::write(root.join("alt/ctl"), sample().to_bytes())?;

    let cfg = ControlConfig::for_data_dir(&root)
        .with_control_file("alt/ctl")
        .with_read_timeout_ms(Some(5_000));
    let rec = read_control_record_with(&cfg)?;
    assert_eq!(rec.system_identifier, 123456789012345);
    Ok(())
}

#[test]
fn concurrent_readers_see_identical_output() -> Result<()> {
    let root = make_data_dir("concurrent", &sample())?;
    let cfg = ControlConfig::for_data_dir(&root);
    let expect = control_data(&cfg)?;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cfg = cfg.clone();
            std::thread::spawn(move || control_data(&cfg))
        })
        .collect();
    for h in handles {
        let got = h.join().expect("reader thread panicked")?;
        assert_eq!(got, expect);
    }
    Ok(())
}

#[test]
fn two_reads_in_a_row_are_identical() -> Result<()> {
    let root = make_data_dir("twice", &sample())?;
    let cfg = ControlConfig::for_data_dir(&root);
    let a = control_data(&cfg)?;
    let b = control_data(&cfg)?;
    assert_eq!(a, b);
    Ok(())
}

#[cfg(unix)]
#[test]
fn stalled_read_times_out() -> Result<()> {
    let root = unique_root("fifo");
    fs::create_dir_all(root.join("global"))?;
    let fifo = root.join(CONTROL_FILE_REL);

    // open() на FIFO без писателя блокируется: этим и моделируем зависший mount.
    let made = std::process::Command::new("mkfifo").arg(&fifo).status();
    if !matches!(made, Ok(s) if s.success()) {
        eprintln!("mkfifo unavailable, skipping");
        return Ok(());
    }

    let cfg = ControlConfig::for_data_dir(&root).with_read_timeout_ms(Some(100));
    let err = read_control_record_with(&cfg).unwrap_err();
    assert_eq!(err.io_kind(), Some(IoErrorKind::Timeout));
    assert!(err.is_retryable());

    release_fifo(&fifo);
    Ok(())
}

// Отпустить зависший поток чтения: открыть FIFO на запись и сразу закрыть.
#[cfg(unix)]
fn release_fifo(fifo: &Path) {
    let _ = fs::OpenOptions::new().write(true).open(fifo);
}
