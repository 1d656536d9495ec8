//! control/reader: открыть pg_control, прочитать ровно одну запись, проверить CRC.
//!
//! - Открытие только на чтение, без блокировок: параллельные читатели не мешают
//!   друг другу, владелец кластера может переписывать файл прямо во время чтения.
//!   Рваное чтение ловит только CRC (ошибка Checksum, is_retryable() == true).
//! - Читаем не больше CONTROL_RECORD_SIZE байт; меньше: Io{Truncated}.
//! - Файл закрывается до возврата на любом пути (drop в конце read_raw).
//! - Необязательный бюджет времени: чтение идёт в отдельном потоке, вызывающий
//!   ждёт recv_timeout; по истечении: Io{Timeout}. Зависший поток доживает сам.

use std::fs::OpenOptions;
use std::io::Read;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use super::record::ControlRecord;
use crate::config::ControlConfig;
use crate::consts::CONTROL_RECORD_SIZE;
use crate::error::{ControlError, ControlResult, IoErrorKind};

/// Read and validate `<data_directory>/global/pg_control`.
pub fn read_control_record(data_directory: &Path) -> ControlResult<ControlRecord> {
    read_control_record_with(&ControlConfig::for_data_dir(data_directory))
}

/// Read and validate the control file located by `cfg` (location + time budget).
pub fn read_control_record_with(cfg: &ControlConfig) -> ControlResult<ControlRecord> {
    let path = cfg.control_path();
    let raw = match cfg.read_timeout() {
        Some(budget) => read_raw_with_budget(&path, budget)?,
        None => read_raw(&path)?,
    };
    validate(&path, &raw)
}

/// Read and validate a control file at an explicit path.
pub fn read_control_file(path: &Path) -> ControlResult<ControlRecord> {
    let raw = read_raw(path)?;
    validate(path, &raw)
}

fn validate(path: &Path, raw: &[u8]) -> ControlResult<ControlRecord> {
    match ControlRecord::from_bytes(raw) {
        Ok(rec) => {
            debug!(
                "pg_control {}: version={} catalog={} crc={:#010x}",
                path.display(),
                rec.pg_control_version,
                rec.catalog_version_no,
                rec.crc
            );
            Ok(rec)
        }
        Err(e) => {
            if let ControlError::Checksum { .. } = e {
                warn!("pg_control {}: {} (retryable)", path.display(), e);
            }
            Err(e)
        }
    }
}

/// Прочитать сырую запись (ровно CONTROL_RECORD_SIZE байт или ошибка).
fn read_raw(path: &Path) -> ControlResult<Vec<u8>> {
    let mut f = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| ControlError::io(IoErrorKind::from_open(&e), path, e.to_string()))?;

    let mut buf = Vec::with_capacity(CONTROL_RECORD_SIZE);
    Read::by_ref(&mut f)
        .take(CONTROL_RECORD_SIZE as u64)
        .read_to_end(&mut buf)
        .map_err(|e| ControlError::io(IoErrorKind::Truncated, path, e.to_string()))?;
    drop(f);

    debug!("read {} bytes from {}", buf.len(), path.display());

    if buf.len() < CONTROL_RECORD_SIZE {
        return Err(ControlError::io(
            IoErrorKind::Truncated,
            path,
            format!("read {} of {} bytes", buf.len(), CONTROL_RECORD_SIZE),
        ));
    }
    Ok(buf)
}

fn read_raw_with_budget(path: &Path, budget: Duration) -> ControlResult<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    let owned = path.to_path_buf();

    thread::Builder::new()
        .name("pg-control-read".to_string())
        .spawn(move || {
            // получатель мог уже уйти по таймауту
            let _ = tx.send(read_raw(&owned));
        })
        .map_err(|e| {
            ControlError::io(IoErrorKind::Other, path, format!("spawn reader thread: {}", e))
        })?;

    match rx.recv_timeout(budget) {
        Ok(res) => res,
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                "pg_control {}: read did not finish within {} ms",
                path.display(),
                budget.as_millis()
            );
            Err(ControlError::io(
                IoErrorKind::Timeout,
                path,
                format!("read did not finish within {} ms", budget.as_millis()),
            ))
        }
        Err(RecvTimeoutError::Disconnected) => Err(ControlError::io(
            IoErrorKind::Other,
            path,
            "reader thread exited without a result",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn unique_root(prefix: &str) -> PathBuf {
        let pid = std::process::id();
        let t = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("pgcd-{}-{}-{}", prefix, pid, t))
    }

    #[test]
    fn read_raw_caps_at_record_size() {
        let root = unique_root("raw-cap");
        fs::create_dir_all(&root).unwrap();
        let p = root.join("ctl");
        fs::write(&p, vec![7u8; 8192]).unwrap();

        let raw = read_raw(&p).unwrap();
        assert_eq!(raw.len(), CONTROL_RECORD_SIZE);
    }

    #[test]
    fn budget_read_returns_same_bytes() {
        let root = unique_root("raw-budget");
        fs::create_dir_all(&root).unwrap();
        let p = root.join("ctl");
        let data: Vec<u8> = (0..CONTROL_RECORD_SIZE).map(|i| i as u8).collect();
        fs::write(&p, &data).unwrap();

        let raw = read_raw_with_budget(&p, Duration::from_secs(5)).unwrap();
        assert_eq!(raw, data);
    }

    #[test]
    fn budget_read_propagates_open_error() {
        let p = unique_root("raw-missing").join("nope");
        let err = read_raw_with_budget(&p, Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.io_kind(), Some(IoErrorKind::NotFound));
    }
}
