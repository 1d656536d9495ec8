//! Centralized configuration for reading the control file.
//!
//! Layers (later wins):
//! - defaults: data_dir = ".", control_file = "global/pg_control", no time budget;
//! - environment: ControlConfig::from_env();
//! - explicit overrides: fluent `with_*` setters or ControlConfigBuilder (CLI flags).
//!
//! Env:
//! - PGDATA               : data directory;
//! - PGCD_CONTROL_FILE    : control file location relative to the data directory
//!                           (absolute paths are used as is);
//! - PGCD_READ_TIMEOUT_MS : optional read time budget (0 or empty disables).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::consts::CONTROL_FILE_REL;

/// Configuration of one control-file read.
#[derive(Clone, Debug)]
pub struct ControlConfig {
    /// Data directory of the cluster.
    /// Env: PGDATA (default ".")
    pub data_dir: PathBuf,

    /// Control file location relative to `data_dir`.
    /// Env: PGCD_CONTROL_FILE (default "global/pg_control")
    pub control_file: PathBuf,

    /// Optional time budget for the read (ms). None = wait for the read to finish.
    /// Env: PGCD_READ_TIMEOUT_MS
    pub read_timeout_ms: Option<u64>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            control_file: PathBuf::from(CONTROL_FILE_REL),
            read_timeout_ms: None,
        }
    }
}

impl ControlConfig {
    /// Defaults for a given data directory (no env lookups).
    pub fn for_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("PGDATA") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.data_dir = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var("PGCD_CONTROL_FILE") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.control_file = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var("PGCD_READ_TIMEOUT_MS") {
            cfg.read_timeout_ms = parse_timeout_ms(&v);
        }

        cfg
    }

    pub fn with_data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_control_file<P: Into<PathBuf>>(mut self, rel: P) -> Self {
        self.control_file = rel.into();
        self
    }

    /// Some(0) is treated as "no budget".
    pub fn with_read_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.read_timeout_ms = ms.filter(|&n| n > 0);
        self
    }

    /// Full path of the control file (`control_file` may be absolute).
    pub fn control_path(&self) -> PathBuf {
        self.data_dir.join(&self.control_file)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn builder() -> ControlConfigBuilder {
        ControlConfigBuilder::new()
    }
}

fn parse_timeout_ms(v: &str) -> Option<u64> {
    v.trim().parse::<u64>().ok().filter(|&n| n > 0)
}

impl fmt::Display for ControlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ControlConfig {{ data_dir: {}, control_file: {}, read_timeout_ms: {} }}",
            self.data_dir.display(),
            self.control_file.display(),
            self.read_timeout_ms
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string()),
        )
    }
}

/// Builder that starts from the environment and applies explicit overrides.
#[derive(Clone, Debug)]
pub struct ControlConfigBuilder {
    cfg: ControlConfig,
}

impl Default for ControlConfigBuilder {
    fn default() -> Self {
        Self {
            cfg: ControlConfig::from_env(),
        }
    }
}

impl ControlConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: ControlConfig::default(),
        }
    }

    pub fn data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cfg.data_dir = dir.into();
        self
    }

    pub fn control_file<P: Into<PathBuf>>(mut self, rel: P) -> Self {
        self.cfg.control_file = rel.into();
        self
    }

    pub fn read_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.cfg = self.cfg.with_read_timeout_ms(ms);
        self
    }

    pub fn build(self) -> ControlConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_location_is_global_pg_control() {
        let cfg = ControlConfig::for_data_dir("/srv/pg");
        assert_eq!(cfg.control_path(), PathBuf::from("/srv/pg/global/pg_control"));
        assert!(cfg.read_timeout().is_none());
    }

    #[test]
    fn overrides_apply() {
        let cfg = ControlConfigBuilder::from_default()
            .data_dir("/d")
            .control_file("alt/ctl")
            .read_timeout_ms(Some(250))
            .build();
        assert_eq!(cfg.control_path(), PathBuf::from("/d/alt/ctl"));
        assert_eq!(cfg.read_timeout(), Some(Duration::from_millis(250)));

        let off = cfg.with_read_timeout_ms(Some(0));
        assert!(off.read_timeout_ms.is_none());
    }

    #[test]
    fn timeout_parsing() {
        assert_eq!(parse_timeout_ms(" 100 "), Some(100));
        assert_eq!(parse_timeout_ms("0"), None);
        assert_eq!(parse_timeout_ms("abc"), None);
    }
}
