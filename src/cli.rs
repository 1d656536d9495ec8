//! cli: хост для бинарника: разбор аргументов, чтение pg_control, вывод.
//!
//! Примеры:
//!   pg_controldata show --path /var/lib/pgsql/data
//!   pg_controldata show --json --extended          (data dir из PGDATA)
//!   pg_controldata check --path ./data --timeout-ms 500

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::config::{ControlConfig, ControlConfigBuilder};
use crate::control::{decode, decode_extended, read_control_record_with, FieldEntry};
use crate::error::ControlError;

#[derive(Parser, Debug)]
#[command(
    name = "pg_controldata",
    version,
    about = "Verify and decode a PostgreSQL global/pg_control file",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Print the decoded control file settings
    Show {
        /// Data directory (default: $PGDATA, then ".")
        #[arg(long, short = 'D')]
        path: Option<PathBuf>,
        /// Control file location relative to the data directory
        #[arg(long)]
        control_file: Option<PathBuf>,
        /// Read time budget in milliseconds (0 = none)
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// JSON output (array of {"name","setting"})
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Also print wal_level / max_connections / ... recorded in the file
        #[arg(long, default_value_t = false)]
        extended: bool,
    },
    /// Only validate size, CRC and version
    Check {
        #[arg(long, short = 'D')]
        path: Option<PathBuf>,
        #[arg(long)]
        control_file: Option<PathBuf>,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

/// Parse args from the process and run.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    run_with(cli)
}

pub fn run_with(cli: Cli) -> Result<()> {
    match cli.cmd {
        Cmd::Show {
            path,
            control_file,
            timeout_ms,
            json,
            extended,
        } => {
            let cfg = build_config(path, control_file, timeout_ms);
            let out = show(&cfg, extended)?;
            let stdout = std::io::stdout();
            let mut w = stdout.lock();
            if json {
                let s = serde_json::to_string_pretty(&out).context("serialize settings")?;
                writeln!(w, "{}", s)?;
            } else {
                write_text(&mut w, &out)?;
            }
            Ok(())
        }
        Cmd::Check {
            path,
            control_file,
            timeout_ms,
        } => {
            let cfg = build_config(path, control_file, timeout_ms);
            let rec = read_control_record_with(&cfg)
                .with_context(|| format!("check {}", cfg.control_path().display()))?;
            println!(
                "ok: {} (version {}, crc {:#010x})",
                cfg.control_path().display(),
                rec.pg_control_version,
                rec.crc
            );
            Ok(())
        }
    }
}

fn build_config(
    path: Option<PathBuf>,
    control_file: Option<PathBuf>,
    timeout_ms: Option<u64>,
) -> ControlConfig {
    // env -> флаги CLI поверх
    let mut b = ControlConfigBuilder::new();
    if let Some(p) = path {
        b = b.data_dir(p);
    }
    if let Some(cf) = control_file {
        b = b.control_file(cf);
    }
    if timeout_ms.is_some() {
        b = b.read_timeout_ms(timeout_ms);
    }
    let cfg = b.build();
    log::debug!("{}", cfg);
    cfg
}

fn show(cfg: &ControlConfig, extended: bool) -> Result<Vec<FieldEntry>> {
    let rec = read_control_record_with(cfg)
        .with_context(|| format!("read {}", cfg.control_path().display()))?;
    Ok(if extended {
        decode_extended(&rec)
    } else {
        decode(&rec)
    })
}

/// pg_controldata-style text: "<label>:" padded to a common column, then the value.
pub fn write_text<W: Write>(w: &mut W, entries: &[FieldEntry]) -> std::io::Result<()> {
    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0) + 2;
    for e in entries {
        let label = format!("{}:", e.name);
        writeln!(w, "{:<width$}{}", label, e.setting, width = width)?;
    }
    Ok(())
}

/// true if the root cause is worth retrying (torn read, read timeout).
pub fn is_retryable(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|c| c.downcast_ref::<ControlError>())
        .any(ControlError::is_retryable)
}
