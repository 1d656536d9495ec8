//! control/decode: ControlRecord -> упорядоченный список (name, setting).
//!
//! Порядок и текст меток фиксированы (LABELS) и являются частью контракта.
//! Каждый вызов строит новый Vec; общего изменяемого состояния нет.
//!
//! Время рендерится в локальной таймзоне процесса форматом "%c", поэтому два
//! процесса в разных таймзонах покажут одну и ту же запись по-разному.

use chrono::{Local, TimeZone};
use log::warn;
use serde::Serialize;

use super::record::ControlRecord;
use crate::consts::{BY_REFERENCE, BY_VALUE, FIELD_COUNT, INT_TIMES_FALSE, INT_TIMES_TRUE};
use crate::error::ControlResult;

/// One published (label, formatted value) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub name: &'static str,
    pub setting: String,
}

impl FieldEntry {
    fn new(name: &'static str, setting: impl Into<String>) -> Self {
        Self {
            name,
            setting: setting.into(),
        }
    }
}

/// Published labels, in output order.
pub const LABELS: [&str; FIELD_COUNT] = [
    "pg_control version number",
    "Catalog version number",
    "Database system identifier",
    "Database cluster state",
    "pg_control last modified",
    "Latest checkpoint location",
    "Prior checkpoint location",
    "Latest checkpoint's REDO location",
    "Latest checkpoint's TimeLineID",
    "Latest checkpoint's NextXID",
    "Latest checkpoint's NextOID",
    "Latest checkpoint's NextMultiXactId",
    "Latest checkpoint's NextMultiOffset",
    "Latest checkpoint's oldestXID",
    "Latest checkpoint's oldestXID's DB",
    "Latest checkpoint's oldestActiveXID",
    "Time of latest checkpoint",
    "Minimum recovery ending location",
    "Backup start location",
    "Maximum data alignment",
    "Database block size",
    "Blocks per segment of large relation",
    "WAL block size",
    "Bytes per WAL segment",
    "Maximum length of identifiers",
    "Maximum columns in an index",
    "Maximum size of a TOAST chunk",
    "Date/time type storage",
    "Float4 argument passing",
    "Float8 argument passing",
];

/// Labels appended by `decode_extended`.
pub const EXTENDED_LABELS: [&str; 4] = [
    "Current wal_level setting",
    "Current max_connections setting",
    "Current max_prepared_xacts setting",
    "Current max_locks_per_xact setting",
];

/// Decode a validated record into exactly `FIELD_COUNT` entries, in published order.
pub fn decode(record: &ControlRecord) -> Vec<FieldEntry> {
    let ck = &record.checkpoint_copy;

    let settings: [String; FIELD_COUNT] = [
        record.pg_control_version.to_string(),
        record.catalog_version_no.to_string(),
        record.system_identifier.to_string(),
        record.state.to_string(),
        format_timestamp(record.time),
        record.checkpoint.to_string(),
        record.prev_checkpoint.to_string(),
        ck.redo.to_string(),
        ck.this_timeline_id.to_string(),
        format!("{}/{}", ck.next_xid_epoch, ck.next_xid),
        ck.next_oid.to_string(),
        ck.next_multi.to_string(),
        ck.next_multi_offset.to_string(),
        ck.oldest_xid.to_string(),
        ck.oldest_xid_db.to_string(),
        ck.oldest_active_xid.to_string(),
        format_timestamp(ck.time),
        record.min_recovery_point.to_string(),
        record.backup_start_point.to_string(),
        record.max_align.to_string(),
        record.blcksz.to_string(),
        record.relseg_size.to_string(),
        record.xlog_blcksz.to_string(),
        record.xlog_seg_size.to_string(),
        record.name_data_len.to_string(),
        record.index_max_keys.to_string(),
        record.toast_max_chunk_size.to_string(),
        flag_str(record.enable_int_times, INT_TIMES_TRUE, INT_TIMES_FALSE).to_string(),
        flag_str(record.float4_by_val, BY_VALUE, BY_REFERENCE).to_string(),
        flag_str(record.float8_by_val, BY_VALUE, BY_REFERENCE).to_string(),
    ];

    LABELS
        .into_iter()
        .zip(settings)
        .map(|(name, setting)| FieldEntry::new(name, setting))
        .collect()
}

/// The published entries followed by the server settings recorded in the file.
pub fn decode_extended(record: &ControlRecord) -> Vec<FieldEntry> {
    let mut out = decode(record);
    out.reserve(EXTENDED_LABELS.len());
    out.push(FieldEntry::new(EXTENDED_LABELS[0], record.wal_level.as_str()));
    out.push(FieldEntry::new(EXTENDED_LABELS[1], record.max_connections.to_string()));
    out.push(FieldEntry::new(EXTENDED_LABELS[2], record.max_prepared_xacts.to_string()));
    out.push(FieldEntry::new(EXTENDED_LABELS[3], record.max_locks_per_xact.to_string()));
    out
}

/// Validate raw bytes (size, CRC, version) and decode. All-or-nothing.
pub fn decode_bytes(raw: &[u8]) -> ControlResult<Vec<FieldEntry>> {
    let record = ControlRecord::from_bytes(raw)?;
    Ok(decode(&record))
}

/// Unix seconds -> local calendar time, "%c".
///
/// Values chrono cannot represent are rendered as the raw seconds count.
pub fn format_timestamp(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).earliest() {
        Some(dt) => dt.format("%c").to_string(),
        None => {
            warn!("timestamp {} is outside the representable range", secs);
            secs.to_string()
        }
    }
}

#[inline]
fn flag_str(on: bool, yes: &'static str, no: &'static str) -> &'static str {
    if on {
        yes
    } else {
        no
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::record::{DbState, LogPointer, WalLevel};

    fn setting<'a>(out: &'a [FieldEntry], name: &str) -> &'a str {
        out.iter()
            .find(|e| e.name == name)
            .map(|e| e.setting.as_str())
            .unwrap_or_else(|| panic!("missing field {name}"))
    }

    #[test]
    fn thirty_entries_in_published_order() {
        let out = decode(&ControlRecord::default());
        assert_eq!(out.len(), FIELD_COUNT);
        for (e, label) in out.iter().zip(LABELS.iter()) {
            assert_eq!(e.name, *label);
        }
        assert_eq!(out[0].setting, "903");
        assert_eq!(out[3].setting, "shut down");
    }

    #[test]
    fn next_xid_is_decimal_epoch_slash_xid() {
        let mut rec = ControlRecord::default();
        rec.checkpoint_copy.next_xid_epoch = 2;
        rec.checkpoint_copy.next_xid = 4_000_000_000;
        let out = decode(&rec);
        assert_eq!(setting(&out, "Latest checkpoint's NextXID"), "2/4000000000");
    }

    #[test]
    fn log_pointers_are_upper_hex_unpadded() {
        let rec = ControlRecord {
            checkpoint: LogPointer::new(0x1, 0x2A),
            prev_checkpoint: LogPointer::new(0xAB, 0xCDEF0),
            min_recovery_point: LogPointer::new(0, 0),
            ..ControlRecord::default()
        };
        let out = decode(&rec);
        assert_eq!(setting(&out, "Latest checkpoint location"), "1/2A");
        assert_eq!(setting(&out, "Prior checkpoint location"), "AB/CDEF0");
        assert_eq!(setting(&out, "Minimum recovery ending location"), "0/0");
    }

    #[test]
    fn unknown_state_falls_back() {
        let rec = ControlRecord {
            state: DbState::from_raw(77),
            ..ControlRecord::default()
        };
        let out = decode(&rec);
        assert_eq!(setting(&out, "Database cluster state"), "unrecognized status code");
    }

    #[test]
    fn extended_appends_settings() {
        let rec = ControlRecord {
            wal_level: WalLevel::Archive,
            max_connections: 250,
            ..ControlRecord::default()
        };
        let out = decode_extended(&rec);
        assert_eq!(out.len(), FIELD_COUNT + EXTENDED_LABELS.len());
        assert_eq!(setting(&out, "Current wal_level setting"), "archive");
        assert_eq!(setting(&out, "Current max_connections setting"), "250");
        assert_eq!(out[..FIELD_COUNT], decode(&rec)[..]);
    }

    #[test]
    fn timestamp_uses_local_c_format() {
        let secs = 1_283_000_000;
        let expect = Local.timestamp_opt(secs, 0).earliest().unwrap().format("%c").to_string();
        assert_eq!(format_timestamp(secs), expect);
    }

    #[test]
    fn timestamp_out_of_range_does_not_panic() {
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }

    #[test]
    fn entries_serialize_as_name_setting() {
        let e = FieldEntry::new("Database block size", "8192");
        let s = serde_json::to_string(&e).unwrap();
        assert_eq!(s, r#"{"name":"Database block size","setting":"8192"}"#);
    }
}
