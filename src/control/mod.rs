//! control: чтение и разбор pg_control.
//!
//! - record: типизированная запись + курсорный разбор + проверка CRC/версии;
//! - reader: файл -> ControlRecord (read-only, без блокировок, опц. бюджет времени);
//! - decode: ControlRecord -> Vec<FieldEntry> (30 опубликованных полей).

pub mod decode;
pub mod reader;
pub mod record;

pub use decode::{
    decode, decode_bytes, decode_extended, format_timestamp, FieldEntry, EXTENDED_LABELS, LABELS,
};
pub use reader::{read_control_file, read_control_record, read_control_record_with};
pub use record::{verify_checksum, CheckPoint, ControlRecord, DbState, LogPointer, WalLevel};

use crate::config::ControlConfig;
use crate::error::ControlResult;

/// Read + decode in one call: the published pairs or a typed failure, never partial output.
pub fn control_data(cfg: &ControlConfig) -> ControlResult<Vec<FieldEntry>> {
    let record = read_control_record_with(cfg)?;
    Ok(decode(&record))
}
