//! Константы формата pg_control (schema version 903, 64-bit ABI).
//!
//! Все смещения: от начала файла, порядок байт нативный (как у процесса,
//! записавшего файл). Выравнивание: u64/i64/f64: 8 байт, остальное: 4/1.

// -------- Location --------
/// Относительный путь control-файла внутри data directory.
pub const CONTROL_FILE_REL: &str = "global/pg_control";

// -------- Version gate --------
pub const PG_CONTROL_VERSION: u32 = 903;

// -------- Record geometry --------
// sizeof(ControlFileData) с хвостовым выравниванием до 8.
pub const CONTROL_RECORD_SIZE: usize = 192;
// offsetof(ControlFileData, crc): CRC считается по [0 .. CRC_OFFSET).
pub const CRC_OFFSET: usize = 184;

// Offsets (top level)
pub const OFF_SYSTEM_IDENTIFIER: usize = 0;
pub const OFF_PG_CONTROL_VERSION: usize = 8;
pub const OFF_CATALOG_VERSION_NO: usize = 12;
pub const OFF_STATE: usize = 16;
pub const OFF_TIME: usize = 24;
pub const OFF_CHECKPOINT: usize = 32;
pub const OFF_PREV_CHECKPOINT: usize = 40;
pub const OFF_CHECKPOINT_COPY: usize = 48;
pub const OFF_MIN_RECOVERY_POINT: usize = 104;
pub const OFF_BACKUP_START_POINT: usize = 112;
pub const OFF_WAL_LEVEL: usize = 120;
pub const OFF_MAX_CONNECTIONS: usize = 124;
pub const OFF_MAX_PREPARED_XACTS: usize = 128;
pub const OFF_MAX_LOCKS_PER_XACT: usize = 132;
pub const OFF_MAX_ALIGN: usize = 136;
pub const OFF_FLOAT_FORMAT: usize = 144;
pub const OFF_BLCKSZ: usize = 152;
pub const OFF_RELSEG_SIZE: usize = 156;
pub const OFF_XLOG_BLCKSZ: usize = 160;
pub const OFF_XLOG_SEG_SIZE: usize = 164;
pub const OFF_NAME_DATA_LEN: usize = 168;
pub const OFF_INDEX_MAX_KEYS: usize = 172;
pub const OFF_TOAST_MAX_CHUNK_SIZE: usize = 176;
pub const OFF_ENABLE_INT_TIMES: usize = 180;
pub const OFF_FLOAT4_BY_VAL: usize = 181;
pub const OFF_FLOAT8_BY_VAL: usize = 182;

// Offsets inside the checkpoint copy (relative to OFF_CHECKPOINT_COPY)
pub const CKPT_OFF_REDO: usize = 0;
pub const CKPT_OFF_TIMELINE: usize = 8;
pub const CKPT_OFF_NEXT_XID_EPOCH: usize = 12;
pub const CKPT_OFF_NEXT_XID: usize = 16;
pub const CKPT_OFF_NEXT_OID: usize = 20;
pub const CKPT_OFF_NEXT_MULTI: usize = 24;
pub const CKPT_OFF_NEXT_MULTI_OFFSET: usize = 28;
pub const CKPT_OFF_OLDEST_XID: usize = 32;
pub const CKPT_OFF_OLDEST_XID_DB: usize = 36;
pub const CKPT_OFF_TIME: usize = 40;
pub const CKPT_OFF_OLDEST_ACTIVE_XID: usize = 48;
// sizeof(CheckPoint) с хвостовым pad 4
pub const CHECKPOINT_SIZE: usize = 56;

// -------- Float format probe --------
// Значение, которое движок пишет в floatFormat; иное: несовместимый float.
pub const FLOAT_FORMAT_VALUE: f64 = 1234567.0;

// -------- Output literals --------
pub const INT_TIMES_TRUE: &str = "64-bit integers";
pub const INT_TIMES_FALSE: &str = "floating-point numbers";
pub const BY_VALUE: &str = "by value";
pub const BY_REFERENCE: &str = "by reference";

// Число полей в опубликованной таблице.
pub const FIELD_COUNT: usize = 30;
