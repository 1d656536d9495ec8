//! control/record: типизированное представление pg_control (версия 903).
//!
//! Разбор идёт поле за полем через курсор: ширина и нативный порядок байт
//! заданы явно, выравнивающие паддинги пропускаются явно, позиция курсора
//! сверяется с закреплёнными смещениями из `consts`. Никакого наложения
//! структуры на буфер.
//!
//! Порядок проверок в `ControlRecord::from_bytes`:
//! 1) длина >= CONTROL_RECORD_SIZE, иначе MalformedRecord;
//! 2) CRC по [0 .. CRC_OFFSET) == сохранённому, иначе Checksum;
//! 3) разбор полей (позиции == смещениям);
//! 4) pg_control_version == 903, иначе UnsupportedVersion.
//!
//! CRC проверяется раньше версии: любой испорченный бит до поля CRC даёт
//! Checksum, а не "неизвестная версия".

use std::fmt;
use std::io::Cursor;

use byteorder::{ByteOrder, NativeEndian, ReadBytesExt};
use log::warn;

use crate::checksum::legacy_crc32;
use crate::consts::*;
use crate::error::{ControlError, ControlResult};

// ---------------- LogPointer ----------------

/// Позиция в WAL: (xlogid, xrecoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogPointer {
    pub xlogid: u32,
    pub xrecoff: u32,
}

impl LogPointer {
    pub const fn new(xlogid: u32, xrecoff: u32) -> Self {
        Self { xlogid, xrecoff }
    }
}

impl fmt::Display for LogPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:X}", self.xlogid, self.xrecoff)
    }
}

// ---------------- DbState ----------------

/// Cluster state. Unknown values are kept as `Unrecognized` and never fail decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbState {
    StartingUp,
    ShutDown,
    ShuttingDown,
    InCrashRecovery,
    InArchiveRecovery,
    InProduction,
    Unrecognized(i32),
}

impl DbState {
    pub fn from_raw(v: i32) -> Self {
        match v {
            0 => DbState::StartingUp,
            1 => DbState::ShutDown,
            2 => DbState::ShuttingDown,
            3 => DbState::InCrashRecovery,
            4 => DbState::InArchiveRecovery,
            5 => DbState::InProduction,
            other => DbState::Unrecognized(other),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            DbState::StartingUp => 0,
            DbState::ShutDown => 1,
            DbState::ShuttingDown => 2,
            DbState::InCrashRecovery => 3,
            DbState::InArchiveRecovery => 4,
            DbState::InProduction => 5,
            DbState::Unrecognized(v) => v,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DbState::StartingUp => "starting up",
            DbState::ShutDown => "shut down",
            DbState::ShuttingDown => "shutting down",
            DbState::InCrashRecovery => "in crash recovery",
            DbState::InArchiveRecovery => "in archive recovery",
            DbState::InProduction => "in production",
            DbState::Unrecognized(_) => "unrecognized status code",
        }
    }
}

impl fmt::Display for DbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------- WalLevel ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalLevel {
    Minimal,
    Archive,
    HotStandby,
    Unrecognized(i32),
}

impl WalLevel {
    pub fn from_raw(v: i32) -> Self {
        match v {
            0 => WalLevel::Minimal,
            1 => WalLevel::Archive,
            2 => WalLevel::HotStandby,
            other => WalLevel::Unrecognized(other),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            WalLevel::Minimal => 0,
            WalLevel::Archive => 1,
            WalLevel::HotStandby => 2,
            WalLevel::Unrecognized(v) => v,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WalLevel::Minimal => "minimal",
            WalLevel::Archive => "archive",
            WalLevel::HotStandby => "hot_standby",
            WalLevel::Unrecognized(_) => "unrecognized wal_level",
        }
    }
}

impl fmt::Display for WalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------- CheckPoint copy ----------------

/// Копия последней checkpoint-записи (56 байт в формате 903).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckPoint {
    pub redo: LogPointer,
    pub this_timeline_id: u32,
    pub next_xid_epoch: u32,
    pub next_xid: u32,
    pub next_oid: u32,
    pub next_multi: u32,
    pub next_multi_offset: u32,
    pub oldest_xid: u32,
    pub oldest_xid_db: u32,
    /// Unix seconds.
    pub time: i64,
    pub oldest_active_xid: u32,
}

impl CheckPoint {
    fn read(c: &mut FieldCursor<'_>) -> ControlResult<Self> {
        let base = OFF_CHECKPOINT_COPY;

        c.at(base + CKPT_OFF_REDO)?;
        let redo = c.log_pointer()?;
        c.at(base + CKPT_OFF_TIMELINE)?;
        let this_timeline_id = c.u32()?;
        c.at(base + CKPT_OFF_NEXT_XID_EPOCH)?;
        let next_xid_epoch = c.u32()?;
        c.at(base + CKPT_OFF_NEXT_XID)?;
        let next_xid = c.u32()?;
        c.at(base + CKPT_OFF_NEXT_OID)?;
        let next_oid = c.u32()?;
        c.at(base + CKPT_OFF_NEXT_MULTI)?;
        let next_multi = c.u32()?;
        c.at(base + CKPT_OFF_NEXT_MULTI_OFFSET)?;
        let next_multi_offset = c.u32()?;
        c.at(base + CKPT_OFF_OLDEST_XID)?;
        let oldest_xid = c.u32()?;
        c.at(base + CKPT_OFF_OLDEST_XID_DB)?;
        let oldest_xid_db = c.u32()?;
        c.at(base + CKPT_OFF_TIME)?;
        let time = c.i64()?;
        c.at(base + CKPT_OFF_OLDEST_ACTIVE_XID)?;
        let oldest_active_xid = c.u32()?;
        c.pad(4)?; // хвостовое выравнивание CheckPoint до 8
        c.at(base + CHECKPOINT_SIZE)?;

        Ok(Self {
            redo,
            this_timeline_id,
            next_xid_epoch,
            next_xid,
            next_oid,
            next_multi,
            next_multi_offset,
            oldest_xid,
            oldest_xid_db,
            time,
            oldest_active_xid,
        })
    }

    fn write(&self, buf: &mut [u8]) {
        let b = OFF_CHECKPOINT_COPY;
        put_log_pointer(buf, b + CKPT_OFF_REDO, self.redo);
        put_u32(buf, b + CKPT_OFF_TIMELINE, self.this_timeline_id);
        put_u32(buf, b + CKPT_OFF_NEXT_XID_EPOCH, self.next_xid_epoch);
        put_u32(buf, b + CKPT_OFF_NEXT_XID, self.next_xid);
        put_u32(buf, b + CKPT_OFF_NEXT_OID, self.next_oid);
        put_u32(buf, b + CKPT_OFF_NEXT_MULTI, self.next_multi);
        put_u32(buf, b + CKPT_OFF_NEXT_MULTI_OFFSET, self.next_multi_offset);
        put_u32(buf, b + CKPT_OFF_OLDEST_XID, self.oldest_xid);
        put_u32(buf, b + CKPT_OFF_OLDEST_XID_DB, self.oldest_xid_db);
        NativeEndian::write_i64(&mut buf[b + CKPT_OFF_TIME..b + CKPT_OFF_TIME + 8], self.time);
        put_u32(buf, b + CKPT_OFF_OLDEST_ACTIVE_XID, self.oldest_active_xid);
    }
}

// ---------------- ControlRecord ----------------

/// Validated contents of one pg_control file.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlRecord {
    pub system_identifier: u64,
    pub pg_control_version: u32,
    pub catalog_version_no: u32,
    pub state: DbState,
    /// Last pg_control update, Unix seconds.
    pub time: i64,
    pub checkpoint: LogPointer,
    pub prev_checkpoint: LogPointer,
    pub checkpoint_copy: CheckPoint,
    pub min_recovery_point: LogPointer,
    pub backup_start_point: LogPointer,
    pub wal_level: WalLevel,
    pub max_connections: i32,
    pub max_prepared_xacts: i32,
    pub max_locks_per_xact: i32,
    pub max_align: u32,
    pub float_format: f64,
    pub blcksz: u32,
    pub relseg_size: u32,
    pub xlog_blcksz: u32,
    pub xlog_seg_size: u32,
    pub name_data_len: u32,
    pub index_max_keys: u32,
    pub toast_max_chunk_size: u32,
    pub enable_int_times: bool,
    pub float4_by_val: bool,
    pub float8_by_val: bool,
    /// Stored CRC as found in the file.
    pub crc: u32,
}

impl Default for ControlRecord {
    fn default() -> Self {
        Self {
            system_identifier: 0,
            pg_control_version: PG_CONTROL_VERSION,
            catalog_version_no: 201008051,
            state: DbState::ShutDown,
            time: 0,
            checkpoint: LogPointer::default(),
            prev_checkpoint: LogPointer::default(),
            checkpoint_copy: CheckPoint {
                this_timeline_id: 1,
                ..CheckPoint::default()
            },
            min_recovery_point: LogPointer::default(),
            backup_start_point: LogPointer::default(),
            wal_level: WalLevel::Minimal,
            max_connections: 100,
            max_prepared_xacts: 0,
            max_locks_per_xact: 64,
            max_align: 8,
            float_format: FLOAT_FORMAT_VALUE,
            blcksz: 8192,
            relseg_size: 131072,
            xlog_blcksz: 8192,
            xlog_seg_size: 16 * 1024 * 1024,
            name_data_len: 64,
            index_max_keys: 32,
            toast_max_chunk_size: 1996,
            enable_int_times: true,
            float4_by_val: true,
            float8_by_val: true,
            crc: 0,
        }
    }
}

impl ControlRecord {
    /// Validate and decode a raw control record.
    ///
    /// Only the first `CONTROL_RECORD_SIZE` bytes are looked at; the on-disk file is
    /// usually padded further and the padding is ignored.
    pub fn from_bytes(raw: &[u8]) -> ControlResult<Self> {
        if raw.len() < CONTROL_RECORD_SIZE {
            return Err(ControlError::MalformedRecord {
                expected: CONTROL_RECORD_SIZE,
                actual: raw.len(),
            });
        }
        let rec = &raw[..CONTROL_RECORD_SIZE];

        verify_checksum(rec)?;

        let parsed = Self::parse_fields(rec)?;
        parsed.check_version()?;

        if parsed.float_format != FLOAT_FORMAT_VALUE {
            warn!(
                "pg_control float_format = {} (expected {}); float representation differs",
                parsed.float_format, FLOAT_FORMAT_VALUE
            );
        }
        Ok(parsed)
    }

    fn parse_fields(rec: &[u8]) -> ControlResult<Self> {
        let mut c = FieldCursor::new(rec);

        c.at(OFF_SYSTEM_IDENTIFIER)?;
        let system_identifier = c.u64()?;
        c.at(OFF_PG_CONTROL_VERSION)?;
        let pg_control_version = c.u32()?;
        c.at(OFF_CATALOG_VERSION_NO)?;
        let catalog_version_no = c.u32()?;
        c.at(OFF_STATE)?;
        let state = DbState::from_raw(c.i32()?);
        c.pad(4)?; // выравнивание pg_time_t
        c.at(OFF_TIME)?;
        let time = c.i64()?;

        c.at(OFF_CHECKPOINT)?;
        let checkpoint = c.log_pointer()?;
        c.at(OFF_PREV_CHECKPOINT)?;
        let prev_checkpoint = c.log_pointer()?;
        let checkpoint_copy = CheckPoint::read(&mut c)?;
        c.at(OFF_MIN_RECOVERY_POINT)?;
        let min_recovery_point = c.log_pointer()?;
        c.at(OFF_BACKUP_START_POINT)?;
        let backup_start_point = c.log_pointer()?;

        c.at(OFF_WAL_LEVEL)?;
        let wal_level = WalLevel::from_raw(c.i32()?);
        c.at(OFF_MAX_CONNECTIONS)?;
        let max_connections = c.i32()?;
        c.at(OFF_MAX_PREPARED_XACTS)?;
        let max_prepared_xacts = c.i32()?;
        c.at(OFF_MAX_LOCKS_PER_XACT)?;
        let max_locks_per_xact = c.i32()?;

        c.at(OFF_MAX_ALIGN)?;
        let max_align = c.u32()?;
        c.pad(4)?; // выравнивание double
        c.at(OFF_FLOAT_FORMAT)?;
        let float_format = c.f64()?;

        c.at(OFF_BLCKSZ)?;
        let blcksz = c.u32()?;
        c.at(OFF_RELSEG_SIZE)?;
        let relseg_size = c.u32()?;
        c.at(OFF_XLOG_BLCKSZ)?;
        let xlog_blcksz = c.u32()?;
        c.at(OFF_XLOG_SEG_SIZE)?;
        let xlog_seg_size = c.u32()?;
        c.at(OFF_NAME_DATA_LEN)?;
        let name_data_len = c.u32()?;
        c.at(OFF_INDEX_MAX_KEYS)?;
        let index_max_keys = c.u32()?;
        c.at(OFF_TOAST_MAX_CHUNK_SIZE)?;
        let toast_max_chunk_size = c.u32()?;

        c.at(OFF_ENABLE_INT_TIMES)?;
        let enable_int_times = c.flag()?;
        c.at(OFF_FLOAT4_BY_VAL)?;
        let float4_by_val = c.flag()?;
        c.at(OFF_FLOAT8_BY_VAL)?;
        let float8_by_val = c.flag()?;
        c.pad(1)?;

        c.at(CRC_OFFSET)?;
        let crc = c.u32()?;

        Ok(Self {
            system_identifier,
            pg_control_version,
            catalog_version_no,
            state,
            time,
            checkpoint,
            prev_checkpoint,
            checkpoint_copy,
            min_recovery_point,
            backup_start_point,
            wal_level,
            max_connections,
            max_prepared_xacts,
            max_locks_per_xact,
            max_align,
            float_format,
            blcksz,
            relseg_size,
            xlog_blcksz,
            xlog_seg_size,
            name_data_len,
            index_max_keys,
            toast_max_chunk_size,
            enable_int_times,
            float4_by_val,
            float8_by_val,
            crc,
        })
    }

    fn check_version(&self) -> ControlResult<()> {
        let found = self.pg_control_version;
        if found == PG_CONTROL_VERSION {
            return Ok(());
        }
        // Версия вида N*65536: типичный признак чужого порядка байт.
        let hint = if found % 65536 == 0 && found / 65536 != 0 {
            Some(
                "possible byte ordering mismatch: the file was probably written on a \
                 machine with different endianness"
                    .to_string(),
            )
        } else {
            None
        };
        Err(ControlError::UnsupportedVersion {
            found,
            expected: PG_CONTROL_VERSION,
            hint,
        })
    }

    /// Serialize into the pinned native layout and stamp a fresh CRC.
    /// The `crc` field of `self` is ignored. Padding bytes are zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; CONTROL_RECORD_SIZE];

        NativeEndian::write_u64(&mut buf[OFF_SYSTEM_IDENTIFIER..OFF_SYSTEM_IDENTIFIER + 8], self.system_identifier);
        put_u32(&mut buf, OFF_PG_CONTROL_VERSION, self.pg_control_version);
        put_u32(&mut buf, OFF_CATALOG_VERSION_NO, self.catalog_version_no);
        put_i32(&mut buf, OFF_STATE, self.state.as_raw());
        NativeEndian::write_i64(&mut buf[OFF_TIME..OFF_TIME + 8], self.time);
        put_log_pointer(&mut buf, OFF_CHECKPOINT, self.checkpoint);
        put_log_pointer(&mut buf, OFF_PREV_CHECKPOINT, self.prev_checkpoint);
        self.checkpoint_copy.write(&mut buf);
        put_log_pointer(&mut buf, OFF_MIN_RECOVERY_POINT, self.min_recovery_point);
        put_log_pointer(&mut buf, OFF_BACKUP_START_POINT, self.backup_start_point);
        put_i32(&mut buf, OFF_WAL_LEVEL, self.wal_level.as_raw());
        put_i32(&mut buf, OFF_MAX_CONNECTIONS, self.max_connections);
        put_i32(&mut buf, OFF_MAX_PREPARED_XACTS, self.max_prepared_xacts);
        put_i32(&mut buf, OFF_MAX_LOCKS_PER_XACT, self.max_locks_per_xact);
        put_u32(&mut buf, OFF_MAX_ALIGN, self.max_align);
        NativeEndian::write_f64(&mut buf[OFF_FLOAT_FORMAT..OFF_FLOAT_FORMAT + 8], self.float_format);
        put_u32(&mut buf, OFF_BLCKSZ, self.blcksz);
        put_u32(&mut buf, OFF_RELSEG_SIZE, self.relseg_size);
        put_u32(&mut buf, OFF_XLOG_BLCKSZ, self.xlog_blcksz);
        put_u32(&mut buf, OFF_XLOG_SEG_SIZE, self.xlog_seg_size);
        put_u32(&mut buf, OFF_NAME_DATA_LEN, self.name_data_len);
        put_u32(&mut buf, OFF_INDEX_MAX_KEYS, self.index_max_keys);
        put_u32(&mut buf, OFF_TOAST_MAX_CHUNK_SIZE, self.toast_max_chunk_size);
        buf[OFF_ENABLE_INT_TIMES] = self.enable_int_times as u8;
        buf[OFF_FLOAT4_BY_VAL] = self.float4_by_val as u8;
        buf[OFF_FLOAT8_BY_VAL] = self.float8_by_val as u8;

        let crc = legacy_crc32(&buf[..CRC_OFFSET]);
        put_u32(&mut buf, CRC_OFFSET, crc);
        buf
    }
}

/// Check the stored CRC of a raw record. Returns the (matching) CRC.
pub fn verify_checksum(rec: &[u8]) -> ControlResult<u32> {
    if rec.len() < CRC_OFFSET + 4 {
        return Err(ControlError::MalformedRecord {
            expected: CONTROL_RECORD_SIZE,
            actual: rec.len(),
        });
    }
    let stored = NativeEndian::read_u32(&rec[CRC_OFFSET..CRC_OFFSET + 4]);
    let calculated = legacy_crc32(&rec[..CRC_OFFSET]);
    if stored != calculated {
        return Err(ControlError::Checksum { stored, calculated });
    }
    Ok(stored)
}

// ---------------- Cursor ----------------

struct FieldCursor<'a> {
    rdr: Cursor<&'a [u8]>,
    len: usize,
}

impl<'a> FieldCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            len: buf.len(),
            rdr: Cursor::new(buf),
        }
    }

    #[inline]
    fn pos(&self) -> usize {
        self.rdr.position() as usize
    }

    /// Курсор обязан стоять ровно на ожидаемом смещении.
    fn at(&self, off: usize) -> ControlResult<()> {
        if self.pos() != off {
            return Err(ControlError::MalformedRecord {
                expected: off,
                actual: self.pos(),
            });
        }
        Ok(())
    }

    fn short(&self) -> ControlError {
        ControlError::MalformedRecord {
            expected: CONTROL_RECORD_SIZE,
            actual: self.len,
        }
    }

    fn pad(&mut self, n: usize) -> ControlResult<()> {
        let next = self.pos() + n;
        if next > self.len {
            return Err(self.short());
        }
        self.rdr.set_position(next as u64);
        Ok(())
    }

    fn u32(&mut self) -> ControlResult<u32> {
        self.rdr.read_u32::<NativeEndian>().map_err(|_| self.short())
    }

    fn i32(&mut self) -> ControlResult<i32> {
        self.rdr.read_i32::<NativeEndian>().map_err(|_| self.short())
    }

    fn u64(&mut self) -> ControlResult<u64> {
        self.rdr.read_u64::<NativeEndian>().map_err(|_| self.short())
    }

    fn i64(&mut self) -> ControlResult<i64> {
        self.rdr.read_i64::<NativeEndian>().map_err(|_| self.short())
    }

    fn f64(&mut self) -> ControlResult<f64> {
        self.rdr.read_f64::<NativeEndian>().map_err(|_| self.short())
    }

    fn flag(&mut self) -> ControlResult<bool> {
        self.rdr.read_u8().map(|b| b != 0).map_err(|_| self.short())
    }

    fn log_pointer(&mut self) -> ControlResult<LogPointer> {
        let xlogid = self.u32()?;
        let xrecoff = self.u32()?;
        Ok(LogPointer { xlogid, xrecoff })
    }
}

// ---------------- write helpers ----------------

#[inline]
fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    NativeEndian::write_u32(&mut buf[off..off + 4], v);
}

#[inline]
fn put_i32(buf: &mut [u8], off: usize, v: i32) {
    NativeEndian::write_i32(&mut buf[off..off + 4], v);
}

#[inline]
fn put_log_pointer(buf: &mut [u8], off: usize, p: LogPointer) {
    put_u32(buf, off, p.xlogid);
    put_u32(buf, off + 4, p.xrecoff);
}
