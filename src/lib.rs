// Базовые модули
pub mod consts;
pub mod checksum;
pub mod error;
pub mod config;

// pg_control: запись, чтение, декодирование
pub mod control; // src/control/{mod,record,reader,decode}.rs

// CLI-хост (используется бинарником)
pub mod cli;

// Удобные реэкспорты
pub use config::{ControlConfig, ControlConfigBuilder};
pub use control::{
    control_data, decode, decode_bytes, decode_extended, read_control_file, read_control_record,
    read_control_record_with, ControlRecord, DbState, FieldEntry, LogPointer,
};
pub use error::{ControlError, ControlResult, IoErrorKind};
