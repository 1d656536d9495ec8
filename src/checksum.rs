//! checksum: CRC-32 движка в варианте до 9.5 ("legacy").
//!
//! Параметры (бит-в-бит как INIT_CRC32/COMP_CRC32/FIN_CRC32 формата 903):
//! - таблица: отражённая CRC-32 таблица для полинома 0xEDB88320 (как у zlib);
//! - init = 0xFFFFFFFF, final xor = 0xFFFFFFFF;
//! - шаг: `crc = TABLE[((crc >> 24) ^ b) & 0xFF] ^ (crc << 8)`.
//!
//! Шаг сдвигает влево при отражённой таблице, поэтому результат НЕ совпадает
//! с CRC-32/ISO-HDLC (crc32fast, zlib). Например, для "123456789":
//! legacy = 0xC40ED0B0, ISO-HDLC = 0xCBF43926.

const POLY_REFLECTED: u32 = 0xEDB8_8320;

static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { POLY_REFLECTED ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// Инкрементальный расчёт legacy CRC-32.
#[derive(Debug, Clone, Copy)]
pub struct LegacyCrc32 {
    crc: u32,
}

impl Default for LegacyCrc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyCrc32 {
    #[inline]
    pub fn new() -> Self {
        Self { crc: 0xFFFF_FFFF }
    }

    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        let mut crc = self.crc;
        for &b in bytes {
            let idx = ((crc >> 24) ^ b as u32) & 0xFF;
            crc = TABLE[idx as usize] ^ (crc << 8);
        }
        self.crc = crc;
    }

    #[inline]
    pub fn finalize(self) -> u32 {
        self.crc ^ 0xFFFF_FFFF
    }
}

/// One-shot legacy CRC-32 over `bytes`.
#[inline]
pub fn legacy_crc32(bytes: &[u8]) -> u32 {
    let mut h = LegacyCrc32::new();
    h.update(bytes);
    h.finalize()
}
