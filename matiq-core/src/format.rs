//! Формат контейнера MAT Level 5
//!
//! Файл начинается с 128-байтного заголовка, за которым следуют элементы
//! данных (тег 8 байт + полезная нагрузка, выровненная на 8 байт). Порядок
//! байт всех чисел задаётся индикатором в конце заголовка.
//!
//! ```text
//! [0..116)   TEXT            текстовое описание ("MATLAB 5.0 MAT-file, ...")
//! [116..124) SUBSYS_OFFSET   смещение данных подсистемы (обычно 0)
//! [124..126) VERSION         0x0100
//! [126..128) ENDIAN          b"IM" little-endian, b"MI" big-endian
//! ```

use log::debug;
use matiq_types::{ConvertError, ConvertResult};

use crate::binary::{read_u16_local, read_u64_local, write_u16_local, write_u64_local};

/// Размер фиксированного заголовка (128 байт)
pub const MAT_HEADER_SIZE: usize = 128;

/// Размер текстовой части заголовка
pub const MAT_TEXT_SIZE: usize = 116;

/// Версия формата Level 5
pub const MAT_VERSION_5: u16 = 0x0100;

/// Версия 7.3 (контейнер HDF5)
pub const MAT_VERSION_73: u16 = 0x0200;

/// Размер тега элемента данных
pub const MAT_TAG_SIZE: usize = 8;

/// Выравнивание элементов данных
pub const MAT_ALIGNMENT: usize = 8;

/// Бит комплексного массива в первом слове Array Flags
pub const ARRAY_FLAG_COMPLEX: u32 = 0x0800;

const MAT_TEXT_PREFIX: &[u8] = b"MATLAB";

/// Заголовок MAT-файла.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatHeader {
    /// Текстовое описание (без завершающих пробелов и нулей)
    pub text: String,
    /// Смещение данных подсистемы
    pub subsys_offset: u64,
    /// Версия формата
    pub version: u16,
    /// Порядок байт файла
    pub is_le: bool,
}

impl MatHeader {
    /// Заголовок Level 5, little-endian.
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            subsys_offset: 0,
            version: MAT_VERSION_5,
            is_le: true,
        }
    }

    /// Сериализация заголовка в 128 байт
    pub fn serialize(&self) -> [u8; MAT_HEADER_SIZE] {
        let mut buf = [b' '; MAT_HEADER_SIZE];

        let text = self.text.as_bytes();
        let n = text.len().min(MAT_TEXT_SIZE);
        buf[..n].copy_from_slice(&text[..n]);

        let mut off = MAT_TEXT_SIZE;
        write_u64_local(&mut buf, &mut off, self.is_le, self.subsys_offset);
        write_u16_local(&mut buf, &mut off, self.is_le, self.version);

        let endian = if self.is_le { b"IM" } else { b"MI" };
        buf[off..off + 2].copy_from_slice(endian);

        buf
    }

    /// Десериализация и валидация заголовка
    pub fn deserialize(buf: &[u8]) -> ConvertResult<Self> {
        if buf.len() < MAT_HEADER_SIZE {
            return Err(ConvertError::parse(format!(
                "File too short for a MAT header: {} bytes",
                buf.len()
            )));
        }

        let is_le = match &buf[126..128] {
            b"IM" => true,
            b"MI" => false,
            other => {
                return Err(ConvertError::parse(format!(
                    "Invalid endian indicator: {other:02x?}"
                )))
            }
        };

        let mut off = MAT_TEXT_SIZE;
        let subsys_offset = read_u64_local(buf, &mut off, is_le);
        let version = read_u16_local(buf, &mut off, is_le);

        match version {
            MAT_VERSION_5 => {}
            MAT_VERSION_73 => {
                return Err(ConvertError::parse(
                    "MAT v7.3 (HDF5) containers are not supported",
                ))
            }
            v => {
                return Err(ConvertError::parse(format!(
                    "Unsupported MAT version: 0x{v:04x}"
                )))
            }
        }

        // Текст произвольный, формат задают версия и индикатор порядка байт
        if !buf.starts_with(MAT_TEXT_PREFIX) {
            debug!("Header text does not start with 'MATLAB'");
        }

        let text = String::from_utf8_lossy(&buf[..MAT_TEXT_SIZE])
            .trim_end_matches(&[' ', '\0'][..])
            .to_string();

        Ok(Self {
            text,
            subsys_offset,
            version,
            is_le,
        })
    }
}

impl Default for MatHeader {
    fn default() -> Self {
        Self::new(format!(
            "MATLAB 5.0 MAT-file, Platform: {}, Created by: matiq {}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        ))
    }
}

/// Количество байт выравнивания до границы 8 байт
pub fn padding_for(len: usize) -> usize {
    (MAT_ALIGNMENT - len % MAT_ALIGNMENT) % MAT_ALIGNMENT
}
