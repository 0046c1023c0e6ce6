use crate::{ConvertError, ConvertResult};

/// Тип данных элемента MAT Level 5 (поле `type` в теге элемента)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MatDataType {
    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Single = 7,
    Double = 9,
    Int64 = 12,
    UInt64 = 13,
    /// Вложенная матрица (массив, ячейка, структура)
    Matrix = 14,
    /// zlib-сжатый элемент
    Compressed = 15,
    Utf8 = 16,
    Utf16 = 17,
    Utf32 = 18,
}

impl MatDataType {
    pub fn from_u32(v: u32) -> ConvertResult<Self> {
        match v {
            1 => Ok(MatDataType::Int8),
            2 => Ok(MatDataType::UInt8),
            3 => Ok(MatDataType::Int16),
            4 => Ok(MatDataType::UInt16),
            5 => Ok(MatDataType::Int32),
            6 => Ok(MatDataType::UInt32),
            7 => Ok(MatDataType::Single),
            9 => Ok(MatDataType::Double),
            12 => Ok(MatDataType::Int64),
            13 => Ok(MatDataType::UInt64),
            14 => Ok(MatDataType::Matrix),
            15 => Ok(MatDataType::Compressed),
            16 => Ok(MatDataType::Utf8),
            17 => Ok(MatDataType::Utf16),
            18 => Ok(MatDataType::Utf32),
            _ => Err(ConvertError::Parse(format!("Unknown MAT data type: {v}"))),
        }
    }

    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// Размер одного значения в байтах (0 для составных типов)
    pub fn element_size(&self) -> usize {
        match self {
            MatDataType::Int8 | MatDataType::UInt8 | MatDataType::Utf8 => 1,
            MatDataType::Int16 | MatDataType::UInt16 | MatDataType::Utf16 => 2,
            MatDataType::Int32
            | MatDataType::UInt32
            | MatDataType::Single
            | MatDataType::Utf32 => 4,
            MatDataType::Double | MatDataType::Int64 | MatDataType::UInt64 => 8,
            MatDataType::Matrix | MatDataType::Compressed => 0,
        }
    }

    /// Числовой тип, значения которого можно расширить до f64
    pub fn is_numeric(&self) -> bool {
        !matches!(
            self,
            MatDataType::Matrix
                | MatDataType::Compressed
                | MatDataType::Utf8
                | MatDataType::Utf16
                | MatDataType::Utf32
        )
    }
}
