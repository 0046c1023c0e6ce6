use crate::{ConvertError, ConvertResult};

/// Класс MATLAB-массива (младший байт первого слова Array Flags)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MatClass {
    Cell = 1,
    Struct = 2,
    Object = 3,
    Char = 4,
    Sparse = 5,
    Double = 6,
    Single = 7,
    Int8 = 8,
    UInt8 = 9,
    Int16 = 10,
    UInt16 = 11,
    Int32 = 12,
    UInt32 = 13,
    Int64 = 14,
    UInt64 = 15,
    Function = 16,
    Opaque = 17,
}

impl MatClass {
    pub fn from_u8(v: u8) -> ConvertResult<Self> {
        match v {
            1 => Ok(MatClass::Cell),
            2 => Ok(MatClass::Struct),
            3 => Ok(MatClass::Object),
            4 => Ok(MatClass::Char),
            5 => Ok(MatClass::Sparse),
            6 => Ok(MatClass::Double),
            7 => Ok(MatClass::Single),
            8 => Ok(MatClass::Int8),
            9 => Ok(MatClass::UInt8),
            10 => Ok(MatClass::Int16),
            11 => Ok(MatClass::UInt16),
            12 => Ok(MatClass::Int32),
            13 => Ok(MatClass::UInt32),
            14 => Ok(MatClass::Int64),
            15 => Ok(MatClass::UInt64),
            16 => Ok(MatClass::Function),
            17 => Ok(MatClass::Opaque),
            _ => Err(ConvertError::Parse(format!("Unknown MAT array class: {v}"))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Числовые классы (double, single, целые)
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            MatClass::Double
                | MatClass::Single
                | MatClass::Int8
                | MatClass::UInt8
                | MatClass::Int16
                | MatClass::UInt16
                | MatClass::Int32
                | MatClass::UInt32
                | MatClass::Int64
                | MatClass::UInt64
        )
    }
}

impl std::fmt::Display for MatClass {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            MatClass::Cell => "cell",
            MatClass::Struct => "struct",
            MatClass::Object => "object",
            MatClass::Char => "char",
            MatClass::Sparse => "sparse",
            MatClass::Double => "double",
            MatClass::Single => "single",
            MatClass::Int8 => "int8",
            MatClass::UInt8 => "uint8",
            MatClass::Int16 => "int16",
            MatClass::UInt16 => "uint16",
            MatClass::Int32 => "int32",
            MatClass::UInt32 => "uint32",
            MatClass::Int64 => "int64",
            MatClass::UInt64 => "uint64",
            MatClass::Function => "function_handle",
            MatClass::Opaque => "opaque",
        };
        write!(f, "{name}")
    }
}
