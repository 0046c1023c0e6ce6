use thiserror::Error;

/// Результат для операций конвертации
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

/// Типы ошибок конвертации MAT → cf64.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Файл не является корректным MAT-контейнером
    #[error("Parse error: {0}")]
    Parse(String),

    /// Поле отсутствует или не приводится к комплексному массиву
    #[error("Format error: {0}")]
    Format(String),

    /// Ошибка извлечения или разбора XML метаданных
    #[error("Metadata error: {0}")]
    Metadata(String),
}

impl ConvertError {
    /// Удобные конструкторы
    pub fn parse<S: Into<String>>(s: S) -> Self {
        Self::Parse(s.into())
    }

    pub fn format<S: Into<String>>(s: S) -> Self {
        Self::Format(s.into())
    }

    pub fn metadata<S: Into<String>>(s: S) -> Self {
        Self::Metadata(s.into())
    }

    /// Короткое имя категории ошибки (для диагностики в CLI).
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::Io(_) => "IoError",
            ConvertError::Parse(_) => "ParseError",
            ConvertError::Format(_) => "FormatError",
            ConvertError::Metadata(_) => "MetadataError",
        }
    }
}
