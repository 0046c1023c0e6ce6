use std::{fs, path::Path};

use log::debug;
use matiq_types::{ConvertResult, Record};

use crate::serialization::Mat5Reader;

/// Источник структурированных записей (контейнеров с именованными полями).
///
/// Передаётся в [`crate::Converter`] явно, поэтому в тестах его можно
/// заменить заглушкой без файловой системы.
pub trait RecordLoader {
    /// Загружает контейнер целиком в память.
    fn load(
        &self,
        path: &Path,
    ) -> ConvertResult<Record>;
}

/// Загрузчик MAT Level 5 файлов.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mat5Loader;

impl Mat5Loader {
    pub fn new() -> Self {
        Self
    }

    /// Разбирает контейнер из буфера в памяти.
    pub fn load_bytes(
        &self,
        bytes: &[u8],
    ) -> ConvertResult<Record> {
        let reader = Mat5Reader::new(bytes)?;
        debug!("MAT header: {:?}", reader.header().text);
        reader.read_record()
    }
}

impl RecordLoader for Mat5Loader {
    fn load(
        &self,
        path: &Path,
    ) -> ConvertResult<Record> {
        let bytes = fs::read(path)?;
        debug!("Read {} bytes from {path:?}", bytes.len());
        self.load_bytes(&bytes)
    }
}

impl<L: RecordLoader + ?Sized> RecordLoader for &L {
    fn load(
        &self,
        path: &Path,
    ) -> ConvertResult<Record> {
        (**self).load(path)
    }
}
