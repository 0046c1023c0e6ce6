use std::path::PathBuf;

use log::{debug, info, warn};
use matiq_types::{ConvertError, ConvertResult, Record, SampleArray, CF64_SAMPLE_SIZE};

use crate::{
    cf64::write_cf64_file,
    config::ConvertConfig,
    loader::{Mat5Loader, RecordLoader},
};

/// Итог одного прогона конвертации.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    /// Количество записанных комплексных выборок
    pub samples: u64,
    /// Размер выходного файла в байтах (16 × samples)
    pub bytes_written: u64,
    /// Форма исходного массива `(rows, cols)`
    pub shape: (usize, usize),
    /// Путь к выходному файлу
    pub output_path: PathBuf,
}

/// Конвертер MAT → cf64.
///
/// Загрузка → поиск поля → разворот построчно → запись 16 байт на выборку.
/// Выходной файл создаётся только после успешного извлечения выборок, поэтому
/// ошибки разбора и формата не трогают существующий файл. Ошибка на этапе
/// записи оставляет файл частично записанным.
#[derive(Debug, Clone, Default)]
pub struct Converter<L: RecordLoader = Mat5Loader> {
    loader: L,
}

impl<L: RecordLoader> Converter<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Выполняет конвертацию. Блокируется до завершения записи.
    pub fn convert(
        &self,
        config: &ConvertConfig,
    ) -> ConvertResult<ConvertSummary> {
        info!("Loading container {:?}", config.input_path);
        let record = self.loader.load(&config.input_path)?;
        debug!(
            "Container variables: {:?}",
            record.names().collect::<Vec<_>>()
        );

        let samples = extract_samples(&record, &config.sample_field)?;
        drop(record);

        let shape = samples.shape();
        if samples.promoted_from_real() {
            warn!(
                "Field '{}' is real-valued; writing zero imaginary parts",
                config.sample_field
            );
        }

        let flat = samples.flatten();
        info!(
            "Field '{}': shape {:?}, {} samples",
            config.sample_field,
            shape,
            flat.len()
        );

        let bytes_written = write_cf64_file(&config.output_path, &flat)?;
        debug_assert_eq!(bytes_written, (flat.len() * CF64_SAMPLE_SIZE) as u64);
        info!("Wrote {bytes_written} bytes to {:?}", config.output_path);

        Ok(ConvertSummary {
            samples: flat.len() as u64,
            bytes_written,
            shape,
            output_path: config.output_path.clone(),
        })
    }
}

/// Извлекает комплексный массив из поля записи.
pub fn extract_samples(
    record: &Record,
    field: &str,
) -> ConvertResult<SampleArray> {
    let value = record
        .get(field)
        .ok_or_else(|| ConvertError::format(format!("Field '{field}' not found in container")))?;

    let array = value.as_numeric().ok_or_else(|| {
        ConvertError::format(format!(
            "Field '{field}' is a {} array, expected a numeric array",
            value.class()
        ))
    })?;

    SampleArray::try_from(array)
}
