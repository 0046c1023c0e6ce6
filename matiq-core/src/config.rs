use std::path::PathBuf;

/// Входной файл по умолчанию (запись RSA от 2023-06-29).
pub const DEFAULT_INPUT_PATH: &str = "2023-06-29 OBU message at 5.915.mat";

/// Выходной файл по умолчанию.
pub const DEFAULT_OUTPUT_PATH: &str = "2023-06-29_OBU.cf64";

/// Имя поля с IQ выборками.
pub const DEFAULT_SAMPLE_FIELD: &str = "Y";

/// Имя поля с XML метаданными анализатора.
pub const DEFAULT_METADATA_FIELD: &str = "rsaMetadata";

/// Конфигурация одного прогона конвертации.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Путь к MAT-контейнеру
    pub input_path: PathBuf,
    /// Путь к выходному .cf64 файлу (создаётся или усекается)
    pub output_path: PathBuf,
    /// Имя поля с комплексным массивом
    pub sample_field: String,
    /// Имя поля с XML метаданными
    pub metadata_field: String,
}

impl ConvertConfig {
    pub fn new<I: Into<PathBuf>, O: Into<PathBuf>>(
        input_path: I,
        output_path: O,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    pub fn with_sample_field<S: Into<String>>(
        mut self,
        field: S,
    ) -> Self {
        self.sample_field = field.into();
        self
    }

    pub fn with_metadata_field<S: Into<String>>(
        mut self,
        field: S,
    ) -> Self {
        self.metadata_field = field.into();
        self
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            sample_field: DEFAULT_SAMPLE_FIELD.to_string(),
            metadata_field: DEFAULT_METADATA_FIELD.to_string(),
        }
    }
}
