//! Конвертация MAT-записей анализатора в сырой cf64
//!
//! Загружает MAT Level 5 контейнер, извлекает комплексный массив IQ выборок
//! и записывает его как последовательность пар f64 (I, Q) без заголовка.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use matiq_core::{ConvertConfig, Converter, Mat5Loader};
//!
//! let config = ConvertConfig::new("capture.mat", "capture.cf64");
//! let summary = Converter::new(Mat5Loader).convert(&config)?;
//! println!("{} samples, {} bytes", summary.samples, summary.bytes_written);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binary;
pub mod cf64;
pub mod config;
pub mod converter;
pub mod format;
pub mod loader;
pub mod metadata;
pub mod serialization;

pub use cf64::*;
pub use config::*;
pub use converter::*;
pub use format::*;
pub use loader::*;
pub use metadata::*;
pub use serialization::*;

pub use matiq_types::{self as types, Complex64, ConvertError, ConvertResult};

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
