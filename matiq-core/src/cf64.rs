//! Сырой формат cf64
//!
//! Последовательность комплексных выборок без заголовка: 8 байт I (f64),
//! затем 8 байт Q (f64), порядок байт платформы.

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use byteorder::{ByteOrder, NativeEndian, WriteBytesExt};
use matiq_types::{Complex64, ConvertError, ConvertResult, CF64_SAMPLE_SIZE};

/// Буферизованный писатель cf64.
pub struct Cf64Writer<W: Write> {
    writer: BufWriter<W>,
    samples_written: u64,
}

impl<W: Write> Cf64Writer<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
            samples_written: 0,
        }
    }

    /// Записывает одну выборку: действительная часть, затем мнимая.
    pub fn write_sample(
        &mut self,
        sample: Complex64,
    ) -> ConvertResult<()> {
        self.writer.write_f64::<NativeEndian>(sample.re)?;
        self.writer.write_f64::<NativeEndian>(sample.im)?;
        self.samples_written += 1;
        Ok(())
    }

    pub fn write_samples(
        &mut self,
        samples: &[Complex64],
    ) -> ConvertResult<()> {
        for &s in samples {
            self.write_sample(s)?;
        }
        Ok(())
    }

    /// Количество записанных выборок.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Количество записанных байт (16 на выборку).
    pub fn bytes_written(&self) -> u64 {
        self.samples_written * CF64_SAMPLE_SIZE as u64
    }

    /// Сбрасывает буфер и возвращает внутренний поток.
    pub fn finish(self) -> ConvertResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| ConvertError::Io(e.into_error()))
    }
}

/// Кодирует выборки в буфер cf64.
pub fn encode_cf64(samples: &[Complex64]) -> Vec<u8> {
    let mut out = vec![0u8; samples.len() * CF64_SAMPLE_SIZE];
    for (chunk, s) in out.chunks_exact_mut(CF64_SAMPLE_SIZE).zip(samples) {
        NativeEndian::write_f64(&mut chunk[..8], s.re);
        NativeEndian::write_f64(&mut chunk[8..], s.im);
    }
    out
}

/// Декодирует буфер cf64. Длина должна быть кратна 16 байтам.
pub fn decode_cf64(bytes: &[u8]) -> ConvertResult<Vec<Complex64>> {
    if bytes.len() % CF64_SAMPLE_SIZE != 0 {
        return Err(ConvertError::format(format!(
            "cf64 stream length {} is not a multiple of {CF64_SAMPLE_SIZE}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(CF64_SAMPLE_SIZE)
        .map(|c| Complex64::new(NativeEndian::read_f64(&c[..8]), NativeEndian::read_f64(&c[8..])))
        .collect())
}

/// Читает весь поток cf64.
pub fn read_cf64<R: Read>(mut reader: R) -> ConvertResult<Vec<Complex64>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_cf64(&bytes)
}

/// Создаёт (или усекает) файл и записывает в него выборки.
/// Возвращает количество записанных байт.
pub fn write_cf64_file<P: AsRef<Path>>(
    path: P,
    samples: &[Complex64],
) -> ConvertResult<u64> {
    let file = File::create(path)?;
    let mut writer = Cf64Writer::new(file);
    writer.write_samples(samples)?;
    let bytes = writer.bytes_written();
    writer.finish()?.sync_all()?;
    Ok(bytes)
}
