use num_complex::Complex64;

use crate::{ConvertError, ConvertResult, NumericArray};

/// Размер одной комплексной выборки cf64 в байтах (f64 I + f64 Q)
pub const CF64_SAMPLE_SIZE: usize = 16;

/// Двумерный массив комплексных выборок.
///
/// Хранение по столбцам (как в MAT-файле): элемент `(r, c)` находится по
/// индексу `c * rows + r`. [`SampleArray::flatten`] отдаёт выборки построчно.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleArray {
    rows: usize,
    cols: usize,
    data: Vec<Complex64>,
    promoted: bool,
}

impl SampleArray {
    /// Создаёт массив из данных, лежащих по столбцам.
    pub fn from_column_major(
        rows: usize,
        cols: usize,
        data: Vec<Complex64>,
    ) -> ConvertResult<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(ConvertError::format(format!(
                "Shape ({rows}, {cols}) does not match {} samples",
                data.len()
            )));
        }

        Ok(Self {
            rows,
            cols,
            data,
            promoted: false,
        })
    }

    /// Столбец `(n, 1)` из последовательности выборок.
    pub fn column(data: Vec<Complex64>) -> Self {
        Self {
            rows: data.len(),
            cols: 1,
            data,
            promoted: false,
        }
    }

    /// Строка `(1, n)` из последовательности выборок.
    pub fn row(data: Vec<Complex64>) -> Self {
        Self {
            rows: 1,
            cols: data.len(),
            data,
            promoted: false,
        }
    }

    /// Форма массива `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `true`, если массив получен из вещественных данных (мнимая часть = 0)
    pub fn promoted_from_real(&self) -> bool {
        self.promoted
    }

    pub fn get(
        &self,
        r: usize,
        c: usize,
    ) -> Option<Complex64> {
        if r >= self.rows || c >= self.cols {
            return None;
        }
        self.data.get(c * self.rows + r).copied()
    }

    /// Разворачивает массив в одномерную последовательность построчно:
    /// внешний цикл по строкам, внутренний по столбцам.
    pub fn flatten(&self) -> Vec<Complex64> {
        // Вектор-столбец и вектор-строка уже лежат в нужном порядке
        if self.rows <= 1 || self.cols <= 1 {
            return self.data.clone();
        }

        let mut out = Vec::with_capacity(self.data.len());
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.push(self.data[c * self.rows + r]);
            }
        }
        out
    }
}

impl TryFrom<&NumericArray> for SampleArray {
    type Error = ConvertError;

    fn try_from(array: &NumericArray) -> ConvertResult<Self> {
        let (rows, cols) = match array.dims.as_slice() {
            [rows, cols] => (*rows, *cols),
            dims => {
                return Err(ConvertError::format(format!(
                    "Expected a 2-D array, got {} dimensions {dims:?}",
                    dims.len()
                )))
            }
        };

        let count = rows.checked_mul(cols).ok_or_else(|| {
            ConvertError::format(format!("Shape ({rows}, {cols}) overflows the sample count"))
        })?;
        if array.real.len() != count {
            return Err(ConvertError::format(format!(
                "Real part holds {} values, shape ({rows}, {cols}) needs {count}",
                array.real.len()
            )));
        }

        let data: Vec<Complex64> = match &array.imag {
            Some(imag) => {
                if imag.len() != count {
                    return Err(ConvertError::format(format!(
                        "Imaginary part holds {} values, shape ({rows}, {cols}) needs {count}",
                        imag.len()
                    )));
                }
                array
                    .real
                    .iter()
                    .zip(imag)
                    .map(|(&re, &im)| Complex64::new(re, im))
                    .collect()
            }
            None => array.real.iter().map(|&re| Complex64::new(re, 0.0)).collect(),
        };

        let mut samples = SampleArray::from_column_major(rows, cols, data)?;
        samples.promoted = !array.is_complex();
        Ok(samples)
    }
}
