use crate::MatClass;

/// Числовой массив MAT. Данные хранятся в порядке столбцов (как в файле).
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    /// Исходный класс массива (значения уже расширены до f64)
    pub class: MatClass,
    /// Размерности (минимум две)
    pub dims: Vec<usize>,
    /// Действительная часть
    pub real: Vec<f64>,
    /// Мнимая часть (`None` для вещественных массивов)
    pub imag: Option<Vec<f64>>,
}

/// Символьный массив MAT (`char`), данные по столбцам.
#[derive(Debug, Clone, PartialEq)]
pub struct CharArray {
    pub dims: Vec<usize>,
    pub data: Vec<char>,
}

/// Массив структур: `elements[i][j]` хранит значение поля `field_names[j]`
/// у i-го элемента. У структуры без полей `elements` пуст.
#[derive(Debug, Clone, PartialEq)]
pub struct StructArray {
    pub dims: Vec<usize>,
    pub field_names: Vec<String>,
    pub elements: Vec<Vec<MatValue>>,
}

/// Значение переменной MAT-контейнера.
#[derive(Debug, Clone, PartialEq)]
pub enum MatValue {
    Numeric(NumericArray),
    Char(CharArray),
    Cell { dims: Vec<usize>, items: Vec<MatValue> },
    Struct(StructArray),
    /// Класс, который загрузчик пропускает (sparse, object, function, opaque)
    Unsupported { class: MatClass },
}

/// Именованная переменная контейнера.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub value: MatValue,
}

/// Загруженный контейнер: переменные в порядке следования в файле.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    variables: Vec<Variable>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl NumericArray {
    /// Вещественный массив double.
    pub fn real(
        dims: Vec<usize>,
        real: Vec<f64>,
    ) -> Self {
        Self {
            class: MatClass::Double,
            dims,
            real,
            imag: None,
        }
    }

    /// Комплексный массив double.
    pub fn complex(
        dims: Vec<usize>,
        real: Vec<f64>,
        imag: Vec<f64>,
    ) -> Self {
        Self {
            class: MatClass::Double,
            dims,
            real,
            imag: Some(imag),
        }
    }

    pub fn is_complex(&self) -> bool {
        self.imag.is_some()
    }

    /// Количество элементов (произведение размерностей)
    pub fn len(&self) -> usize {
        element_count(&self.dims)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CharArray {
    pub fn from_text(text: &str) -> Self {
        let data: Vec<char> = text.chars().collect();
        Self {
            dims: vec![1, data.len()],
            data,
        }
    }

    /// Количество строк (первая размерность)
    pub fn row_count(&self) -> usize {
        self.dims.first().copied().unwrap_or(0)
    }

    /// Возвращает i-ю строку. Символы собираются через шаг `rows`,
    /// поскольку данные лежат по столбцам.
    pub fn row(
        &self,
        i: usize,
    ) -> Option<String> {
        let rows = self.row_count();
        if i >= rows {
            return None;
        }
        Some(self.data.iter().skip(i).step_by(rows).collect())
    }

    /// Все строки массива.
    pub fn rows(&self) -> Vec<String> {
        (0..self.row_count()).filter_map(|i| self.row(i)).collect()
    }
}

impl StructArray {
    /// Значение поля `name` у i-го элемента.
    pub fn field(
        &self,
        i: usize,
        name: &str,
    ) -> Option<&MatValue> {
        let j = self.field_names.iter().position(|f| f == name)?;
        self.elements.get(i)?.get(j)
    }
}

impl MatValue {
    /// Класс значения (для диагностики)
    pub fn class(&self) -> MatClass {
        match self {
            MatValue::Numeric(a) => a.class,
            MatValue::Char(_) => MatClass::Char,
            MatValue::Cell { .. } => MatClass::Cell,
            MatValue::Struct(_) => MatClass::Struct,
            MatValue::Unsupported { class } => *class,
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericArray> {
        match self {
            MatValue::Numeric(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<&CharArray> {
        match self {
            MatValue::Char(c) => Some(c),
            _ => None,
        }
    }
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет переменную. Повторное имя заменяет прежнее значение.
    pub fn insert<S: Into<String>>(
        &mut self,
        name: S,
        value: MatValue,
    ) {
        let name = name.into();
        if let Some(v) = self.variables.iter_mut().find(|v| v.name == name) {
            v.value = value;
        } else {
            self.variables.push(Variable { name, value });
        }
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&MatValue> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| &v.value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Произведение размерностей; пустой список даёт 0.
pub fn element_count(dims: &[usize]) -> usize {
    checked_element_count(dims).unwrap_or(usize::MAX)
}

/// Произведение размерностей или `None` при переполнении `usize`.
pub fn checked_element_count(dims: &[usize]) -> Option<usize> {
    if dims.is_empty() {
        return Some(0);
    }
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}
