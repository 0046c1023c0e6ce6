use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use log::debug;
use matiq_types::{
    checked_element_count, CharArray, ConvertError, ConvertResult, MatClass, MatDataType, MatValue,
    NumericArray, Record, StructArray, Variable,
};

use crate::{
    binary::{push_f64, push_i32, push_u16, push_u32, read_u32_local, ByteReader},
    format::{padding_for, MatHeader, ARRAY_FLAG_COMPLEX, MAT_HEADER_SIZE, MAT_TAG_SIZE},
};

/// Элемент данных MAT: тип и полезная нагрузка (без выравнивания).
#[derive(Debug, Clone, Copy)]
struct Element<'a> {
    data_type: MatDataType,
    data: &'a [u8],
}

/// Последовательный читатель переменных MAT Level 5 из буфера в памяти.
pub struct Mat5Reader<'a> {
    header: MatHeader,
    reader: ByteReader<'a>,
    done: bool,
}

/// Писатель MAT Level 5 контейнеров.
#[derive(Debug, Clone)]
pub struct Mat5Writer {
    header: MatHeader,
    compress: bool,
    body: Vec<u8>,
}

impl<'a> Mat5Reader<'a> {
    /// Создаёт читатель, валидируя 128-байтный заголовок.
    pub fn new(bytes: &'a [u8]) -> ConvertResult<Self> {
        let header = MatHeader::deserialize(bytes)?;
        let reader = ByteReader::new(&bytes[MAT_HEADER_SIZE..], header.is_le);

        Ok(Self {
            header,
            reader,
            done: false,
        })
    }

    pub fn header(&self) -> &MatHeader {
        &self.header
    }

    /// Возвращает следующую именованную переменную или `None` в конце файла.
    pub fn next_variable(&mut self) -> ConvertResult<Option<Variable>> {
        let is_le = self.header.is_le;

        loop {
            if self.reader.remaining() < MAT_TAG_SIZE {
                if !self.reader.is_at_end() {
                    debug!("Ignoring {} trailing bytes", self.reader.remaining());
                }
                return Ok(None);
            }

            let offset = MAT_HEADER_SIZE + self.reader.position();
            let element = read_element(&mut self.reader)?;

            let (name, value) = match element.data_type {
                MatDataType::Compressed => {
                    let inflated = inflate(element.data)?;
                    let mut inner = ByteReader::new(&inflated, is_le);
                    let el = read_element(&mut inner)?;

                    if el.data_type != MatDataType::Matrix {
                        debug!("Skipping compressed {:?} element at {offset}", el.data_type);
                        continue;
                    }
                    parse_matrix(el.data, is_le)?
                }
                MatDataType::Matrix => parse_matrix(element.data, is_le)?,
                other => {
                    debug!("Skipping top-level {other:?} element at {offset}");
                    continue;
                }
            };

            if name.is_empty() {
                debug!("Skipping unnamed {} element at {offset}", value.class());
                continue;
            }

            debug!("Variable '{name}' ({}) at offset {offset}", value.class());
            return Ok(Some(Variable { name, value }));
        }
    }

    /// Читает все переменные в [`Record`].
    pub fn read_record(mut self) -> ConvertResult<Record> {
        let mut record = Record::new();
        while let Some(var) = self.next_variable()? {
            record.insert(var.name, var.value);
        }
        Ok(record)
    }
}

impl Iterator for Mat5Reader<'_> {
    type Item = ConvertResult<Variable>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_variable() {
            Ok(Some(v)) => Some(Ok(v)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl Mat5Writer {
    pub fn new() -> Self {
        Self::with_header(MatHeader::default())
    }

    pub fn with_header(header: MatHeader) -> Self {
        Self {
            header,
            compress: false,
            body: Vec::new(),
        }
    }

    /// Сжимать каждую переменную в отдельный miCOMPRESSED элемент.
    pub fn compressed(
        mut self,
        compress: bool,
    ) -> Self {
        self.compress = compress;
        self
    }

    /// Big-endian файл вместо little-endian.
    pub fn big_endian(mut self) -> Self {
        self.header.is_le = false;
        self
    }

    pub fn header(&self) -> &MatHeader {
        &self.header
    }

    /// Добавляет переменную в контейнер.
    pub fn add_variable(
        &mut self,
        name: &str,
        value: &MatValue,
    ) -> ConvertResult<()> {
        let is_le = self.header.is_le;
        let element = encode_matrix(name, value, is_le)?;

        if self.compress {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&element)?;
            let zipped = encoder.finish()?;

            let len = u32::try_from(zipped.len()).map_err(|_| {
                ConvertError::format(format!("Variable '{name}' is too large to compress"))
            })?;
            push_u32(&mut self.body, is_le, MatDataType::Compressed.as_u32());
            push_u32(&mut self.body, is_le, len);
            self.body.extend_from_slice(&zipped);
        } else {
            self.body.extend_from_slice(&element);
        }

        Ok(())
    }

    /// Добавляет все переменные записи в исходном порядке.
    pub fn add_record(
        &mut self,
        record: &Record,
    ) -> ConvertResult<()> {
        for var in record.iter() {
            self.add_variable(&var.name, &var.value)?;
        }
        Ok(())
    }

    /// Заголовок + элементы одним буфером.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAT_HEADER_SIZE + self.body.len());
        out.extend_from_slice(&self.header.serialize());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn write_to<W: Write>(
        self,
        mut writer: W,
    ) -> ConvertResult<()> {
        writer.write_all(&self.into_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

impl Default for Mat5Writer {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Чтение элементов
////////////////////////////////////////////////////////////////////////////////

fn read_element<'a>(r: &mut ByteReader<'a>) -> ConvertResult<Element<'a>> {
    let word = r.read_u32()?;

    // Small Data Element: размер в старших 16 битах, данные в следующих 4 байтах
    if word >> 16 != 0 {
        let data_type = MatDataType::from_u32(word & 0xFFFF)?;
        let nbytes = (word >> 16) as usize;
        if nbytes > 4 {
            return Err(ConvertError::parse(format!(
                "Small data element claims {nbytes} bytes"
            )));
        }
        let slot = r.read_bytes(4)?;
        return Ok(Element {
            data_type,
            data: &slot[..nbytes],
        });
    }

    let data_type = MatDataType::from_u32(word)?;
    let nbytes = r.read_u32()? as usize;
    let data = r.read_bytes(nbytes)?;

    // Сжатые элементы не выравниваются
    if data_type != MatDataType::Compressed {
        r.skip_lenient(padding_for(nbytes));
    }

    Ok(Element { data_type, data })
}

fn expect_element<'a>(
    r: &mut ByteReader<'a>,
    expected: MatDataType,
    what: &str,
) -> ConvertResult<Element<'a>> {
    let el = read_element(r)?;
    if el.data_type != expected {
        return Err(ConvertError::parse(format!(
            "Expected {expected:?} {what}, found {:?}",
            el.data_type
        )));
    }
    Ok(el)
}

fn inflate(data: &[u8]) -> ConvertResult<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| ConvertError::parse(format!("Corrupt compressed element: {e}")))?;
    Ok(out)
}

fn read_dims(
    r: &mut ByteReader<'_>,
    is_le: bool,
) -> ConvertResult<Vec<usize>> {
    let el = expect_element(r, MatDataType::Int32, "dimensions")?;
    let dims = decode_numeric(el.data_type, el.data, is_le)?;

    dims.into_iter()
        .map(|d| {
            if d < 0.0 {
                Err(ConvertError::parse(format!("Negative dimension: {d}")))
            } else {
                Ok(d as usize)
            }
        })
        .collect()
}

fn read_name(r: &mut ByteReader<'_>) -> ConvertResult<String> {
    let el = read_element(r)?;
    match el.data_type {
        MatDataType::Int8 | MatDataType::UInt8 | MatDataType::Utf8 => {
            Ok(String::from_utf8_lossy(el.data).into_owned())
        }
        other => Err(ConvertError::parse(format!(
            "Expected array name, found {other:?}"
        ))),
    }
}

/// Разбирает полезную нагрузку miMATRIX: имя и значение.
fn parse_matrix(
    payload: &[u8],
    is_le: bool,
) -> ConvertResult<(String, MatValue)> {
    if payload.is_empty() {
        return Ok((
            String::new(),
            MatValue::Numeric(NumericArray::real(vec![0, 0], Vec::new())),
        ));
    }

    let mut r = ByteReader::new(payload, is_le);

    let flags = expect_element(&mut r, MatDataType::UInt32, "array flags")?;
    if flags.data.len() < 8 {
        return Err(ConvertError::parse("Array flags element is too short"));
    }
    let mut off = 0;
    let word = read_u32_local(flags.data, &mut off, is_le);
    let class = MatClass::from_u8((word & 0xFF) as u8)?;
    let complex = word & ARRAY_FLAG_COMPLEX != 0;

    // У opaque-объектов нет элемента размерностей
    if class == MatClass::Opaque {
        let name = read_name(&mut r)?;
        return Ok((name, MatValue::Unsupported { class }));
    }

    let dims = read_dims(&mut r, is_le)?;
    let name = read_name(&mut r)?;
    let count = checked_element_count(&dims)
        .ok_or_else(|| ConvertError::parse(format!("Array dimensions overflow: {dims:?}")))?;

    let value = match class {
        c if c.is_numeric() => {
            let real = read_numeric_part(&mut r, is_le, count, "real")?;
            let imag = if complex {
                Some(read_numeric_part(&mut r, is_le, count, "imaginary")?)
            } else {
                None
            };
            MatValue::Numeric(NumericArray {
                class,
                dims,
                real,
                imag,
            })
        }
        MatClass::Char => {
            let data = if r.is_at_end() {
                Vec::new()
            } else {
                let el = read_element(&mut r)?;
                decode_chars(el.data_type, el.data, is_le)?
            };
            MatValue::Char(CharArray { dims, data })
        }
        MatClass::Cell => {
            ensure_nested_fit(&r, Some(count), "Cell array")?;
            let items = (0..count)
                .map(|_| read_nested(&mut r, is_le))
                .collect::<ConvertResult<Vec<_>>>()?;
            MatValue::Cell { dims, items }
        }
        MatClass::Struct => {
            let field_names = read_field_names(&mut r, is_le)?;
            // Без полей у элементов нет данных, хранить нечего
            let stored = if field_names.is_empty() { 0 } else { count };
            ensure_nested_fit(&r, stored.checked_mul(field_names.len()), "Struct array")?;

            let mut elements = Vec::new();
            for _ in 0..stored {
                let fields = field_names
                    .iter()
                    .map(|_| read_nested(&mut r, is_le))
                    .collect::<ConvertResult<Vec<_>>>()?;
                elements.push(fields);
            }
            MatValue::Struct(StructArray {
                dims,
                field_names,
                elements,
            })
        }
        _ => {
            debug!("Skipping unsupported {class} array '{name}'");
            MatValue::Unsupported { class }
        }
    };

    Ok((name, value))
}

/// Каждый вложенный элемент занимает минимум тег, поэтому заявленное
/// количество не может превышать остаток нагрузки / 8.
fn ensure_nested_fit(
    r: &ByteReader<'_>,
    nested: Option<usize>,
    what: &str,
) -> ConvertResult<()> {
    match nested.and_then(|n| n.checked_mul(MAT_TAG_SIZE)) {
        Some(needed) if needed <= r.remaining() => Ok(()),
        _ => Err(ConvertError::parse(format!(
            "{what} declares more nested arrays than {} remaining bytes can hold",
            r.remaining()
        ))),
    }
}

fn read_nested(
    r: &mut ByteReader<'_>,
    is_le: bool,
) -> ConvertResult<MatValue> {
    let el = expect_element(r, MatDataType::Matrix, "nested array")?;
    parse_matrix(el.data, is_le).map(|(_, value)| value)
}

fn read_numeric_part(
    r: &mut ByteReader<'_>,
    is_le: bool,
    count: usize,
    part: &str,
) -> ConvertResult<Vec<f64>> {
    let el = read_element(r)?;
    let values = decode_numeric(el.data_type, el.data, is_le)?;

    if values.len() != count {
        return Err(ConvertError::parse(format!(
            "The {part} part holds {} values, dimensions require {count}",
            values.len()
        )));
    }
    Ok(values)
}

fn read_field_names(
    r: &mut ByteReader<'_>,
    is_le: bool,
) -> ConvertResult<Vec<String>> {
    let len_el = expect_element(r, MatDataType::Int32, "field name length")?;
    let field_len = decode_numeric(len_el.data_type, len_el.data, is_le)?
        .first()
        .copied()
        .unwrap_or(0.0) as usize;

    let names_el = expect_element(r, MatDataType::Int8, "field names")?;
    if field_len == 0 {
        return Ok(Vec::new());
    }

    Ok(names_el
        .data
        .chunks(field_len)
        .map(|chunk| {
            let end = chunk.iter().position(|&b| b == 0).unwrap_or(chunk.len());
            String::from_utf8_lossy(&chunk[..end]).into_owned()
        })
        .collect())
}

/// Расширяет значения любого числового типа MAT до f64.
pub fn decode_numeric(
    data_type: MatDataType,
    data: &[u8],
    is_le: bool,
) -> ConvertResult<Vec<f64>> {
    if is_le {
        decode_numeric_with::<LittleEndian>(data_type, data)
    } else {
        decode_numeric_with::<BigEndian>(data_type, data)
    }
}

fn decode_numeric_with<B: ByteOrder>(
    data_type: MatDataType,
    data: &[u8],
) -> ConvertResult<Vec<f64>> {
    if !data_type.is_numeric() {
        return Err(ConvertError::parse(format!(
            "{data_type:?} is not a numeric data type"
        )));
    }

    let size = data_type.element_size();
    if data.len() % size != 0 {
        return Err(ConvertError::parse(format!(
            "{} bytes is not a whole number of {data_type:?} values",
            data.len()
        )));
    }

    let chunks = data.chunks_exact(size);
    let values = match data_type {
        MatDataType::Int8 => chunks.map(|c| c[0] as i8 as f64).collect(),
        MatDataType::UInt8 => chunks.map(|c| c[0] as f64).collect(),
        MatDataType::Int16 => chunks.map(|c| B::read_i16(c) as f64).collect(),
        MatDataType::UInt16 => chunks.map(|c| B::read_u16(c) as f64).collect(),
        MatDataType::Int32 => chunks.map(|c| B::read_i32(c) as f64).collect(),
        MatDataType::UInt32 => chunks.map(|c| B::read_u32(c) as f64).collect(),
        MatDataType::Single => chunks.map(|c| B::read_f32(c) as f64).collect(),
        MatDataType::Double => chunks.map(B::read_f64).collect(),
        MatDataType::Int64 => chunks.map(|c| B::read_i64(c) as f64).collect(),
        MatDataType::UInt64 => chunks.map(|c| B::read_u64(c) as f64).collect(),
        other => {
            return Err(ConvertError::parse(format!(
                "{other:?} is not a numeric data type"
            )))
        }
    };

    Ok(values)
}

fn decode_chars(
    data_type: MatDataType,
    data: &[u8],
    is_le: bool,
) -> ConvertResult<Vec<char>> {
    let to_char = |u: u32| char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER);

    match data_type {
        MatDataType::Utf8 => std::str::from_utf8(data)
            .map(|s| s.chars().collect())
            .map_err(|e| ConvertError::parse(format!("Invalid UTF-8 in char array: {e}"))),
        MatDataType::Int8 | MatDataType::UInt8 => Ok(data.iter().map(|&b| b as char).collect()),
        MatDataType::Utf16
        | MatDataType::UInt16
        | MatDataType::Utf32
        | MatDataType::UInt32
        | MatDataType::Int16
        | MatDataType::Int32 => {
            let alias = match data_type {
                MatDataType::Utf16 => MatDataType::UInt16,
                MatDataType::Utf32 => MatDataType::UInt32,
                other => other,
            };
            Ok(decode_numeric(alias, data, is_le)?
                .into_iter()
                .map(|v| to_char(v as u32))
                .collect())
        }
        other => Err(ConvertError::parse(format!(
            "Unsupported char data type {other:?}"
        ))),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Запись элементов
////////////////////////////////////////////////////////////////////////////////

/// Дописывает элемент данных с тегом и выравниванием. Нагрузка до 4 байт
/// записывается в компактном формате Small Data Element.
fn write_element(
    buf: &mut Vec<u8>,
    data_type: MatDataType,
    data: &[u8],
    is_le: bool,
) {
    if !data.is_empty() && data.len() <= 4 {
        push_u32(buf, is_le, ((data.len() as u32) << 16) | data_type.as_u32());
        buf.extend_from_slice(data);
        buf.resize(buf.len() + 4 - data.len(), 0);
        return;
    }

    push_u32(buf, is_le, data_type.as_u32());
    push_u32(buf, is_le, data.len() as u32);
    buf.extend_from_slice(data);
    buf.resize(buf.len() + padding_for(data.len()), 0);
}

fn encode_header(
    buf: &mut Vec<u8>,
    class: MatClass,
    complex: bool,
    dims: &[usize],
    name: &str,
    is_le: bool,
) -> ConvertResult<()> {
    let mut word = class.as_u8() as u32;
    if complex {
        word |= ARRAY_FLAG_COMPLEX;
    }
    let mut flags = Vec::with_capacity(8);
    push_u32(&mut flags, is_le, word);
    push_u32(&mut flags, is_le, 0);
    write_element(buf, MatDataType::UInt32, &flags, is_le);

    let mut dim_bytes = Vec::with_capacity(dims.len() * 4);
    for &d in dims {
        let d = i32::try_from(d)
            .map_err(|_| ConvertError::format(format!("Dimension {d} exceeds i32 range")))?;
        push_i32(&mut dim_bytes, is_le, d);
    }
    write_element(buf, MatDataType::Int32, &dim_bytes, is_le);
    write_element(buf, MatDataType::Int8, name.as_bytes(), is_le);

    Ok(())
}

fn encode_f64s(
    values: &[f64],
    is_le: bool,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for &v in values {
        push_f64(&mut out, is_le, v);
    }
    out
}

/// Кодирует значение в полный miMATRIX элемент (тег + нагрузка).
fn encode_matrix(
    name: &str,
    value: &MatValue,
    is_le: bool,
) -> ConvertResult<Vec<u8>> {
    let mut payload = Vec::new();

    match value {
        MatValue::Numeric(a) => {
            let count = a.len();
            let imag_len = a.imag.as_ref().map_or(count, Vec::len);
            if a.real.len() != count || imag_len != count {
                return Err(ConvertError::format(format!(
                    "Array '{name}' data does not match dimensions {:?}",
                    a.dims
                )));
            }

            encode_header(&mut payload, a.class, a.is_complex(), &a.dims, name, is_le)?;
            write_element(&mut payload, MatDataType::Double, &encode_f64s(&a.real, is_le), is_le);
            if let Some(imag) = &a.imag {
                write_element(&mut payload, MatDataType::Double, &encode_f64s(imag, is_le), is_le);
            }
        }
        MatValue::Char(c) => {
            encode_header(&mut payload, MatClass::Char, false, &c.dims, name, is_le)?;
            let mut units = Vec::with_capacity(c.data.len() * 2);
            for &ch in &c.data {
                let unit = u16::try_from(ch as u32).unwrap_or(0xFFFD);
                push_u16(&mut units, is_le, unit);
            }
            write_element(&mut payload, MatDataType::Utf16, &units, is_le);
        }
        MatValue::Cell { dims, items } => {
            encode_header(&mut payload, MatClass::Cell, false, dims, name, is_le)?;
            for item in items {
                payload.extend_from_slice(&encode_matrix("", item, is_le)?);
            }
        }
        MatValue::Struct(s) => {
            encode_header(&mut payload, MatClass::Struct, false, &s.dims, name, is_le)?;

            let field_len = s.field_names.iter().map(String::len).max().unwrap_or(0) + 1;
            let mut len_bytes = Vec::with_capacity(4);
            push_i32(&mut len_bytes, is_le, field_len as i32);
            write_element(&mut payload, MatDataType::Int32, &len_bytes, is_le);

            let mut names = vec![0u8; field_len * s.field_names.len()];
            for (i, field) in s.field_names.iter().enumerate() {
                names[i * field_len..i * field_len + field.len()].copy_from_slice(field.as_bytes());
            }
            write_element(&mut payload, MatDataType::Int8, &names, is_le);

            for element in &s.elements {
                for field in element {
                    payload.extend_from_slice(&encode_matrix("", field, is_le)?);
                }
            }
        }
        MatValue::Unsupported { class } => {
            return Err(ConvertError::format(format!(
                "Cannot encode {class} array '{name}'"
            )))
        }
    }

    let len = u32::try_from(payload.len())
        .map_err(|_| ConvertError::format(format!("Array '{name}' is too large")))?;
    let mut out = Vec::with_capacity(MAT_TAG_SIZE + payload.len());
    push_u32(&mut out, is_le, MatDataType::Matrix.as_u32());
    push_u32(&mut out, is_le, len);
    out.extend_from_slice(&payload);
    Ok(out)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
