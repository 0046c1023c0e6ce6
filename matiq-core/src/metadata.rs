//! XML метаданные анализатора
//!
//! Контейнер может хранить XML-описание записи (настройки прибора, время,
//! сохранённые параметры). Разбор не участвует в конвертации выборок и
//! вызывается отдельно.

use std::path::Path;

use log::debug;
use matiq_types::{ConvertError, ConvertResult, MatClass, MatValue, Record};
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use serde_json::{Map, Value};

use crate::loader::RecordLoader;

/// Ключ для текста элемента, у которого есть атрибуты или дочерние элементы.
pub const TEXT_KEY: &str = "#text";

/// Префикс ключей атрибутов.
pub const ATTR_PREFIX: &str = "@";

/// Декодер XML в вложенную структуру словарей.
pub trait MetadataDecoder {
    fn decode(
        &self,
        xml: &str,
    ) -> ConvertResult<Value>;
}

/// Декодер в стиле xml-to-dict на quick-xml.
///
/// - элемент → объект, корень становится единственным ключом верхнего уровня;
/// - атрибуты → ключи `@name`;
/// - элемент только с текстом → строка, пустой элемент → `null`;
/// - текст рядом с атрибутами/детьми → ключ `#text`;
/// - повторяющиеся имена соседей → массив.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDictDecoder;

/// Извлекает и декодирует метаданные из контейнера.
#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor<L: RecordLoader, D: MetadataDecoder> {
    loader: L,
    decoder: D,
}

struct Frame {
    name: String,
    map: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> ConvertResult<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut map = Map::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| ConvertError::metadata(format!("Bad attribute in <{name}>: {e}")))?;
            let key = format!("{ATTR_PREFIX}{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr
                .unescape_value()
                .map_err(|e| ConvertError::metadata(format!("Bad attribute value in <{name}>: {e}")))?;
            map.insert(key, Value::String(value.into_owned()));
        }

        Ok(Self {
            name,
            map,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let value = if self.map.is_empty() {
            if self.text.is_empty() {
                Value::Null
            } else {
                Value::String(self.text)
            }
        } else {
            let mut map = self.map;
            if !self.text.is_empty() {
                map.insert(TEXT_KEY.to_string(), Value::String(self.text));
            }
            Value::Object(map)
        };
        (self.name, value)
    }
}

/// Добавляет дочерний элемент; повторное имя превращает значение в массив.
fn attach(
    map: &mut Map<String, Value>,
    name: String,
    value: Value,
) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

impl XmlDictDecoder {
    fn finish_element(
        stack: &mut Vec<Frame>,
        root: &mut Option<Value>,
        frame: Frame,
    ) -> ConvertResult<()> {
        let (name, value) = frame.close();

        match stack.last_mut() {
            Some(parent) => attach(&mut parent.map, name, value),
            None => {
                if root.is_some() {
                    return Err(ConvertError::metadata("Multiple root elements"));
                }
                let mut top = Map::new();
                top.insert(name, value);
                *root = Some(Value::Object(top));
            }
        }
        Ok(())
    }
}

impl MetadataDecoder for XmlDictDecoder {
    fn decode(
        &self,
        xml: &str,
    ) -> ConvertResult<Value> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Frame> = Vec::new();
        let mut root: Option<Value> = None;

        loop {
            let pos = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| ConvertError::metadata(format!("Malformed XML at byte {pos}: {e}")))?;

            match event {
                Event::Start(start) => stack.push(Frame::open(&start)?),
                Event::Empty(start) => {
                    let frame = Frame::open(&start)?;
                    Self::finish_element(&mut stack, &mut root, frame)?;
                }
                Event::End(_) => {
                    let frame = stack
                        .pop()
                        .ok_or_else(|| ConvertError::metadata("Unbalanced closing tag"))?;
                    Self::finish_element(&mut stack, &mut root, frame)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| ConvertError::metadata(format!("Bad text at byte {pos}: {e}")))?;
                    match stack.last_mut() {
                        Some(frame) => frame.text.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(ConvertError::metadata("Text outside of the root element"))
                        }
                    }
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    if let Some(frame) = stack.last_mut() {
                        frame.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                // Декларация, комментарии, PI, DOCTYPE
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ConvertError::metadata(format!(
                "Unexpected end of document inside <{}>",
                open.name
            )));
        }

        root.ok_or_else(|| ConvertError::metadata("Document has no root element"))
    }
}

impl<L: RecordLoader, D: MetadataDecoder> MetadataExtractor<L, D> {
    pub fn new(
        loader: L,
        decoder: D,
    ) -> Self {
        Self { loader, decoder }
    }

    /// Загружает контейнер и декодирует поле метаданных.
    pub fn extract(
        &self,
        path: &Path,
        field: &str,
    ) -> ConvertResult<Value> {
        let record = self.loader.load(path)?;
        let xml = metadata_text(&record, field)?;
        debug!("Metadata field '{field}': {} bytes of XML", xml.len());
        self.decoder.decode(&xml)
    }
}

/// Текст метаданных из поля записи: первая строка char-массива или байты
/// `uint8`/`int8` массива в UTF-8.
pub fn metadata_text(
    record: &Record,
    field: &str,
) -> ConvertResult<String> {
    let value = record
        .get(field)
        .ok_or_else(|| ConvertError::metadata(format!("Field '{field}' not found in container")))?;

    value_text(value, field)
}

fn value_text(
    value: &MatValue,
    field: &str,
) -> ConvertResult<String> {
    match value {
        MatValue::Char(chars) => {
            let row = chars.row(0).unwrap_or_default();
            Ok(row.trim_end_matches(&['\0', ' '][..]).to_string())
        }
        MatValue::Numeric(array) if matches!(array.class, MatClass::UInt8 | MatClass::Int8) => {
            let bytes: Vec<u8> = array.real.iter().map(|&v| v as i64 as u8).collect();
            let text = String::from_utf8(bytes)
                .map_err(|e| ConvertError::metadata(format!("Field '{field}' is not UTF-8: {e}")))?;
            Ok(text.trim_end_matches('\0').to_string())
        }
        MatValue::Cell { items, .. } => match items.first() {
            Some(first) => value_text(first, field),
            None => Err(ConvertError::metadata(format!("Field '{field}' is an empty cell"))),
        },
        other => Err(ConvertError::metadata(format!(
            "Field '{field}' is a {} array, expected text",
            other.class()
        ))),
    }
}
