use std::{fs, path::Path};

use matiq_core::{
    binary::{push_f64, push_i32, push_u32},
    decode_cf64, padding_for, read_cf64, ConvertConfig, ConvertError, Converter, Mat5Loader,
    Mat5Writer, MatHeader, MetadataExtractor, XmlDictDecoder,
};
use matiq_types::{CharArray, Complex64, MatClass, MatDataType, MatValue, NumericArray};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tempfile::TempDir;

// ===========================================================================
// Helpers: детерминированные тест-данные
// ===========================================================================

const RSA_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<DataFile xmlns="http://www.tektronix.com">
  <DataSetsCollection>
    <DataSets>
      <DataDescription>
        <NumberSamples>3</NumberSamples>
        <DateTime>2023-06-29T14:02:11.123456789-06:00</DateTime>
      </DataDescription>
    </DataSets>
  </DataSetsCollection>
  <Setup>
    <RSAPersist>
      <Internal>
        <Composite pid="CenterFrequency">5.915E+9</Composite>
        <Composite pid="SpanHz">40E+6</Composite>
      </Internal>
    </RSAPersist>
  </Setup>
</DataFile>"#;

/// Комплексный массив double в порядке столбцов.
fn complex_array(
    dims: Vec<usize>,
    samples: &[Complex64],
) -> MatValue {
    MatValue::Numeric(NumericArray::complex(
        dims,
        samples.iter().map(|s| s.re).collect(),
        samples.iter().map(|s| s.im).collect(),
    ))
}

fn known_samples() -> Vec<Complex64> {
    vec![
        Complex64::new(1.0, 2.0),
        Complex64::new(3.0, 4.0),
        Complex64::new(5.0, 6.0),
    ]
}

/// Записывает MAT-файл с переменными `vars` во временный каталог.
fn write_container(
    dir: &TempDir,
    name: &str,
    writer: Mat5Writer,
    vars: &[(&str, MatValue)],
) -> std::path::PathBuf {
    let mut writer = writer;
    for (var, value) in vars {
        writer.add_variable(var, value).unwrap();
    }
    let path = dir.path().join(name);
    writer.write_to(fs::File::create(&path).unwrap()).unwrap();
    path
}

fn convert(
    input: &Path,
    output: &Path,
) -> Result<matiq_core::ConvertSummary, ConvertError> {
    Converter::new(Mat5Loader).convert(&ConvertConfig::new(input, output))
}

fn read_output(path: &Path) -> Vec<Complex64> {
    read_cf64(fs::File::open(path).unwrap()).unwrap()
}

/// Элемент данных little-endian с обычным 8-байтным тегом.
fn raw_element(
    buf: &mut Vec<u8>,
    data_type: MatDataType,
    data: &[u8],
) {
    push_u32(buf, true, data_type.as_u32());
    push_u32(buf, true, data.len() as u32);
    buf.extend_from_slice(data);
    buf.resize(buf.len() + padding_for(data.len()), 0);
}

/// Флаги, размерности и имя miMATRIX; данные дописывает вызывающий.
fn raw_matrix_prefix(
    class: MatClass,
    complex: bool,
    dims: &[i32],
    name: &str,
) -> Vec<u8> {
    let mut payload = Vec::new();

    let mut flags = Vec::new();
    let complex_bit = if complex { 0x0800 } else { 0 };
    push_u32(&mut flags, true, class.as_u8() as u32 | complex_bit);
    push_u32(&mut flags, true, 0);
    raw_element(&mut payload, MatDataType::UInt32, &flags);

    let mut dim_bytes = Vec::new();
    for &d in dims {
        push_i32(&mut dim_bytes, true, d);
    }
    raw_element(&mut payload, MatDataType::Int32, &dim_bytes);
    raw_element(&mut payload, MatDataType::Int8, name.as_bytes());
    payload
}

fn raw_doubles(values: &[f64]) -> Vec<u8> {
    let mut out = Vec::new();
    for &v in values {
        push_f64(&mut out, true, v);
    }
    out
}

/// Собирает контейнер из готовых нагрузок miMATRIX без проверок писателя.
fn write_raw_container(
    dir: &TempDir,
    name: &str,
    matrices: &[Vec<u8>],
) -> std::path::PathBuf {
    let mut bytes = MatHeader::default().serialize().to_vec();
    for payload in matrices {
        raw_element(&mut bytes, MatDataType::Matrix, payload);
    }
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Валидный комплексный `Y` (3, 1) в сыром виде.
fn raw_valid_samples() -> Vec<u8> {
    let mut payload = raw_matrix_prefix(MatClass::Double, true, &[3, 1], "Y");
    raw_element(&mut payload, MatDataType::Double, &raw_doubles(&[1.0, 3.0, 5.0]));
    raw_element(&mut payload, MatDataType::Double, &raw_doubles(&[2.0, 4.0, 6.0]));
    payload
}

fn assert_parse_error_without_output(
    dir: &TempDir,
    input: &Path,
) {
    let output = dir.path().join("rejected.cf64");
    let err = convert(input, &output).unwrap_err();

    assert!(matches!(err, ConvertError::Parse(_)), "unexpected error: {err}");
    assert!(!output.exists());
}

// ===========================================================================
// Форма и порядок выборок
// ===========================================================================

#[test]
fn test_column_vector_known_values() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "capture.mat",
        Mat5Writer::new(),
        &[("Y", complex_array(vec![3, 1], &known_samples()))],
    );
    let output = dir.path().join("capture.cf64");

    let summary = convert(&input, &output).unwrap();

    assert_eq!(summary.samples, 3);
    assert_eq!(summary.shape, (3, 1));
    assert_eq!(fs::metadata(&output).unwrap().len(), 48);

    let pairs: Vec<(f64, f64)> = read_output(&output).iter().map(|s| (s.re, s.im)).collect();
    assert_eq!(pairs, vec![(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]);
}

#[test]
fn test_row_vector_shape() {
    let dir = TempDir::new().unwrap();
    let samples: Vec<Complex64> = (0..17)
        .map(|i| Complex64::new(i as f64, -(i as f64) / 2.0))
        .collect();
    let input = write_container(
        &dir,
        "row.mat",
        Mat5Writer::new(),
        &[("Y", complex_array(vec![1, 17], &samples))],
    );
    let output = dir.path().join("row.cf64");

    let summary = convert(&input, &output).unwrap();

    assert_eq!(summary.shape, (1, 17));
    assert_eq!(summary.bytes_written, 16 * 17);
    assert_eq!(read_output(&output), samples);
}

#[test]
fn test_matrix_flattened_row_major() {
    let dir = TempDir::new().unwrap();
    // [[a, b, c],
    //  [d, e, f]] хранится по столбцам: a d b e c f
    let column_major: Vec<Complex64> = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0]
        .iter()
        .map(|&v| Complex64::new(v, 10.0 * v))
        .collect();
    let input = write_container(
        &dir,
        "matrix.mat",
        Mat5Writer::new(),
        &[("Y", complex_array(vec![2, 3], &column_major))],
    );
    let output = dir.path().join("matrix.cf64");

    convert(&input, &output).unwrap();

    let re: Vec<f64> = read_output(&output).iter().map(|s| s.re).collect();
    assert_eq!(re, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

// ===========================================================================
// Точность и варианты контейнера
// ===========================================================================

#[test]
fn test_random_samples_bit_exact() {
    let mut rng = StdRng::seed_from_u64(0x0B0_5915);
    let samples: Vec<Complex64> = std::iter::repeat_with(|| {
        let re = f64::from_bits(rng.gen());
        let im = f64::from_bits(rng.gen());
        Complex64::new(re, im)
    })
    .filter(|s| s.re.is_finite() && s.im.is_finite())
    .take(4_096)
    .collect();

    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "random.mat",
        Mat5Writer::new().compressed(true),
        &[("Y", complex_array(vec![samples.len(), 1], &samples))],
    );
    let output = dir.path().join("random.cf64");

    convert(&input, &output).unwrap();
    let decoded = read_output(&output);

    assert_eq!(decoded.len(), samples.len());
    for (a, b) in samples.iter().zip(&decoded) {
        assert_eq!(a.re.to_bits(), b.re.to_bits());
        assert_eq!(a.im.to_bits(), b.im.to_bits());
    }
}

#[test]
fn test_big_endian_container() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "be.mat",
        Mat5Writer::new().big_endian(),
        &[("Y", complex_array(vec![3, 1], &known_samples()))],
    );
    let output = dir.path().join("be.cf64");

    convert(&input, &output).unwrap();

    // Выход всегда в порядке байт платформы
    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[0..8], &1.0f64.to_ne_bytes());
    assert_eq!(decode_cf64(&bytes).unwrap(), known_samples());
}

#[test]
fn test_real_array_gets_zero_imaginary() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "real.mat",
        Mat5Writer::new(),
        &[("Y", MatValue::Numeric(NumericArray::real(vec![2, 1], vec![0.25, -0.5])))],
    );
    let output = dir.path().join("real.cf64");

    convert(&input, &output).unwrap();

    assert_eq!(
        read_output(&output),
        vec![Complex64::new(0.25, 0.0), Complex64::new(-0.5, 0.0)]
    );
}

#[test]
fn test_empty_array_gives_empty_file() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "empty.mat",
        Mat5Writer::new(),
        &[("Y", complex_array(vec![0, 1], &[]))],
    );
    let output = dir.path().join("empty.cf64");

    let summary = convert(&input, &output).unwrap();

    assert_eq!(summary.samples, 0);
    assert_eq!(fs::metadata(&output).unwrap().len(), 0);
}

#[test]
fn test_existing_output_truncated() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "capture.mat",
        Mat5Writer::new(),
        &[("Y", complex_array(vec![1, 1], &[Complex64::new(9.0, 9.0)]))],
    );
    let output = dir.path().join("capture.cf64");
    fs::write(&output, vec![0xEE; 1_000]).unwrap();

    convert(&input, &output).unwrap();

    assert_eq!(fs::metadata(&output).unwrap().len(), 16);
}

// ===========================================================================
// Ошибки
// ===========================================================================

#[test]
fn test_missing_field_leaves_output_untouched() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "nofield.mat",
        Mat5Writer::new(),
        &[("X", complex_array(vec![3, 1], &known_samples()))],
    );

    // Выходного файла нет и он не появляется
    let fresh = dir.path().join("fresh.cf64");
    let err = convert(&input, &fresh).unwrap_err();
    assert!(matches!(err, ConvertError::Format(_)));
    assert!(!fresh.exists());

    // Существующий выходной файл не изменяется
    let existing = dir.path().join("existing.cf64");
    fs::write(&existing, b"previous run").unwrap();
    let err = convert(&input, &existing).unwrap_err();
    assert!(matches!(err, ConvertError::Format(_)));
    assert_eq!(fs::read(&existing).unwrap(), b"previous run");
}

#[test]
fn test_non_numeric_field_is_format_error() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "text.mat",
        Mat5Writer::new(),
        &[("Y", MatValue::Char(CharArray::from_text("not samples")))],
    );
    let output = dir.path().join("text.cf64");

    assert!(matches!(
        convert(&input, &output),
        Err(ConvertError::Format(_))
    ));
    assert!(!output.exists());
}

#[test]
fn test_three_dimensional_field_is_format_error() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "cube.mat",
        Mat5Writer::new(),
        &[("Y", complex_array(vec![1, 2, 2], &[Complex64::new(0.0, 0.0); 4]))],
    );

    assert!(matches!(
        convert(&input, &dir.path().join("cube.cf64")),
        Err(ConvertError::Format(_))
    ));
}

#[test]
fn test_corrupt_container_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("corrupt.mat");
    fs::write(&input, b"this is not a MAT file at all").unwrap();
    let output = dir.path().join("corrupt.cf64");

    let err = convert(&input, &output).unwrap_err();

    assert!(matches!(err, ConvertError::Parse(_)));
    assert!(!output.exists());
}

#[test]
fn test_truncated_container_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "full.mat",
        Mat5Writer::new(),
        &[("Y", complex_array(vec![3, 1], &known_samples()))],
    );
    let bytes = fs::read(&input).unwrap();
    fs::write(&input, &bytes[..bytes.len() - 30]).unwrap();
    let output = dir.path().join("truncated.cf64");

    assert!(matches!(
        convert(&input, &output),
        Err(ConvertError::Parse(_))
    ));
    assert!(!output.exists());
}

#[test]
fn test_raw_fixture_converts() {
    let dir = TempDir::new().unwrap();
    let input = write_raw_container(&dir, "raw.mat", &[raw_valid_samples()]);
    let output = dir.path().join("raw.cf64");

    convert(&input, &output).unwrap();
    assert_eq!(read_output(&output), known_samples());
}

#[test]
fn test_dims_not_matching_data_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let mut payload = raw_matrix_prefix(MatClass::Double, false, &[2, 2], "Y");
    raw_element(&mut payload, MatDataType::Double, &raw_doubles(&[1.0, 2.0, 3.0]));
    let input = write_raw_container(&dir, "short.mat", &[payload]);

    assert_parse_error_without_output(&dir, &input);
}

#[test]
fn test_dims_overflow_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let mut payload = raw_matrix_prefix(MatClass::Double, false, &[i32::MAX; 3], "Y");
    raw_element(&mut payload, MatDataType::Double, &raw_doubles(&[1.0]));
    let input = write_raw_container(&dir, "overflow.mat", &[payload]);

    assert_parse_error_without_output(&dir, &input);
}

#[test]
fn test_cell_count_beyond_payload_is_parse_error() {
    let dir = TempDir::new().unwrap();
    // Ячейка заявляет 1000 элементов, но данных нет; рядом валидный Y
    let cell = raw_matrix_prefix(MatClass::Cell, false, &[1000, 1], "notes");
    let input = write_raw_container(&dir, "cell.mat", &[raw_valid_samples(), cell]);

    assert_parse_error_without_output(&dir, &input);
}

#[test]
fn test_huge_struct_dims_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let mut payload = raw_matrix_prefix(MatClass::Struct, false, &[i32::MAX, i32::MAX], "settings");
    let mut field_len = Vec::new();
    push_i32(&mut field_len, true, 8);
    raw_element(&mut payload, MatDataType::Int32, &field_len);
    raw_element(&mut payload, MatDataType::Int8, b"gain\0\0\0\0");
    let input = write_raw_container(&dir, "struct.mat", &[raw_valid_samples(), payload]);

    assert_parse_error_without_output(&dir, &input);
}

#[test]
fn test_element_size_beyond_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let mut bytes = MatHeader::default().serialize().to_vec();
    push_u32(&mut bytes, true, MatDataType::Matrix.as_u32());
    push_u32(&mut bytes, true, u32::MAX);
    bytes.extend_from_slice(&raw_valid_samples());
    let input = dir.path().join("oversized.mat");
    fs::write(&input, bytes).unwrap();

    assert_parse_error_without_output(&dir, &input);
}

#[test]
fn test_missing_input_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = convert(&dir.path().join("absent.mat"), &dir.path().join("out.cf64")).unwrap_err();
    assert!(matches!(err, ConvertError::Io(_)));
}

#[test]
fn test_unwritable_output_is_io_error() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "capture.mat",
        Mat5Writer::new(),
        &[("Y", complex_array(vec![3, 1], &known_samples()))],
    );
    let output = dir.path().join("no-such-dir").join("out.cf64");

    assert!(matches!(
        convert(&input, &output),
        Err(ConvertError::Io(_))
    ));
}

// ===========================================================================
// Метаданные
// ===========================================================================

#[test]
fn test_metadata_extraction() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "rsa.mat",
        Mat5Writer::new().compressed(true),
        &[
            ("Y", complex_array(vec![3, 1], &known_samples())),
            ("rsaMetadata", MatValue::Char(CharArray::from_text(RSA_XML))),
        ],
    );

    let extractor = MetadataExtractor::new(Mat5Loader, XmlDictDecoder);
    let metadata = extractor.extract(&input, "rsaMetadata").unwrap();

    let data_file = &metadata["DataFile"];
    assert_eq!(data_file["@xmlns"], "http://www.tektronix.com");
    assert_eq!(
        data_file["DataSetsCollection"]["DataSets"]["DataDescription"]["NumberSamples"],
        "3"
    );

    let composites = data_file["Setup"]["RSAPersist"]["Internal"]["Composite"]
        .as_array()
        .unwrap();
    assert_eq!(composites.len(), 2);
    assert_eq!(composites[0]["@pid"], "CenterFrequency");
    assert_eq!(composites[0]["#text"], "5.915E+9");

    // Конвертация не зависит от метаданных
    let output = dir.path().join("rsa.cf64");
    convert(&input, &output).unwrap();
    assert_eq!(read_output(&output), known_samples());
}

#[test]
fn test_metadata_missing_field() {
    let dir = TempDir::new().unwrap();
    let input = write_container(
        &dir,
        "plain.mat",
        Mat5Writer::new(),
        &[("Y", complex_array(vec![3, 1], &known_samples()))],
    );

    let extractor = MetadataExtractor::new(Mat5Loader, XmlDictDecoder);
    assert!(matches!(
        extractor.extract(&input, "rsaMetadata"),
        Err(ConvertError::Metadata(_))
    ));
}
