use std::{path::PathBuf, time::Instant};

use clap::{Parser, Subcommand};
use log::{error, info, LevelFilter};
use matiq_core::{
    ConvertConfig, Converter, Mat5Loader, MetadataExtractor, XmlDictDecoder, DEFAULT_INPUT_PATH,
    DEFAULT_METADATA_FIELD, DEFAULT_OUTPUT_PATH, DEFAULT_SAMPLE_FIELD,
};
use matiq_types::CF64_SAMPLE_SIZE;

#[derive(Parser, Debug)]
#[command(
    name = "matiq",
    version = env!("CARGO_PKG_VERSION"),
    about = "Convert analyzer MAT captures to raw interleaved complex-f64 IQ files",
    long_about = None,
)]
struct Cli {
    /// Без подкоманды: конвертация с путями по умолчанию
    #[command(subcommand)]
    command: Option<Command>,
    /// Тихий режим (только ошибки)
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Подробный вывод (отладочные сообщения)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Конвертировать MAT-контейнер в .cf64
    Convert {
        /// Путь к MAT-файлу
        #[arg(short, long, default_value = DEFAULT_INPUT_PATH)]
        input: PathBuf,
        /// Путь к выходному файлу (создаётся или перезаписывается)
        #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
        output: PathBuf,
        /// Имя поля с комплексными выборками
        #[arg(long, default_value = DEFAULT_SAMPLE_FIELD)]
        field: String,
    },
    /// Вывести XML метаданные анализатора в виде JSON
    Metadata {
        /// Путь к MAT-файлу
        #[arg(short, long, default_value = DEFAULT_INPUT_PATH)]
        input: PathBuf,
        /// Имя поля с XML
        #[arg(long, default_value = DEFAULT_METADATA_FIELD)]
        field: String,
    },
}

fn run_convert(config: ConvertConfig) {
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Input         : {:?}", config.input_path);
    info!("  Field         : {}", config.sample_field);
    info!("  Output        : {:?}", config.output_path);
    info!("  Sample format : complex f64 ({CF64_SAMPLE_SIZE} B/sample, native endian)");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let started = Instant::now();

    let summary = match Converter::new(Mat5Loader).convert(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("Conversion failed ({}): {e}", e.kind());
            std::process::exit(1);
        }
    };

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Shape         : {} x {}", summary.shape.0, summary.shape.1);
    info!("  Samples       : {}", summary.samples);
    info!("  Bytes written : {}", summary.bytes_written);
    info!("  Elapsed       : {:.3} s", started.elapsed().as_secs_f64());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("✓ Conversion complete: {:?}", summary.output_path);
}

fn run_metadata(
    input: PathBuf,
    field: String,
) {
    let extractor = MetadataExtractor::new(Mat5Loader, XmlDictDecoder);

    let value = match extractor.extract(&input, &field) {
        Ok(v) => v,
        Err(e) => {
            error!("Metadata extraction failed ({}): {e}", e.kind());
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("Failed to render metadata: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        LevelFilter::Error
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp_secs()
        .init();

    match cli.command {
        None => run_convert(ConvertConfig::default()),
        Some(Command::Convert {
            input,
            output,
            field,
        }) => run_convert(ConvertConfig::new(input, output).with_sample_field(field)),
        Some(Command::Metadata { input, field }) => run_metadata(input, field),
    }
}
