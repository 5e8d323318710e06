use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Instant,
};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};

use crate::{
    map_data::{tile_grid::RegularGrid, MapDataError},
    map_file::{
        converter::MapFileConverter, reader::MapFileReader, report::MapFileReport, MapFileError,
    },
    osm_data::{data_reader::OsmDataReader, DataSource, OsmDataReaderError},
    result_writer::{DataDestination, ResultWriter, ResultWriterError},
};

pub const DEFAULT_TILE_SIZE_DEGREES: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum ConverterRunnerError {
    #[error("Input file {filename:?} must end in .pbf or .json")]
    InputFileFormatIncorrect { filename: PathBuf },

    #[error("Output file {filename:?} must end in .json")]
    OutputFileFormatIncorrect { filename: PathBuf },

    #[error("Invalid tile grid: {error}")]
    TileGrid { error: MapDataError },

    #[error("Failed to read OSM data: {error}")]
    OsmData { error: OsmDataReaderError },

    #[error("Failed to open map file {filename:?}: {error}")]
    MapFileOpen {
        filename: PathBuf,
        error: std::io::Error,
    },

    #[error("Map file error: {error}")]
    MapFile { error: MapFileError },

    #[error("Failed to write result: {error}")]
    ResultWrite { error: ResultWriterError },
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    pub mode: CliMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(Subcommand)]
enum CliMode {
    /// Convert OSM nodes and ways into a tiled map file
    Convert {
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        #[arg(long, value_name = "DEGREES", default_value_t = DEFAULT_TILE_SIZE_DEGREES)]
        tile_size: f64,
    },
    /// Print a JSON summary of a map file
    Inspect {
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long, value_name = "ID", allow_negative_numbers = true)]
        tile: Option<i32>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConverterMode {
    Convert {
        input: PathBuf,
        output: PathBuf,
        tile_size_degrees: f64,
    },
    Inspect {
        input: PathBuf,
        output: Option<PathBuf>,
        tile_id: Option<i32>,
    },
}

pub struct ConverterRunner {
    log_level: Level,
    mode: ConverterMode,
}

impl ConverterRunner {
    pub fn init() -> Self {
        let cli = Cli::parse();
        let mode = match cli.mode {
            CliMode::Convert {
                input,
                output,
                tile_size,
            } => ConverterMode::Convert {
                input,
                output,
                tile_size_degrees: tile_size,
            },
            CliMode::Inspect {
                input,
                output,
                tile,
            } => ConverterMode::Inspect {
                input,
                output,
                tile_id: tile,
            },
        };

        Self {
            log_level: cli.log_level.into(),
            mode,
        }
    }

    pub fn log_level(&self) -> Level {
        self.log_level
    }

    #[tracing::instrument(skip(self))]
    fn run_convert(
        &self,
        input: &Path,
        output: &Path,
        tile_size_degrees: f64,
    ) -> Result<(), ConverterRunnerError> {
        let run_start = Instant::now();

        let grid = RegularGrid::new(tile_size_degrees)
            .map_err(|error| ConverterRunnerError::TileGrid { error })?;
        let data_source = get_data_source(input.to_path_buf())?;

        let map_data = OsmDataReader::new(data_source)
            .read_data(&grid)
            .map_err(|error| ConverterRunnerError::OsmData { error })?;

        let stats = MapFileConverter::new(&map_data)
            .write_to_path(output)
            .map_err(|error| ConverterRunnerError::MapFile { error })?;

        info!(
            tile_size_degrees = grid.tile_size_degrees(),
            tiles = stats.tile_count,
            features = stats.feature_count,
            coordinates = stats.coordinate_count,
            properties = stats.property_count,
            bytes = stats.byte_count,
            run_duration_secs = run_start.elapsed().as_secs_f64(),
            "Conversion done"
        );
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn run_inspect(
        &self,
        input: &Path,
        output: Option<PathBuf>,
        tile_id: Option<i32>,
    ) -> Result<(), ConverterRunnerError> {
        let data_destination = get_data_destination(output)?;

        let file = File::open(input).map_err(|error| ConverterRunnerError::MapFileOpen {
            filename: input.to_path_buf(),
            error,
        })?;
        let mut reader = MapFileReader::open(BufReader::new(file))
            .map_err(|error| ConverterRunnerError::MapFile { error })?;
        let report = MapFileReport::collect(&mut reader, tile_id)
            .map_err(|error| ConverterRunnerError::MapFile { error })?;

        ResultWriter::write(data_destination, &report)
            .map_err(|error| ConverterRunnerError::ResultWrite { error })?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn run(&self) -> Result<(), ConverterRunnerError> {
        match &self.mode {
            ConverterMode::Convert {
                input,
                output,
                tile_size_degrees,
            } => self.run_convert(input, output, *tile_size_degrees),
            ConverterMode::Inspect {
                input,
                output,
                tile_id,
            } => self.run_inspect(input, output.clone(), *tile_id),
        }
    }
}

fn get_data_source(file: PathBuf) -> Result<DataSource, ConverterRunnerError> {
    if let Some(ext) = file.extension() {
        if ext == "json" {
            return Ok(DataSource::JsonFile { file });
        } else if ext == "pbf" {
            return Ok(DataSource::PbfFile { file });
        }
    }
    Err(ConverterRunnerError::InputFileFormatIncorrect { filename: file })
}

fn get_data_destination(
    output: Option<PathBuf>,
) -> Result<DataDestination, ConverterRunnerError> {
    if let Some(output) = output {
        if output.extension().is_some_and(|ext| ext == "json") {
            return Ok(DataDestination::Json { file: output });
        }
        return Err(ConverterRunnerError::OutputFileFormatIncorrect { filename: output });
    }

    Ok(DataDestination::Stdout)
}
