use std::{io, path::PathBuf};

pub mod data_reader;
pub mod json_reader;
pub mod pbf_reader;

#[derive(Debug, thiserror::Error)]
pub enum OsmDataReaderError {
    #[error("File error: {error}")]
    FileError { error: io::Error },

    #[error("OSM JSON parse error: {error}")]
    JsonParseError { error: serde_json::Error },

    #[error("Failed to open PBF file: {error}")]
    PbfFileOpenError { error: io::Error },

    #[error("Failed to read PBF file: {error}")]
    PbfFileReadError { error: osmpbfreader::Error },
}

#[derive(Debug, PartialEq, Clone)]
pub enum DataSource {
    JsonFile { file: PathBuf },
    PbfFile { file: PathBuf },
}
