use std::io;

use crate::map_data::MapDataError;

pub mod converter;
pub mod reader;
pub mod report;
pub mod sections;
pub mod writer;

pub const FILE_VERSION: i64 = 1;

/// version i64 + tile count i32
pub const FILE_HEADER_SIZE: u64 = 12;
/// tile id i32 + block offset i64
pub const TILE_INDEX_ENTRY_SIZE: u64 = 12;
/// four i32 counters + three i64 section offsets
pub const TILE_BLOCK_HEADER_SIZE: u64 = 40;
/// id i64, label i32, geometry u8, four i32
pub const MAP_FEATURE_SIZE: u64 = 29;
pub const COORDINATE_SIZE: u64 = 16;
pub const STRING_ENTRY_SIZE: u64 = 8;
pub const CHARACTER_SIZE: u64 = 2;

#[derive(Debug, thiserror::Error)]
pub enum MapFileError {
    #[error("Map file IO error: {error}")]
    Io { error: io::Error },

    #[error("Map data error: {error}")]
    MapData { error: MapDataError },

    #[error("{what} count {count} does not fit the file format")]
    CountOverflow { what: &'static str, count: usize },

    #[error("Unsupported map file version {version}, expected {expected}")]
    InvalidVersion { version: i64, expected: i64 },

    #[error("Map file is truncated or corrupt: {context}")]
    Corrupt { context: String },

    #[error("Tile block {tile_id} written out of index order, expected {expected:?}")]
    UnexpectedTile { expected: Option<i32>, tile_id: i32 },

    #[error("Tile {tile_id} not found in map file")]
    TileNotFound { tile_id: i32 },
}

impl From<io::Error> for MapFileError {
    fn from(error: io::Error) -> Self {
        MapFileError::Io { error }
    }
}

impl From<MapDataError> for MapFileError {
    fn from(error: MapDataError) -> Self {
        MapFileError::MapData { error }
    }
}

pub(crate) fn to_i32(what: &'static str, count: usize) -> Result<i32, MapFileError> {
    i32::try_from(count).map_err(|_| MapFileError::CountOverflow { what, count })
}
