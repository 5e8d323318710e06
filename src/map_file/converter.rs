use std::{
    ffi::OsString,
    fs::{self, File},
    io::{BufWriter, Seek, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use serde::Serialize;
use tracing::{info, warn};

use crate::{map_data::store::MapData, map_features::builder::TileFeatureBuilder};

use super::{sections::TileSections, writer::MapFileWriter, MapFileError};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub tile_count: usize,
    pub feature_count: usize,
    pub coordinate_count: usize,
    pub property_count: usize,
    pub byte_count: u64,
}

pub struct MapFileConverter<'a> {
    map_data: &'a MapData,
}

impl<'a> MapFileConverter<'a> {
    pub fn new(map_data: &'a MapData) -> Self {
        Self { map_data }
    }

    /// Writes one block per tile of the map data in ascending tile id order.
    #[tracing::instrument(skip_all)]
    pub fn write<W: Write + Seek>(&self, out: W) -> Result<(W, ConversionStats), MapFileError> {
        let tile_ids = self.map_data.tile_ids();
        let mut stats = ConversionStats {
            tile_count: tile_ids.len(),
            ..ConversionStats::default()
        };

        let mut writer = MapFileWriter::begin(out, tile_ids.clone())?;
        for tile_id in tile_ids {
            let features = TileFeatureBuilder::new(self.map_data).build(tile_id)?;
            let sections = TileSections::assemble(&features)?;
            writer.write_tile_block(tile_id, &sections)?;

            stats.feature_count += sections.features.len();
            stats.coordinate_count += sections.coordinates.len();
            stats.property_count += sections.property_count();
        }

        let mut out = writer.finish()?;
        stats.byte_count = out.stream_position()?;
        Ok((out, stats))
    }

    /// Writes next to `path` and renames into place only once the file is complete, so `path`
    /// never holds a half written map file.
    #[tracing::instrument(skip(self))]
    pub fn write_to_path(&self, path: &Path) -> Result<ConversionStats, MapFileError> {
        let write_start = Instant::now();
        let partial = partial_path(path);

        let result = self.write_partial(&partial).and_then(|stats| {
            fs::rename(&partial, path)?;
            Ok(stats)
        });

        match result {
            Ok(stats) => {
                info!(
                    tiles = stats.tile_count,
                    features = stats.feature_count,
                    bytes = stats.byte_count,
                    write_duration_secs = write_start.elapsed().as_secs_f64(),
                    "Map file written"
                );
                Ok(stats)
            }
            Err(error) => {
                if let Err(remove_error) = fs::remove_file(&partial) {
                    warn!(file = ?partial, error = ?remove_error, "Could not remove partial file");
                }
                Err(error)
            }
        }
    }

    fn write_partial(&self, partial: &Path) -> Result<ConversionStats, MapFileError> {
        let file = File::create(partial)?;
        let (out, stats) = self.write(BufWriter::new(file))?;
        let file = out.into_inner().map_err(|error| error.into_error())?;
        file.sync_all()?;
        Ok(stats)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}
