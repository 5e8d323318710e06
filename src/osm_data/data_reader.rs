use std::time::Instant;

use tracing::info;

use crate::map_data::{
    store::{MapData, SharedMapData},
    tile_grid::TileGrid,
};

use super::{json_reader::JsonReader, pbf_reader::PbfReader, DataSource, OsmDataReaderError};

pub struct OsmDataReader {
    source: DataSource,
    map_data: SharedMapData,
}

impl OsmDataReader {
    pub fn new(data_source: DataSource) -> Self {
        Self {
            map_data: SharedMapData::new(),
            source: data_source,
        }
    }

    /// Reads every node and way of the source and buckets the nodes into `grid` tiles.
    #[tracing::instrument(skip(self, grid), fields(source = ?self.source))]
    pub fn read_data(self, grid: &dyn TileGrid) -> Result<MapData, OsmDataReaderError> {
        let read_start = Instant::now();

        match self.source {
            DataSource::JsonFile { ref file } => JsonReader::new(&self.map_data, file).read()?,
            DataSource::PbfFile { ref file } => PbfReader::new(&self.map_data, file).read()?,
        };

        let map_data = self.map_data.freeze(grid);

        info!(
            nodes = map_data.node_count(),
            ways = map_data.ways().len(),
            tiles = map_data.tiles().len(),
            read_duration_secs = read_start.elapsed().as_secs_f64(),
            "OSM data read"
        );

        Ok(map_data)
    }
}
