use std::{fs::File, path::Path, time::Instant};

use osmpbfreader::{blobs::result_blob_into_iter, OsmObj, OsmPbfReader, Tags};
use rayon::iter::{ParallelBridge, ParallelIterator};
use tracing::trace;

use crate::map_data::{
    osm::{Coordinate, OsmNode, OsmTags, OsmWay},
    store::SharedMapData,
};

use super::OsmDataReaderError;

/// Decodes PBF blobs in parallel. Each blob's nodes and ways are merged into the shared tables
/// in one step; relations are dropped.
pub struct PbfReader<'a> {
    map_data: &'a SharedMapData,
    file_name: &'a Path,
}

impl<'a> PbfReader<'a> {
    pub fn new(map_data: &'a SharedMapData, file_name: &'a Path) -> Self {
        Self {
            map_data,
            file_name,
        }
    }

    pub fn read(self) -> Result<(), OsmDataReaderError> {
        let read_start = Instant::now();

        let file = File::open(self.file_name)
            .map_err(|error| OsmDataReaderError::PbfFileOpenError { error })?;
        let mut pbf = OsmPbfReader::new(file);

        pbf.blobs()
            .par_bridge()
            .try_for_each(|blob| -> Result<(), OsmDataReaderError> {
                let mut nodes = Vec::new();
                let mut ways = Vec::new();
                for obj in result_blob_into_iter(blob) {
                    match obj.map_err(|error| OsmDataReaderError::PbfFileReadError { error })? {
                        OsmObj::Node(node) => nodes.push(OsmNode {
                            id: node.id.0,
                            coordinate: Coordinate::new(node.lat(), node.lon()),
                            tags: to_osm_tags(&node.tags),
                        }),
                        OsmObj::Way(way) => ways.push(OsmWay {
                            id: way.id.0,
                            node_ids: way.nodes.iter().map(|id| id.0).collect(),
                            tags: to_osm_tags(&way.tags),
                        }),
                        OsmObj::Relation(_) => {}
                    }
                }
                self.map_data.extend(nodes, ways);
                Ok(())
            })?;

        trace!(
            read_duration_secs = read_start.elapsed().as_secs(),
            "PBF file read done"
        );

        Ok(())
    }
}

fn to_osm_tags(tags: &Tags) -> OsmTags {
    tags.iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
