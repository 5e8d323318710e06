use std::io::{Read, Seek};

use serde::Serialize;

use crate::{map_data::osm::Coordinate, map_features::builder::GeometryType};

use super::{
    reader::{MapFileReader, TileBlock},
    sections::MapFeatureEntry,
    MapFileError, FILE_VERSION,
};

/// JSON summary of a map file, produced by `inspect`.
#[derive(Debug, Serialize)]
pub struct MapFileReport {
    pub version: i64,
    pub tile_count: usize,
    pub tiles: Vec<TileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile: Option<TileDetail>,
}

#[derive(Debug, Serialize)]
pub struct TileSummary {
    pub tile_id: i32,
    pub block_offset: i64,
    pub feature_count: i32,
    pub coordinate_count: i32,
    pub string_entry_count: i32,
}

#[derive(Debug, Serialize)]
pub struct TileDetail {
    pub tile_id: i32,
    pub features: Vec<FeatureDetail>,
}

#[derive(Debug, Serialize)]
pub struct FeatureDetail {
    pub id: i64,
    pub geometry_type: Option<GeometryType>,
    pub label: Option<String>,
    pub coordinates: Vec<Coordinate>,
    pub properties: Vec<(String, String)>,
}

impl MapFileReport {
    #[tracing::instrument(skip(reader))]
    pub fn collect<R: Read + Seek>(
        reader: &mut MapFileReader<R>,
        detail_tile_id: Option<i32>,
    ) -> Result<Self, MapFileError> {
        let index = reader.tile_index().to_vec();
        let mut tiles = Vec::with_capacity(index.len());

        for entry in &index {
            let block = reader.read_tile(entry)?;
            tiles.push(TileSummary {
                tile_id: entry.tile_id,
                block_offset: entry.block_offset,
                feature_count: block.header.feature_count,
                coordinate_count: block.header.coordinate_count,
                string_entry_count: block.header.string_entry_count,
            });
        }

        let tile = match detail_tile_id {
            Some(tile_id) => {
                let block = reader.read_tile_by_id(tile_id)?;
                Some(TileDetail::from_block(tile_id, &block)?)
            }
            None => None,
        };

        Ok(Self {
            version: FILE_VERSION,
            tile_count: index.len(),
            tiles,
            tile,
        })
    }
}

impl TileDetail {
    fn from_block(tile_id: i32, block: &TileBlock) -> Result<Self, MapFileError> {
        let features = block
            .features
            .iter()
            .map(|feature| FeatureDetail::from_entry(block, feature))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tile_id, features })
    }
}

impl FeatureDetail {
    fn from_entry(block: &TileBlock, feature: &MapFeatureEntry) -> Result<Self, MapFileError> {
        let corrupt = |what: &str| MapFileError::Corrupt {
            context: format!("{what} of feature {} out of range", feature.id),
        };
        let coordinates = block
            .feature_coordinates(feature)
            .ok_or_else(|| corrupt("coordinates"))?
            .to_vec();
        let properties = block
            .feature_properties(feature)
            .ok_or_else(|| corrupt("properties"))?
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Ok(Self {
            id: feature.id,
            geometry_type: GeometryType::from_byte(feature.geometry_type),
            label: block.feature_label(feature).map(str::to_string),
            coordinates,
            properties,
        })
    }
}
