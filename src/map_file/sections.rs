use serde::Serialize;

use crate::{
    map_data::osm::Coordinate,
    map_features::builder::FeatureRecord,
};

use super::{to_i32, MapFileError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileIndexEntry {
    pub tile_id: i32,
    pub block_offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileBlockHeader {
    pub feature_count: i32,
    pub coordinate_count: i32,
    pub string_entry_count: i32,
    pub reserved_char_count: i32,
    pub coordinate_section_offset: i64,
    pub string_section_offset: i64,
    pub character_section_offset: i64,
}

/// One fixed-size feature record as stored in a tile block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapFeatureEntry {
    pub id: i64,
    /// Index of the label's value string entry, -1 without a label.
    pub label_offset: i32,
    pub geometry_type: u8,
    pub coordinate_offset: i32,
    pub coordinate_count: i32,
    /// Index of the first key string entry, two entries per property.
    pub property_offset: i32,
    pub property_count: i32,
}

/// Position and length of one string in the tile's character buffer, in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StringEntry {
    pub offset: i32,
    pub length: i32,
}

/// The variable-length parts of one tile block, laid out contiguously.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TileSections {
    pub features: Vec<MapFeatureEntry>,
    pub coordinates: Vec<Coordinate>,
    pub string_entries: Vec<StringEntry>,
    pub characters: Vec<u16>,
}

impl TileSections {
    pub fn assemble(features: &[FeatureRecord]) -> Result<Self, MapFileError> {
        let mut sections = TileSections::default();
        let mut property_count = 0usize;

        for feature in features {
            sections.features.push(MapFeatureEntry {
                id: feature.id,
                label_offset: match feature.label_offset() {
                    Some(offset) => to_i32("Label offset", offset)?,
                    None => -1,
                },
                geometry_type: feature.geometry_type as u8,
                coordinate_offset: to_i32("Coordinate", sections.coordinates.len())?,
                coordinate_count: to_i32("Coordinate", feature.coordinates.len())?,
                property_offset: to_i32("String entry", property_count * 2)?,
                property_count: to_i32("Property", feature.properties.len())?,
            });
            sections.coordinates.extend_from_slice(&feature.coordinates);

            for (key, value) in feature.properties.iter() {
                sections.push_string(key.as_str())?;
                sections.push_string(value.as_str())?;
            }
            property_count += feature.properties.len();
        }

        Ok(sections)
    }

    fn push_string(&mut self, text: &str) -> Result<(), MapFileError> {
        let offset = to_i32("Character", self.characters.len())?;
        self.characters.extend(text.encode_utf16());
        let length = to_i32("Character", self.characters.len())? - offset;
        self.string_entries.push(StringEntry { offset, length });
        Ok(())
    }

    pub fn property_count(&self) -> usize {
        self.string_entries.len() / 2
    }
}
