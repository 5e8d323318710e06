use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::map_data::osm::Coordinate;

use super::{
    sections::{MapFeatureEntry, StringEntry, TileBlockHeader, TileIndexEntry},
    MapFileError, CHARACTER_SIZE, COORDINATE_SIZE, FILE_HEADER_SIZE, FILE_VERSION, MAP_FEATURE_SIZE,
    STRING_ENTRY_SIZE, TILE_BLOCK_HEADER_SIZE, TILE_INDEX_ENTRY_SIZE,
};

/// Random access reader for files produced by [`super::writer::MapFileWriter`].
pub struct MapFileReader<R: Read + Seek> {
    input: R,
    index: Vec<TileIndexEntry>,
    blocks_start: u64,
    stream_len: u64,
}

/// One decoded tile block.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBlock {
    pub header: TileBlockHeader,
    pub features: Vec<MapFeatureEntry>,
    pub coordinates: Vec<Coordinate>,
    pub string_entries: Vec<StringEntry>,
    pub strings: Vec<String>,
}

impl<R: Read + Seek> MapFileReader<R> {
    pub fn open(mut input: R) -> Result<Self, MapFileError> {
        let stream_len = input.seek(SeekFrom::End(0))?;
        input.seek(SeekFrom::Start(0))?;
        let version = read_i64(&mut input, "file header")?;
        if version != FILE_VERSION {
            return Err(MapFileError::InvalidVersion {
                version,
                expected: FILE_VERSION,
            });
        }
        let tile_count = read_count(&mut input, "tile count")?;
        let blocks_start = FILE_HEADER_SIZE + tile_count as u64 * TILE_INDEX_ENTRY_SIZE;
        check_within_stream(blocks_start, stream_len, "tile index")?;

        let mut index = Vec::with_capacity(tile_count);
        for _ in 0..tile_count {
            index.push(TileIndexEntry {
                tile_id: read_i32(&mut input, "tile index")?,
                block_offset: read_i64(&mut input, "tile index")?,
            });
        }

        Ok(Self {
            input,
            index,
            blocks_start,
            stream_len,
        })
    }

    pub fn tile_index(&self) -> &[TileIndexEntry] {
        &self.index
    }

    /// Tiles are not required to be sorted, so this is a plain scan.
    pub fn find_tile(&self, tile_id: i32) -> Option<TileIndexEntry> {
        self.index
            .iter()
            .find(|entry| entry.tile_id == tile_id)
            .copied()
    }

    pub fn read_tile_by_id(&mut self, tile_id: i32) -> Result<TileBlock, MapFileError> {
        let entry = self
            .find_tile(tile_id)
            .ok_or(MapFileError::TileNotFound { tile_id })?;
        self.read_tile(&entry)
    }

    pub fn read_tile(&mut self, entry: &TileIndexEntry) -> Result<TileBlock, MapFileError> {
        let block_offset = to_position(entry.block_offset, "block offset")?;
        if block_offset < self.blocks_start {
            return Err(MapFileError::Corrupt {
                context: format!(
                    "tile {} points into the file header or tile index",
                    entry.tile_id
                ),
            });
        }
        self.input.seek(SeekFrom::Start(block_offset))?;
        let input = &mut self.input;

        let header = TileBlockHeader {
            feature_count: read_i32(input, "tile block header")?,
            coordinate_count: read_i32(input, "tile block header")?,
            string_entry_count: read_i32(input, "tile block header")?,
            reserved_char_count: read_i32(input, "tile block header")?,
            coordinate_section_offset: read_i64(input, "tile block header")?,
            string_section_offset: read_i64(input, "tile block header")?,
            character_section_offset: read_i64(input, "tile block header")?,
        };

        check_section_layout(entry.tile_id, block_offset, &header, self.stream_len)?;

        let feature_count = to_count(header.feature_count, "feature count")?;
        let mut features = Vec::with_capacity(feature_count);
        for _ in 0..feature_count {
            features.push(MapFeatureEntry {
                id: read_i64(input, "map feature")?,
                label_offset: read_i32(input, "map feature")?,
                geometry_type: read_u8(input, "map feature")?,
                coordinate_offset: read_i32(input, "map feature")?,
                coordinate_count: read_i32(input, "map feature")?,
                property_offset: read_i32(input, "map feature")?,
                property_count: read_i32(input, "map feature")?,
            });
        }

        input.seek(SeekFrom::Start(to_position(
            header.coordinate_section_offset,
            "coordinate section offset",
        )?))?;
        let coordinate_count = to_count(header.coordinate_count, "coordinate count")?;
        let mut coordinates = Vec::with_capacity(coordinate_count);
        for _ in 0..coordinate_count {
            coordinates.push(Coordinate {
                lat: read_f64(input, "coordinate")?,
                lon: read_f64(input, "coordinate")?,
            });
        }

        input.seek(SeekFrom::Start(to_position(
            header.string_section_offset,
            "string section offset",
        )?))?;
        let string_entry_count = to_count(header.string_entry_count, "string entry count")?;
        let mut string_entries = Vec::with_capacity(string_entry_count);
        let mut character_count = 0usize;
        for _ in 0..string_entry_count {
            let entry = StringEntry {
                offset: read_i32(input, "string entry")?,
                length: read_i32(input, "string entry")?,
            };
            let end = to_count(entry.offset, "string offset")?
                + to_count(entry.length, "string length")?;
            character_count = character_count.max(end);
            string_entries.push(entry);
        }

        let character_section_offset =
            to_position(header.character_section_offset, "character section offset")?;
        check_within_stream(
            character_section_offset + character_count as u64 * CHARACTER_SIZE,
            self.stream_len,
            "character buffer",
        )?;
        input.seek(SeekFrom::Start(character_section_offset))?;
        let mut characters = Vec::with_capacity(character_count);
        for _ in 0..character_count {
            characters.push(read_u16(input, "character buffer")?);
        }

        let strings = string_entries
            .iter()
            .map(|entry| {
                let start = entry.offset as usize;
                String::from_utf16_lossy(&characters[start..start + entry.length as usize])
            })
            .collect();

        Ok(TileBlock {
            header,
            features,
            coordinates,
            string_entries,
            strings,
        })
    }
}

impl TileBlock {
    pub fn feature_coordinates(&self, feature: &MapFeatureEntry) -> Option<&[Coordinate]> {
        let start = usize::try_from(feature.coordinate_offset).ok()?;
        let count = usize::try_from(feature.coordinate_count).ok()?;
        self.coordinates.get(start..start + count)
    }

    pub fn feature_properties(&self, feature: &MapFeatureEntry) -> Option<Vec<(&str, &str)>> {
        let start = usize::try_from(feature.property_offset).ok()?;
        let count = usize::try_from(feature.property_count).ok()?;
        let strings = self.strings.get(start..start + 2 * count)?;
        Some(
            strings
                .chunks_exact(2)
                .map(|pair| (pair[0].as_str(), pair[1].as_str()))
                .collect(),
        )
    }

    pub fn feature_label(&self, feature: &MapFeatureEntry) -> Option<&str> {
        let index = usize::try_from(feature.label_offset).ok()?;
        self.strings.get(index).map(String::as_str)
    }
}

/// Sections follow each other without gaps, so the offsets are implied by the counts.
fn check_section_layout(
    tile_id: i32,
    block_offset: u64,
    header: &TileBlockHeader,
    stream_len: u64,
) -> Result<(), MapFileError> {
    let coordinates = block_offset
        + TILE_BLOCK_HEADER_SIZE
        + to_count(header.feature_count, "feature count")? as u64 * MAP_FEATURE_SIZE;
    let strings = coordinates
        + to_count(header.coordinate_count, "coordinate count")? as u64 * COORDINATE_SIZE;
    let characters = strings
        + to_count(header.string_entry_count, "string entry count")? as u64 * STRING_ENTRY_SIZE;

    let actual = (
        to_position(header.coordinate_section_offset, "coordinate section offset")?,
        to_position(header.string_section_offset, "string section offset")?,
        to_position(header.character_section_offset, "character section offset")?,
    );
    if actual != (coordinates, strings, characters) {
        return Err(MapFileError::Corrupt {
            context: format!("section offsets of tile {tile_id} do not match its counts"),
        });
    }
    check_within_stream(characters, stream_len, "tile block")
}

/// Counts come from the file, so they are checked against its length before anything is
/// allocated for them.
fn check_within_stream(end: u64, stream_len: u64, context: &str) -> Result<(), MapFileError> {
    if end > stream_len {
        return Err(MapFileError::Corrupt {
            context: format!("{context} ends at byte {end}, the file has {stream_len} bytes"),
        });
    }
    Ok(())
}

fn corrupt_on_eof(error: std::io::Error, context: &str) -> MapFileError {
    if error.kind() == ErrorKind::UnexpectedEof {
        MapFileError::Corrupt {
            context: format!("unexpected end of file in {context}"),
        }
    } else {
        MapFileError::Io { error }
    }
}

fn read_array<R: Read, const N: usize>(r: &mut R, context: &str) -> Result<[u8; N], MapFileError> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)
        .map_err(|error| corrupt_on_eof(error, context))?;
    Ok(buf)
}

fn read_u8<R: Read>(r: &mut R, context: &str) -> Result<u8, MapFileError> {
    Ok(read_array::<R, 1>(r, context)?[0])
}

fn read_u16<R: Read>(r: &mut R, context: &str) -> Result<u16, MapFileError> {
    Ok(u16::from_le_bytes(read_array(r, context)?))
}

fn read_i32<R: Read>(r: &mut R, context: &str) -> Result<i32, MapFileError> {
    Ok(i32::from_le_bytes(read_array(r, context)?))
}

fn read_i64<R: Read>(r: &mut R, context: &str) -> Result<i64, MapFileError> {
    Ok(i64::from_le_bytes(read_array(r, context)?))
}

fn read_f64<R: Read>(r: &mut R, context: &str) -> Result<f64, MapFileError> {
    Ok(f64::from_le_bytes(read_array(r, context)?))
}

fn read_count<R: Read>(r: &mut R, context: &str) -> Result<usize, MapFileError> {
    to_count(read_i32(r, context)?, context)
}

fn to_count(value: i32, context: &str) -> Result<usize, MapFileError> {
    usize::try_from(value).map_err(|_| MapFileError::Corrupt {
        context: format!("negative {context} {value}"),
    })
}

fn to_position(value: i64, context: &str) -> Result<u64, MapFileError> {
    u64::try_from(value).map_err(|_| MapFileError::Corrupt {
        context: format!("negative {context} {value}"),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{
        map_file::{sections::TileSections, writer::MapFileWriter},
        map_features::builder::{GeometryType, TileFeatureBuilder},
        test_utils::get_test_map_data,
    };

    use super::*;

    fn write_test_file() -> Vec<u8> {
        let map_data = get_test_map_data();
        let tile_ids = map_data.tile_ids();
        let mut writer = MapFileWriter::begin(Cursor::new(Vec::new()), tile_ids.clone()).unwrap();
        for tile_id in tile_ids {
            let features = TileFeatureBuilder::new(&map_data).build(tile_id).unwrap();
            let sections = TileSections::assemble(&features).unwrap();
            writer.write_tile_block(tile_id, &sections).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn every_tile_reads_back() {
        let bytes = write_test_file();
        let mut reader = MapFileReader::open(Cursor::new(bytes)).unwrap();
        let index = reader.tile_index().to_vec();

        assert_eq!(index.len(), 3);
        for entry in index {
            let tile = reader.read_tile(&entry).unwrap();

            assert_eq!(tile.features.len(), tile.header.feature_count as usize);
            assert_eq!(
                tile.features.iter().map(|f| f.coordinate_count).sum::<i32>(),
                tile.header.coordinate_count
            );
            assert_eq!(
                tile.features.iter().map(|f| f.property_count).sum::<i32>() * 2,
                tile.header.string_entry_count
            );
            assert_eq!(tile.header.reserved_char_count, 0);
            assert_eq!(tile.header.coordinate_count, 11);
            assert_eq!(tile.header.string_entry_count, 14);
        }
    }

    #[test]
    fn features_decode_to_properties_and_labels() {
        let bytes = write_test_file();
        let mut reader = MapFileReader::open(Cursor::new(bytes)).unwrap();
        let first_tile = reader.tile_index()[0].tile_id;

        let tile = reader.read_tile_by_id(first_tile).unwrap();

        let forest = &tile.features[0];
        assert_eq!(forest.id, 100);
        assert_eq!(
            GeometryType::from_byte(forest.geometry_type),
            Some(GeometryType::Polygon)
        );
        let ring = tile.feature_coordinates(forest).unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(
            tile.feature_properties(forest).unwrap(),
            vec![("landuse", "forest")]
        );
        assert_eq!(tile.feature_label(forest), None);

        let elm_street = &tile.features[1];
        assert_eq!(tile.feature_label(elm_street), Some("Elm Street"));
        assert_eq!(elm_street.label_offset % 2, 1);
        assert_eq!(
            tile.feature_properties(elm_street).unwrap(),
            vec![
                ("highway", "motorway"),
                ("name", "Elm Street"),
                ("amenity", "restaurant")
            ]
        );

        let hill = tile.features.iter().find(|f| f.id == 6).unwrap();
        assert_eq!(tile.feature_label(hill), Some("Lonely Hill"));
        assert_eq!(
            tile.feature_coordinates(hill).unwrap(),
            &[Coordinate::new(10.0, 10.0)]
        );
    }

    #[test]
    fn unknown_tile_is_reported() {
        let bytes = write_test_file();
        let mut reader = MapFileReader::open(Cursor::new(bytes)).unwrap();

        assert!(matches!(
            reader.read_tile_by_id(-5),
            Err(MapFileError::TileNotFound { tile_id: -5 })
        ));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut bytes = write_test_file();
        bytes[0] = 2;

        assert!(matches!(
            MapFileReader::open(Cursor::new(bytes)),
            Err(MapFileError::InvalidVersion {
                version: 2,
                expected: 1
            })
        ));
    }

    #[test]
    fn inconsistent_section_offsets_are_corrupt() {
        let mut bytes = write_test_file();
        let block = {
            let reader = MapFileReader::open(Cursor::new(bytes.clone())).unwrap();
            reader.tile_index()[0].block_offset as usize
        };
        // coordinate section offset, low byte
        bytes[block + 16] ^= 0x01;
        let mut reader = MapFileReader::open(Cursor::new(bytes)).unwrap();
        let first = reader.tile_index()[0];

        assert!(matches!(
            reader.read_tile(&first),
            Err(MapFileError::Corrupt { .. })
        ));
    }

    #[test]
    fn oversized_tile_count_is_corrupt() {
        let mut bytes = FILE_VERSION.to_le_bytes().to_vec();
        bytes.extend_from_slice(&i32::MAX.to_le_bytes());

        assert!(matches!(
            MapFileReader::open(Cursor::new(bytes)),
            Err(MapFileError::Corrupt { .. })
        ));
    }

    #[test]
    fn oversized_section_counts_are_corrupt() {
        let mut bytes = write_test_file();
        let mut reader = MapFileReader::open(Cursor::new(bytes.clone())).unwrap();
        let first = reader.tile_index()[0];
        let block = first.block_offset as usize;
        let original = reader.read_tile(&first).unwrap().header;

        // a huge coordinate count with section offsets that agree with it
        let coordinate_count = i32::MAX;
        let shift = (coordinate_count - original.coordinate_count) as i64 * COORDINATE_SIZE as i64;
        bytes[block + 4..block + 8].copy_from_slice(&coordinate_count.to_le_bytes());
        bytes[block + 24..block + 32]
            .copy_from_slice(&(original.string_section_offset + shift).to_le_bytes());
        bytes[block + 32..block + 40]
            .copy_from_slice(&(original.character_section_offset + shift).to_le_bytes());
        let mut reader = MapFileReader::open(Cursor::new(bytes)).unwrap();

        assert!(matches!(
            reader.read_tile(&first),
            Err(MapFileError::Corrupt { .. })
        ));
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let mut bytes = write_test_file();
        bytes.truncate(bytes.len() - 3);
        let mut reader = MapFileReader::open(Cursor::new(bytes)).unwrap();
        let last = *reader.tile_index().last().unwrap();

        assert!(matches!(
            reader.read_tile(&last),
            Err(MapFileError::Corrupt { .. })
        ));
    }
}
