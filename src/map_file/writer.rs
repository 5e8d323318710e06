use std::io::{Seek, SeekFrom, Write};

use tracing::trace;

use super::{
    sections::{TileIndexEntry, TileSections},
    to_i32, MapFileError, FILE_HEADER_SIZE, FILE_VERSION,
};

/// Two-pass writer for the tiled map file.
///
/// `begin` reserves the file header and one index entry per tile with zeroed offsets, every
/// `write_tile_block` streams one block and backpatches its section offsets, `finish` rewrites
/// the index with the real block offsets. Until `finish` returns the output is not a valid
/// map file.
pub struct MapFileWriter<W: Write + Seek> {
    out: W,
    tile_ids: Vec<i32>,
    index: Vec<TileIndexEntry>,
}

impl<W: Write + Seek> MapFileWriter<W> {
    pub fn begin(mut out: W, tile_ids: Vec<i32>) -> Result<Self, MapFileError> {
        write_i64(&mut out, FILE_VERSION)?;
        write_i32(&mut out, to_i32("Tile", tile_ids.len())?)?;
        for tile_id in &tile_ids {
            write_i32(&mut out, *tile_id)?;
            write_i64(&mut out, 0)?;
        }

        Ok(Self {
            out,
            index: Vec::with_capacity(tile_ids.len()),
            tile_ids,
        })
    }

    /// Writes the block of the next tile in index order and returns its offset in the file.
    pub fn write_tile_block(
        &mut self,
        tile_id: i32,
        sections: &TileSections,
    ) -> Result<i64, MapFileError> {
        let expected = self.tile_ids.get(self.index.len()).copied();
        if expected != Some(tile_id) {
            return Err(MapFileError::UnexpectedTile { expected, tile_id });
        }

        let block_offset = self.position()?;

        write_i32(&mut self.out, to_i32("Feature", sections.features.len())?)?;
        write_i32(&mut self.out, to_i32("Coordinate", sections.coordinates.len())?)?;
        write_i32(&mut self.out, to_i32("String entry", sections.string_entries.len())?)?;
        // character count, never filled in
        write_i32(&mut self.out, 0)?;

        let coordinates_placeholder = self.out.stream_position()?;
        write_i64(&mut self.out, 0)?;
        let strings_placeholder = self.out.stream_position()?;
        write_i64(&mut self.out, 0)?;
        let characters_placeholder = self.out.stream_position()?;
        write_i64(&mut self.out, 0)?;

        for feature in &sections.features {
            write_i64(&mut self.out, feature.id)?;
            write_i32(&mut self.out, feature.label_offset)?;
            write_u8(&mut self.out, feature.geometry_type)?;
            write_i32(&mut self.out, feature.coordinate_offset)?;
            write_i32(&mut self.out, feature.coordinate_count)?;
            write_i32(&mut self.out, feature.property_offset)?;
            write_i32(&mut self.out, feature.property_count)?;
        }

        self.backpatch_current_position(coordinates_placeholder)?;
        for coordinate in &sections.coordinates {
            write_f64(&mut self.out, coordinate.lat)?;
            write_f64(&mut self.out, coordinate.lon)?;
        }

        self.backpatch_current_position(strings_placeholder)?;
        for entry in &sections.string_entries {
            write_i32(&mut self.out, entry.offset)?;
            write_i32(&mut self.out, entry.length)?;
        }

        self.backpatch_current_position(characters_placeholder)?;
        for character in &sections.characters {
            write_u16(&mut self.out, *character)?;
        }

        let block_end = self.position()?;
        trace!(
            tile_id,
            block_offset,
            block_len = block_end - block_offset,
            "Tile block written"
        );

        self.index.push(TileIndexEntry {
            tile_id,
            block_offset,
        });
        Ok(block_offset)
    }

    /// Rewrites the tile index with the real block offsets and hands the stream back.
    pub fn finish(mut self) -> Result<W, MapFileError> {
        if self.index.len() != self.tile_ids.len() {
            return Err(MapFileError::UnexpectedTile {
                expected: self.tile_ids.get(self.index.len()).copied(),
                tile_id: self.index.last().map_or(-1, |entry| entry.tile_id),
            });
        }

        let end = self.out.stream_position()?;
        self.out.seek(SeekFrom::Start(FILE_HEADER_SIZE))?;
        for entry in &self.index {
            write_i32(&mut self.out, entry.tile_id)?;
            write_i64(&mut self.out, entry.block_offset)?;
        }
        self.out.seek(SeekFrom::Start(end))?;
        self.out.flush()?;

        Ok(self.out)
    }

    fn position(&mut self) -> Result<i64, MapFileError> {
        let position = self.out.stream_position()?;
        to_i64_offset(position)
    }

    fn backpatch_current_position(&mut self, placeholder: u64) -> Result<(), MapFileError> {
        let current = self.out.stream_position()?;
        self.out.seek(SeekFrom::Start(placeholder))?;
        write_i64(&mut self.out, to_i64_offset(current)?)?;
        self.out.seek(SeekFrom::Start(current))?;
        Ok(())
    }
}

fn to_i64_offset(position: u64) -> Result<i64, MapFileError> {
    i64::try_from(position).map_err(|_| MapFileError::CountOverflow {
        what: "Byte",
        count: position as usize,
    })
}

fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<(), MapFileError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_u16<W: Write>(w: &mut W, v: u16) -> Result<(), MapFileError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_i32<W: Write>(w: &mut W, v: i32) -> Result<(), MapFileError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_i64<W: Write>(w: &mut W, v: i64) -> Result<(), MapFileError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f64<W: Write>(w: &mut W, v: f64) -> Result<(), MapFileError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{
        map_data::osm::Coordinate,
        map_file::{
            sections::{MapFeatureEntry, StringEntry},
            COORDINATE_SIZE, MAP_FEATURE_SIZE, STRING_ENTRY_SIZE, TILE_BLOCK_HEADER_SIZE,
            TILE_INDEX_ENTRY_SIZE,
        },
    };

    use super::*;

    fn i32_at(bytes: &[u8], at: usize) -> i32 {
        i32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn i64_at(bytes: &[u8], at: usize) -> i64 {
        i64::from_le_bytes(bytes[at..at + 8].try_into().unwrap())
    }

    fn single_feature_sections() -> TileSections {
        TileSections {
            features: vec![MapFeatureEntry {
                id: 42,
                label_offset: 1,
                geometry_type: 2,
                coordinate_offset: 0,
                coordinate_count: 1,
                property_offset: 0,
                property_count: 1,
            }],
            coordinates: vec![Coordinate::new(1.5, -2.5)],
            string_entries: vec![
                StringEntry {
                    offset: 0,
                    length: 4,
                },
                StringEntry {
                    offset: 4,
                    length: 2,
                },
            ],
            characters: "nameAb".encode_utf16().collect(),
        }
    }

    #[test]
    fn header_and_index_are_reserved() {
        let writer = MapFileWriter::begin(Cursor::new(Vec::new()), vec![7, 9]).unwrap();

        let bytes = writer.out.into_inner();
        assert_eq!(bytes.len() as u64, FILE_HEADER_SIZE + 2 * TILE_INDEX_ENTRY_SIZE);
        assert_eq!(i64_at(&bytes, 0), FILE_VERSION);
        assert_eq!(i32_at(&bytes, 8), 2);
        assert_eq!(i32_at(&bytes, 12), 7);
        assert_eq!(i64_at(&bytes, 16), 0);
        assert_eq!(i32_at(&bytes, 24), 9);
    }

    #[test]
    fn block_offsets_are_backpatched() {
        let sections = single_feature_sections();
        let mut writer = MapFileWriter::begin(Cursor::new(Vec::new()), vec![3]).unwrap();

        let block_offset = writer.write_tile_block(3, &sections).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let block = block_offset as usize;
        assert_eq!(block as u64, FILE_HEADER_SIZE + TILE_INDEX_ENTRY_SIZE);
        assert_eq!(i32_at(&bytes, 12), 3);
        assert_eq!(i64_at(&bytes, 16), block_offset);

        assert_eq!(i32_at(&bytes, block), 1);
        assert_eq!(i32_at(&bytes, block + 4), 1);
        assert_eq!(i32_at(&bytes, block + 8), 2);
        assert_eq!(i32_at(&bytes, block + 12), 0);

        let coordinates_at = i64_at(&bytes, block + 16) as u64;
        let strings_at = i64_at(&bytes, block + 24) as u64;
        let characters_at = i64_at(&bytes, block + 32) as u64;
        assert_eq!(
            coordinates_at,
            block as u64 + TILE_BLOCK_HEADER_SIZE + MAP_FEATURE_SIZE
        );
        assert_eq!(strings_at, coordinates_at + COORDINATE_SIZE);
        assert_eq!(characters_at, strings_at + 2 * STRING_ENTRY_SIZE);
        assert_eq!(bytes.len() as u64, characters_at + 6 * 2);

        let feature = block + TILE_BLOCK_HEADER_SIZE as usize;
        assert_eq!(i64_at(&bytes, feature), 42);
        assert_eq!(i32_at(&bytes, feature + 8), 1);
        assert_eq!(bytes[feature + 12], 2);

        let lat = f64::from_le_bytes(
            bytes[coordinates_at as usize..coordinates_at as usize + 8]
                .try_into()
                .unwrap(),
        );
        assert_eq!(lat, 1.5);
        assert_eq!(
            u16::from_le_bytes([bytes[characters_at as usize], bytes[characters_at as usize + 1]]),
            'n' as u16
        );
    }

    #[test]
    fn tiles_must_follow_index_order() {
        let sections = TileSections::default();
        let mut writer = MapFileWriter::begin(Cursor::new(Vec::new()), vec![1, 2]).unwrap();

        let result = writer.write_tile_block(2, &sections);

        assert!(matches!(
            result,
            Err(MapFileError::UnexpectedTile {
                expected: Some(1),
                tile_id: 2
            })
        ));
    }

    #[test]
    fn finish_requires_every_tile() {
        let sections = TileSections::default();
        let mut writer = MapFileWriter::begin(Cursor::new(Vec::new()), vec![1, 2]).unwrap();
        writer.write_tile_block(1, &sections).unwrap();

        assert!(matches!(
            writer.finish(),
            Err(MapFileError::UnexpectedTile {
                expected: Some(2),
                ..
            })
        ));
    }
}
