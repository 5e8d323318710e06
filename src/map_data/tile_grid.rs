use super::{osm::Coordinate, MapDataError};

/// Maps a coordinate onto the id of the tile that contains it.
///
/// Implementations must be pure and total: every consumer that re-derives tile ids from
/// coordinates (a renderer looking up a tile, for instance) relies on getting bit-for-bit the
/// same answer the converter got.
pub trait TileGrid {
    fn tile_id_of(&self, coordinate: Coordinate) -> i32;
}

const MAX_CELLS_PER_AXIS: u32 = 1 << 15;

/// Equal-angle grid over the whole globe, tile ids are the Z-order interleave of row and column.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularGrid {
    tile_size_degrees: f64,
    rows: u32,
    cols: u32,
}

impl RegularGrid {
    pub fn new(tile_size_degrees: f64) -> Result<Self, MapDataError> {
        if !tile_size_degrees.is_finite() || tile_size_degrees <= 0.0 {
            return Err(MapDataError::InvalidTileSize { tile_size_degrees });
        }
        let rows = (180.0 / tile_size_degrees).ceil();
        let cols = (360.0 / tile_size_degrees).ceil();
        if rows > MAX_CELLS_PER_AXIS as f64 || cols > MAX_CELLS_PER_AXIS as f64 {
            return Err(MapDataError::TileGridTooLarge {
                tile_size_degrees,
                max_cells_per_axis: MAX_CELLS_PER_AXIS,
            });
        }

        Ok(Self {
            tile_size_degrees,
            rows: rows as u32,
            cols: cols as u32,
        })
    }

    pub fn tile_size_degrees(&self) -> f64 {
        self.tile_size_degrees
    }

    fn get_cell(&self, coordinate: Coordinate) -> (u32, u32) {
        // float to int casts saturate and map NaN to 0, the clamp keeps the poles and the
        // antimeridian inside the last cell
        let row = ((coordinate.lat + 90.0) / self.tile_size_degrees).floor() as u32;
        let col = ((coordinate.lon + 180.0) / self.tile_size_degrees).floor() as u32;
        (row.min(self.rows - 1), col.min(self.cols - 1))
    }
}

impl TileGrid for RegularGrid {
    fn tile_id_of(&self, coordinate: Coordinate) -> i32 {
        let (row, col) = self.get_cell(coordinate);
        let id = (interleave_u16_with_zeros(row as u16) << 1) | interleave_u16_with_zeros(col as u16);
        // rows and cols stay below 2^15, so the interleave fits in 30 bits
        id as i32
    }
}

fn interleave_u16_with_zeros(input: u16) -> u32 {
    let mut output: u32 = input.into();
    output = (output ^ (output << 8)) & 0x00ff00ff;
    output = (output ^ (output << 4)) & 0x0f0f0f0f;
    output = (output ^ (output << 2)) & 0x33333333;
    output = (output ^ (output << 1)) & 0x55555555;
    output
}
