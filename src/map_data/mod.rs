pub mod osm;
pub mod store;
pub mod tile_grid;

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum MapDataError {
    #[error("Way {way_id} references missing node with ID: {node_id}")]
    MissingNode { way_id: i64, node_id: i64 },

    #[error(
        "Feature {feature_id} has {key_count} property keys but {value_count} property values"
    )]
    PropertyCountMismatch {
        feature_id: i64,
        key_count: usize,
        value_count: usize,
    },

    #[error("Tile size must be a positive number of degrees, got {tile_size_degrees}")]
    InvalidTileSize { tile_size_degrees: f64 },

    #[error(
        "Tile size {tile_size_degrees} needs more than {max_cells_per_axis} tiles along an axis"
    )]
    TileGridTooLarge {
        tile_size_degrees: f64,
        max_cells_per_axis: u32,
    },
}
