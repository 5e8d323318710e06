use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};

use dashmap::DashMap;
use tracing::trace;

use super::{
    osm::{OsmNode, OsmWay},
    tile_grid::TileGrid,
};

/// Node and way tables filled by the readers. Safe to share between ingestion tasks; nodes
/// with a duplicate id replace the earlier one.
#[derive(Debug, Default)]
pub struct SharedMapData {
    nodes: DashMap<i64, OsmNode>,
    ways: Mutex<Vec<OsmWay>>,
}

impl SharedMapData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&self, nodes: Vec<OsmNode>, ways: Vec<OsmWay>) {
        for node in nodes {
            self.nodes.insert(node.id, node);
        }
        if !ways.is_empty() {
            // a panicking ingestion task aborts the whole conversion anyway, the list is still usable
            self.ways
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(ways);
        }
    }

    /// Ends ingestion. Consumes the shared tables, so no reader can still be appending, and
    /// assigns every node to its tile.
    pub fn freeze(self, grid: &dyn TileGrid) -> MapData {
        let nodes: BTreeMap<i64, OsmNode> = self.nodes.into_iter().collect();
        let mut ways = self
            .ways
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        ways.sort_by_key(|way| way.id);

        let mut tiles: BTreeMap<i32, Vec<i64>> = BTreeMap::new();
        for (id, node) in &nodes {
            tiles
                .entry(grid.tile_id_of(node.coordinate))
                .or_default()
                .push(*id);
        }

        trace!(
            nodes = nodes.len(),
            ways = ways.len(),
            tiles = tiles.len(),
            "Map data frozen"
        );

        MapData {
            nodes,
            ways,
            tiles,
        }
    }
}

/// Immutable snapshot used by tile processing.
#[derive(Debug, Default)]
pub struct MapData {
    nodes: BTreeMap<i64, OsmNode>,
    ways: Vec<OsmWay>,
    tiles: BTreeMap<i32, Vec<i64>>,
}

impl MapData {
    pub fn get_node(&self, id: &i64) -> Option<&OsmNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &OsmNode> {
        self.nodes.values()
    }

    pub fn ways(&self) -> &[OsmWay] {
        &self.ways
    }

    pub fn tiles(&self) -> &BTreeMap<i32, Vec<i64>> {
        &self.tiles
    }

    pub fn tile_ids(&self) -> Vec<i32> {
        self.tiles.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
