use std::collections::HashSet;

use serde::Serialize;
use tracing::trace;

use crate::map_data::{
    osm::{Coordinate, OsmNode, OsmWay},
    store::MapData,
    MapDataError,
};

use super::tags::PropertyList;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum GeometryType {
    Polyline = 0,
    Polygon = 1,
    Point = 2,
}

impl GeometryType {
    pub fn from_way_coordinates(coordinates: &[Coordinate]) -> Self {
        match (coordinates.first(), coordinates.last()) {
            (Some(first), Some(last)) if coordinates.len() >= 2 && first == last => {
                GeometryType::Polygon
            }
            _ => GeometryType::Polyline,
        }
    }

    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(GeometryType::Polyline),
            1 => Some(GeometryType::Polygon),
            2 => Some(GeometryType::Point),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub id: i64,
    pub geometry_type: GeometryType,
    pub coordinates: Vec<Coordinate>,
    pub properties: PropertyList,
}

impl FeatureRecord {
    pub fn label_offset(&self) -> Option<usize> {
        self.properties.label_offset()
    }
}

/// Builds the features of one tile.
///
/// Every tile walks the complete way list and then turns every node that no way used into a
/// point, so each tile re-derives the full feature set.
pub struct TileFeatureBuilder<'a> {
    map_data: &'a MapData,
    used_nodes: HashSet<i64>,
    property_count: usize,
    features: Vec<FeatureRecord>,
}

impl<'a> TileFeatureBuilder<'a> {
    pub fn new(map_data: &'a MapData) -> Self {
        Self {
            map_data,
            used_nodes: HashSet::new(),
            property_count: 0,
            features: Vec::new(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn build(mut self, tile_id: i32) -> Result<Vec<FeatureRecord>, MapDataError> {
        let map_data = self.map_data;
        for way in map_data.ways() {
            let feature = self.build_way_feature(way)?;
            self.push_feature(feature)?;
        }

        let way_feature_count = self.features.len();
        for node in map_data.nodes() {
            if self.used_nodes.contains(&node.id) {
                continue;
            }
            let feature = self.build_point_feature(node);
            self.push_feature(feature)?;
        }

        trace!(
            way_features = way_feature_count,
            point_features = self.features.len() - way_feature_count,
            properties = self.property_count,
            "Tile features built"
        );

        Ok(self.features)
    }

    fn build_way_feature(&mut self, way: &OsmWay) -> Result<FeatureRecord, MapDataError> {
        let mut properties = PropertyList::new();
        properties.push_tags(&way.tags, self.property_count);

        let mut coordinates = Vec::with_capacity(way.node_ids.len());
        for node_id in &way.node_ids {
            let node = self
                .map_data
                .get_node(node_id)
                .ok_or(MapDataError::MissingNode {
                    way_id: way.id,
                    node_id: *node_id,
                })?;
            // tags of the member nodes end up on the way feature as well
            properties.push_tags(&node.tags, self.property_count);
            coordinates.push(node.coordinate);
            self.used_nodes.insert(*node_id);
        }

        Ok(FeatureRecord {
            id: way.id,
            geometry_type: GeometryType::from_way_coordinates(&coordinates),
            coordinates,
            properties,
        })
    }

    fn build_point_feature(&self, node: &OsmNode) -> FeatureRecord {
        let mut properties = PropertyList::new();
        properties.push_tags(&node.tags, self.property_count);

        FeatureRecord {
            id: node.id,
            geometry_type: GeometryType::Point,
            coordinates: vec![node.coordinate],
            properties,
        }
    }

    fn push_feature(&mut self, feature: FeatureRecord) -> Result<(), MapDataError> {
        // push_tag keeps keys and values paired; this check holds the file format to that contract
        if !feature.properties.is_balanced() {
            return Err(MapDataError::PropertyCountMismatch {
                feature_id: feature.id,
                key_count: feature.properties.keys().len(),
                value_count: feature.properties.values().len(),
            });
        }
        self.property_count += feature.properties.len();
        self.features.push(feature);
        Ok(())
    }
}
