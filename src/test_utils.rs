use crate::map_data::{
    osm::{Coordinate, OsmNode, OsmWay},
    store::{MapData, SharedMapData},
    tile_grid::RegularGrid,
};

pub const TEST_TILE_SIZE: f64 = 5.0;

pub fn node(id: i64, lat: f64, lon: f64, tags: &[(&str, &str)]) -> OsmNode {
    OsmNode {
        id,
        coordinate: Coordinate::new(lat, lon),
        tags: tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

pub fn way(id: i64, node_ids: &[i64], tags: &[(&str, &str)]) -> OsmWay {
    OsmWay {
        id,
        node_ids: node_ids.to_vec(),
        tags: tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

pub fn get_test_data() -> (Vec<OsmNode>, Vec<OsmWay>) {
    //  3 ----- 4 ----- 5      way 101 (3, 4, 5), way 102 (5, 4)
    //  | \
    //  |   \                  way 100 (1, 2, 3, 1), closed
    //  1 --- 2
    //
    //  6 and 7 are not part of any way
    (
        vec![
            node(1, 1.0, 1.0, &[]),
            node(2, 1.0, 2.0, &[]),
            node(3, 2.0, 2.0, &[]),
            node(4, 3.0, 3.0, &[("amenity", "restaurant")]),
            node(5, 3.0, 4.0, &[("highway", "traffic_signals")]),
            node(6, 10.0, 10.0, &[("name", "Lonely Hill"), ("natural", "peak")]),
            node(7, 20.0, 20.0, &[("place", "town")]),
        ],
        vec![
            way(102, &[5, 4], &[("foo", "bar"), ("building", "no")]),
            way(100, &[1, 2, 3, 1], &[("landuse", "forest")]),
            way(
                101,
                &[3, 4, 5],
                &[("highway", "primary"), ("name", "Elm Street")],
            ),
        ],
    )
}

pub fn map_data_from(nodes: Vec<OsmNode>, ways: Vec<OsmWay>) -> MapData {
    let shared = SharedMapData::new();
    shared.extend(nodes, ways);
    shared.freeze(&RegularGrid::new(TEST_TILE_SIZE).expect("valid test tile size"))
}

pub fn get_test_map_data() -> MapData {
    let (nodes, ways) = get_test_data();
    map_data_from(nodes, ways)
}
