use serde::Serialize;

pub type OsmTags = Vec<(String, String)>;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OsmNode {
    pub id: i64,
    pub coordinate: Coordinate,
    pub tags: OsmTags,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OsmWay {
    pub id: i64,
    pub node_ids: Vec<i64>,
    pub tags: OsmTags,
}
