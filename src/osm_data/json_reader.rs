use std::{fmt, fs::File, io::BufReader, path::Path, time::Instant};

use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};
use tracing::trace;

use crate::map_data::{
    osm::{Coordinate, OsmNode, OsmTags, OsmWay},
    store::SharedMapData,
};

use super::OsmDataReaderError;

/// Overpass API JSON output, `[out:json]`.
#[derive(Debug, Deserialize)]
struct OverpassDocument {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OverpassElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default, deserialize_with = "tags_in_document_order")]
        tags: OsmTags,
    },
    Way {
        id: i64,
        nodes: Vec<i64>,
        #[serde(default, deserialize_with = "tags_in_document_order")]
        tags: OsmTags,
    },
    #[serde(other)]
    Other,
}

// tag order decides key order and which name wins, so the object is not collected into a map
fn tags_in_document_order<'de, D>(deserializer: D) -> Result<OsmTags, D::Error>
where
    D: Deserializer<'de>,
{
    struct TagsVisitor;

    impl<'de> Visitor<'de> for TagsVisitor {
        type Value = OsmTags;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an object of string tags")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut tags = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, String>()? {
                tags.push(entry);
            }
            Ok(tags)
        }
    }

    deserializer.deserialize_map(TagsVisitor)
}

pub struct JsonReader<'a> {
    map_data: &'a SharedMapData,
    file_name: &'a Path,
}

impl<'a> JsonReader<'a> {
    pub fn new(map_data: &'a SharedMapData, file_name: &'a Path) -> Self {
        Self {
            map_data,
            file_name,
        }
    }

    pub fn read(self) -> Result<(), OsmDataReaderError> {
        let read_start = Instant::now();

        let file =
            File::open(self.file_name).map_err(|error| OsmDataReaderError::FileError { error })?;
        let document: OverpassDocument = serde_json::from_reader(BufReader::new(file))
            .map_err(|error| OsmDataReaderError::JsonParseError { error })?;

        let mut nodes = Vec::new();
        let mut ways = Vec::new();
        let mut skipped = 0usize;
        for element in document.elements {
            match element {
                OverpassElement::Node { id, lat, lon, tags } => nodes.push(OsmNode {
                    id,
                    coordinate: Coordinate::new(lat, lon),
                    tags,
                }),
                OverpassElement::Way { id, nodes: node_ids, tags } => ways.push(OsmWay {
                    id,
                    node_ids,
                    tags,
                }),
                OverpassElement::Other => skipped += 1,
            }
        }
        if skipped > 0 {
            trace!(skipped, "Skipped elements that are neither nodes nor ways");
        }
        self.map_data.extend(nodes, ways);

        trace!(
            read_duration_secs = read_start.elapsed().as_secs(),
            "File read done"
        );

        Ok(())
    }
}
