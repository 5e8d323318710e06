use serde::Serialize;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKey {
    Place,
    Boundary,
    AdminLevel,
    Water,
    Highway,
    Railway,
    Natural,
    Landuse,
    Building,
    Leisure,
    Amenity,
    Name,
}

impl PropertyKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKey::Place => "place",
            PropertyKey::Boundary => "boundary",
            PropertyKey::AdminLevel => "admin_level",
            PropertyKey::Water => "water",
            PropertyKey::Highway => "highway",
            PropertyKey::Railway => "railway",
            PropertyKey::Natural => "natural",
            PropertyKey::Landuse => "landuse",
            PropertyKey::Building => "building",
            PropertyKey::Leisure => "leisure",
            PropertyKey::Amenity => "amenity",
            PropertyKey::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueCategory {
    City,
    Town,
    Locality,
    Hamlet,
    Administrative,
    Two,
    Motorway,
    Forest,
    Orchard,
    Residential,
    Farm,
    Reservoir,
    Basin,
    Restaurant,
    Water,
    Yes,
}

impl ValueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueCategory::City => "city",
            ValueCategory::Town => "town",
            ValueCategory::Locality => "locality",
            ValueCategory::Hamlet => "hamlet",
            ValueCategory::Administrative => "administrative",
            ValueCategory::Two => "two",
            ValueCategory::Motorway => "motorway",
            ValueCategory::Forest => "forest",
            ValueCategory::Orchard => "orchard",
            ValueCategory::Residential => "residential",
            ValueCategory::Farm => "farm",
            ValueCategory::Reservoir => "reservoir",
            ValueCategory::Basin => "basin",
            ValueCategory::Restaurant => "restaurant",
            ValueCategory::Water => "water",
            ValueCategory::Yes => "yes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Category(ValueCategory),
    Label(String),
}

impl PropertyValue {
    pub fn as_str(&self) -> &str {
        match self {
            PropertyValue::Category(category) => category.as_str(),
            PropertyValue::Label(text) => text,
        }
    }
}

/// Key prefixes in match priority order.
const KEY_PREFIXES: [(&str, PropertyKey); 12] = [
    ("place", PropertyKey::Place),
    ("boundary", PropertyKey::Boundary),
    ("admin_level", PropertyKey::AdminLevel),
    ("water", PropertyKey::Water),
    ("highway", PropertyKey::Highway),
    ("railway", PropertyKey::Railway),
    ("natural", PropertyKey::Natural),
    ("landuse", PropertyKey::Landuse),
    ("building", PropertyKey::Building),
    ("leisure", PropertyKey::Leisure),
    ("amenity", PropertyKey::Amenity),
    ("name", PropertyKey::Name),
];

/// Value prefix groups in match priority order.
const VALUE_PREFIXES: [(&[&str], ValueCategory); 16] = [
    (&["city"], ValueCategory::City),
    (&["town"], ValueCategory::Town),
    (&["locality"], ValueCategory::Locality),
    (&["hamlet"], ValueCategory::Hamlet),
    (&["administrative"], ValueCategory::Administrative),
    (&["2"], ValueCategory::Two),
    (
        &[
            "motorway",
            "trunk",
            "primary",
            "secondary",
            "tertiary",
            "road",
            "path",
            "service",
            "footway",
            "track",
            "steps",
        ],
        ValueCategory::Motorway,
    ),
    (&["forest"], ValueCategory::Forest),
    (&["orchard"], ValueCategory::Orchard),
    (
        &[
            "residential",
            "cemetery",
            "industrial",
            "commercial",
            "square",
            "construction",
            "military",
            "quarry",
            "brownfield",
            "office",
            "apartment",
            "house",
        ],
        ValueCategory::Residential,
    ),
    (
        &[
            "farm",
            "meadow",
            "grass",
            "greenfield",
            "recreation_ground",
            "winter_sports",
            "allotments",
        ],
        ValueCategory::Farm,
    ),
    (&["reservoir"], ValueCategory::Reservoir),
    (&["basin", "stream"], ValueCategory::Basin),
    (&["restaurant"], ValueCategory::Restaurant),
    (&["water", "river"], ValueCategory::Water),
    (&["yes", "swimming", "parking"], ValueCategory::Yes),
];

pub fn classify_key(key: &str) -> Option<PropertyKey> {
    KEY_PREFIXES
        .iter()
        .find(|(prefix, _)| key.starts_with(prefix))
        .map(|(_, property_key)| *property_key)
}

pub fn classify_value(value: &str) -> Option<ValueCategory> {
    VALUE_PREFIXES
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|prefix| value.starts_with(prefix)))
        .map(|(_, category)| *category)
}

/// Parallel key and value lists of one feature under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyList {
    keys: Vec<PropertyKey>,
    values: Vec<PropertyValue>,
    label_offset: Option<usize>,
}

impl PropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_parts(
        keys: Vec<PropertyKey>,
        values: Vec<PropertyValue>,
        label_offset: Option<usize>,
    ) -> Self {
        Self {
            keys,
            values,
            label_offset,
        }
    }

    /// Appends the key first and the value second. A key whose value does not classify is
    /// taken back out again so the two lists never drift apart.
    ///
    /// `properties_before` is the number of properties already written for earlier features of
    /// the same tile; a `name` tag points the label at the value string of its own pair.
    pub fn push_tag(&mut self, key: &str, value: &str, properties_before: usize) {
        let property_key = match classify_key(key) {
            Some(property_key) => property_key,
            None => {
                trace!(key, "Dropping tag with unknown key");
                return;
            }
        };

        if property_key == PropertyKey::Name {
            let local_index = self.keys.len();
            self.label_offset = Some(2 * (properties_before + local_index) + 1);
            self.keys.push(property_key);
            self.values.push(PropertyValue::Label(value.to_string()));
            return;
        }

        self.keys.push(property_key);
        match classify_value(value) {
            Some(category) => self.values.push(PropertyValue::Category(category)),
            None => {
                trace!(key, value, "Dropping tag with unknown value");
                self.keys.pop();
            }
        }
    }

    pub fn push_tags<'a, I>(&mut self, tags: I, properties_before: usize)
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        for (key, value) in tags {
            self.push_tag(key, value, properties_before);
        }
    }

    pub fn keys(&self) -> &[PropertyKey] {
        &self.keys
    }

    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn label_offset(&self) -> Option<usize> {
        self.label_offset
    }

    pub fn is_balanced(&self) -> bool {
        self.keys.len() == self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyValue)> {
        self.keys.iter().zip(self.values.iter())
    }
}
