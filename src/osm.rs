pub use osmpbfreader::Tags;

/// A WGS84 coordinate as delivered by the input, possibly unknown.
///
/// A location is undefined when the source had no coordinate for the node, e.g. a way in a
/// partial extract referencing a node that was cut away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lon: f64,
    pub lat: f64,
}

impl Location {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn undefined() -> Self {
        Self {
            lon: f64::NAN,
            lat: f64::NAN,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::undefined()
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: i64,
    pub location: Location,
    pub tags: Tags,
}

#[derive(Debug, Clone)]
pub struct Way {
    pub id: i64,
    pub node_refs: Vec<i64>,
    pub tags: Tags,
}

/// A way node reference together with the location the index resolved it to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayNode {
    pub id: i64,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum OsmObject {
    Node(Node),
    Way(Way),
    Relation(i64),
}

impl From<osmpbfreader::OsmObj> for OsmObject {
    fn from(obj: osmpbfreader::OsmObj) -> Self {
        match obj {
            osmpbfreader::OsmObj::Node(node) => OsmObject::Node(Node {
                id: node.id.0,
                location: Location::new(node.lon(), node.lat()),
                tags: node.tags,
            }),
            osmpbfreader::OsmObj::Way(way) => OsmObject::Way(Way {
                id: way.id.0,
                node_refs: way.nodes.iter().map(|node_id| node_id.0).collect(),
                tags: way.tags,
            }),
            osmpbfreader::OsmObj::Relation(relation) => OsmObject::Relation(relation.id.0),
        }
    }
}
