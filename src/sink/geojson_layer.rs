use std::fs::File;
use std::io::{BufWriter, Write};

use geojson::{FeatureWriter, JsonObject, JsonValue};

use super::{round_real, Feature, FieldValue, Geometry, Schema};
use crate::error::Result;

fn to_geojson(schema: &Schema, feature: &Feature) -> geojson::Feature {
    let value = match feature.geometry() {
        Geometry::Point(point) => geojson::Value::from(point),
        Geometry::LineString(line) => geojson::Value::from(line),
    };

    let mut properties = JsonObject::new();
    for (defn, field) in schema.fields().iter().zip(feature.values()) {
        let json = match field {
            None => JsonValue::Null,
            Some(FieldValue::Integer(v)) => JsonValue::from(*v),
            Some(FieldValue::Real(v)) => JsonValue::from(round_real(*v, defn.precision)),
            Some(FieldValue::String(v)) => JsonValue::from(v.as_str()),
        };
        properties.insert(defn.name.clone(), json);
    }

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// A single FeatureCollection, streamed feature by feature.
///
/// The layer name goes into a `"name"` member ahead of the first feature. A collection without
/// features has no name, as `FeatureWriter` cannot close one that only holds foreign members.
pub struct GeoJsonLayer {
    writer: FeatureWriter<BufWriter<File>>,
    name: String,
    started: bool,
}

impl GeoJsonLayer {
    pub fn new(writer: BufWriter<File>, name: &str) -> Self {
        Self {
            writer: FeatureWriter::from_writer(writer),
            name: name.to_string(),
            started: false,
        }
    }

    pub fn write(&mut self, schema: &Schema, feature: &Feature) -> Result<()> {
        if !self.started {
            self.writer.write_foreign_member("name", &self.name)?;
            self.started = true;
        }
        self.writer.write_feature(&to_geojson(schema, feature))?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.finish()?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Newline delimited GeoJSON features.
pub struct GeoJsonSeqLayer {
    writer: BufWriter<File>,
}

impl GeoJsonSeqLayer {
    pub fn new(writer: BufWriter<File>) -> Self {
        Self { writer }
    }

    pub fn write(&mut self, schema: &Schema, feature: &Feature) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &to_geojson(schema, feature))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
