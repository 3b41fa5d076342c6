//! Vector output: one layer of a single geometry type with a fixed attribute schema.
//!
//! Fields are declared up front, then features are written one by one. The schema is frozen
//! by the first written feature since most vector formats cannot change columns afterwards.

mod csv_layer;
mod geojson_layer;

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use geo_types::{Coord, LineString, Point};

use crate::error::{Error, Result};

use self::csv_layer::CsvLayer;
use self::geojson_layer::{GeoJsonLayer, GeoJsonSeqLayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    GeoJson,
    GeoJsonSeq,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "geojson" => Ok(OutputFormat::GeoJson),
            "geojsonseq" => Ok(OutputFormat::GeoJsonSeq),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

impl OutputFormat {
    /// Column the driver writes the geometry into, if it has one.
    pub fn geometry_column(self) -> Option<&'static str> {
        match self {
            OutputFormat::Csv => Some(csv_layer::GEOMETRY_COLUMN),
            OutputFormat::GeoJson | OutputFormat::GeoJsonSeq => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Csv => "CSV",
            OutputFormat::GeoJson => "GeoJSON",
            OutputFormat::GeoJsonSeq => "GeoJSONSeq",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    LineString,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    LineString(LineString<f64>),
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point(Point::new(lon, lat))
    }

    /// Build a line from `coords`, collapsing consecutive duplicates. Fails if fewer than two
    /// distinct points remain.
    pub fn line_string<I>(coords: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut unique: Vec<Coord<f64>> = Vec::new();
        for (x, y) in coords {
            let coord = Coord { x, y };
            if unique.last() != Some(&coord) {
                unique.push(coord);
            }
        }
        if unique.len() < 2 {
            return Err(Error::Geometry(
                "need at least two distinct points for a linestring".to_string(),
            ));
        }
        Ok(Geometry::LineString(LineString::from(unique)))
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Real,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    /// Maximum length of string values in characters. 0 means unbounded.
    pub width: usize,
    /// Decimal places written for real values.
    pub precision: usize,
}

impl FieldDefinition {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            width: 0,
            precision: 0,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Real(f64),
    String(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<FieldDefinition>,
}

impl Schema {
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

/// One output record. Values are aligned with the layer schema; `None` means unset.
#[derive(Debug, Clone)]
pub struct Feature {
    schema: Rc<Schema>,
    geometry: Geometry,
    values: Vec<Option<FieldValue>>,
}

impl Feature {
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn values(&self) -> &[Option<FieldValue>] {
        &self.values
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        let idx = self.schema.index_of(name)?;
        self.values[idx].as_ref()
    }

    pub fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        let defn = &self.schema.fields[idx];
        let value = match (defn.field_type, value) {
            (FieldType::Integer, FieldValue::Integer(v)) => FieldValue::Integer(v),
            (FieldType::Real, FieldValue::Real(v)) => FieldValue::Real(v),
            (FieldType::Real, FieldValue::Integer(v)) => FieldValue::Real(v as f64),
            (FieldType::String, FieldValue::String(v)) => {
                FieldValue::String(truncate_chars(v, defn.width))
            }
            (field_type, _) => {
                return Err(Error::FieldTypeMismatch {
                    name: name.to_string(),
                    expected: match field_type {
                        FieldType::Integer => "integer",
                        FieldType::Real => "real",
                        FieldType::String => "string",
                    },
                })
            }
        };
        self.values[idx] = Some(value);
        Ok(())
    }

    pub fn set_integer(&mut self, name: &str, value: i64) -> Result<()> {
        self.set_field(name, FieldValue::Integer(value))
    }

    pub fn set_real(&mut self, name: &str, value: f64) -> Result<()> {
        self.set_field(name, FieldValue::Real(value))
    }

    pub fn set_string(&mut self, name: &str, value: &str) -> Result<()> {
        self.set_field(name, FieldValue::String(value.to_string()))
    }
}

fn truncate_chars(value: String, width: usize) -> String {
    if width == 0 {
        return value;
    }
    match value.char_indices().nth(width) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value,
    }
}

enum LayerWriter {
    Csv(CsvLayer),
    GeoJson(GeoJsonLayer),
    GeoJsonSeq(GeoJsonSeqLayer),
}

/// The single output layer of a run, backed by a file in the chosen format.
pub struct Layer {
    name: String,
    format: OutputFormat,
    geometry_type: GeometryType,
    schema: Rc<Schema>,
    frozen: bool,
    written: u64,
    writer: LayerWriter,
}

impl Layer {
    pub fn create(
        format: OutputFormat,
        path: &Path,
        name: &str,
        geometry_type: GeometryType,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let writer = match format {
            OutputFormat::Csv => LayerWriter::Csv(CsvLayer::new(::csv::Writer::from_path(path)?)),
            OutputFormat::GeoJson => {
                LayerWriter::GeoJson(GeoJsonLayer::new(BufWriter::new(File::create(path)?), name))
            }
            OutputFormat::GeoJsonSeq => {
                LayerWriter::GeoJsonSeq(GeoJsonSeqLayer::new(BufWriter::new(File::create(path)?)))
            }
        };
        Ok(Self {
            name: name.to_string(),
            format,
            geometry_type,
            schema: Rc::new(Schema::default()),
            frozen: false,
            written: 0,
            writer,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn features_written(&self) -> u64 {
        self.written
    }

    pub fn add_field(&mut self, defn: FieldDefinition) -> Result<()> {
        if self.frozen {
            return Err(Error::SchemaFrozen(defn.name));
        }
        if self.format.geometry_column() == Some(defn.name.as_str()) {
            return Err(Error::ReservedField(defn.name));
        }
        if self.schema.index_of(&defn.name).is_some() {
            return Err(Error::DuplicateField(defn.name));
        }
        Rc::make_mut(&mut self.schema).fields.push(defn);
        Ok(())
    }

    pub fn create_feature(&self, geometry: Geometry) -> Feature {
        Feature {
            values: vec![None; self.schema.fields.len()],
            schema: Rc::clone(&self.schema),
            geometry,
        }
    }

    pub fn write_feature(&mut self, feature: &Feature) -> Result<()> {
        if feature.geometry.geometry_type() != self.geometry_type {
            return Err(Error::Geometry(format!(
                "layer '{}' only accepts {:?} geometries",
                self.name, self.geometry_type
            )));
        }
        self.frozen = true;
        match &mut self.writer {
            LayerWriter::Csv(w) => w.write(&self.schema, feature)?,
            LayerWriter::GeoJson(w) => w.write(&self.schema, feature)?,
            LayerWriter::GeoJsonSeq(w) => w.write(&self.schema, feature)?,
        }
        self.written += 1;
        Ok(())
    }

    /// Flush everything to disk. Dropping a layer without closing it leaves a best-effort,
    /// possibly incomplete file behind.
    pub fn close(self) -> Result<()> {
        match self.writer {
            LayerWriter::Csv(w) => w.finish(&self.schema),
            LayerWriter::GeoJson(w) => w.finish(),
            LayerWriter::GeoJsonSeq(w) => w.finish(),
        }
    }
}

pub(crate) fn format_real(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

pub(crate) fn round_real(value: f64, precision: usize) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_layer() -> (tempfile::TempDir, Layer) {
        let dir = tempfile::tempdir().unwrap();
        let mut layer = Layer::create(
            OutputFormat::Csv,
            &dir.path().join("out.csv"),
            "test",
            GeometryType::Point,
        )
        .unwrap();
        layer
            .add_field(FieldDefinition::new("osm_id", FieldType::Integer))
            .unwrap();
        layer
            .add_field(FieldDefinition::new("name", FieldType::String).with_width(5))
            .unwrap();
        (dir, layer)
    }

    #[test]
    fn format_names_are_case_insensitive() {
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("GeoJSON".parse::<OutputFormat>().unwrap(), OutputFormat::GeoJson);
        assert_eq!("geojsonseq".parse::<OutputFormat>().unwrap(), OutputFormat::GeoJsonSeq);
        assert!(matches!(
            "ESRI Shapefile".parse::<OutputFormat>(),
            Err(Error::UnknownFormat(_))
        ));
    }

    #[test]
    fn line_string_collapses_repeated_points() {
        let geom = Geometry::line_string(vec![(1.0, 1.0), (1.0, 1.0), (2.0, 2.0), (2.0, 2.0)]).unwrap();
        match geom {
            Geometry::LineString(line) => assert_eq!(line.0.len(), 2),
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn line_string_needs_two_distinct_points() {
        assert!(Geometry::line_string(vec![(1.0, 1.0), (1.0, 1.0)]).is_err());
        assert!(Geometry::line_string(Vec::<(f64, f64)>::new()).is_err());
    }

    #[test]
    fn unset_fields_stay_empty() {
        let (_dir, layer) = schema_layer();
        let mut feature = layer.create_feature(Geometry::point(1.0, 2.0));
        feature.set_integer("osm_id", 42).unwrap();
        assert_eq!(feature.field("osm_id"), Some(&FieldValue::Integer(42)));
        assert_eq!(feature.field("name"), None);
        assert_eq!(feature.values().len(), 2);
    }

    #[test]
    fn strings_are_truncated_to_width() {
        let (_dir, layer) = schema_layer();
        let mut feature = layer.create_feature(Geometry::point(1.0, 2.0));
        feature.set_string("name", "Straßenbahn").unwrap();
        assert_eq!(
            feature.field("name"),
            Some(&FieldValue::String("Straß".to_string()))
        );
    }

    #[test]
    fn unknown_and_mistyped_fields_are_rejected() {
        let (_dir, layer) = schema_layer();
        let mut feature = layer.create_feature(Geometry::point(1.0, 2.0));
        assert!(matches!(
            feature.set_string("nope", "x"),
            Err(Error::UnknownField(_))
        ));
        assert!(matches!(
            feature.set_string("osm_id", "x"),
            Err(Error::FieldTypeMismatch { .. })
        ));
    }

    #[test]
    fn schema_is_frozen_after_first_write() {
        let (_dir, mut layer) = schema_layer();
        assert!(matches!(
            layer.add_field(FieldDefinition::new("name", FieldType::String)),
            Err(Error::DuplicateField(_))
        ));

        let feature = layer.create_feature(Geometry::point(1.0, 2.0));
        layer.write_feature(&feature).unwrap();
        assert_eq!(layer.features_written(), 1);
        assert!(matches!(
            layer.add_field(FieldDefinition::new("late", FieldType::String)),
            Err(Error::SchemaFrozen(_))
        ));
    }

    #[test]
    fn csv_geometry_column_name_is_taken() {
        let (_dir, mut layer) = schema_layer();
        assert!(matches!(
            layer.add_field(FieldDefinition::new("WKT", FieldType::String)),
            Err(Error::ReservedField(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let mut layer = Layer::create(
            OutputFormat::GeoJson,
            &dir.path().join("out.geojson"),
            "test",
            GeometryType::Point,
        )
        .unwrap();
        layer.add_field(FieldDefinition::new("WKT", FieldType::String)).unwrap();
    }

    #[test]
    fn geometry_type_must_match_layer() {
        let (_dir, mut layer) = schema_layer();
        let line = layer.create_feature(Geometry::line_string(vec![(0.0, 0.0), (1.0, 1.0)]).unwrap());
        assert!(layer.write_feature(&line).is_err());
    }

    #[test]
    fn real_formatting_and_rounding() {
        assert_eq!(format_real(1234.56789, 3), "1234.568");
        assert_eq!(format_real(2.0, 3), "2.000");
        assert_eq!(round_real(1234.56789, 3), 1234.568);
    }
}
