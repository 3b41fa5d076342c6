use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("PBF error: {0}")]
    Pbf(#[from] osmpbfreader::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed input at byte {offset}: {msg}")]
    MalformedInput { offset: u64, msg: String },
    #[error("unknown output format '{0}' (supported: CSV, GeoJSON, GeoJSONSeq)")]
    UnknownFormat(String),
    #[error("field '{0}' is not part of the layer schema")]
    UnknownField(String),
    #[error("'{0}' is a reserved column name")]
    ReservedField(String),
    #[error("field '{0}' is declared twice")]
    DuplicateField(String),
    #[error("cannot declare field '{0}' after features were written")]
    SchemaFrozen(String),
    #[error("field '{name}' expects a {expected} value")]
    FieldTypeMismatch {
        name: String,
        expected: &'static str,
    },
    #[error("geometry error: {0}")]
    Geometry(String),
}

pub type Result<T> = std::result::Result<T, Error>;
