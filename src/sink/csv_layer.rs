use std::fs::File;

use csv::Writer;
use itertools::Itertools;

use super::{format_real, Feature, FieldValue, Geometry, Schema};
use crate::error::Result;

pub const GEOMETRY_COLUMN: &str = "WKT";

/// CSV with the geometry as WKT in the first column.
pub struct CsvLayer {
    writer: Writer<File>,
    header_written: bool,
}

impl CsvLayer {
    pub fn new(writer: Writer<File>) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    fn write_header(&mut self, schema: &Schema) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        let mut header = vec![GEOMETRY_COLUMN.to_string()];
        header.extend(schema.fields().iter().map(|field| field.name.clone()));
        self.writer.write_record(&header)?;
        self.header_written = true;
        Ok(())
    }

    pub fn write(&mut self, schema: &Schema, feature: &Feature) -> Result<()> {
        self.write_header(schema)?;

        let mut record = Vec::with_capacity(schema.fields().len() + 1);
        record.push(to_wkt(feature.geometry()));
        for (defn, value) in schema.fields().iter().zip(feature.values()) {
            let cell = match value {
                None => String::new(),
                Some(FieldValue::Integer(v)) => v.to_string(),
                Some(FieldValue::Real(v)) => format_real(*v, defn.precision),
                Some(FieldValue::String(v)) => v.clone(),
            };
            record.push(cell);
        }
        self.writer.write_record(&record)?;
        Ok(())
    }

    pub fn finish(mut self, schema: &Schema) -> Result<()> {
        self.write_header(schema)?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn to_wkt(geometry: &Geometry) -> String {
    match geometry {
        Geometry::Point(point) => format!("POINT ({:.7} {:.7})", point.x(), point.y()),
        Geometry::LineString(line) => format!(
            "LINESTRING ({})",
            line.coords()
                .map(|coord| format!("{:.7} {:.7}", coord.x, coord.y))
                .join(",")
        ),
    }
}
