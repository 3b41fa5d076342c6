use std::path::PathBuf;

use log::info;

use crate::emitter::{apply, EmitStats, LineEmitter, PointEmitter, RESERVED_FIELDS};
use crate::error::{Error, Result};
use crate::progress::{ProgressDisplay, ProgressReporter};
use crate::reader::InputFile;
use crate::sink::{GeometryType, Layer, OutputFormat};
use crate::tags::TagProjector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Points,
    Lines,
}

impl Mode {
    pub fn geometry_type(self) -> GeometryType {
        match self {
            Mode::Points => GeometryType::Point,
            Mode::Lines => GeometryType::LineString,
        }
    }

    pub fn default_layer_name(self) -> &'static str {
        match self {
            Mode::Points => "nodes",
            Mode::Lines => "ways",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub layer_name: Option<String>,
    pub mode: Mode,
    pub tags: Vec<String>,
    pub include_length: bool,
}

impl Config {
    pub fn layer_name(&self) -> &str {
        self.layer_name
            .as_deref()
            .unwrap_or_else(|| self.mode.default_layer_name())
    }

    /// Reject tag keys that would clash with a column the emitters or the output driver write
    /// themselves.
    pub fn validate(&self) -> Result<()> {
        let geometry_column = self.format.geometry_column();
        let reserved = |tag: &&String| {
            RESERVED_FIELDS.contains(&tag.as_str()) || geometry_column == Some(tag.as_str())
        };
        match self.tags.iter().find(reserved) {
            Some(tag) => Err(Error::ReservedField(tag.clone())),
            None => Ok(()),
        }
    }
}

/// Convert `input` according to `config`, showing progress on `display` if given.
pub fn convert<D: ProgressDisplay>(
    config: &Config,
    input: &InputFile,
    display: Option<D>,
) -> Result<EmitStats> {
    config.validate()?;
    let projector = TagProjector::new(config.tags.iter().cloned());
    let layer = Layer::create(
        config.format,
        &config.output,
        config.layer_name(),
        config.mode.geometry_type(),
    )?;
    info!(
        "writing {} layer '{}' to {} with {} tag column(s)",
        config.format,
        config.layer_name(),
        config.output.display(),
        projector.len()
    );
    let progress = ProgressReporter::new(display, input.offset());

    let stats = match config.mode {
        Mode::Points => {
            let mut emitter = PointEmitter::new(layer, projector, progress)?;
            apply(input, &mut emitter)?;
            emitter.finish()?
        }
        Mode::Lines => {
            let mut emitter = LineEmitter::new(layer, projector, progress, config.include_length)?;
            apply(input, &mut emitter)?;
            emitter.finish()?
        }
    };

    info!(
        "wrote {} feature(s), skipped {} object(s)",
        stats.written, stats.skipped
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haversine::{distance_m, path_length_m};
    use crate::osm::{Location, WayNode};
    use csv::ReaderBuilder;
    use std::path::Path;
    use tempfile::tempdir;

    const OSM_WAYS: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <node id="1" lat="49.000" lon="8.400" />
  <node id="2" lat="49.001" lon="8.401" />
  <node id="3" lat="49.002" lon="8.403" />
  <node id="4" lat="49.004" lon="8.404" />
  <node id="5" lat="49.005" lon="8.406" />
  <node id="11" lat="50.000" lon="9.000" />
  <node id="12" lat="50.001" lon="9.001" />
  <node id="14" lat="50.003" lon="9.003" />
  <node id="15" lat="50.004" lon="9.004" />
  <way id="100">
    <nd ref="1" />
    <nd ref="2" />
    <nd ref="3" />
    <nd ref="4" />
    <nd ref="5" />
    <tag k="highway" v="residential" />
  </way>
  <way id="200">
    <nd ref="11" />
    <nd ref="12" />
    <nd ref="13" />
    <nd ref="14" />
    <nd ref="15" />
    <tag k="highway" v="track" />
    <tag k="name" v="Waldweg" />
  </way>
</osm>
"#;

    const OSM_NODES: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <node id="1" lat="49.0" lon="8.4">
    <tag k="amenity" v="bench" />
  </node>
  <node id="2" />
  <node id="3" lat="49.1" lon="8.5">
    <tag k="amenity" v="cafe" />
    <tag k="name" v="Kaffeehaus" />
  </node>
  <way id="10">
    <nd ref="1" />
    <nd ref="3" />
  </way>
</osm>
"#;

    fn setup(content: &str) -> (tempfile::TempDir, InputFile) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.osm");
        std::fs::write(&path, content).unwrap();
        let input = InputFile::open(&path).unwrap();
        (dir, input)
    }

    fn config(dir: &Path, file: &str, mode: Mode, tags: &[&str], include_length: bool) -> Config {
        Config {
            input: dir.join("input.osm"),
            output: dir.join(file),
            format: file.rsplit('.').next().unwrap().parse().unwrap(),
            layer_name: None,
            mode,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            include_length,
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|row| row.unwrap().iter().map(|value| value.to_string()).collect())
            .collect()
    }

    fn length_of(coords: &[(f64, f64)]) -> f64 {
        let nodes: Vec<WayNode> = coords
            .iter()
            .map(|&(lon, lat)| WayNode {
                id: 0,
                location: Location::new(lon, lat),
            })
            .collect();
        path_length_m(&nodes)
    }

    #[test]
    fn complete_way_becomes_one_line_with_length() {
        let (dir, input) = setup(OSM_WAYS);
        let config = config(dir.path(), "out.csv", Mode::Lines, &["highway"], true);
        convert(&config, &input, None::<indicatif::ProgressBar>).unwrap();

        let rows = read_rows(&config.output);
        assert_eq!(rows[0], vec!["WKT", "osm_id", "way_part", "osm_length", "highway"]);
        let row = rows.iter().find(|row| row[1] == "100").unwrap();
        assert_eq!(row[2], "0");
        let expected = length_of(&[
            (8.400, 49.000),
            (8.401, 49.001),
            (8.403, 49.002),
            (8.404, 49.004),
            (8.406, 49.005),
        ]);
        assert_eq!(row[3], format!("{:.3}", expected));
        assert_eq!(row[4], "residential");
    }

    #[test]
    fn way_with_missing_node_is_split_in_two() {
        let (dir, input) = setup(OSM_WAYS);
        let config = config(dir.path(), "out.csv", Mode::Lines, &["highway"], true);
        convert(&config, &input, None::<indicatif::ProgressBar>).unwrap();

        let rows = read_rows(&config.output);
        let parts: Vec<&Vec<String>> = rows.iter().filter(|row| row[1] == "200").collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0][2], "0");
        assert_eq!(parts[1][2], "1");

        let first = distance_m(Location::new(9.000, 50.000), Location::new(9.001, 50.001));
        let second = distance_m(Location::new(9.003, 50.003), Location::new(9.004, 50.004));
        assert_eq!(parts[0][3], format!("{:.3}", first));
        assert_eq!(parts[1][3], format!("{:.3}", second));
        assert_eq!(parts[0][4], "track");
    }

    #[test]
    fn nodes_without_location_are_skipped() {
        let (dir, input) = setup(OSM_NODES);
        let config = config(dir.path(), "out.csv", Mode::Points, &["amenity", "name"], false);
        let stats = convert(&config, &input, None::<indicatif::ProgressBar>).unwrap();
        assert_eq!(stats.written, 2);
        assert_eq!(stats.skipped, 1);

        let rows = read_rows(&config.output);
        assert_eq!(rows[0], vec!["WKT", "osm_id", "amenity", "name"]);
        assert_eq!(rows[1], vec!["POINT (8.4000000 49.0000000)", "1", "bench", ""]);
        assert_eq!(rows[2], vec!["POINT (8.5000000 49.1000000)", "3", "cafe", "Kaffeehaus"]);
    }

    #[test]
    fn unused_tag_still_gets_a_column() {
        let (dir, input) = setup(OSM_WAYS);
        let config = config(dir.path(), "out.csv", Mode::Lines, &["surface"], false);
        convert(&config, &input, None::<indicatif::ProgressBar>).unwrap();

        let rows = read_rows(&config.output);
        assert_eq!(rows[0], vec!["WKT", "osm_id", "way_part", "surface"]);
        assert_eq!(rows.len(), 4);
        assert!(rows[1..].iter().all(|row| row[3].is_empty()));
    }

    #[test]
    fn conversion_is_reproducible() {
        let (dir, input) = setup(OSM_WAYS);
        let first = config(dir.path(), "first.geojson", Mode::Lines, &["name", "highway"], true);
        let second = config(dir.path(), "second.geojson", Mode::Lines, &["highway", "name"], true);
        convert(&first, &input, None::<indicatif::ProgressBar>).unwrap();
        let input = InputFile::open(&dir.path().join("input.osm")).unwrap();
        convert(&second, &input, None::<indicatif::ProgressBar>).unwrap();

        let a = std::fs::read(&first.output).unwrap();
        let b = std::fs::read(&second.output).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn custom_layer_name_is_used() {
        let (dir, input) = setup(OSM_NODES);
        let mut config = config(dir.path(), "out.geojson", Mode::Points, &[], false);
        config.layer_name = Some("export".to_string());
        convert(&config, &input, None::<indicatif::ProgressBar>).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&config.output).unwrap()).unwrap();
        assert_eq!(json["name"], "export");
        assert_eq!(json["features"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn progress_is_driven_to_completion() {
        let (dir, input) = setup(OSM_NODES);
        let config = config(dir.path(), "out.csv", Mode::Points, &[], false);
        let bar = indicatif::ProgressBar::hidden();
        bar.set_length(input.file_size());
        convert(&config, &input, Some(bar.clone())).unwrap();
        assert_eq!(bar.position(), input.file_size());
        assert!(bar.is_finished());
    }

    #[test]
    fn reserved_tag_keys_leave_no_output_behind() {
        let (dir, input) = setup(OSM_NODES);
        for (file, tag) in [("ids.csv", "osm_id"), ("parts.geojson", "way_part"), ("wkt.csv", "WKT")] {
            let config = config(dir.path(), file, Mode::Points, &["amenity", tag], false);
            let result = convert(&config, &input, None::<indicatif::ProgressBar>);
            assert!(matches!(result, Err(Error::ReservedField(ref name)) if name == tag));
            assert!(!config.output.exists());
        }
    }

    #[test]
    fn wkt_is_an_ordinary_tag_outside_csv() {
        let (dir, input) = setup(OSM_NODES);
        let config = config(dir.path(), "out.geojson", Mode::Points, &["WKT"], false);
        let stats = convert(&config, &input, None::<indicatif::ProgressBar>).unwrap();
        assert_eq!(stats.written, 2);
    }

    #[test]
    fn default_layer_names() {
        assert_eq!(Mode::Points.default_layer_name(), "nodes");
        assert_eq!(Mode::Lines.default_layer_name(), "ways");
    }
}
