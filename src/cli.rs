use std::path::PathBuf;

use clap::Parser;

use crate::convert::{Config, Mode};
use crate::error::Result;
use crate::sink::OutputFormat;

/// Convert OSM data to vector formats. Allows exporting arbitrary tags as attribute columns.
#[derive(Parser, Debug)]
#[command(name = "osm2vec", version, about)]
pub struct Args {
    /// Input file (.osm XML or .pbf)
    #[arg(short, long = "inputfile", value_name = "FILE")]
    pub input: PathBuf,

    /// Output file
    #[arg(short, long = "outputfile", value_name = "FILE")]
    pub output: PathBuf,

    /// Output format: CSV, GeoJSON or GeoJSONSeq
    #[arg(
        short,
        long = "format-name",
        alias = "format_name",
        value_name = "NAME",
        default_value = "CSV"
    )]
    pub format: String,

    /// Name of the exported layer. Defaults to "nodes" or "ways"
    #[arg(short, long = "layer-name", alias = "layer_name", value_name = "NAME")]
    pub layer_name: Option<String>,

    /// Convert ways instead of nodes
    #[arg(short, long)]
    pub ways: bool,

    /// Add an "osm_length" field with the length of each line in meters. Only applies to ways
    #[arg(long)]
    pub length: bool,

    /// Tag to create a column for. May be given multiple times
    #[arg(short, long = "tag", value_name = "KEY")]
    pub tags: Vec<String>,

    /// Show a progress bar of how much of the input file has been read. PBF files are sorted
    /// by type, so this only gives a rough idea
    #[arg(short, long)]
    pub progress: bool,
}

impl Args {
    pub fn into_config(self) -> Result<Config> {
        let format: OutputFormat = self.format.parse()?;
        let config = Config {
            input: self.input,
            output: self.output,
            format,
            layer_name: self.layer_name,
            mode: if self.ways { Mode::Lines } else { Mode::Points },
            tags: self.tags,
            include_length: self.length,
        };
        config.validate()?;
        Ok(config)
    }
}
