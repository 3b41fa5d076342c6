//! Convert OpenStreetMap nodes or ways into a vector dataset, exporting a chosen set of tags as
//! attribute columns.
//!
//! Ways in partial extracts often reference nodes that are not part of the file. Such ways are
//! split at the missing nodes and every remaining stretch is written as its own line, numbered
//! by `way_part`.

pub mod cli;
pub mod convert;
pub mod emitter;
pub mod error;
pub mod haversine;
pub mod location_index;
pub mod osm;
pub mod progress;
pub mod reader;
pub mod segment;
pub mod sink;
pub mod tags;

pub use convert::{convert, Config, Mode};
pub use error::{Error, Result};
