use log::{info, warn};

use crate::error::{Error, Result};
use crate::haversine::path_length_m;
use crate::location_index::LocationIndex;
use crate::osm::{Node, OsmObject, Way};
use crate::progress::{ProgressDisplay, ProgressReporter};
use crate::reader::InputFile;
use crate::segment;
use crate::sink::{FieldDefinition, FieldType, Geometry, Layer};
use crate::tags::TagProjector;

pub const ID_FIELD: &str = "osm_id";
pub const PART_FIELD: &str = "way_part";
pub const LENGTH_FIELD: &str = "osm_length";

/// Names that exported tags cannot use because the emitters own them.
pub const RESERVED_FIELDS: [&str; 3] = [ID_FIELD, PART_FIELD, LENGTH_FIELD];

/// Receives the objects of the input stream one by one.
pub trait Handler {
    /// Whether `apply` has to keep node locations for resolving ways.
    const NEEDS_LOCATIONS: bool;

    fn node(&mut self, _node: &Node) -> Result<()> {
        Ok(())
    }

    fn way(&mut self, _way: &Way, _locations: &LocationIndex) -> Result<()> {
        Ok(())
    }
}

/// Stream every object of `input` through `handler`, keeping node locations on the way if the
/// handler needs them.
pub fn apply<H: Handler>(input: &InputFile, handler: &mut H) -> Result<()> {
    let mut locations = LocationIndex::new();
    input.for_each_object(|obj| match obj {
        OsmObject::Node(node) => {
            if H::NEEDS_LOCATIONS {
                locations.insert(&node);
            }
            handler.node(&node)
        }
        OsmObject::Way(way) => handler.way(&way, &locations),
        OsmObject::Relation(_) => Ok(()),
    })?;
    if H::NEEDS_LOCATIONS {
        info!("indexed {} node locations", locations.len());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub written: u64,
    pub skipped: u64,
}

fn add_id_field(layer: &mut Layer) -> Result<()> {
    layer.add_field(FieldDefinition::new(ID_FIELD, FieldType::Integer))
}

/// Writes one point per node.
pub struct PointEmitter<D> {
    layer: Layer,
    projector: TagProjector,
    progress: ProgressReporter<D>,
    stats: EmitStats,
}

impl<D: ProgressDisplay> PointEmitter<D> {
    pub fn new(mut layer: Layer, projector: TagProjector, progress: ProgressReporter<D>) -> Result<Self> {
        add_id_field(&mut layer)?;
        projector.declare_columns(&mut layer)?;
        Ok(Self {
            layer,
            projector,
            progress,
            stats: EmitStats::default(),
        })
    }

    fn emit(&mut self, node: &Node) -> Result<()> {
        if !node.location.is_valid() {
            warn!("node {}: invalid location, skipped", node.id);
            self.stats.skipped += 1;
            return Ok(());
        }

        let mut feature = self
            .layer
            .create_feature(Geometry::point(node.location.lon, node.location.lat));
        feature.set_integer(ID_FIELD, node.id)?;
        self.projector.project(&mut feature, &node.tags)?;
        self.layer.write_feature(&feature)?;
        self.stats.written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<EmitStats> {
        self.progress.finish();
        self.layer.close()?;
        Ok(self.stats)
    }
}

impl<D: ProgressDisplay> Handler for PointEmitter<D> {
    const NEEDS_LOCATIONS: bool = false;

    fn node(&mut self, node: &Node) -> Result<()> {
        let result = self.emit(node);
        self.progress.tick();
        result
    }
}

/// Writes one line per located stretch of each way.
pub struct LineEmitter<D> {
    layer: Layer,
    projector: TagProjector,
    progress: ProgressReporter<D>,
    include_length: bool,
    stats: EmitStats,
}

impl<D: ProgressDisplay> LineEmitter<D> {
    pub fn new(
        mut layer: Layer,
        projector: TagProjector,
        progress: ProgressReporter<D>,
        include_length: bool,
    ) -> Result<Self> {
        add_id_field(&mut layer)?;
        layer.add_field(FieldDefinition::new(PART_FIELD, FieldType::Integer))?;
        if include_length {
            layer.add_field(
                FieldDefinition::new(LENGTH_FIELD, FieldType::Real)
                    .with_width(10)
                    .with_precision(3),
            )?;
        }
        projector.declare_columns(&mut layer)?;
        Ok(Self {
            layer,
            projector,
            progress,
            include_length,
            stats: EmitStats::default(),
        })
    }

    fn emit(&mut self, way: &Way, locations: &LocationIndex) -> Result<()> {
        let nodes = locations.resolve(way);
        let segments = segment::split(&nodes);
        if segments.is_empty() {
            self.stats.skipped += 1;
            return Ok(());
        }

        for segment in &segments {
            let part_nodes = segment.nodes(&nodes);
            let geometry = match Geometry::line_string(
                part_nodes.iter().map(|n| (n.location.lon, n.location.lat)),
            ) {
                Ok(geometry) => geometry,
                Err(Error::Geometry(msg)) => {
                    warn!("way {} part {}: {}, skipped", way.id, segment.part, msg);
                    self.stats.skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let mut feature = self.layer.create_feature(geometry);
            feature.set_integer(ID_FIELD, way.id)?;
            feature.set_integer(PART_FIELD, i64::from(segment.part))?;
            if self.include_length {
                feature.set_real(LENGTH_FIELD, path_length_m(part_nodes))?;
            }
            self.projector.project(&mut feature, &way.tags)?;
            self.layer.write_feature(&feature)?;
            self.stats.written += 1;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<EmitStats> {
        self.progress.finish();
        self.layer.close()?;
        Ok(self.stats)
    }
}

impl<D: ProgressDisplay> Handler for LineEmitter<D> {
    const NEEDS_LOCATIONS: bool = true;

    fn way(&mut self, way: &Way, locations: &LocationIndex) -> Result<()> {
        let result = self.emit(way, locations);
        self.progress.tick();
        result
    }
}
