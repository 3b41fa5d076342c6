use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use osmpbfreader::OsmPbfReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::osm::{Location, Node, OsmObject, Tags, Way};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Xml,
    Pbf,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("osm") => InputFormat::Xml,
            _ => InputFormat::Pbf,
        }
    }
}

/// Number of bytes consumed from the input file so far.
///
/// Shared between the reader and the progress reporter. Only used from one thread.
#[derive(Debug, Clone, Default)]
pub struct ByteOffset(Rc<Cell<u64>>);

impl ByteOffset {
    pub fn get(&self) -> u64 {
        self.0.get()
    }

    fn advance(&self, n: usize) {
        self.0.set(self.0.get() + n as u64);
    }
}

struct CountingReader<R> {
    inner: R,
    offset: ByteOffset,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset.advance(n);
        Ok(n)
    }
}

/// An OSM input file, streamed object by object in file order.
pub struct InputFile {
    path: PathBuf,
    format: InputFormat,
    size: u64,
    offset: ByteOffset,
}

impl InputFile {
    pub fn open(path: &Path) -> Result<Self> {
        let size = std::fs::metadata(path)?.len();
        Ok(Self {
            path: path.to_path_buf(),
            format: InputFormat::from_path(path),
            size,
            offset: ByteOffset::default(),
        })
    }

    pub fn format(&self) -> InputFormat {
        self.format
    }

    pub fn file_size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> ByteOffset {
        self.offset.clone()
    }

    /// Stream every object to `visit`. Stops at the first error, either from the input or from
    /// the visitor.
    pub fn for_each_object<F>(&self, visit: F) -> Result<()>
    where
        F: FnMut(OsmObject) -> Result<()>,
    {
        let file = File::open(&self.path)?;
        self.offset.0.set(0);
        let counting = CountingReader {
            inner: file,
            offset: self.offset.clone(),
        };
        match self.format {
            InputFormat::Xml => read_xml(BufReader::new(counting), &self.offset, visit),
            InputFormat::Pbf => read_pbf(counting, visit),
        }
    }
}

fn read_pbf<R, F>(rdr: R, mut visit: F) -> Result<()>
where
    R: Read,
    F: FnMut(OsmObject) -> Result<()>,
{
    let mut pbf = OsmPbfReader::new(rdr);
    for obj in pbf.iter() {
        visit(obj?.into())?;
    }
    Ok(())
}

fn get_attr_value(event: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in event.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.to_string()));
        }
    }
    Ok(None)
}

fn parse_attr<T: std::str::FromStr>(
    event: &BytesStart<'_>,
    key: &[u8],
    offset: &ByteOffset,
) -> Result<Option<T>> {
    match get_attr_value(event, key)? {
        None => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(|_| Error::MalformedInput {
            offset: offset.get(),
            msg: format!(
                "invalid value '{}' for attribute '{}'",
                value,
                String::from_utf8_lossy(key)
            ),
        }),
    }
}

fn required_id(event: &BytesStart<'_>, offset: &ByteOffset) -> Result<i64> {
    parse_attr::<i64>(event, b"id", offset)?.ok_or_else(|| Error::MalformedInput {
        offset: offset.get(),
        msg: format!(
            "<{}> without id",
            String::from_utf8_lossy(event.name().as_ref())
        ),
    })
}

fn parse_node(event: &BytesStart<'_>, offset: &ByteOffset) -> Result<Node> {
    let id = required_id(event, offset)?;
    let lat = parse_attr::<f64>(event, b"lat", offset)?;
    let lon = parse_attr::<f64>(event, b"lon", offset)?;
    let location = match (lon, lat) {
        (Some(lon), Some(lat)) => Location::new(lon, lat),
        _ => Location::undefined(),
    };
    Ok(Node {
        id,
        location,
        tags: Tags::new(),
    })
}

fn parse_way(event: &BytesStart<'_>, offset: &ByteOffset) -> Result<Way> {
    Ok(Way {
        id: required_id(event, offset)?,
        node_refs: Vec::new(),
        tags: Tags::new(),
    })
}

/// Element currently open in the XML stream. Children (`nd`, `tag`) attach to it.
enum Current {
    None,
    Node(Node),
    Way(Way),
    Relation(i64),
}

impl Current {
    fn tags_mut(&mut self) -> Option<&mut Tags> {
        match self {
            Current::Node(node) => Some(&mut node.tags),
            Current::Way(way) => Some(&mut way.tags),
            _ => None,
        }
    }
}

fn handle_child(event: &BytesStart<'_>, current: &mut Current, offset: &ByteOffset) -> Result<()> {
    match event.name().as_ref() {
        b"nd" => {
            if let Current::Way(way) = current {
                let reference = parse_attr::<i64>(event, b"ref", offset)?.ok_or_else(|| {
                    Error::MalformedInput {
                        offset: offset.get(),
                        msg: format!("<nd> without ref in way {}", way.id),
                    }
                })?;
                way.node_refs.push(reference);
            }
        }
        b"tag" => {
            if let Some(tags) = current.tags_mut() {
                let key = get_attr_value(event, b"k")?;
                let value = get_attr_value(event, b"v")?;
                if let (Some(key), Some(value)) = (key, value) {
                    tags.insert(key.into(), value.into());
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn read_xml<R, F>(rdr: R, offset: &ByteOffset, mut visit: F) -> Result<()>
where
    R: io::BufRead,
    F: FnMut(OsmObject) -> Result<()>,
{
    let mut reader = Reader::from_reader(rdr);
    reader.trim_text(true);

    let mut current = Current::None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => match e.name().as_ref() {
                b"node" => current = Current::Node(parse_node(&e, offset)?),
                b"way" => current = Current::Way(parse_way(&e, offset)?),
                b"relation" => current = Current::Relation(required_id(&e, offset)?),
                _ => handle_child(&e, &mut current, offset)?,
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"node" => visit(OsmObject::Node(parse_node(&e, offset)?))?,
                b"way" => visit(OsmObject::Way(parse_way(&e, offset)?))?,
                b"relation" => visit(OsmObject::Relation(required_id(&e, offset)?))?,
                _ => handle_child(&e, &mut current, offset)?,
            },
            Event::End(e) => {
                let closes_object = matches!(e.name().as_ref(), b"node" | b"way" | b"relation");
                if closes_object {
                    match std::mem::replace(&mut current, Current::None) {
                        Current::Node(node) => visit(OsmObject::Node(node))?,
                        Current::Way(way) => visit(OsmObject::Way(way))?,
                        Current::Relation(id) => visit(OsmObject::Relation(id))?,
                        Current::None => {}
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}
