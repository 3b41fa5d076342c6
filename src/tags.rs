use std::collections::BTreeSet;

use crate::error::Result;
use crate::osm::Tags;
use crate::sink::{Feature, FieldDefinition, FieldType, Layer};

/// Width of the string column created for every exported tag.
pub const TAG_FIELD_WIDTH: usize = 200;

/// The set of tag keys exported as columns.
///
/// Keys are deduplicated and kept sorted, so the column order is the same for every run with
/// the same keys. Fixed once built: the output schema depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagProjector {
    keys: BTreeSet<String>,
}

impl TagProjector {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|key| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn declare_columns(&self, layer: &mut Layer) -> Result<()> {
        for key in &self.keys {
            layer.add_field(
                FieldDefinition::new(key, FieldType::String).with_width(TAG_FIELD_WIDTH),
            )?;
        }
        Ok(())
    }

    /// Copy the exported tags present in `tags` onto `feature`. Missing keys leave the column
    /// unset.
    pub fn project(&self, feature: &mut Feature, tags: &Tags) -> Result<()> {
        for key in &self.keys {
            if let Some(value) = tags.get(key.as_str()) {
                feature.set_string(key, value.as_str())?;
            }
        }
        Ok(())
    }
}
