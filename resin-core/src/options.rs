use serde::{Deserialize, Serialize};

/// Settings for save and load operations.
///
/// All switches default to off. Can be read from a JSON fragment, with
/// missing fields taking their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Use the attribute flagged as id for the document's `_id`.
    pub use_id_attribute_as_primary_key: bool,
    /// Write attributes even when they hold their default value.
    pub serialize_default_values: bool,
    /// Give every root object an extrinsic id if it has none.
    pub generate_extrinsic_ids: bool,
    /// Many-valued containments with more children than this are stored as
    /// sibling documents instead of being embedded.
    pub sibling_threshold: Option<usize>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn use_id_attribute_as_primary_key(mut self, enabled: bool) -> Self {
        self.use_id_attribute_as_primary_key = enabled;
        self
    }

    pub fn serialize_default_values(mut self, enabled: bool) -> Self {
        self.serialize_default_values = enabled;
        self
    }

    pub fn generate_extrinsic_ids(mut self, enabled: bool) -> Self {
        self.generate_extrinsic_ids = enabled;
        self
    }

    pub fn sibling_threshold(mut self, threshold: Option<usize>) -> Self {
        self.sibling_threshold = threshold;
        self
    }
}
