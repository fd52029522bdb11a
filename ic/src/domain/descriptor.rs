//! Transformation descriptors
//!
//! A descriptor is an ordered operation-name → value mapping. The names come
//! from the CDN's vocabulary; nothing in the sequencer looks at them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// One edit step: operation names mapped to their parameters, in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(Map<String, Value>);

impl Descriptor {
    pub fn new(ops: Map<String, Value>) -> Self {
        Self(ops)
    }

    /// Build a descriptor from a JSON value; `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Operations in insertion order
    pub fn ops(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, op: &str) -> Option<&Value> {
        self.0.get(op)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for Descriptor {
    fn from(ops: Map<String, Value>) -> Self {
        Self(ops)
    }
}

/// What one translator turn produced
///
/// A single object merges independent operations into one step; an array
/// asks for discrete sequential steps (e.g. remove the background, then
/// shadow the cut-out).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptorGroup {
    Steps(Vec<Descriptor>),
    Single(Descriptor),
}

impl DescriptorGroup {
    /// An empty group: "nothing understood"
    pub fn empty() -> Self {
        DescriptorGroup::Single(Descriptor::default())
    }

    /// Flatten into the steps to append, dropping steps with no operations
    pub fn into_steps(self) -> Vec<Descriptor> {
        debug!("DescriptorGroup::into_steps: called");
        match self {
            DescriptorGroup::Single(d) => {
                if d.is_empty() {
                    debug!("DescriptorGroup::into_steps: empty single descriptor");
                    vec![]
                } else {
                    vec![d]
                }
            }
            DescriptorGroup::Steps(steps) => steps.into_iter().filter(|d| !d.is_empty()).collect(),
        }
    }

    /// True when normalizing would produce no steps
    pub fn is_empty(&self) -> bool {
        match self {
            DescriptorGroup::Single(d) => d.is_empty(),
            DescriptorGroup::Steps(steps) => steps.iter().all(Descriptor::is_empty),
        }
    }

    /// The group in its wire shape (object or array)
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

impl From<Descriptor> for DescriptorGroup {
    fn from(d: Descriptor) -> Self {
        DescriptorGroup::Single(d)
    }
}

impl From<Vec<Descriptor>> for DescriptorGroup {
    fn from(steps: Vec<Descriptor>) -> Self {
        DescriptorGroup::Steps(steps)
    }
}
