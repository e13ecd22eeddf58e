//! Scene graph consumed by the batched-model and glTF-content writers.
//!
//! The scene is built elsewhere (meshes, accessors, buffers) and handed to
//! this crate as a mutable value. [`inject_feature_metadata`] augments it with
//! per-instance metadata; a [`SceneSerializer`] turns it into a GLB payload.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   inject_feature_metadata   ┌──────────────┐
//! │  SceneModel  │ ──────────────────────────► │  SceneModel  │
//! │  (_BATCHID)  │   + InstanceAttributes      │ (_FEATURE_ID)│
//! └──────────────┘                             └──────┬───────┘
//!                                                     │ SceneSerializer
//!                                                     ▼
//!                                                GLB bytes ──► b3dm / .glb
//! ```

mod catalog;
mod metadata;
mod serializer;
mod value;

pub use catalog::{attribute_info, AttributeInfo};
pub use metadata::{
    inject_feature_metadata, BATCH_ID_ATTRIBUTE, FEATURE_ID_ATTRIBUTE,
    FEATURE_METADATA_EXTENSION,
};
pub use serializer::{GlbSerializer, SceneSerializer};
pub use value::Value;

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// glTF `componentType` for 32-bit floats.
pub const COMPONENT_TYPE_FLOAT: u32 = 5126;
/// glTF `componentType` for unsigned 16-bit integers.
pub const COMPONENT_TYPE_UNSIGNED_SHORT: u32 = 5123;

/// A glTF 2.0 scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneModel {
    pub asset: Asset,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<Scene>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
}

impl Default for SceneModel {
    fn default() -> Self {
        Self {
            asset: Asset::default(),
            scene: None,
            scenes: Vec::new(),
            nodes: Vec::new(),
            meshes: Vec::new(),
            accessors: Vec::new(),
            buffer_views: Vec::new(),
            buffers: Vec::new(),
            extensions: BTreeMap::new(),
            extensions_used: Vec::new(),
        }
    }
}

impl SceneModel {
    /// Record an extension as used, once.
    pub fn use_extension(&mut self, name: &str) {
        if !self.extensions_used.iter().any(|used| used == name) {
            self.extensions_used.push(name.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: "2.0".to_string(),
            generator: Some(concat!("geotiles3d ", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Scene {
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Node {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[f64; 16]>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

/// A mesh primitive; `attributes` maps semantic names to accessor indices.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Primitive {
    pub attributes: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    #[serde(skip_serializing_if = "is_zero")]
    pub byte_offset: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f64>>,
}

impl Accessor {
    /// A tightly packed accessor over a whole buffer view.
    pub fn new(buffer_view: usize, component_type: u32, count: usize, kind: &str) -> Self {
        Self {
            buffer_view: Some(buffer_view),
            byte_offset: 0,
            component_type,
            count,
            kind: kind.to_string(),
            min: None,
            max: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

/// An embedded buffer. Serializes as its `byteLength`; the bytes travel in
/// the GLB binary chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Buffer {
    pub data: Vec<u8>,
}

impl Serialize for Buffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Buffer", 1)?;
        state.serialize_field("byteLength", &self.data.len())?;
        state.end()
    }
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}
