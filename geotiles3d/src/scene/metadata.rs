//! `EXT_feature_metadata` injection.
//!
//! Rewrites a scene whose primitives carry a per-vertex `_BATCHID`
//! attribute so that it carries the instance attribute table as structured
//! metadata instead:
//!
//! - every primitive's `_BATCHID` is renamed to `_FEATURE_ID_0` and gets a
//!   `featureIdAttributes` extension pointing at the feature table
//! - every integer and double column becomes one buffer view over a single
//!   metadata buffer appended at the end
//! - the scene root gets the `EXT_feature_metadata` extension describing the
//!   class and the feature table
//!
//! Identifier and string columns are not carried.

use serde_json::{json, Map};
use tracing::debug;

use super::{attribute_info, Buffer, BufferView, SceneModel, Value};
use crate::attributes::{ComponentType, InstanceAttributes};
use crate::config::MetadataConfig;

pub const FEATURE_METADATA_EXTENSION: &str = "EXT_feature_metadata";
/// Per-vertex instance id attribute written by the scene builder.
pub const BATCH_ID_ATTRIBUTE: &str = "_BATCHID";
pub const FEATURE_ID_ATTRIBUTE: &str = "_FEATURE_ID_0";

/// Inject `attributes` into `scene` as `EXT_feature_metadata`.
///
/// The new `_FEATURE_ID_0` attribute takes the buffer view index of the
/// former `_BATCHID` accessor, not the accessor index itself.
///
/// # Panics
///
/// Panics if a primitive has no `_BATCHID` attribute, or if its accessor is
/// missing or has no buffer view.
pub fn inject_feature_metadata(
    scene: &mut SceneModel,
    attributes: &InstanceAttributes,
    config: &MetadataConfig,
) {
    let mut metadata = MetadataBuilder::new(scene, attributes.instance_count(), config);
    for (name, values) in attributes.integers() {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        metadata.add_property(scene, name, ComponentType::Int, data);
    }
    for (name, values) in attributes.doubles() {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        metadata.add_property(scene, name, ComponentType::Double, data);
    }

    let primitive_extension = Value::from_json(&json!({
        "featureIdAttributes": [{
            "featureTable": config.feature_table_name,
            "featureIds": { "attribute": FEATURE_ID_ATTRIBUTE },
        }]
    }));

    let mut primitives = 0;
    for mesh_index in 0..scene.meshes.len() {
        for primitive_index in 0..scene.meshes[mesh_index].primitives.len() {
            let accessor = scene.meshes[mesh_index].primitives[primitive_index]
                .attributes
                .remove(BATCH_ID_ATTRIBUTE)
                .unwrap_or_else(|| {
                    panic!(
                        "mesh {} primitive {} has no {} attribute",
                        mesh_index, primitive_index, BATCH_ID_ATTRIBUTE
                    )
                });
            let feature_ids = scene
                .accessors
                .get(accessor)
                .and_then(|a| a.buffer_view)
                .unwrap_or_else(|| {
                    panic!(
                        "{} accessor {} has no buffer view",
                        BATCH_ID_ATTRIBUTE, accessor
                    )
                });

            let primitive = &mut scene.meshes[mesh_index].primitives[primitive_index];
            primitive
                .attributes
                .insert(FEATURE_ID_ATTRIBUTE.to_string(), feature_ids);
            primitive.extensions.insert(
                FEATURE_METADATA_EXTENSION.to_string(),
                primitive_extension.clone(),
            );
            primitives += 1;
        }
    }

    let properties = metadata.property_count;
    metadata.commit(scene);
    scene.use_extension(FEATURE_METADATA_EXTENSION);

    debug!(
        instances = attributes.instance_count(),
        properties, primitives, "Injected feature metadata"
    );
}

/// Collects property buffer views over a metadata buffer whose index is
/// reserved when the builder is created.
struct MetadataBuilder<'a> {
    config: &'a MetadataConfig,
    element_count: usize,
    buffer_index: usize,
    data: Vec<u8>,
    class_properties: Map<String, serde_json::Value>,
    table_properties: Map<String, serde_json::Value>,
    property_count: usize,
}

impl<'a> MetadataBuilder<'a> {
    fn new(scene: &SceneModel, element_count: usize, config: &'a MetadataConfig) -> Self {
        Self {
            config,
            element_count,
            buffer_index: scene.buffers.len(),
            data: Vec::new(),
            class_properties: Map::new(),
            table_properties: Map::new(),
            property_count: 0,
        }
    }

    fn add_property(
        &mut self,
        scene: &mut SceneModel,
        name: &str,
        component: ComponentType,
        data: Vec<u8>,
    ) {
        let byte_offset = self.data.len();
        self.data.extend_from_slice(&data);

        scene.buffer_views.push(BufferView {
            buffer: self.buffer_index,
            byte_offset,
            byte_length: data.len(),
            ..Default::default()
        });
        let buffer_view = scene.buffer_views.len() - 1;

        let mut class_property = Map::new();
        match attribute_info(name) {
            Some(info) => {
                class_property.insert("name".into(), json!(info.name));
                class_property.insert("description".into(), json!(info.description));
            }
            None => {
                class_property.insert("name".into(), json!(name));
            }
        }
        let kind = match component {
            ComponentType::Int => "INT32",
            ComponentType::Double => "FLOAT64",
        };
        class_property.insert("type".into(), json!(kind));

        self.class_properties
            .insert(name.to_string(), class_property.into());
        self.table_properties
            .insert(name.to_string(), json!({ "bufferView": buffer_view }));
        self.property_count += 1;
    }

    /// Append the metadata buffer at the reserved index and attach the root
    /// extension.
    ///
    /// # Panics
    ///
    /// Panics if any buffer was added to the scene since the builder was
    /// created.
    fn commit(self, scene: &mut SceneModel) {
        assert_eq!(
            scene.buffers.len(),
            self.buffer_index,
            "scene buffers changed while feature metadata was being built"
        );

        let extension = if self.property_count == 0 {
            Value::Null
        } else {
            scene.buffers.push(Buffer { data: self.data });
            Value::from_json(&json!({
                "classes": {
                    self.config.class_name.as_str(): { "properties": self.class_properties },
                },
                "featureTables": {
                    self.config.feature_table_name.as_str(): {
                        "class": self.config.class_name,
                        "elementCount": self.element_count,
                        "properties": self.table_properties,
                    },
                },
            }))
        };

        if !extension.is_null() {
            scene
                .extensions
                .insert(FEATURE_METADATA_EXTENSION.to_string(), extension);
        }
    }
}
