//! GLB serialization of a [`SceneModel`].

use std::borrow::Cow;

use gltf::binary::{Glb, Header};
use tracing::trace;

use super::{Buffer, SceneModel};
use crate::error::{TileError, TileResult};
use crate::layout::round_up;

/// GLB chunks are aligned to four bytes.
const GLB_CHUNK_ALIGNMENT: usize = 4;
const GLB_VERSION: u32 = 2;

/// Turns a scene into binary glTF bytes.
///
/// The tile writers take any implementation so callers can plug in their
/// own encoder.
pub trait SceneSerializer {
    fn to_glb(&self, scene: &SceneModel) -> TileResult<Vec<u8>>;
}

/// Default serializer built on the `gltf` crate's GLB container.
///
/// All buffers of the scene are concatenated into the single `BIN` chunk,
/// each starting on a 4-byte boundary, and buffer views are rebased onto
/// that combined buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlbSerializer;

impl SceneSerializer for GlbSerializer {
    fn to_glb(&self, scene: &SceneModel) -> TileResult<Vec<u8>> {
        let merged = merge_buffers(scene);
        let bin = merged.buffers.first().map(|b| b.data.clone());

        let mut json = serde_json::to_vec(&merged)?;
        json.resize(round_up(json.len(), GLB_CHUNK_ALIGNMENT), b' ');

        let glb = Glb {
            header: Header {
                magic: *b"glTF",
                version: GLB_VERSION,
                // Recomputed by the writer.
                length: 0,
            },
            json: Cow::Owned(json),
            bin: bin.map(Cow::Owned),
        };

        let mut out = Vec::new();
        glb.to_writer(&mut out)
            .map_err(|e| TileError::Glb(e.to_string()))?;
        trace!(bytes = out.len(), "Serialized scene to GLB");
        Ok(out)
    }
}

/// Copy of `scene` whose buffers are merged into at most one.
fn merge_buffers(scene: &SceneModel) -> SceneModel {
    let mut merged = scene.clone();
    if scene.buffers.is_empty() {
        return merged;
    }

    let mut data = Vec::new();
    let mut bases = Vec::with_capacity(scene.buffers.len());
    for buffer in &scene.buffers {
        bases.push(data.len());
        data.extend_from_slice(&buffer.data);
        data.resize(round_up(data.len(), GLB_CHUNK_ALIGNMENT), 0);
    }

    for view in &mut merged.buffer_views {
        view.byte_offset += bases[view.buffer];
        view.buffer = 0;
    }
    merged.buffers = vec![Buffer { data }];
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::BufferView;
    use serde_json::Value;

    fn decode(bytes: &[u8]) -> (Value, Option<Vec<u8>>) {
        let glb = Glb::from_slice(bytes).unwrap();
        let json = serde_json::from_slice(&glb.json).unwrap();
        (json, glb.bin.map(|b| b.into_owned()))
    }

    #[test]
    fn test_empty_scene_is_valid_glb() {
        let bytes = GlbSerializer.to_glb(&SceneModel::default()).unwrap();
        assert_eq!(&bytes[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize, bytes.len());
        assert_eq!(bytes.len() % 4, 0);

        let (json, bin) = decode(&bytes);
        assert_eq!(json["asset"]["version"], "2.0");
        assert!(bin.is_none());
    }

    #[test]
    fn test_buffers_merge_into_bin_chunk() {
        let mut scene = SceneModel::default();
        scene.buffers.push(Buffer { data: vec![1, 2, 3] });
        scene.buffers.push(Buffer { data: vec![9; 8] });
        scene.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: 1,
            byte_length: 2,
            ..Default::default()
        });
        scene.buffer_views.push(BufferView {
            buffer: 1,
            byte_offset: 0,
            byte_length: 8,
            ..Default::default()
        });

        let (json, bin) = decode(&GlbSerializer.to_glb(&scene).unwrap());
        let bin = bin.unwrap();
        assert_eq!(&bin[..12], &[1, 2, 3, 0, 9, 9, 9, 9, 9, 9, 9, 9]);

        assert_eq!(json["buffers"].as_array().unwrap().len(), 1);
        assert_eq!(json["buffers"][0]["byteLength"], 12);
        assert_eq!(json["bufferViews"][0]["byteOffset"], 1);
        assert_eq!(json["bufferViews"][1]["buffer"], 0);
        assert_eq!(json["bufferViews"][1]["byteOffset"], 4);
    }

    #[test]
    fn test_input_scene_untouched() {
        let mut scene = SceneModel::default();
        scene.buffers.push(Buffer { data: vec![1] });
        scene.buffers.push(Buffer { data: vec![2] });
        let before = scene.clone();
        GlbSerializer.to_glb(&scene).unwrap();
        assert_eq!(scene, before);
    }
}
