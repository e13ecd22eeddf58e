//! Standalone glTF tile content.

use std::io::Write;

use tracing::debug;

use crate::attributes::InstanceAttributes;
use crate::config::MetadataConfig;
use crate::error::{header_len, TileResult};
use crate::layout::pad_binary;
use crate::scene::{inject_feature_metadata, SceneModel, SceneSerializer};

/// Write `scene` as a `.glb` tile content file.
///
/// With an attribute table the scene is first given `EXT_feature_metadata`
/// (see [`inject_feature_metadata`]), so `scene` is left mutated. The GLB is
/// padded to an 8-byte boundary.
///
/// Returns the number of bytes written.
///
/// # Panics
///
/// Panics under the same conditions as [`inject_feature_metadata`].
pub fn write_gltf_content<W, S>(
    scene: &mut SceneModel,
    attributes: Option<&InstanceAttributes>,
    config: &MetadataConfig,
    serializer: &S,
    out: &mut W,
) -> TileResult<u32>
where
    W: Write,
    S: SceneSerializer + ?Sized,
{
    if let Some(attributes) = attributes {
        inject_feature_metadata(scene, attributes, config);
    }

    let glb = pad_binary(serializer.to_glb(scene)?);
    let byte_length = header_len("glb", glb.len())?;
    out.write_all(&glb)?;

    debug!(
        metadata = attributes.is_some(),
        bytes = byte_length,
        "Wrote glTF content"
    );
    Ok(byte_length)
}
