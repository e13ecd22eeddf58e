//! Batched-model (`b3dm`) writer.

use std::io::Write;

use bytes::BufMut;
use serde_json::json;
use tracing::debug;

use super::{begin_header, total_length, write_tile, Section, TileFormat};
use crate::attributes::{BatchTable, InstanceAttributes};
use crate::error::TileResult;
use crate::layout::{pad_binary, pad_text};
use crate::scene::{SceneModel, SceneSerializer};

/// Write `scene` as a batched-model tile.
///
/// The scene is serialized to GLB through `serializer` and embedded as the
/// payload. Every instance of `attributes` goes into the batch table in
/// index order; with no attributes the batch table is empty and
/// `BATCH_LENGTH` is 0.
///
/// Returns the number of bytes written.
pub fn write_b3dm<W, S>(
    scene: &SceneModel,
    attributes: Option<&InstanceAttributes>,
    serializer: &S,
    out: &mut W,
) -> TileResult<u32>
where
    W: Write,
    S: SceneSerializer + ?Sized,
{
    let glb = pad_binary(serializer.to_glb(scene)?);

    let batch_length = attributes.map_or(0, InstanceAttributes::instance_count);
    let format = TileFormat::Batched;
    let feature_json = pad_text(
        serde_json::to_vec(&json!({ "BATCH_LENGTH": batch_length }))?,
        format.header_len(),
    );

    let batch_table = BatchTable::pack_all(attributes);
    let batch_json = batch_table.json_section()?;

    let sections = [
        Section::new("feature table json", &feature_json),
        Section::new("batch table json", &batch_json),
        Section::new("batch table binary", batch_table.binary_section()),
        Section::new("glb", &glb),
    ];

    let byte_length = total_length(format, &sections)?;
    let mut header = begin_header(format, byte_length);
    header.put_u32_le(sections[0].len()?);
    // No binary feature table data.
    header.put_u32_le(0);
    header.put_u32_le(sections[1].len()?);
    header.put_u32_le(sections[2].len()?);

    write_tile(out, &header, &sections)?;

    debug!(
        batch_length,
        glb_bytes = glb.len(),
        bytes = byte_length,
        "Wrote b3dm tile"
    );
    Ok(byte_length)
}
