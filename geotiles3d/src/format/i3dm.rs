//! Instanced-model (`i3dm`) writer.

use std::io::Write;

use bytes::{BufMut, BytesMut};
use cgmath::{InnerSpace, Vector3};
use serde_json::json;
use tracing::debug;

use super::{begin_header, total_length, write_tile, Section, TileFormat, GLTF_FORMAT_URI};
use crate::attributes::{BatchTable, ModelAttributes};
use crate::error::TileResult;
use crate::geodesy::{model_orientation, Ellipsoid};
use crate::layout::{pad_binary, pad_text};

/// Bytes in one `float32` vec3.
const VEC3_SIZE: usize = 12;

/// Write the selected instances of `model` as an instanced-model tile that
/// references the glTF at `gltf_uri`.
///
/// Positions are stored relative to `RTC_CENTER`, the cartesian position of
/// the owning tile's region center. Instances appear in selection order in
/// both the feature table and the batch table.
///
/// Returns the number of bytes written.
///
/// # Panics
///
/// Panics if any selection index is out of range.
pub fn write_i3dm<W: Write>(
    gltf_uri: &str,
    model: &ModelAttributes,
    selection: &[usize],
    out: &mut W,
) -> TileResult<u32> {
    let feature_table = InstanceFeatureTable::build(model, selection);
    let batch_table = BatchTable::pack(model.instances(), selection);

    let format = TileFormat::Instanced;
    let feature_json = pad_text(serde_json::to_vec(&feature_table.json)?, format.header_len());
    let feature_bin = pad_binary(feature_table.binary);
    let batch_json = batch_table.json_section()?;
    let payload = pad_text(gltf_uri.as_bytes().to_vec(), 0);

    let sections = [
        Section::new("feature table json", &feature_json),
        Section::new("feature table binary", &feature_bin),
        Section::new("batch table json", &batch_json),
        Section::new("batch table binary", batch_table.binary_section()),
        Section::new("glTF uri", &payload),
    ];

    let byte_length = total_length(format, &sections)?;
    let mut header = begin_header(format, byte_length);
    for section in &sections[..4] {
        header.put_u32_le(section.len()?);
    }
    header.put_u32_le(GLTF_FORMAT_URI);

    write_tile(out, &header, &sections)?;

    debug!(
        instances = selection.len(),
        bytes = byte_length,
        uri = gltf_uri,
        "Wrote i3dm tile"
    );
    Ok(byte_length)
}

/// Feature table of an instanced tile.
struct InstanceFeatureTable {
    json: serde_json::Value,
    binary: Vec<u8>,
}

impl InstanceFeatureTable {
    fn build(model: &ModelAttributes, selection: &[usize]) -> Self {
        let count = model.instance_count();
        if let Some(bad) = selection.iter().find(|&&idx| idx >= count) {
            panic!(
                "selection index {} out of range for {} instances",
                bad, count
            );
        }

        let ellipsoid = Ellipsoid::WGS84;
        let center =
            ellipsoid.cartographic_to_cartesian(&model.tile_region().rectangle.center());

        let array_len = selection.len() * VEC3_SIZE;
        let mut positions = BytesMut::with_capacity(array_len);
        let mut scales = BytesMut::with_capacity(array_len);
        let mut normal_ups = BytesMut::with_capacity(array_len);
        let mut normal_rights = BytesMut::with_capacity(array_len);

        for &idx in selection {
            let world = ellipsoid.cartographic_to_cartesian(&model.positions()[idx]);
            let rotation = model_orientation(world, model.orientations()[idx]);

            put_vec3(&mut positions, world - center);
            for component in model.scales()[idx] {
                scales.put_f32_le(component);
            }
            put_vec3(&mut normal_ups, rotation.y.normalize());
            put_vec3(&mut normal_rights, rotation.x.normalize());
        }

        let json = json!({
            "INSTANCES_LENGTH": selection.len(),
            "RTC_CENTER": [center.x, center.y, center.z],
            "POSITION": { "byteOffset": 0 },
            "SCALE_NON_UNIFORM": { "byteOffset": array_len },
            "NORMAL_UP": { "byteOffset": 2 * array_len },
            "NORMAL_RIGHT": { "byteOffset": 3 * array_len },
        });

        let mut binary = positions;
        binary.extend_from_slice(&scales);
        binary.extend_from_slice(&normal_ups);
        binary.extend_from_slice(&normal_rights);

        Self {
            json,
            binary: binary.to_vec(),
        }
    }
}

fn put_vec3(buf: &mut BytesMut, v: Vector3<f64>) {
    buf.put_f32_le(v.x as f32);
    buf.put_f32_le(v.y as f32);
    buf.put_f32_le(v.z as f32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{InstanceAttributes, IDENTIFIER_KEY};
    use crate::format::inspect::TileHeader;
    use crate::geodesy::{BoundingRegion, Cartographic, Rectangle};
    use crate::tile::TileNode;
    use serde_json::Value;

    fn point_tile(position: Cartographic) -> TileNode {
        TileNode::new(BoundingRegion::new(
            Rectangle::new(
                position.longitude,
                position.latitude,
                position.longitude,
                position.latitude,
            ),
            0.0,
            10.0,
        ))
    }

    fn model_at(position: Cartographic, n: usize) -> ModelAttributes {
        let tile = point_tile(position);
        let instances = InstanceAttributes::new((0..n).map(|i| format!("tree{}", i)).collect())
            .with_integer("NIS", (0..n as i32).collect())
            .with_double("HGT", (0..n).map(|i| i as f64 + 0.5).collect());
        ModelAttributes::new(
            &tile,
            instances,
            vec![position; n],
            vec![[1.0, 2.0, 3.0]; n],
            vec![0.0; n],
        )
    }

    fn read_f32s(data: &[u8]) -> Vec<f32> {
        data.chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    #[test]
    fn test_three_instances_at_tile_center() {
        let position = Cartographic::new(0.0, 0.0, 0.0);
        let model = model_at(position, 3);
        let mut out = Vec::new();
        let written = write_i3dm("tree.glb", &model, &[0, 1, 2], &mut out).unwrap();
        assert_eq!(written as usize, out.len());

        let header = TileHeader::parse(&out).unwrap();
        let sections = header.sections(&out).unwrap();
        let feature: Value = serde_json::from_slice(sections.feature_json).unwrap();
        assert_eq!(feature["INSTANCES_LENGTH"], 3);

        let positions = read_f32s(&sections.feature_binary[..36]);
        assert!(positions.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_header_fields_and_alignment() {
        let model = model_at(Cartographic::from_degrees(-75.0, 40.0, 5.0), 2);
        let mut out = Vec::new();
        write_i3dm("models/tree.glb", &model, &[1, 0], &mut out).unwrap();

        assert_eq!(&out[0..4], b"i3dm");
        assert_eq!(u32::from_le_bytes(out[4..8].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(out[8..12].try_into().unwrap()) as usize, out.len());
        assert_eq!(u32::from_le_bytes(out[28..32].try_into().unwrap()), GLTF_FORMAT_URI);

        let header = TileHeader::parse(&out).unwrap();
        for boundary in header.section_boundaries() {
            assert_eq!(boundary % 8, 0, "boundary {} not aligned", boundary);
        }
        assert_eq!(out.len() % 8, 0);
    }

    #[test]
    fn test_feature_table_offsets_and_scale() {
        let model = model_at(Cartographic::from_degrees(10.0, 50.0, 0.0), 2);
        let mut out = Vec::new();
        write_i3dm("a.glb", &model, &[0, 1], &mut out).unwrap();

        let header = TileHeader::parse(&out).unwrap();
        let sections = header.sections(&out).unwrap();
        let feature: Value = serde_json::from_slice(sections.feature_json).unwrap();
        assert_eq!(feature["POSITION"]["byteOffset"], 0);
        assert_eq!(feature["SCALE_NON_UNIFORM"]["byteOffset"], 24);
        assert_eq!(feature["NORMAL_UP"]["byteOffset"], 48);
        assert_eq!(feature["NORMAL_RIGHT"]["byteOffset"], 72);
        assert_eq!(sections.feature_binary.len(), 96);

        let scales = read_f32s(&sections.feature_binary[24..48]);
        assert_eq!(scales, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);

        let ups = read_f32s(&sections.feature_binary[48..60]);
        let len = (ups[0] * ups[0] + ups[1] * ups[1] + ups[2] * ups[2]).sqrt();
        assert!((len - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rtc_center_is_region_center() {
        let position = Cartographic::from_degrees(10.0, 50.0, 0.0);
        let model = model_at(position, 1);
        let mut out = Vec::new();
        write_i3dm("a.glb", &model, &[0], &mut out).unwrap();

        let header = TileHeader::parse(&out).unwrap();
        let feature: Value =
            serde_json::from_slice(header.sections(&out).unwrap().feature_json).unwrap();
        let expected = Ellipsoid::WGS84.cartographic_to_cartesian(&position);
        let rtc = feature["RTC_CENTER"].as_array().unwrap();
        assert!((rtc[0].as_f64().unwrap() - expected.x).abs() < 1e-6);
        assert!((rtc[1].as_f64().unwrap() - expected.y).abs() < 1e-6);
        assert!((rtc[2].as_f64().unwrap() - expected.z).abs() < 1e-6);
    }

    #[test]
    fn test_batch_table_follows_selection() {
        let model = model_at(Cartographic::default(), 3);
        let mut out = Vec::new();
        write_i3dm("a.glb", &model, &[2, 0], &mut out).unwrap();

        let header = TileHeader::parse(&out).unwrap();
        let sections = header.sections(&out).unwrap();
        let batch: Value = serde_json::from_slice(sections.batch_json).unwrap();
        assert_eq!(batch[IDENTIFIER_KEY], json!(["tree2", "tree0"]));
        assert_eq!(batch["NIS"]["byteOffset"], 0);
        assert_eq!(batch["HGT"]["byteOffset"], 8);
        assert_eq!(sections.batch_binary.len(), 8 + 16);
    }

    #[test]
    fn test_payload_is_padded_uri() {
        let model = model_at(Cartographic::default(), 1);
        let mut out = Vec::new();
        write_i3dm("abc.glb", &model, &[0], &mut out).unwrap();

        let header = TileHeader::parse(&out).unwrap();
        let payload = header.sections(&out).unwrap().payload;
        assert_eq!(payload, b"abc.glb ");
    }

    #[test]
    fn test_empty_selection() {
        let model = model_at(Cartographic::default(), 2);
        let mut out = Vec::new();
        write_i3dm("a.glb", &model, &[], &mut out).unwrap();

        let header = TileHeader::parse(&out).unwrap();
        let sections = header.sections(&out).unwrap();
        assert!(sections.feature_binary.is_empty());
        assert!(sections.batch_binary.is_empty());
        let batch: Value = serde_json::from_slice(sections.batch_json).unwrap();
        assert_eq!(batch[IDENTIFIER_KEY], json!([]));
        let feature: Value = serde_json::from_slice(sections.feature_json).unwrap();
        assert_eq!(feature["INSTANCES_LENGTH"], 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_bad_selection_panics() {
        let model = model_at(Cartographic::default(), 2);
        let _ = write_i3dm("a.glb", &model, &[5], &mut Vec::new());
    }

    /// Output stream that rejects every write.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let model = model_at(Cartographic::default(), 2);
        let result = write_i3dm("a.glb", &model, &[0, 1], &mut BrokenPipe);
        assert!(matches!(result, Err(crate::error::TileError::Io(_))));
    }
}
