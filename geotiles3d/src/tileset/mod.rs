//! Tileset document serialization.
//!
//! Two documents are produced here:
//!
//! - the hierarchy of one [`Tileset`], where each level below the root gets
//!   half of its parent's geometric error and leaves get 0
//! - a wrapper that merges several existing tileset files as children of a
//!   single additive root
//!
//! Geometric errors are propagated from the configured root value, never
//! computed from geometry.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TilesetConfig;
use crate::error::{TileError, TileResult};
use crate::geodesy::BoundingRegion;
use crate::tile::{TileNode, Tileset};

/// Fixed geometric error of a tileset root and of merged children.
pub const MAX_GEOMETRIC_ERROR: f64 = 300_000.0;

/// Tileset format version written in `asset.version`.
pub const TILESET_VERSION: &str = "1.0";

/// Extension declared by tilesets whose content is glTF.
pub const CONTENT_GLTF_EXTENSION: &str = "3DTILES_content_gltf";

/// Refinement strategy of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Refine {
    Add,
    Replace,
}

impl Refine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Refine::Add => "ADD",
            Refine::Replace => "REPLACE",
        }
    }
}

impl fmt::Display for Refine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Refine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADD" => Ok(Refine::Add),
            "REPLACE" => Ok(Refine::Replace),
            _ => Err(format!("unknown refine strategy: {}", s)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TilesetDocument {
    asset: AssetJson,
    geometric_error: f64,
    root: TileJson,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extensions_used: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extensions_required: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct AssetJson {
    version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TileJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    refine: Option<Refine>,
    bounding_volume: BoundingVolumeJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<ContentJson>,
    geometric_error: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<TileJson>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BoundingVolumeJson {
    region: [f64; 6],
}

#[derive(Debug, Serialize)]
struct ContentJson {
    uri: String,
}

impl BoundingVolumeJson {
    fn new(region: &BoundingRegion) -> Self {
        Self {
            region: region.to_region_array(),
        }
    }
}

fn tile_json(tile: &TileNode, geometric_error: f64) -> TileJson {
    let (geometric_error, children) = if tile.is_leaf() {
        (0.0, Vec::new())
    } else {
        let children = tile
            .children()
            .map(|child| tile_json(child, geometric_error / 2.0))
            .collect();
        (geometric_error, children)
    };

    TileJson {
        refine: None,
        bounding_volume: BoundingVolumeJson::new(tile.region()),
        content: tile.content_uri().map(|uri| ContentJson {
            uri: uri.to_string(),
        }),
        geometric_error,
        children,
    }
}

/// Build the tileset document of `tileset`, or `None` if it has no root.
///
/// The root gets `config.max_geometric_error` (0 if it is a leaf) and
/// `config.refine`; the top-level `geometricError` equals the root's.
pub fn tileset_to_json(
    tileset: &Tileset,
    config: &TilesetConfig,
) -> TileResult<Option<serde_json::Value>> {
    let Some(root) = tileset.root() else {
        return Ok(None);
    };
    let mut root_json = tile_json(root, config.max_geometric_error);
    root_json.refine = Some(config.refine);

    let document = TilesetDocument {
        asset: AssetJson {
            version: TILESET_VERSION,
        },
        geometric_error: root_json.geometric_error,
        root: root_json,
        extensions_used: Vec::new(),
        extensions_required: Vec::new(),
    };
    Ok(Some(serde_json::to_value(document)?))
}

/// Write the tileset document of `tileset` followed by a newline.
///
/// Writes nothing and returns `false` when the tileset has no root.
pub fn write_tileset_json<W: Write>(
    tileset: &Tileset,
    config: &TilesetConfig,
    out: &mut W,
) -> TileResult<bool> {
    let Some(json) = tileset_to_json(tileset, config)? else {
        debug!("Tileset has no root, nothing written");
        return Ok(false);
    };
    write_json_line(out, &json)?;
    Ok(true)
}

/// Compact JSON plus a newline. Stream failures surface as `TileError::Io`.
fn write_json_line<W: Write>(out: &mut W, json: &serde_json::Value) -> TileResult<()> {
    let mut bytes = serde_json::to_vec(json)?;
    bytes.push(b'\n');
    out.write_all(&bytes)?;
    Ok(())
}

/// An existing tileset file to be merged under a wrapper root.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetReference {
    /// URI written as the child's `content.uri`.
    pub uri: String,
    /// Bounding region of the referenced tileset's root.
    pub region: BoundingRegion,
}

#[derive(Deserialize)]
struct TilesetHead {
    root: RootHead,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RootHead {
    bounding_volume: BoundingVolumeJson,
}

impl TilesetReference {
    pub fn new(uri: impl Into<String>, region: BoundingRegion) -> Self {
        Self {
            uri: uri.into(),
            region,
        }
    }

    /// Read the root region of the tileset at `path`, referenced as `uri`.
    pub fn from_tileset_file(path: &Path, uri: impl Into<String>) -> TileResult<Self> {
        let invalid = |reason: String| TileError::InvalidTileset {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let head: TilesetHead =
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
        let region = BoundingRegion::from_region_array(head.root.bounding_volume.region);
        Ok(Self::new(uri, region))
    }
}

/// Build a wrapper document with one child per referenced tileset.
///
/// The wrapper root refines additively, carries no content, and bounds the
/// union of all children. Every geometric error in the document is
/// `config.max_geometric_error`. With `config.gltf_content` the document
/// declares `3DTILES_content_gltf` as used and required.
///
/// # Panics
///
/// Panics if `references` is empty.
pub fn combine_tilesets(
    references: &[TilesetReference],
    config: &TilesetConfig,
) -> TileResult<serde_json::Value> {
    let (first, rest) = references
        .split_first()
        .unwrap_or_else(|| panic!("cannot combine an empty list of tilesets"));
    let region = rest
        .iter()
        .fold(first.region, |acc, reference| acc.union(&reference.region));

    let error = config.max_geometric_error;
    let children = references
        .iter()
        .map(|reference| TileJson {
            refine: None,
            bounding_volume: BoundingVolumeJson::new(&reference.region),
            content: Some(ContentJson {
                uri: reference.uri.clone(),
            }),
            geometric_error: error,
            children: Vec::new(),
        })
        .collect();

    let extensions = if config.gltf_content {
        vec![CONTENT_GLTF_EXTENSION]
    } else {
        Vec::new()
    };

    let document = TilesetDocument {
        asset: AssetJson {
            version: TILESET_VERSION,
        },
        geometric_error: error,
        root: TileJson {
            refine: Some(Refine::Add),
            bounding_volume: BoundingVolumeJson::new(&region),
            content: None,
            geometric_error: error,
            children,
        },
        extensions_used: extensions.clone(),
        extensions_required: extensions,
    };
    Ok(serde_json::to_value(document)?)
}

/// Write the wrapper document of [`combine_tilesets`] followed by a newline.
///
/// # Panics
///
/// Panics if `references` is empty.
pub fn write_combined_tileset_json<W: Write>(
    references: &[TilesetReference],
    config: &TilesetConfig,
    out: &mut W,
) -> TileResult<()> {
    let json = combine_tilesets(references, config)?;
    write_json_line(out, &json)?;
    info!(
        tilesets = references.len(),
        gltf_content = config.gltf_content,
        "Wrote combined tileset"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::Rectangle;
    use serde_json::{json, Value};
    use tempfile::NamedTempFile;

    fn region(w: f64, s: f64, e: f64, n: f64) -> BoundingRegion {
        BoundingRegion::new(Rectangle::new(w, s, e, n), 0.0, 1.0)
    }

    fn quadtree(depth: usize) -> TileNode {
        let node = TileNode::new(region(0.0, 0.0, 1.0, 1.0));
        if depth == 0 {
            return node;
        }
        node.with_child(Some(quadtree(depth - 1)))
            .with_child(None)
            .with_child(Some(quadtree(depth - 1)))
    }

    fn errors_by_depth(tile: &Value, depth: usize, out: &mut Vec<(usize, f64)>) {
        out.push((depth, tile["geometricError"].as_f64().unwrap()));
        if let Some(children) = tile["children"].as_array() {
            for child in children {
                errors_by_depth(child, depth + 1, out);
            }
        }
    }

    #[test]
    fn test_empty_tileset_writes_nothing() {
        let config = TilesetConfig::default();
        assert!(tileset_to_json(&Tileset::empty(), &config).unwrap().is_none());

        let mut out = Vec::new();
        assert!(!write_tileset_json(&Tileset::empty(), &config, &mut out).unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn test_single_leaf_root() {
        let root = TileNode::new(region(0.0, 0.0, 1.0, 1.0)).with_content_uri("0.b3dm");
        let json = tileset_to_json(&Tileset::new(root), &TilesetConfig::default()).unwrap().unwrap();
        assert_eq!(
            json,
            json!({
                "asset": { "version": "1.0" },
                "geometricError": 0.0,
                "root": {
                    "refine": "ADD",
                    "boundingVolume": { "region": [0.0, 0.0, 1.0, 1.0, 0.0, 1.0] },
                    "content": { "uri": "0.b3dm" },
                    "geometricError": 0.0,
                },
            })
        );
    }

    #[test]
    fn test_error_halves_per_level_and_leaves_are_zero() {
        let config = TilesetConfig::default().with_refine(Refine::Replace);
        let json = tileset_to_json(&Tileset::new(quadtree(3)), &config).unwrap().unwrap();
        assert_eq!(json["geometricError"], 300_000.0);
        assert_eq!(json["root"]["refine"], "REPLACE");

        let mut errors = Vec::new();
        errors_by_depth(&json["root"], 0, &mut errors);
        // Two non-empty children per inner node.
        assert_eq!(errors.len(), 1 + 2 + 4 + 8);
        for (depth, error) in errors {
            let expected = if depth == 3 {
                0.0
            } else {
                300_000.0 / f64::from(1u32 << depth)
            };
            assert_eq!(error, expected, "depth {}", depth);
        }
    }

    #[test]
    fn test_empty_slots_skipped_and_no_content_key() {
        let root = TileNode::new(region(0.0, 0.0, 1.0, 1.0))
            .with_child(None)
            .with_child(Some(TileNode::new(region(0.0, 0.0, 0.5, 0.5))));
        let json = tileset_to_json(&Tileset::new(root), &TilesetConfig::default()).unwrap().unwrap();
        let root = &json["root"];
        assert!(root.get("content").is_none());
        assert_eq!(root["children"].as_array().unwrap().len(), 1);
        assert!(root["children"][0].get("refine").is_none());
        assert_eq!(root["children"][0]["geometricError"], 0.0);
    }

    #[test]
    fn test_only_empty_slots_is_a_leaf() {
        let root = TileNode::new(region(0.0, 0.0, 1.0, 1.0))
            .with_children(vec![None, None, None, None]);
        let json = tileset_to_json(&Tileset::new(root), &TilesetConfig::default()).unwrap().unwrap();
        assert_eq!(json["root"]["geometricError"], 0.0);
        assert!(json["root"].get("children").is_none());
    }

    #[test]
    fn test_write_appends_newline() {
        let root = TileNode::new(region(0.0, 0.0, 1.0, 1.0));
        let mut out = Vec::new();
        assert!(write_tileset_json(&Tileset::new(root), &TilesetConfig::default(), &mut out).unwrap());
        assert_eq!(out.last(), Some(&b'\n'));
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["asset"]["version"], "1.0");
    }

    #[test]
    fn test_combine_region_is_union() {
        let references = [
            TilesetReference::new("a/tileset.json", region(0.0, 0.0, 1.0, 1.0)),
            TilesetReference::new("b/tileset.json", region(2.0, 2.0, 3.0, 3.0)),
        ];
        let json = combine_tilesets(&references, &TilesetConfig::default()).unwrap();

        let root = &json["root"];
        assert_eq!(root["refine"], "ADD");
        assert_eq!(
            root["boundingVolume"]["region"],
            json!([0.0, 0.0, 3.0, 3.0, 0.0, 1.0])
        );
        assert!(root.get("content").is_none());

        let children = root["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["content"]["uri"], "a/tileset.json");
        assert_eq!(children[1]["content"]["uri"], "b/tileset.json");
        for child in children {
            assert_eq!(child["geometricError"], MAX_GEOMETRIC_ERROR);
        }
        assert_eq!(json["geometricError"], MAX_GEOMETRIC_ERROR);
        assert!(json.get("extensionsUsed").is_none());
        assert!(json.get("extensionsRequired").is_none());
    }

    #[test]
    fn test_combine_gltf_content_extensions() {
        let references = [TilesetReference::new("a.json", region(0.0, 0.0, 1.0, 1.0))];
        let config = TilesetConfig::default().with_gltf_content(true);
        let json = combine_tilesets(&references, &config).unwrap();
        assert_eq!(json["extensionsUsed"], json!([CONTENT_GLTF_EXTENSION]));
        assert_eq!(json["extensionsRequired"], json!([CONTENT_GLTF_EXTENSION]));
    }

    #[test]
    #[should_panic(expected = "empty list of tilesets")]
    fn test_combine_empty_panics() {
        let _ = combine_tilesets(&[], &TilesetConfig::default());
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
    fn test_write_failures_reach_caller() {
        let config = TilesetConfig::default();
        let tileset = Tileset::new(TileNode::new(region(0.0, 0.0, 1.0, 1.0)));
        let err = write_tileset_json(&tileset, &config, &mut BrokenPipe).unwrap_err();
        assert!(matches!(err, TileError::Io(_)));

        let references = [TilesetReference::new("a.json", region(0.0, 0.0, 1.0, 1.0))];
        let err = write_combined_tileset_json(&references, &config, &mut BrokenPipe).unwrap_err();
        assert!(matches!(err, TileError::Io(_)));
    }

    #[test]
    fn test_non_empty_tileset_always_yields_document() {
        let config = TilesetConfig::default().with_max_geometric_error(f64::NAN);
        let tileset = Tileset::new(TileNode::new(region(0.0, 0.0, 1.0, 1.0)));
        assert!(tileset_to_json(&tileset, &config).unwrap().is_some());
    }

    #[test]
    fn test_reference_from_tileset_file() {
        let root = TileNode::new(region(0.1, 0.2, 0.3, 0.4));
        let mut file = NamedTempFile::new().unwrap();
        write_tileset_json(&Tileset::new(root), &TilesetConfig::default(), &mut file).unwrap();

        let reference = TilesetReference::from_tileset_file(file.path(), "sub/tileset.json").unwrap();
        assert_eq!(reference.uri, "sub/tileset.json");
        assert_eq!(reference.region, region(0.1, 0.2, 0.3, 0.4));
    }

    #[test]
    fn test_reference_without_region_is_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"root\": {{\"boundingVolume\": {{\"box\": []}}}}}}").unwrap();
        let err = TilesetReference::from_tileset_file(file.path(), "x").unwrap_err();
        assert!(matches!(err, TileError::InvalidTileset { .. }));
    }

    #[test]
    fn test_refine_parsing() {
        assert_eq!("add".parse::<Refine>().unwrap(), Refine::Add);
        assert_eq!("REPLACE".parse::<Refine>().unwrap(), Refine::Replace);
        assert!("merge".parse::<Refine>().is_err());
        assert_eq!(Refine::Replace.to_string(), "REPLACE");
    }
}
