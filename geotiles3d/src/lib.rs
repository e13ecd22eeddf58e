//! geotiles3d - 3D Tiles encoding for geospatial tile hierarchies
//!
//! This library turns an in-memory tile tree and its per-instance attribute
//! tables into streamable 3D Tiles artifacts:
//!
//! - instanced-model (`i3dm`), batched-model (`b3dm`) and composite (`cmpt`)
//!   tile containers, see [`format`]
//! - tileset documents and merged tilesets, see [`tileset`]
//! - `EXT_feature_metadata` on glTF scenes, see [`scene`]
//!
//! The tile tree, attribute tables and scene geometry are produced by the
//! caller; this crate only encodes them.
//!
//! # Example
//!
//! ```
//! use geotiles3d::attributes::InstanceAttributes;
//! use geotiles3d::format::write_b3dm;
//! use geotiles3d::scene::{GlbSerializer, SceneModel};
//!
//! let attributes = InstanceAttributes::new(vec!["house".into()])
//!     .with_double("HGT", vec![7.5]);
//!
//! let mut tile = Vec::new();
//! let written = write_b3dm(&SceneModel::default(), Some(&attributes), &GlbSerializer, &mut tile)?;
//! assert_eq!(written as usize, tile.len());
//! # Ok::<(), geotiles3d::TileError>(())
//! ```

pub mod attributes;
pub mod config;
pub mod error;
pub mod format;
pub mod geodesy;
pub mod layout;
pub mod scene;
pub mod tile;
pub mod tileset;

pub use error::{TileError, TileResult};
