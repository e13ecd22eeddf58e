//! Configuration for tileset serialization and metadata injection.
//!
//! Both configurations can be built in code or loaded from an INI file:
//!
//! ```ini
//! [tileset]
//! max_geometric_error = 300000
//! refine = ADD
//! gltf_content = false
//!
//! [metadata]
//! class_name = CDBClass
//! feature_table_name = CDBFeatureTable
//! ```
//!
//! Missing sections or keys keep their defaults.

use std::path::Path;
use std::str::FromStr;

use ini::Ini;
use tracing::debug;

use crate::error::{TileError, TileResult};
use crate::tileset::{Refine, MAX_GEOMETRIC_ERROR};

// ==================== Tileset Defaults ====================

/// Geometric error of a tileset root, halved at every level below it.
pub const DEFAULT_MAX_GEOMETRIC_ERROR: f64 = MAX_GEOMETRIC_ERROR;

/// Refinement strategy written on the root tile.
pub const DEFAULT_REFINE: Refine = Refine::Add;

// ==================== Metadata Defaults ====================

/// Class name in the `EXT_feature_metadata` schema.
pub const DEFAULT_CLASS_NAME: &str = "CDBClass";

/// Feature table name in the `EXT_feature_metadata` extension.
pub const DEFAULT_FEATURE_TABLE_NAME: &str = "CDBFeatureTable";

/// Options for writing tileset documents.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetConfig {
    /// Geometric error of the root tile.
    pub max_geometric_error: f64,

    /// Refinement strategy of the root tile.
    pub refine: Refine,

    /// Tile content is glTF rather than tile containers.
    ///
    /// Combined tilesets then declare `3DTILES_content_gltf`.
    pub gltf_content: bool,
}

impl Default for TilesetConfig {
    fn default() -> Self {
        Self {
            max_geometric_error: DEFAULT_MAX_GEOMETRIC_ERROR,
            refine: DEFAULT_REFINE,
            gltf_content: false,
        }
    }
}

impl TilesetConfig {
    pub fn with_max_geometric_error(mut self, error: f64) -> Self {
        self.max_geometric_error = error;
        self
    }

    pub fn with_refine(mut self, refine: Refine) -> Self {
        self.refine = refine;
        self
    }

    pub fn with_gltf_content(mut self, gltf_content: bool) -> Self {
        self.gltf_content = gltf_content;
        self
    }
}

/// Names used by the metadata injector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataConfig {
    pub class_name: String,
    pub feature_table_name: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            class_name: DEFAULT_CLASS_NAME.to_string(),
            feature_table_name: DEFAULT_FEATURE_TABLE_NAME.to_string(),
        }
    }
}

impl MetadataConfig {
    pub fn with_class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = name.into();
        self
    }

    pub fn with_feature_table_name(mut self, name: impl Into<String>) -> Self {
        self.feature_table_name = name.into();
        self
    }
}

/// Settings loaded from an INI file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub tileset: TilesetConfig,
    pub metadata: MetadataConfig,
}

impl ConfigFile {
    /// Load settings from `path`.
    pub fn load(path: &Path) -> TileResult<Self> {
        let ini = Ini::load_from_file(path).map_err(|e| TileError::ConfigRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_ini(&ini)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse settings from INI text.
    pub fn parse(text: &str) -> TileResult<Self> {
        let ini = Ini::load_from_str(text).map_err(|e| TileError::ConfigRead {
            path: "<string>".into(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> TileResult<Self> {
        let mut config = ConfigFile::default();

        if let Some(section) = ini.section(Some("tileset")) {
            if let Some(v) = section.get("max_geometric_error") {
                config.tileset.max_geometric_error =
                    parse_value("tileset.max_geometric_error", v)?;
            }
            if let Some(v) = section.get("refine") {
                config.tileset.refine = parse_value("tileset.refine", v)?;
            }
            if let Some(v) = section.get("gltf_content") {
                config.tileset.gltf_content = parse_bool("tileset.gltf_content", v)?;
            }
        }

        if let Some(section) = ini.section(Some("metadata")) {
            if let Some(v) = section.get("class_name") {
                config.metadata.class_name = non_empty("metadata.class_name", v)?;
            }
            if let Some(v) = section.get("feature_table_name") {
                config.metadata.feature_table_name =
                    non_empty("metadata.feature_table_name", v)?;
            }
        }

        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> TileResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TileError::config(key, value))
}

fn parse_bool(key: &str, value: &str) -> TileResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(TileError::config(key, value)),
    }
}

fn non_empty(key: &str, value: &str) -> TileResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TileError::config(key, value));
    }
    Ok(value.to_string())
}
