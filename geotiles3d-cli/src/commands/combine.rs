//! Combine command - merge tileset files under one root.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use geotiles3d::config::ConfigFile;
use geotiles3d::tileset::{write_combined_tileset_json, TilesetReference};
use tracing::info;

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct CombineArgs {
    /// Combined tileset file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Tile content is glTF (declares 3DTILES_content_gltf)
    #[arg(long)]
    pub gltf_content: bool,

    /// INI file with [tileset] settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Tileset files to merge
    #[arg(required = true)]
    pub tilesets: Vec<PathBuf>,
}

pub fn run(args: CombineArgs) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let gltf_content = args.gltf_content || config.tileset.gltf_content;
    let tileset_config = config.tileset.with_gltf_content(gltf_content);

    let base = args.output.parent().unwrap_or_else(|| Path::new(""));
    let references = load_references(&args.tilesets, base)?;

    let file = File::create(&args.output).map_err(|e| CliError::write(&args.output, e))?;
    let mut out = BufWriter::new(file);
    write_combined_tileset_json(&references, &tileset_config, &mut out)?;
    out.flush().map_err(|e| CliError::write(&args.output, e))?;

    info!(output = %args.output.display(), "Combined tileset written");
    println!(
        "Combined {} tilesets into {}",
        references.len(),
        args.output.display()
    );
    Ok(())
}

/// Read the root region of each tileset, referencing it relative to `base`.
pub fn load_references(paths: &[PathBuf], base: &Path) -> Result<Vec<TilesetReference>, CliError> {
    paths
        .iter()
        .map(|path| {
            let uri = relative_uri(path, base);
            Ok(TilesetReference::from_tileset_file(path, uri)?)
        })
        .collect()
}

/// `path` relative to `base` with `/` separators, or `path` itself when it
/// is not under `base`.
pub fn relative_uri(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    if relative.is_absolute() {
        return relative.to_string_lossy().into_owned();
    }
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotiles3d::config::TilesetConfig;
    use geotiles3d::geodesy::{BoundingRegion, Rectangle};
    use geotiles3d::tile::{TileNode, Tileset};
    use geotiles3d::tileset::write_tileset_json;
    use tempfile::TempDir;

    fn write_child(dir: &Path, name: &str, west: f64) -> PathBuf {
        let path = dir.join(name).join("tileset.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let region = BoundingRegion::new(Rectangle::new(west, 0.0, west + 0.1, 0.1), 0.0, 5.0);
        let mut file = File::create(&path).unwrap();
        write_tileset_json(
            &Tileset::new(TileNode::new(region)),
            &TilesetConfig::default(),
            &mut file,
        )
        .unwrap();
        path
    }

    #[test]
    fn test_relative_uri() {
        assert_eq!(
            relative_uri(Path::new("/data/out/a/tileset.json"), Path::new("/data/out")),
            "a/tileset.json"
        );
        assert_eq!(
            relative_uri(Path::new("/elsewhere/tileset.json"), Path::new("/data/out")),
            "/elsewhere/tileset.json"
        );
    }

    #[test]
    fn test_load_references() {
        let dir = TempDir::new().unwrap();
        let paths = vec![write_child(dir.path(), "a", 0.0), write_child(dir.path(), "b", 0.5)];
        let references = load_references(&paths, dir.path()).unwrap();
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].uri, "a/tileset.json");
        assert_eq!(references[1].region.rectangle.west, 0.5);
    }

    #[test]
    fn test_load_references_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_references(&[dir.path().join("missing.json")], dir.path());
        assert!(matches!(result, Err(CliError::Tile(_))));
    }

    #[test]
    fn test_run_writes_combined_tileset() {
        let dir = TempDir::new().unwrap();
        let tilesets = vec![write_child(dir.path(), "a", 0.0), write_child(dir.path(), "b", 0.5)];
        let output = dir.path().join("tileset.json");

        run(CombineArgs {
            output: output.clone(),
            gltf_content: true,
            config: None,
            tilesets,
        })
        .unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("\"uri\":\"b/tileset.json\""));
        assert!(text.contains("3DTILES_content_gltf"));
    }
}
