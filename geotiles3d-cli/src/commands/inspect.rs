//! Inspect command - print tile headers.

use std::path::PathBuf;

use clap::Args;
use geotiles3d::format::inspect::{composite_tiles, TileHeader};
use geotiles3d::format::TileFormat;

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Tile file (i3dm, b3dm or cmpt)
    pub tile: PathBuf,
}

pub fn run(args: InspectArgs) -> Result<(), CliError> {
    let bytes = std::fs::read(&args.tile).map_err(|e| CliError::read(&args.tile, e))?;
    for line in describe(&bytes)? {
        println!("{}", line);
    }
    Ok(())
}

/// One line per tile, composite sub-tiles indented below their parent.
pub fn describe(bytes: &[u8]) -> Result<Vec<String>, CliError> {
    let mut lines = Vec::new();
    describe_into(bytes, 0, &mut lines)?;
    Ok(lines)
}

fn describe_into(bytes: &[u8], depth: usize, lines: &mut Vec<String>) -> Result<(), CliError> {
    let header = TileHeader::parse(bytes)?;
    lines.push(format!("{}{}", "  ".repeat(depth), header));
    if header.format == TileFormat::Composite {
        for tile in composite_tiles(bytes)? {
            describe_into(tile, depth + 1, lines)?;
        }
    }
    Ok(())
}
