//! Header decoding for written tiles.
//!
//! Used to split a tile back into its sections, to walk the sub-tiles of a
//! composite, and by the CLI `inspect` command.

use std::fmt;

use bytes::Buf;

use super::TileFormat;
use crate::error::{TileError, TileResult};

/// Decoded fixed header of any tile container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileHeader {
    pub format: TileFormat,
    pub version: u32,
    pub byte_length: u32,
    /// Section lengths in file order. Composite tiles have none.
    pub feature_table_json_len: u32,
    pub feature_table_binary_len: u32,
    pub batch_table_json_len: u32,
    pub batch_table_binary_len: u32,
    /// `gltfFormat` for instanced tiles.
    pub gltf_format: Option<u32>,
    /// Number of sub-tiles for composite tiles.
    pub tiles_length: Option<u32>,
}

/// Borrowed views of each section of a batched or instanced tile.
#[derive(Debug, Clone, Copy)]
pub struct TileSections<'a> {
    pub feature_json: &'a [u8],
    pub feature_binary: &'a [u8],
    pub batch_json: &'a [u8],
    pub batch_binary: &'a [u8],
    pub payload: &'a [u8],
}

impl TileHeader {
    /// Decode the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> TileResult<Self> {
        if bytes.len() < 12 {
            return Err(TileError::InvalidHeader(format!(
                "{} bytes is shorter than any tile header",
                bytes.len()
            )));
        }
        let format = TileFormat::from_magic(&bytes[0..4]).ok_or_else(|| {
            TileError::InvalidHeader(format!("unknown magic {:?}", &bytes[0..4]))
        })?;
        if bytes.len() < format.header_len() {
            return Err(TileError::InvalidHeader(format!(
                "truncated {} header: {} bytes",
                format.extension(),
                bytes.len()
            )));
        }

        let mut buf = &bytes[4..format.header_len()];
        let version = buf.get_u32_le();
        let byte_length = buf.get_u32_le();

        let mut header = TileHeader {
            format,
            version,
            byte_length,
            feature_table_json_len: 0,
            feature_table_binary_len: 0,
            batch_table_json_len: 0,
            batch_table_binary_len: 0,
            gltf_format: None,
            tiles_length: None,
        };

        match format {
            TileFormat::Composite => {
                header.tiles_length = Some(buf.get_u32_le());
            }
            TileFormat::Batched | TileFormat::Instanced => {
                header.feature_table_json_len = buf.get_u32_le();
                header.feature_table_binary_len = buf.get_u32_le();
                header.batch_table_json_len = buf.get_u32_le();
                header.batch_table_binary_len = buf.get_u32_le();
                if format == TileFormat::Instanced {
                    header.gltf_format = Some(buf.get_u32_le());
                }
            }
        }

        Ok(header)
    }

    /// Byte offsets (from the tile start) at which each section ends.
    pub fn section_boundaries(&self) -> Vec<usize> {
        let mut offset = self.format.header_len();
        let mut boundaries = vec![offset];
        if self.format == TileFormat::Composite {
            return boundaries;
        }
        for len in [
            self.feature_table_json_len,
            self.feature_table_binary_len,
            self.batch_table_json_len,
            self.batch_table_binary_len,
        ] {
            offset += len as usize;
            boundaries.push(offset);
        }
        boundaries.push(self.byte_length as usize);
        boundaries
    }

    /// Split a batched or instanced tile into its sections.
    pub fn sections<'a>(&self, bytes: &'a [u8]) -> TileResult<TileSections<'a>> {
        if self.format == TileFormat::Composite {
            return Err(TileError::InvalidHeader(
                "composite tiles have no table sections".to_string(),
            ));
        }
        let boundaries = self.section_boundaries();
        let end = self.byte_length as usize;
        if bytes.len() < end || boundaries.windows(2).any(|w| w[0] > w[1]) {
            return Err(TileError::InvalidHeader(format!(
                "section lengths exceed tile of {} bytes",
                bytes.len()
            )));
        }
        let slice = |i: usize| &bytes[boundaries[i]..boundaries[i + 1]];
        Ok(TileSections {
            feature_json: slice(0),
            feature_binary: slice(1),
            batch_json: slice(2),
            batch_binary: slice(3),
            payload: slice(4),
        })
    }
}

impl fmt::Display for TileHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} ({} bytes)",
            self.format.extension(),
            self.version,
            self.byte_length
        )?;
        match self.format {
            TileFormat::Composite => {
                write!(f, ", {} tiles", self.tiles_length.unwrap_or(0))
            }
            _ => write!(
                f,
                ", feature table {}+{}, batch table {}+{}",
                self.feature_table_json_len,
                self.feature_table_binary_len,
                self.batch_table_json_len,
                self.batch_table_binary_len
            ),
        }
    }
}

/// Split a composite tile into its sub-tiles.
pub fn composite_tiles(bytes: &[u8]) -> TileResult<Vec<&[u8]>> {
    let header = TileHeader::parse(bytes)?;
    if header.format != TileFormat::Composite {
        return Err(TileError::InvalidHeader(format!(
            "expected cmpt, found {}",
            header.format.extension()
        )));
    }

    let end = (header.byte_length as usize).min(bytes.len());
    let mut offset = header.format.header_len();
    let mut tiles = Vec::new();
    for _ in 0..header.tiles_length.unwrap_or(0) {
        if offset >= end {
            return Err(TileError::InvalidHeader(format!(
                "composite of {} bytes ends before all sub-tiles",
                end
            )));
        }
        let inner = TileHeader::parse(&bytes[offset..end])?;
        if (inner.byte_length as usize) < inner.format.header_len() {
            return Err(TileError::InvalidHeader(format!(
                "sub-tile at {} declares {} bytes, shorter than its header",
                offset, inner.byte_length
            )));
        }
        let next = offset + inner.byte_length as usize;
        if next > end {
            return Err(TileError::InvalidHeader(format!(
                "sub-tile at {} overruns composite of {} bytes",
                offset, end
            )));
        }
        tiles.push(&bytes[offset..next]);
        offset = next;
    }
    Ok(tiles)
}
