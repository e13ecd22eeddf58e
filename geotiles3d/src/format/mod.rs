//! Binary tile container writers.
//!
//! Three containers share one layout pattern: a fixed header of
//! little-endian `u32` fields, then JSON and binary sections, then a
//! payload. Every section ends on an 8-byte boundary measured from the
//! start of the tile; JSON sections are padded with spaces and binary
//! sections with zeros.
//!
//! ```text
//! i3dm  [header 32][feature JSON][feature bin][batch JSON][batch bin][glTF URI]
//! b3dm  [header 28][feature JSON][batch JSON][batch bin][GLB]
//! cmpt  [header 16][tile 0][tile 1]...
//! ```
//!
//! Every writer returns the number of bytes it wrote, which is also the
//! value stored in the header's `byteLength` field. This lets any writer
//! serve as the callback of [`write_cmpt`].

mod b3dm;
mod cmpt;
mod gltf_content;
mod i3dm;
pub mod inspect;

pub use b3dm::write_b3dm;
pub use cmpt::write_cmpt;
pub use gltf_content::write_gltf_content;
pub use i3dm::write_i3dm;

use std::io::Write;

use bytes::{BufMut, BytesMut};

use crate::error::{header_len, TileResult};

/// Version written to every tile header.
pub const TILE_VERSION: u32 = 1;

/// `gltfFormat` value for an instanced tile whose payload is a glTF URI.
pub const GLTF_FORMAT_URI: u32 = 0;

/// The three tile containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    /// Instanced model (`i3dm`).
    Instanced,
    /// Batched model (`b3dm`).
    Batched,
    /// Composite (`cmpt`).
    Composite,
}

impl TileFormat {
    pub fn magic(&self) -> &'static [u8; 4] {
        match self {
            TileFormat::Instanced => b"i3dm",
            TileFormat::Batched => b"b3dm",
            TileFormat::Composite => b"cmpt",
        }
    }

    /// Size of the fixed header in bytes.
    pub fn header_len(&self) -> usize {
        match self {
            TileFormat::Instanced => 32,
            TileFormat::Batched => 28,
            TileFormat::Composite => 16,
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Instanced => "i3dm",
            TileFormat::Batched => "b3dm",
            TileFormat::Composite => "cmpt",
        }
    }

    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        [TileFormat::Instanced, TileFormat::Batched, TileFormat::Composite]
            .into_iter()
            .find(|format| format.magic().as_slice() == magic)
    }
}

/// A named section of a tile body.
pub(crate) struct Section<'a> {
    pub name: &'static str,
    pub bytes: &'a [u8],
}

impl<'a> Section<'a> {
    pub fn new(name: &'static str, bytes: &'a [u8]) -> Self {
        Self { name, bytes }
    }

    pub fn len(&self) -> TileResult<u32> {
        header_len(self.name, self.bytes.len())
    }
}

/// Total `byteLength` of a tile: header plus all sections.
pub(crate) fn total_length(format: TileFormat, sections: &[Section<'_>]) -> TileResult<u32> {
    let total = format.header_len() + sections.iter().map(|s| s.bytes.len()).sum::<usize>();
    header_len("tile", total)
}

/// Start a header: magic, version and byte length.
pub(crate) fn begin_header(format: TileFormat, byte_length: u32) -> BytesMut {
    let mut header = BytesMut::with_capacity(format.header_len());
    header.put_slice(format.magic());
    header.put_u32_le(TILE_VERSION);
    header.put_u32_le(byte_length);
    header
}

/// Write a finished header followed by the body sections.
pub(crate) fn write_tile<W: Write>(
    out: &mut W,
    header: &[u8],
    sections: &[Section<'_>],
) -> TileResult<()> {
    out.write_all(header)?;
    for section in sections {
        out.write_all(section.bytes)?;
    }
    Ok(())
}
