//! Composite (`cmpt`) writer.

use std::io::{Seek, SeekFrom, Write};

use bytes::BufMut;
use tracing::debug;

use super::{begin_header, TileFormat};
use crate::error::{header_len, TileError, TileResult};

/// Write a composite tile of `tiles_length` sub-tiles.
///
/// `write_tile` is called once per sub-tile with the output stream and the
/// sub-tile index; it writes one complete tile (any format, including
/// another composite) and returns the bytes it wrote. The header is written
/// first with a provisional length and patched in place once all sub-tiles
/// are written. The stream is left positioned after the last sub-tile.
///
/// Returns the number of bytes written.
pub fn write_cmpt<W, F>(tiles_length: u32, out: &mut W, mut write_tile: F) -> TileResult<u32>
where
    W: Write + Seek,
    F: FnMut(&mut W, usize) -> TileResult<u32>,
{
    let format = TileFormat::Composite;
    let start = out.stream_position()?;
    let mut byte_length = header_len("composite header", format.header_len())?;

    out.write_all(&composite_header(byte_length, tiles_length))?;

    for index in 0..tiles_length as usize {
        let written = write_tile(out, index)?;
        byte_length = byte_length
            .checked_add(written)
            .ok_or(TileError::SectionTooLarge {
                section: "composite",
                len: byte_length as usize + written as usize,
            })?;
    }

    out.seek(SeekFrom::Start(start))?;
    out.write_all(&composite_header(byte_length, tiles_length))?;
    out.seek(SeekFrom::Start(start + u64::from(byte_length)))?;

    debug!(tiles = tiles_length, bytes = byte_length, "Wrote cmpt tile");
    Ok(byte_length)
}

fn composite_header(byte_length: u32, tiles_length: u32) -> Vec<u8> {
    let mut header = begin_header(TileFormat::Composite, byte_length);
    header.put_u32_le(tiles_length);
    header.to_vec()
}
