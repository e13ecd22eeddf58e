//! Byte alignment helpers shared by the packers and tile writers.

/// Every section boundary in a tile is aligned to this many bytes.
pub const SECTION_ALIGNMENT: usize = 8;

/// Round `len` up to the next multiple of `alignment`.
#[inline]
pub fn round_up(len: usize, alignment: usize) -> usize {
    len.div_ceil(alignment) * alignment
}

/// Pad a JSON (or other text) section with ASCII spaces so that it ends on
/// an aligned boundary, given the number of bytes preceding it in the tile.
pub fn pad_text(mut text: Vec<u8>, preceding: usize) -> Vec<u8> {
    let end = preceding + text.len();
    text.resize(text.len() + round_up(end, SECTION_ALIGNMENT) - end, b' ');
    text
}

/// Pad a binary section with zero bytes to an aligned length.
pub fn pad_binary(mut data: Vec<u8>) -> Vec<u8> {
    data.resize(round_up(data.len(), SECTION_ALIGNMENT), 0);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0, 8), 0);
        assert_eq!(round_up(1, 8), 8);
        assert_eq!(round_up(8, 8), 8);
        assert_eq!(round_up(9, 8), 16);
        assert_eq!(round_up(12, 4), 12);
    }

    #[test]
    fn test_pad_text_alone() {
        let padded = pad_text(b"{\"a\":1}".to_vec(), 0);
        assert_eq!(padded, b"{\"a\":1} ".to_vec());
    }

    #[test]
    fn test_pad_text_after_header() {
        // A 28-byte header plus 4 bytes of text lands on 32.
        let padded = pad_text(b"abcd".to_vec(), 28);
        assert_eq!(padded.len(), 4);

        let padded = pad_text(b"abcde".to_vec(), 28);
        assert_eq!(padded.len(), 12);
        assert_eq!(&padded[5..], b"       ");
    }

    #[test]
    fn test_pad_text_empty_stays_empty() {
        assert!(pad_text(Vec::new(), 0).is_empty());
    }

    #[test]
    fn test_pad_binary_zeroes() {
        let padded = pad_binary(vec![1, 2, 3]);
        assert_eq!(padded, vec![1, 2, 3, 0, 0, 0, 0, 0]);
    }
}
