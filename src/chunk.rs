//! RIFF chunk identifiers and chunk headers.

use std::fmt;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::Result;
use crate::input::ExtractorInput;

/// A four-character chunk identifier such as `RIFF` or `fmt `.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const RIFF: FourCc = FourCc(*b"RIFF");
    pub const WAVE: FourCc = FourCc(*b"WAVE");
    pub const FMT: FourCc = FourCc(*b"fmt ");
    pub const BEXT: FourCc = FourCc(*b"bext");
    pub const DATA: FourCc = FourCc(*b"data");

    /// Pack the tag into an integer, first character in the high byte, for
    /// log messages about unprintable tags.
    pub fn to_u32(self) -> u32 {
        BigEndian::read_u32(&self.0)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc(\"{}\")", self)
    }
}

/// Header of a RIFF chunk: tag plus declared payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: FourCc,
    /// Payload length in bytes, excluding this header. Widened from the
    /// unsigned 32-bit on-disk value.
    pub size: i64,
}

impl ChunkHeader {
    /// Size in bytes of a chunk header.
    pub const SIZE_IN_BYTES: usize = 8;

    /// Peek a chunk header at the current peek position.
    ///
    /// Only the peek position moves. Read failures are returned unchanged;
    /// the source resets its peek position on failure, so the caller may
    /// simply retry.
    pub fn peek<I: ExtractorInput + ?Sized>(
        input: &mut I,
        scratch: &mut [u8; ChunkHeader::SIZE_IN_BYTES],
    ) -> Result<Self> {
        input.peek_fully(scratch)?;
        Ok(Self::from_bytes(scratch))
    }

    pub fn from_bytes(bytes: &[u8; ChunkHeader::SIZE_IN_BYTES]) -> Self {
        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[0..4]);
        ChunkHeader {
            id: FourCc(id),
            size: i64::from(LittleEndian::read_u32(&bytes[4..8])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::StreamInput;
    use std::io::Cursor;

    #[test]
    fn test_fourcc_packing() {
        assert_eq!(FourCc::RIFF.to_u32(), 0x5249_4646);
        assert_eq!(FourCc::DATA.to_u32(), 0x6461_7461);
        assert_eq!(FourCc::FMT.to_string(), "fmt ");
        assert_eq!(FourCc([b'a', 0, b'b', 0xff]).to_string(), "a\\x00b\\xff");
    }

    #[test]
    fn test_peek_chunk_header() {
        let data = [b'd', b'a', b't', b'a', 0x10, 0x27, 0x00, 0x00, 0xaa];
        let mut input = StreamInput::new(Cursor::new(data.to_vec()));
        let mut scratch = [0u8; ChunkHeader::SIZE_IN_BYTES];

        let header = ChunkHeader::peek(&mut input, &mut scratch).unwrap();
        assert_eq!(header.id, FourCc::DATA);
        assert_eq!(header.size, 10_000);
        assert_eq!(input.position(), 0);
        assert_eq!(input.peek_position(), 8);
    }

    #[test]
    fn test_size_above_i32_range_stays_positive() {
        let header = ChunkHeader::from_bytes(&[b'J', b'U', b'N', b'K', 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(header.size, 4_294_967_295);
    }

    #[test]
    fn test_truncated_header() {
        let mut input = StreamInput::new(Cursor::new(b"RIFF\x00".to_vec()));
        let mut scratch = [0u8; ChunkHeader::SIZE_IN_BYTES];
        assert!(ChunkHeader::peek(&mut input, &mut scratch).is_err());
        assert_eq!(input.peek_position(), 0);
    }
}
