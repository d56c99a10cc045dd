//! Reads a `WavHeader` from an `ExtractorInput`; supports resuming from
//! input failures.
//!
//! `peek` only moves the peek position, so after a failed read it can be
//! called again from scratch. `skip_to_data` commits progress one whole
//! chunk at a time, and on failure leaves the durable position at a chunk
//! header, so it too can be called again.

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, error, warn};

use crate::chunk::{ChunkHeader, FourCc};
use crate::error::{Result, WavError};
use crate::header::{expected_block_alignment, DataBounds, FormatType, WavFormat, WavHeader};
use crate::input::ExtractorInput;

/// Length of the fields of the format chunk that are decoded.
const FORMAT_CHUNK_MIN_SIZE: i64 = 16;

/// Only 16-bit samples are supported.
const SUPPORTED_BITS_PER_SAMPLE: u16 = 16;

/// Largest number of bytes skipped in one step.
const MAX_SKIP: i64 = i32::MAX as i64;

/// Peek the RIFF envelope and format chunk.
///
/// Returns `Ok(None)` if the input is not a WAV file this crate supports.
/// On return the peek position is just past the format chunk; the durable
/// position has not moved.
pub fn peek<I: ExtractorInput + ?Sized>(input: &mut I) -> Result<Option<WavFormat>> {
    let mut scratch = [0u8; ChunkHeader::SIZE_IN_BYTES];

    let mut chunk_header = ChunkHeader::peek(input, &mut scratch)?;
    if chunk_header.id != FourCc::RIFF {
        debug!(
            "Not a RIFF stream; first chunk: {} ({:#010x})",
            chunk_header.id,
            chunk_header.id.to_u32()
        );
        return Ok(None);
    }

    let mut form_type = [0u8; 4];
    input.peek_fully(&mut form_type)?;
    let form_type = FourCc(form_type);
    if form_type != FourCc::WAVE {
        error!(
            "Unsupported RIFF format: {} ({:#010x})",
            form_type,
            form_type.to_u32()
        );
        return Ok(None);
    }

    // A bext chunk may precede the format chunk.
    chunk_header = ChunkHeader::peek(input, &mut scratch)?;
    if chunk_header.id == FourCc::BEXT {
        debug!("Skipping bext chunk of {} bytes", chunk_header.size);
        input.advance_peek_position(chunk_header.size as u64)?;
        chunk_header = ChunkHeader::peek(input, &mut scratch)?;
    }

    if chunk_header.id != FourCc::FMT {
        return Err(WavError::UnexpectedChunk {
            expected: FourCc::FMT,
            found: chunk_header.id,
        });
    }
    if chunk_header.size < FORMAT_CHUNK_MIN_SIZE {
        return Err(WavError::InvalidState(format!(
            "format chunk declares {} bytes; at least {} are required",
            chunk_header.size, FORMAT_CHUNK_MIN_SIZE
        )));
    }

    let mut fields = [0u8; FORMAT_CHUNK_MIN_SIZE as usize];
    input.peek_fully(&mut fields)?;
    let type_code = LittleEndian::read_u16(&fields[0..2]);
    let num_channels = LittleEndian::read_u16(&fields[2..4]);
    let sample_rate_hz = LittleEndian::read_u32(&fields[4..8]);
    let average_bytes_per_second = LittleEndian::read_u32(&fields[8..12]);
    let block_alignment = LittleEndian::read_u16(&fields[12..14]);
    let bits_per_sample = LittleEndian::read_u16(&fields[14..16]);

    let expected = expected_block_alignment(num_channels, bits_per_sample);
    if u32::from(block_alignment) != expected {
        return Err(WavError::BlockAlignmentMismatch {
            expected,
            actual: block_alignment,
        });
    }
    if bits_per_sample != SUPPORTED_BITS_PER_SAMPLE {
        error!("Only 16-bit WAVs are supported; got: {}", bits_per_sample);
        return Ok(None);
    }
    let Some(format_type) = FormatType::from_code(type_code) else {
        error!("Unsupported WAV format type: {:#06x}", type_code);
        return Ok(None);
    };

    // Extension fields (valid bits, channel mask, sub-format GUID) are ignored.
    input.advance_peek_position((chunk_header.size - FORMAT_CHUNK_MIN_SIZE) as u64)?;

    let format = WavFormat::new(
        format_type,
        num_channels,
        sample_rate_hz,
        average_bytes_per_second,
        block_alignment,
        bits_per_sample,
    )?;
    debug!(
        "WAV format: {:?} ({:#06x}), {} channels, {} Hz, {} bytes/s, block {}",
        format_type,
        format_type.code(),
        num_channels,
        sample_rate_hz,
        average_bytes_per_second,
        block_alignment
    );
    Ok(Some(format))
}

/// Skip to the sample data and return the completed header.
///
/// Scanning starts from the durable position, which must be a chunk header:
/// either the start of the file (the RIFF header) or the chunk at which a
/// previous call failed. On return the durable position is the first byte
/// of sample data.
///
/// If an error is returned, the durable position is left at a chunk header.
pub fn skip_to_data<I: ExtractorInput + ?Sized>(
    input: &mut I,
    format: &WavFormat,
) -> Result<WavHeader> {
    input.reset_peek_position();

    let mut scratch = [0u8; ChunkHeader::SIZE_IN_BYTES];
    let mut chunk_header = ChunkHeader::peek(input, &mut scratch)?;
    while chunk_header.id != FourCc::DATA {
        let bytes_to_skip = if chunk_header.id == FourCc::RIFF {
            // The RIFF size covers the whole file; skip only the header and form type.
            ChunkHeader::SIZE_IN_BYTES as i64 + 4
        } else {
            if chunk_header.id == FourCc::FMT || chunk_header.id == FourCc::BEXT {
                debug!("Skipping {} chunk", chunk_header.id);
            } else {
                warn!(
                    "Ignoring unknown WAV chunk: {} ({:#010x})",
                    chunk_header.id,
                    chunk_header.id.to_u32()
                );
            }
            ChunkHeader::SIZE_IN_BYTES as i64 + chunk_header.size
        };
        if bytes_to_skip > MAX_SKIP {
            return Err(WavError::ChunkTooLarge {
                id: chunk_header.id,
                size: chunk_header.size,
            });
        }
        input.skip_fully(bytes_to_skip as u64)?;
        chunk_header = ChunkHeader::peek(input, &mut scratch)?;
    }

    input.skip_fully(ChunkHeader::SIZE_IN_BYTES as u64)?;

    let data = DataBounds {
        start: input.position(),
        size: chunk_header.size,
    };
    debug!("WAV data: {} bytes at offset {}", data.size, data.start);
    Ok(WavHeader::new(*format, data))
}

/// Peek the format and skip to the data in one call.
pub fn read_header<I: ExtractorInput + ?Sized>(input: &mut I) -> Result<Option<WavHeader>> {
    match peek(input)? {
        Some(format) => skip_to_data(input, &format).map(Some),
        None => Ok(None),
    }
}
