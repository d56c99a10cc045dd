//! WAV file writer for generating RIFF/WAVE images.
//!
//! Produces the layout the readers expect: RIFF envelope, optional `bext`,
//! `fmt `, any extra chunks, then `data`. Chunks are written back to back
//! without pad bytes.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::chunk::FourCc;
use crate::header::{expected_block_alignment, FormatType};

/// KSDATAFORMAT_SUBTYPE_PCM.
const PCM_SUBFORMAT_GUID: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

/// Size of the extension appended to an extensible format chunk.
const EXTENSIBLE_CB_SIZE: u16 = 22;

/// Builder for a complete WAV byte image.
#[derive(Debug, Clone)]
pub struct WavWriter {
    format_code: u16,
    num_channels: u16,
    sample_rate_hz: u32,
    bits_per_sample: u16,
    block_alignment: u16,
    extensible: bool,
    bext: Option<Vec<u8>>,
    extra_chunks: Vec<(FourCc, Vec<u8>)>,
    data: Vec<u8>,
}

impl WavWriter {
    /// A PCM writer with a consistent block alignment and no sample data.
    pub fn new(num_channels: u16, sample_rate_hz: u32, bits_per_sample: u16) -> Self {
        WavWriter {
            format_code: FormatType::PCM_CODE,
            num_channels,
            sample_rate_hz,
            bits_per_sample,
            block_alignment: expected_block_alignment(num_channels, bits_per_sample) as u16,
            extensible: false,
            bext: None,
            extra_chunks: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Write a WAVE_FORMAT_EXTENSIBLE format chunk carrying PCM.
    pub fn extensible(mut self) -> Self {
        self.format_code = FormatType::EXTENSIBLE_CODE;
        self.extensible = true;
        self
    }

    /// Override the format tag written to the format chunk.
    pub fn with_format_code(mut self, format_code: u16) -> Self {
        self.format_code = format_code;
        self
    }

    /// Override the block alignment, e.g. to produce an inconsistent header.
    pub fn with_block_alignment(mut self, block_alignment: u16) -> Self {
        self.block_alignment = block_alignment;
        self
    }

    /// Add a broadcast extension chunk ahead of the format chunk.
    pub fn with_bext(mut self, payload: Vec<u8>) -> Self {
        self.bext = Some(payload);
        self
    }

    /// Append a chunk between the format and data chunks.
    pub fn with_chunk(mut self, id: [u8; 4], payload: Vec<u8>) -> Self {
        self.extra_chunks.push((FourCc(id), payload));
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Offset of the first sample byte in the written image.
    pub fn data_offset(&self) -> u64 {
        let mut offset = 12 + 8 + self.format_chunk_len() as u64;
        if let Some(bext) = &self.bext {
            offset += 8 + bext.len() as u64;
        }
        for (_, payload) in &self.extra_chunks {
            offset += 8 + payload.len() as u64;
        }
        offset + 8
    }

    fn format_chunk_len(&self) -> usize {
        if self.extensible {
            16 + 2 + EXTENSIBLE_CB_SIZE as usize
        } else {
            16
        }
    }

    fn byte_rate(&self) -> u32 {
        self.sample_rate_hz.wrapping_mul(u32::from(self.block_alignment))
    }

    /// Write the image to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let riff_size = self.data_offset() - 8 + self.data.len() as u64;
        let riff_size = u32::try_from(riff_size).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "WAV image exceeds 4 GiB")
        })?;

        out.write_all(&FourCc::RIFF.0)?;
        out.write_u32::<LittleEndian>(riff_size)?;
        out.write_all(&FourCc::WAVE.0)?;

        if let Some(bext) = &self.bext {
            write_chunk(out, FourCc::BEXT, bext)?;
        }

        out.write_all(&FourCc::FMT.0)?;
        out.write_u32::<LittleEndian>(self.format_chunk_len() as u32)?;
        out.write_u16::<LittleEndian>(self.format_code)?;
        out.write_u16::<LittleEndian>(self.num_channels)?;
        out.write_u32::<LittleEndian>(self.sample_rate_hz)?;
        out.write_u32::<LittleEndian>(self.byte_rate())?;
        out.write_u16::<LittleEndian>(self.block_alignment)?;
        out.write_u16::<LittleEndian>(self.bits_per_sample)?;
        if self.extensible {
            out.write_u16::<LittleEndian>(EXTENSIBLE_CB_SIZE)?;
            out.write_u16::<LittleEndian>(self.bits_per_sample)?;
            out.write_u32::<LittleEndian>(channel_mask(self.num_channels))?;
            out.write_all(&PCM_SUBFORMAT_GUID)?;
        }

        for (id, payload) in &self.extra_chunks {
            write_chunk(out, *id, payload)?;
        }

        write_chunk(out, FourCc::DATA, &self.data)
    }

    /// Encode the image into memory. Fails if a chunk or the whole image
    /// exceeds 4 GiB.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.data_offset() as usize + self.data.len());
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Write the image to a file at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()
    }
}

fn write_chunk<W: Write>(out: &mut W, id: FourCc, payload: &[u8]) -> io::Result<()> {
    let size = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "chunk exceeds 4 GiB"))?;
    out.write_all(&id.0)?;
    out.write_u32::<LittleEndian>(size)?;
    out.write_all(payload)
}

/// Default speaker mask: the first `channels` speaker positions.
fn channel_mask(channels: u16) -> u32 {
    match channels {
        0 => 0,
        n if n >= 32 => u32::MAX,
        n => (1u32 << n) - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::input::StreamInput;
    use crate::reader::read_header;
    use std::io::Cursor;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    #[test]
    fn test_canonical_layout() {
        let bytes = WavWriter::new(1, 44_100, 16)
            .with_data(vec![0, 0, 1, 0])
            .to_bytes()
            .unwrap();

        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[4..8], &40u32.to_le_bytes());
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(&bytes[16..20], &16u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &88_200u32.to_le_bytes());
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(&bytes[40..44], &4u32.to_le_bytes());
    }

    #[test]
    fn test_data_offset_matches_image() {
        let writer = WavWriter::new(2, 48_000, 16)
            .extensible()
            .with_bext(vec![0; 10])
            .with_chunk(*b"LIST", vec![0; 26])
            .with_data(vec![7; 8]);
        let bytes = writer.to_bytes().unwrap();
        let offset = writer.data_offset() as usize;
        assert_eq!(&bytes[offset - 8..offset - 4], b"data");
        assert_eq!(&bytes[offset..], &[7; 8]);
    }

    #[test]
    fn test_write_error_is_returned() {
        let writer = WavWriter::new(2, 48_000, 16).with_data(vec![0; 64]);
        let mut short = [0u8; 20];
        let err = writer.write_to(&mut &mut short[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }

    #[test]
    fn test_channel_mask() {
        assert_eq!(channel_mask(1), 0b1);
        assert_eq!(channel_mask(2), 0b11);
        assert_eq!(channel_mask(6), 0b11_1111);
        assert_eq!(channel_mask(40), u32::MAX);
    }

    #[test]
    fn test_symphonia_accepts_written_file() {
        let bytes = WavWriter::new(2, 48_000, 16)
            .with_data(vec![0; 48_000 * 4 / 10])
            .to_bytes()
            .unwrap();

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let mut hint = Hint::new();
        hint.with_extension("wav");
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .expect("symphonia should probe the file");

        let track = probed.format.default_track().expect("audio track");
        assert_eq!(track.codec_params.sample_rate, Some(48_000));
        assert_eq!(track.codec_params.channels.map(|c| c.count()), Some(2));
    }

    #[test]
    fn test_saved_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let writer = WavWriter::new(2, 22_050, 16)
            .with_chunk(*b"JUNK", vec![0; 20])
            .with_data(vec![1; 88]);
        writer.save(&path).unwrap();

        let mut input = StreamInput::open(&path, &Config::new()).unwrap();
        let header = read_header(&mut input).unwrap().unwrap();
        assert_eq!(header.sample_rate_hz(), 22_050);
        assert_eq!(header.average_bytes_per_second(), 88_200);
        assert_eq!(header.data_start_position(), writer.data_offset());
        assert_eq!(header.data_size(), 88);
    }
}
