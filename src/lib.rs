//! RIFF/WAVE header scanning over peekable byte sources.
//!
//! `reader::peek` validates the envelope and decodes the format chunk
//! without consuming input; `reader::skip_to_data` then commits past the
//! remaining metadata chunks and locates the sample data.

pub mod cancel;
pub mod chunk;
pub mod config;
pub mod error;
pub mod header;
pub mod input;
pub mod logging;
pub mod reader;
pub mod writer;

pub use cancel::CancellationToken;
pub use chunk::{ChunkHeader, FourCc};
pub use config::Config;
pub use error::{Result, WavError};
pub use header::{DataBounds, FormatType, WavFormat, WavHeader};
pub use input::{ExtractorInput, StreamInput};
pub use reader::{peek, read_header, skip_to_data};
pub use writer::WavWriter;
