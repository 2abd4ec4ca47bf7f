//! Output formats for bankconv.
//!
//! Serializes a resolved bank to DLS and SF2, and single samples to WAV,
//! through a shared RIFF chunk framework.

pub mod chunk;
mod dls;
mod sf2;
pub mod synth;
mod wav_format;

use std::io::Cursor;

use binrw::{BinRead, BinWrite, Endian};
use thiserror::Error;

pub use chunk::{Chunk, ChunkNode, FourCc, ListChunk, RiffChunks};
pub use dls::{build_dls, produce_dls, write_dls, DlsOptions};
pub use sf2::{produce_sf2, write_sf2, Sf2Options};
pub use synth::{BankSource, SynthBank, SynthError, SynthInstrument, SynthRegion, SynthSample};
pub use wav_format::{parse_wav, sample_to_wav, write_sample_wav, WavInfo};

/// Error type for format reading and writing.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    #[error("invalid header")]
    InvalidHeader,
    /// Unexpected end of file
    #[error("unexpected end of data")]
    UnexpectedEof,
    /// Unsupported format version
    #[error("unsupported format variant")]
    UnsupportedVersion,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("binary record error: {0}")]
    Encode(#[from] binrw::Error),
    /// A count does not fit the width of its field
    #[error("too many {what} ({count}) for a 16-bit index")]
    TooLarge { what: &'static str, count: usize },
    #[error(transparent)]
    Synth(#[from] SynthError),
}

/// Serialize one fixed-size little-endian record.
pub(crate) fn encode<T>(record: &T) -> Result<Vec<u8>, FormatError>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let mut cursor = Cursor::new(Vec::new());
    record.write_options(&mut cursor, Endian::Little, ())?;
    Ok(cursor.into_inner())
}

/// Parse one fixed-size little-endian record from the front of `bytes`.
pub(crate) fn decode<T>(bytes: &[u8]) -> Result<T, FormatError>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    T::read_options(&mut Cursor::new(bytes), Endian::Little, ()).map_err(|err| {
        if err.is_eof() {
            FormatError::UnexpectedEof
        } else {
            FormatError::Encode(err)
        }
    })
}

/// Serialize a run of records back to back.
pub(crate) fn encode_all<T>(records: &[T]) -> Result<Vec<u8>, FormatError>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let mut cursor = Cursor::new(Vec::new());
    for record in records {
        record.write_options(&mut cursor, Endian::Little, ())?;
    }
    Ok(cursor.into_inner())
}

/// Fixed-width, zero-padded name field.
pub(crate) fn name_field<const N: usize>(name: &str) -> [u8; N] {
    let mut field = [0u8; N];
    let bytes: Vec<u8> = name.bytes().filter(|b| b.is_ascii() && *b != 0).collect();
    let len = bytes.len().min(N - 1);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}
