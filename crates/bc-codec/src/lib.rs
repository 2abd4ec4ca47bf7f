//! Sample decoders for bankconv.
//!
//! Turns the encoded bytes of a [`Sample`] into [`SampleData`] PCM.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod adpcm;
pub mod pcm;

use bc_ir::{Sample, SampleCollection, SampleData, SampleDecoder, SampleEncoding};
use tracing::{trace, warn};

/// Decoder for the console 4-bit ADPCM, usable as a
/// [`SampleEncoding::Custom`] building block by scanners.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdpcmDecoder;

impl SampleDecoder for AdpcmDecoder {
    fn decode(&self, sample: &Sample, bytes: &[u8]) -> SampleData {
        let _ = sample;
        SampleData::Mono16(adpcm::decode(bytes))
    }

    fn compression_ratio(&self) -> f64 {
        adpcm::COMPRESSION_RATIO
    }
}

/// Decode `bytes` according to the sample's encoding.
///
/// Unknown encodings are logged and decoded as 16-bit PCM.
pub fn decode(sample: &Sample, bytes: &[u8]) -> SampleData {
    trace!(
        offset = sample.data_offset,
        len = bytes.len(),
        encoding = ?sample.encoding,
        "decoding sample"
    );
    match &sample.encoding {
        SampleEncoding::Pcm8 => pcm::decode_pcm8(bytes, sample.channels),
        SampleEncoding::Pcm16 => pcm::decode_pcm16(bytes, sample.channels, false),
        SampleEncoding::Pcm16Be => pcm::decode_pcm16(bytes, sample.channels, true),
        SampleEncoding::Adpcm4 => AdpcmDecoder.decode(sample, bytes),
        SampleEncoding::Custom(decoder) => decoder.decode(sample, bytes),
        SampleEncoding::Unknown(tag) => {
            warn!(
                tag = *tag,
                offset = sample.data_offset,
                "unknown sample encoding, decoding as 16-bit PCM"
            );
            pcm::decode_pcm16(bytes, sample.channels, false)
        }
    }
}

/// Decode sample `index` of a collection from its backing image.
pub fn decode_in(collection: &SampleCollection, index: usize) -> Option<SampleData> {
    let sample = collection.samples.get(index)?;
    Some(decode(sample, collection.sample_bytes(sample)))
}
