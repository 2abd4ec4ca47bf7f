//! RIFF/WAVE files as one-sample banks.

use std::sync::Arc;

use bc_formats::{parse_wav, WavInfo};
use bc_ir::{
    InstrumentSet, Loop, Sample, SampleCollection, SampleData, SampleDecoder, SampleEncoding,
    SampleFormat,
};
use tracing::debug;

use super::{file_stem, SingleSampleBank};
use crate::loader::{load_sample_collection, LoadError, SampleCollectionLoader};
use crate::scan::{FormatScanner, ScanContext};

/// Registers each WAV file as an instrument set with an embedded
/// one-sample collection.
#[derive(Clone, Copy, Debug, Default)]
pub struct WavScanner;

impl FormatScanner for WavScanner {
    fn name(&self) -> &str {
        "wav"
    }

    fn scan(&self, ctx: &mut ScanContext<'_>) -> Result<(), LoadError> {
        let raw = ctx.file().clone();
        let bytes = raw.bytes();
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Ok(());
        }
        let info = parse_wav(bytes)?;
        debug!(
            file = raw.name(),
            channels = info.num_channels,
            rate = info.sample_rate,
            bits = info.bits_per_sample,
            "found WAV"
        );

        let name = file_stem(raw.name()).to_string();
        let mut coll = SampleCollection::new(&name, raw.clone(), 0, raw.len() as u32);
        load_sample_collection(&mut coll, &mut WavSamples { name: &name, info })?;

        let mut set = InstrumentSet::new(&name, raw.clone(), 0, raw.len() as u32);
        set.sample_collection = Some(coll);
        ctx.load_instrument_set(
            set,
            &mut SingleSampleBank {
                name: &name,
                collection: None,
            },
        )?;
        Ok(())
    }
}

struct WavSamples<'a> {
    name: &'a str,
    info: WavInfo,
}

impl SampleCollectionLoader for WavSamples<'_> {
    fn parse_header(&mut self, coll: &mut SampleCollection) -> Result<(), LoadError> {
        if self.info.data_size == 0 {
            return Err(LoadError::Header {
                name: coll.name.clone(),
                reason: "empty data chunk".into(),
            });
        }
        Ok(())
    }

    fn parse_sample_info(&mut self, coll: &mut SampleCollection) -> Result<(), LoadError> {
        let info = &self.info;
        let encoding = if info.bits_per_sample == 8 {
            SampleEncoding::Custom(Arc::new(UnsignedPcm8))
        } else {
            SampleEncoding::Pcm16
        };
        let format = SampleFormat {
            encoding,
            channels: info.num_channels,
            bits_per_sample: info.bits_per_sample,
            rate: info.sample_rate,
        };
        let sample = coll.add_sample(info.data_offset as u32, info.data_size as u32, format)?;
        sample.set_name(self.name);
        sample.loop_info = match info.loop_info {
            Some(lp) => Loop::samples(lp.start, lp.length),
            None => Loop::off(),
        };
        Ok(())
    }
}

/// 8-bit WAV data is unsigned; the model's 8-bit PCM is signed.
struct UnsignedPcm8;

impl SampleDecoder for UnsignedPcm8 {
    fn decode(&self, sample: &Sample, bytes: &[u8]) -> SampleData {
        let signed: Vec<u8> = bytes.iter().map(|b| b ^ 0x80).collect();
        bc_codec::pcm::decode_pcm8(&signed, sample.channels)
    }
}
