//! Headerless sample files.

use bc_ir::{InstrumentSet, Loop, SampleCollection, SampleEncoding, SampleFormat};

use super::{file_stem, SingleSampleBank};
use crate::loader::{LoadError, SampleCollectionLoader};
use crate::scan::{FormatScanner, ScanContext};

/// How to interpret a headerless sample file.
#[derive(Clone, Debug)]
pub struct RawSampleConfig {
    /// Lowercase extensions this scanner claims
    pub extensions: Vec<String>,
    pub encoding: SampleEncoding,
    pub channels: u16,
    pub rate: u32,
    pub loop_info: Loop,
}

impl Default for RawSampleConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["raw".to_string(), "pcm".to_string()],
            encoding: SampleEncoding::Pcm16,
            channels: 1,
            rate: 22050,
            loop_info: Loop::off(),
        }
    }
}

/// Registers the whole file as one sample in an external collection, plus
/// a one-region bank playing it.
#[derive(Clone, Debug, Default)]
pub struct RawSampleScanner {
    pub config: RawSampleConfig,
}

impl RawSampleScanner {
    pub fn new(config: RawSampleConfig) -> Self {
        Self { config }
    }
}

impl FormatScanner for RawSampleScanner {
    fn name(&self) -> &str {
        "raw"
    }

    fn scan(&self, ctx: &mut ScanContext<'_>) -> Result<(), LoadError> {
        let raw = ctx.file().clone();
        if !self.config.extensions.contains(&raw.extension()) {
            return Ok(());
        }
        let name = file_stem(raw.name()).to_string();
        let coll = SampleCollection::new(&name, raw.clone(), 0, raw.len() as u32);
        let key = ctx.load_sample_collection(coll, &mut RawSamples { config: &self.config })?;

        let set = InstrumentSet::new(&name, raw, 0, 0);
        ctx.load_instrument_set(
            set,
            &mut SingleSampleBank {
                name: &name,
                collection: Some(key),
            },
        )?;
        Ok(())
    }
}

struct RawSamples<'a> {
    config: &'a RawSampleConfig,
}

impl SampleCollectionLoader for RawSamples<'_> {
    fn parse_header(&mut self, coll: &mut SampleCollection) -> Result<(), LoadError> {
        if coll.raw.is_empty() {
            return Err(LoadError::Header {
                name: coll.name.clone(),
                reason: "empty file".into(),
            });
        }
        Ok(())
    }

    fn parse_sample_info(&mut self, coll: &mut SampleCollection) -> Result<(), LoadError> {
        let config = self.config;
        let mut format = SampleFormat::mono(config.encoding.clone(), config.rate);
        format.channels = config.channels.max(1);
        let name = coll.name.clone();
        let length = coll.raw.len() as u32;
        let sample = coll.add_sample(0, length, format)?;
        sample.set_name(&name);
        sample.loop_info = config.loop_info;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatcherConfig;
    use bc_ir::{Library, RawFile};

    #[test]
    fn raw_file_becomes_external_collection() {
        let mut lib = Library::new();
        let config = MatcherConfig::default();
        let scanner = RawSampleScanner::new(RawSampleConfig {
            extensions: vec!["adp".into()],
            encoding: SampleEncoding::Adpcm4,
            rate: 32000,
            ..RawSampleConfig::default()
        });
        let mut ctx = ScanContext::new(&mut lib, RawFile::new("voice.ADP", vec![0; 36]), &config);
        scanner.scan(&mut ctx).unwrap();
        assert_eq!(ctx.registered(), 2);
        ctx.finish();

        let (key, coll) = lib.sample_collections.iter().next().unwrap();
        assert_eq!(coll.samples[0].decoded_size(), 36 * 4);
        let set = lib.instrument_sets.values().next().unwrap();
        assert_eq!(set.instruments[0].regions[0].sample_collection, Some(key));
    }

    #[test]
    fn unclaimed_extensions_are_ignored() {
        let mut lib = Library::new();
        let config = MatcherConfig::default();
        let mut ctx = ScanContext::new(&mut lib, RawFile::new("voice.wav", vec![0; 4]), &config);
        RawSampleScanner::default().scan(&mut ctx).unwrap();
        assert_eq!(ctx.registered(), 0);
    }

    #[test]
    fn empty_files_are_rejected() {
        let mut lib = Library::new();
        let config = MatcherConfig::default();
        let mut ctx = ScanContext::new(&mut lib, RawFile::new("x.raw", vec![]), &config);
        assert!(matches!(
            RawSampleScanner::default().scan(&mut ctx),
            Err(LoadError::Header { .. })
        ));
        assert_eq!(ctx.registered(), 0);
    }
}
