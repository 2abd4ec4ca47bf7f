//! Staged construction of instrument sets and sample collections.
//!
//! Each format implements the loader traits; the drivers below run the
//! stages in order and freeze the object once every stage succeeded.

use bc_formats::FormatError;
use bc_ir::{InstrumentSet, ModelError, SampleCollection};
use thiserror::Error;
use tracing::{debug, trace};

/// Per-file load failure. The caller discards the partially built object.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{name}: bad header: {reason}")]
    Header { name: String, reason: String },
    #[error("{name}: bad instrument table: {reason}")]
    Pointers { name: String, reason: String },
    #[error("{name}: instrument {index}: {reason}")]
    Instrument { name: String, index: usize, reason: String },
    #[error("{name}: bad sample table: {reason}")]
    SampleInfo { name: String, reason: String },
    #[error("read of {len} bytes at {offset:#x} is past the end of the file")]
    OutOfBounds { offset: u32, len: u32 },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Format-specific construction of an [`InstrumentSet`].
pub trait InstrumentSetLoader {
    fn parse_header(&mut self, set: &mut InstrumentSet) -> Result<(), LoadError>;

    /// Create the instruments (normally with `add_instrument`).
    fn parse_instrument_pointers(&mut self, set: &mut InstrumentSet) -> Result<(), LoadError>;

    /// Fill in the regions of instrument `index`.
    fn load_instrument(&mut self, set: &mut InstrumentSet, index: usize) -> Result<(), LoadError>;
}

/// Format-specific construction of a [`SampleCollection`].
pub trait SampleCollectionLoader {
    fn parse_header(&mut self, coll: &mut SampleCollection) -> Result<(), LoadError>;

    /// Create the samples (normally with `add_sample`).
    fn parse_sample_info(&mut self, coll: &mut SampleCollection) -> Result<(), LoadError>;
}

/// Run every stage of `loader` over `set`, then mark it loaded.
pub fn load_instrument_set(
    set: &mut InstrumentSet,
    loader: &mut impl InstrumentSetLoader,
) -> Result<(), LoadError> {
    loader.parse_header(set)?;
    loader.parse_instrument_pointers(set)?;
    trace!(set = %set.name, instruments = set.instruments.len(), "parsed instrument table");
    for index in 0..set.instruments.len() {
        loader.load_instrument(set, index)?;
    }
    set.mark_loaded();
    debug!(set = %set.name, regions = set.region_count(), "loaded instrument set");
    Ok(())
}

/// Run every stage of `loader` over `coll`, then mark it loaded.
pub fn load_sample_collection(
    coll: &mut SampleCollection,
    loader: &mut impl SampleCollectionLoader,
) -> Result<(), LoadError> {
    loader.parse_header(coll)?;
    loader.parse_sample_info(coll)?;
    coll.mark_loaded();
    debug!(collection = %coll.name, samples = coll.len(), "loaded sample collection");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bc_ir::{RawFile, SampleEncoding, SampleFormat};

    /// Header byte 0 = instrument count, then one sample index per instrument.
    struct TinyBank;

    impl InstrumentSetLoader for TinyBank {
        fn parse_header(&mut self, set: &mut InstrumentSet) -> Result<(), LoadError> {
            if set.raw.is_empty() {
                return Err(LoadError::Header {
                    name: set.name.clone(),
                    reason: "empty file".into(),
                });
            }
            Ok(())
        }

        fn parse_instrument_pointers(&mut self, set: &mut InstrumentSet) -> Result<(), LoadError> {
            let count = set.raw.get_u8(0).unwrap_or(0);
            for program in 0..count {
                set.add_instrument(1 + program as u32, 0, program)?;
            }
            Ok(())
        }

        fn load_instrument(&mut self, set: &mut InstrumentSet, index: usize) -> Result<(), LoadError> {
            let offset = 1 + index as u32;
            let sample = set
                .raw
                .get_u8(offset)
                .ok_or(LoadError::OutOfBounds { offset, len: 1 })?;
            set.add_region(index, offset, sample as u32)?;
            Ok(())
        }
    }

    struct FixedSamples(u32);

    impl SampleCollectionLoader for FixedSamples {
        fn parse_header(&mut self, _coll: &mut SampleCollection) -> Result<(), LoadError> {
            Ok(())
        }

        fn parse_sample_info(&mut self, coll: &mut SampleCollection) -> Result<(), LoadError> {
            for i in 0..self.0 {
                coll.add_sample(i * 4, 4, SampleFormat::mono(SampleEncoding::Pcm16, 8000))?;
            }
            Ok(())
        }
    }

    #[test]
    fn stages_run_in_order_and_freeze() {
        let raw = RawFile::new("bank.bin", vec![2, 7, 9]);
        let mut set = InstrumentSet::new("bank", raw, 0, 3);
        load_instrument_set(&mut set, &mut TinyBank).unwrap();
        assert!(set.is_loaded());
        assert_eq!(set.instruments.len(), 2);
        assert_eq!(set.instruments[1].regions[0].sample_num, 9);
        assert!(set.add_instrument(0, 0, 0).is_err());
    }

    #[test]
    fn failing_stage_leaves_set_unloaded() {
        let raw = RawFile::new("bank.bin", vec![3, 1]);
        let mut set = InstrumentSet::new("bank", raw, 0, 2);
        let err = load_instrument_set(&mut set, &mut TinyBank).unwrap_err();
        assert!(matches!(err, LoadError::OutOfBounds { offset: 2, .. }));
        assert!(!set.is_loaded());
    }

    #[test]
    fn header_failure_stops_early() {
        let mut set = InstrumentSet::new("bank", RawFile::new("bank.bin", vec![]), 0, 0);
        assert!(matches!(
            load_instrument_set(&mut set, &mut TinyBank),
            Err(LoadError::Header { .. })
        ));
        assert!(set.instruments.is_empty());
    }

    #[test]
    fn sample_collection_is_frozen_after_load() {
        let mut coll = SampleCollection::new("s", RawFile::new("s.bin", vec![0; 8]), 0, 8);
        load_sample_collection(&mut coll, &mut FixedSamples(2)).unwrap();
        assert!(coll.is_loaded());
        assert_eq!(coll.len(), 2);
        assert!(matches!(
            load_sample_collection(&mut coll, &mut FixedSamples(1)),
            Err(LoadError::Model(ModelError::AlreadyLoaded(_)))
        ));
    }
}
