//! Built-in scanners.

mod raw;
mod wav;

pub use raw::{RawSampleConfig, RawSampleScanner};
pub use wav::WavScanner;

use bc_ir::{InstrumentSet, SampleCollectionKey};

use crate::loader::{InstrumentSetLoader, LoadError};

/// A bank of one instrument with one full-range region playing sample 0.
struct SingleSampleBank<'a> {
    name: &'a str,
    /// External collection holding the sample; the embedded one when unset
    collection: Option<SampleCollectionKey>,
}

impl InstrumentSetLoader for SingleSampleBank<'_> {
    fn parse_header(&mut self, _set: &mut InstrumentSet) -> Result<(), LoadError> {
        Ok(())
    }

    fn parse_instrument_pointers(&mut self, set: &mut InstrumentSet) -> Result<(), LoadError> {
        let index = set.add_instrument(0, 0, 0)?;
        set.instruments[index].set_name(self.name);
        Ok(())
    }

    fn load_instrument(&mut self, set: &mut InstrumentSet, index: usize) -> Result<(), LoadError> {
        let rgn = set.add_region(index, 0, 0)?;
        rgn.sample_collection = self.collection;
        Ok(())
    }
}

/// File name without directories or extension.
fn file_stem(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(dot) => &base[..dot],
    }
}
