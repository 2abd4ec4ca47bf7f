//! Instruments and instrument sets.

use alloc::string::String;
use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::error::ModelError;
use crate::raw_file::RawFile;
use crate::region::Region;
use crate::sample_collection::SampleCollection;

/// Default reverb send of a new instrument, as a fraction.
pub const DEFAULT_REVERB: f64 = 0.8;

/// One bank program.
#[derive(Clone, Debug)]
pub struct Instrument {
    pub name: ArrayString<32>,
    /// Offset of the instrument record in the source image
    pub offset: u32,
    /// 14-bit bank number (MSB << 7 | LSB)
    pub bank: u16,
    pub program: u8,
    pub drum_kit: bool,
    /// Reverb send, 0.0..=1.0
    pub reverb: f64,
    pub regions: Vec<Region>,
}

impl Instrument {
    pub fn new(offset: u32, bank: u16, program: u8) -> Self {
        let mut name = ArrayString::new();
        let _ = core::fmt::write(
            &mut name,
            format_args!("Instrument {}:{}", bank, program),
        );
        Self {
            name,
            offset,
            bank: bank & 0x3FFF,
            program: program & 0x7F,
            drum_kit: false,
            reverb: DEFAULT_REVERB,
            regions: Vec::new(),
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        for ch in name.chars() {
            if self.name.try_push(ch).is_err() {
                break;
            }
        }
    }
}

/// An instrument bank file: ordered instruments plus an optional embedded
/// sample archive.
#[derive(Clone, Debug)]
pub struct InstrumentSet {
    pub name: String,
    pub raw: RawFile,
    pub offset: u32,
    /// Size of the bank in bytes
    pub length: u32,
    pub instruments: Vec<Instrument>,
    /// Samples stored inside the bank itself
    pub sample_collection: Option<SampleCollection>,
    loaded: bool,
}

impl InstrumentSet {
    pub fn new(name: &str, raw: RawFile, offset: u32, length: u32) -> Self {
        Self {
            name: String::from(name),
            raw,
            offset,
            length,
            instruments: Vec::new(),
            sample_collection: None,
            loaded: false,
        }
    }

    /// Append an instrument and return its index.
    pub fn add_instrument(&mut self, offset: u32, bank: u16, program: u8) -> Result<usize, ModelError> {
        if self.loaded {
            return Err(ModelError::AlreadyLoaded("instrument set"));
        }
        self.instruments.push(Instrument::new(offset, bank, program));
        Ok(self.instruments.len() - 1)
    }

    /// Append a region to instrument `instr` and return it for further setup.
    pub fn add_region(
        &mut self,
        instr: usize,
        offset: u32,
        sample_num: u32,
    ) -> Result<&mut Region, ModelError> {
        if self.loaded {
            return Err(ModelError::AlreadyLoaded("instrument set"));
        }
        let instrument = self
            .instruments
            .get_mut(instr)
            .ok_or(ModelError::NoSuchInstrument(instr))?;
        instrument.regions.push(Region::new(offset, sample_num));
        let index = instrument.regions.len() - 1;
        Ok(&mut instrument.regions[index])
    }

    /// Freeze the set. Also freezes the embedded sample collection.
    pub fn mark_loaded(&mut self) {
        self.loaded = true;
        if let Some(coll) = self.sample_collection.as_mut() {
            coll.mark_loaded();
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn region_count(&self) -> usize {
        self.instruments.iter().map(|i| i.regions.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn set() -> InstrumentSet {
        InstrumentSet::new("bank", RawFile::new("bank.bin", vec![0; 16]), 0, 16)
    }

    #[test]
    fn builder_appends_in_order() {
        let mut set = set();
        let a = set.add_instrument(0x10, 0, 5).unwrap();
        let b = set.add_instrument(0x20, 1, 6).unwrap();
        set.add_region(a, 0x30, 0).unwrap().set_key_range(0, 59);
        set.add_region(a, 0x40, 1).unwrap().set_key_range(60, 127);
        set.add_region(b, 0x50, 2).unwrap();
        assert_eq!(set.instruments[a].regions.len(), 2);
        assert_eq!(set.instruments[a].regions[1].key_low, 60);
        assert_eq!(set.instruments[b].program, 6);
        assert_eq!(set.region_count(), 3);
    }

    #[test]
    fn builder_rejects_after_load() {
        let mut set = set();
        let a = set.add_instrument(0, 0, 0).unwrap();
        set.mark_loaded();
        assert_eq!(set.add_instrument(0, 0, 1), Err(ModelError::AlreadyLoaded("instrument set")));
        assert!(set.add_region(a, 0, 0).is_err());
    }

    #[test]
    fn unknown_instrument_index_is_an_error() {
        let mut set = set();
        assert_eq!(set.add_region(3, 0, 0).unwrap_err(), ModelError::NoSuchInstrument(3));
    }

    #[test]
    fn marking_loaded_freezes_embedded_samples() {
        let mut set = set();
        set.sample_collection = Some(SampleCollection::new("embedded", set.raw.clone(), 0, 16));
        set.mark_loaded();
        assert!(set.sample_collection.as_ref().unwrap().is_loaded());
    }

    #[test]
    fn default_name_mentions_patch() {
        let inst = Instrument::new(0, 2, 9);
        assert_eq!(inst.name.as_str(), "Instrument 2:9");
        assert_eq!(inst.reverb, DEFAULT_REVERB);
    }
}
