//! Sequences, collections and the arena that owns every loaded object.

use alloc::string::String;
use alloc::vec::Vec;
use slotmap::SlotMap;

use crate::instrument::InstrumentSet;
use crate::raw_file::RawFile;
use crate::sample_collection::SampleCollection;

slotmap::new_key_type! {
    /// Handle to a sequence in the library.
    pub struct SequenceKey;
    /// Handle to an instrument set in the library.
    pub struct InstrumentSetKey;
    /// Handle to an external sample collection in the library.
    pub struct SampleCollectionKey;
    /// Handle to a collection in the library.
    pub struct CollectionKey;
}

/// A discovered sequence. Its event contents are handled elsewhere; the
/// model only needs its identity and size.
#[derive(Clone, Debug)]
pub struct Sequence {
    pub name: String,
    pub raw: RawFile,
    pub offset: u32,
    pub length: u32,
}

impl Sequence {
    pub fn new(name: &str, raw: RawFile, offset: u32, length: u32) -> Self {
        Self {
            name: String::from(name),
            raw,
            offset,
            length,
        }
    }
}

/// One playable song: a sequence plus the banks and samples it uses.
#[derive(Clone, Debug, Default)]
pub struct Collection {
    pub name: String,
    pub sequence: Option<SequenceKey>,
    pub instrument_sets: Vec<InstrumentSetKey>,
    /// External sample collections, in global-index order
    pub sample_collections: Vec<SampleCollectionKey>,
}

impl Collection {
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            ..Self::default()
        }
    }
}

/// Owner of every sequence, instrument set, sample collection and
/// collection discovered during a session.
#[derive(Debug, Default)]
pub struct Library {
    pub sequences: SlotMap<SequenceKey, Sequence>,
    pub instrument_sets: SlotMap<InstrumentSetKey, InstrumentSet>,
    pub sample_collections: SlotMap<SampleCollectionKey, SampleCollection>,
    pub collections: SlotMap<CollectionKey, Collection>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, key: CollectionKey) -> Option<&Collection> {
        self.collections.get(key)
    }

    /// Remove a sequence; collections built on it are removed too.
    pub fn remove_sequence(&mut self, key: SequenceKey) -> Option<Sequence> {
        let seq = self.sequences.remove(key)?;
        self.collections.retain(|_, coll| coll.sequence != Some(key));
        Some(seq)
    }

    /// Remove an instrument set and drop it from every collection.
    pub fn remove_instrument_set(&mut self, key: InstrumentSetKey) -> Option<InstrumentSet> {
        let set = self.instrument_sets.remove(key)?;
        for coll in self.collections.values_mut() {
            coll.instrument_sets.retain(|k| *k != key);
        }
        Some(set)
    }

    /// Remove a sample collection, clearing region handles and collection
    /// entries that pointed to it.
    pub fn remove_sample_collection(&mut self, key: SampleCollectionKey) -> Option<SampleCollection> {
        let coll = self.sample_collections.remove(key)?;
        for set in self.instrument_sets.values_mut() {
            for rgn in set.instruments.iter_mut().flat_map(|i| i.regions.iter_mut()) {
                if rgn.sample_collection == Some(key) {
                    rgn.sample_collection = None;
                }
            }
        }
        for collection in self.collections.values_mut() {
            collection.sample_collections.retain(|k| *k != key);
        }
        Some(coll)
    }
}
