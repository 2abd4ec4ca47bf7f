//! Per-file scanning context and the scanner trait.

use bc_ir::{
    Collection, CollectionKey, InstrumentSet, InstrumentSetKey, Library, RawFile, SampleCollection,
    SampleCollectionKey, Sequence, SequenceKey,
};
use tracing::{debug, warn};

use crate::loader::{
    load_instrument_set, load_sample_collection, InstrumentSetLoader, LoadError,
    SampleCollectionLoader,
};
use crate::matcher::{finalize, Matcher, MatcherConfig};

/// Detects one family of formats in a file and registers what it finds.
pub trait FormatScanner {
    fn name(&self) -> &str;

    /// Scan the context's file. Not recognizing the file is not an error;
    /// the scanner just registers nothing.
    fn scan(&self, ctx: &mut ScanContext<'_>) -> Result<(), LoadError>;
}

/// State of one source file's scan: the file, the library receiving
/// objects, and the matcher queues.
pub struct ScanContext<'a> {
    library: &'a mut Library,
    file: RawFile,
    config: &'a MatcherConfig,
    matcher: Matcher,
    registered: usize,
    collections: Vec<CollectionKey>,
}

impl<'a> ScanContext<'a> {
    pub fn new(library: &'a mut Library, file: RawFile, config: &'a MatcherConfig) -> Self {
        Self {
            library,
            file,
            config,
            matcher: Matcher::new(),
            registered: 0,
            collections: Vec::new(),
        }
    }

    pub fn file(&self) -> &RawFile {
        &self.file
    }

    pub fn library(&self) -> &Library {
        self.library
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Number of objects registered so far.
    pub fn registered(&self) -> usize {
        self.registered
    }

    pub fn add_sequence(&mut self, seq: Sequence) -> SequenceKey {
        debug!(sequence = %seq.name, "new sequence");
        let key = self.library.sequences.insert(seq);
        self.matcher.on_new_sequence(key);
        self.registered += 1;
        key
    }

    /// Register an already loaded instrument set.
    pub fn add_instrument_set(&mut self, set: InstrumentSet) -> InstrumentSetKey {
        debug!(set = %set.name, instruments = set.instruments.len(), "new instrument set");
        let key = self.library.instrument_sets.insert(set);
        self.matcher.on_new_instrument_set(key);
        self.registered += 1;
        key
    }

    /// Register an already loaded sample collection.
    pub fn add_sample_collection(&mut self, coll: SampleCollection) -> SampleCollectionKey {
        debug!(collection = %coll.name, samples = coll.len(), "new sample collection");
        let key = self.library.sample_collections.insert(coll);
        self.matcher.on_new_sample_collection(key);
        self.registered += 1;
        key
    }

    /// Run `loader` over `set` and register it on success. On failure the
    /// set is dropped.
    pub fn load_instrument_set(
        &mut self,
        mut set: InstrumentSet,
        loader: &mut impl InstrumentSetLoader,
    ) -> Result<InstrumentSetKey, LoadError> {
        if let Err(err) = load_instrument_set(&mut set, loader) {
            warn!(set = %set.name, %err, "discarding instrument set");
            return Err(err);
        }
        Ok(self.add_instrument_set(set))
    }

    /// Run `loader` over `coll` and register it on success. On failure the
    /// collection is dropped.
    pub fn load_sample_collection(
        &mut self,
        mut coll: SampleCollection,
        loader: &mut impl SampleCollectionLoader,
    ) -> Result<SampleCollectionKey, LoadError> {
        if let Err(err) = load_sample_collection(&mut coll, loader) {
            warn!(collection = %coll.name, %err, "discarding sample collection");
            return Err(err);
        }
        Ok(self.add_sample_collection(coll))
    }

    /// Register an explicitly built collection if it finalizes.
    pub fn add_collection(&mut self, collection: Collection) -> Option<CollectionKey> {
        if !finalize(self.library, &collection) {
            warn!(collection = %collection.name, "discarding collection that failed to finalize");
            return None;
        }
        let key = self.library.collections.insert(collection);
        self.collections.push(key);
        Some(key)
    }

    pub fn remove_sequence(&mut self, key: SequenceKey) {
        self.matcher.on_close_sequence(key);
        self.library.remove_sequence(key);
    }

    pub fn remove_instrument_set(&mut self, key: InstrumentSetKey) {
        self.matcher.on_close_instrument_set(key);
        self.library.remove_instrument_set(key);
    }

    pub fn remove_sample_collection(&mut self, key: SampleCollectionKey) {
        self.matcher.on_close_sample_collection(key);
        self.library.remove_sample_collection(key);
    }

    /// End of the file: pair what is left in the matcher queues, unless
    /// the file only carries dependencies. Returns every collection created
    /// during this scan.
    pub fn finish(mut self) -> Vec<CollectionKey> {
        let extension = self.file.extension();
        if self.config.is_aux_file(&extension) {
            debug!(file = self.file.name(), "auxiliary file, skipping pairing");
        } else {
            let paired = self.matcher.pair(self.library);
            self.collections.extend(paired);
        }
        self.collections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bc_ir::{SampleEncoding, SampleFormat};

    fn populate(ctx: &mut ScanContext<'_>) {
        let raw = ctx.file().clone();
        ctx.add_sequence(Sequence::new("song", raw.clone(), 0, 4));
        let mut set = InstrumentSet::new("bank", raw.clone(), 0, 4);
        set.mark_loaded();
        ctx.add_instrument_set(set);
        let mut coll = SampleCollection::new("wave", raw, 0, 4);
        coll.add_sample(0, 4, SampleFormat::mono(SampleEncoding::Pcm8, 8000)).unwrap();
        coll.mark_loaded();
        ctx.add_sample_collection(coll);
    }

    #[test]
    fn finish_pairs_registered_objects() {
        let mut lib = Library::new();
        let config = MatcherConfig::default();
        let mut ctx = ScanContext::new(&mut lib, RawFile::new("song.psf", vec![0; 4]), &config);
        populate(&mut ctx);
        assert_eq!(ctx.registered(), 3);
        let created = ctx.finish();
        assert_eq!(created.len(), 1);
        assert_eq!(lib.collections[created[0]].name, "song");
    }

    #[test]
    fn auxiliary_files_are_not_paired() {
        let mut lib = Library::new();
        let config = MatcherConfig::default();
        let mut ctx = ScanContext::new(&mut lib, RawFile::new("bank.psflib", vec![0; 4]), &config);
        populate(&mut ctx);
        assert!(ctx.finish().is_empty());
        assert!(lib.collections.is_empty());
        assert_eq!(lib.sequences.len(), 1);
    }

    #[test]
    fn removed_objects_are_not_paired() {
        let mut lib = Library::new();
        let config = MatcherConfig::default();
        let mut ctx = ScanContext::new(&mut lib, RawFile::new("song.bin", vec![0; 4]), &config);
        populate(&mut ctx);
        let seq = ctx.library().sequences.keys().next().unwrap();
        ctx.remove_sequence(seq);
        assert_eq!(ctx.matcher().pending_sequences(), 0);
        assert!(ctx.finish().is_empty());
    }
}
