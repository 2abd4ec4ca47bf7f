//! Pairs sequences with the instrument sets and sample collections found
//! in the same source file.

use std::collections::VecDeque;

use bc_ir::{
    Collection, CollectionKey, InstrumentSetKey, Library, SampleCollectionKey, SequenceKey,
};
use tracing::{debug, info, warn};

/// Matcher settings.
#[derive(Clone, Debug)]
pub struct MatcherConfig {
    /// Files whose extension ends with this suffix only carry dependencies
    /// of other files (`psflib`, `2sflib`, ...) and are never paired.
    pub aux_suffix: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            aux_suffix: "lib".to_string(),
        }
    }
}

impl MatcherConfig {
    pub fn is_aux_file(&self, extension: &str) -> bool {
        !self.aux_suffix.is_empty() && extension.to_ascii_lowercase().ends_with(&self.aux_suffix)
    }
}

/// Queues of not-yet-associated objects of one source file.
#[derive(Debug, Default)]
pub struct Matcher {
    sequences: VecDeque<SequenceKey>,
    instrument_sets: VecDeque<InstrumentSetKey>,
    sample_collections: VecDeque<SampleCollectionKey>,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_new_sequence(&mut self, key: SequenceKey) {
        self.sequences.push_back(key);
    }

    pub fn on_new_instrument_set(&mut self, key: InstrumentSetKey) {
        self.instrument_sets.push_back(key);
    }

    pub fn on_new_sample_collection(&mut self, key: SampleCollectionKey) {
        self.sample_collections.push_back(key);
    }

    pub fn on_close_sequence(&mut self, key: SequenceKey) {
        self.sequences.retain(|k| *k != key);
    }

    pub fn on_close_instrument_set(&mut self, key: InstrumentSetKey) {
        self.instrument_sets.retain(|k| *k != key);
    }

    pub fn on_close_sample_collection(&mut self, key: SampleCollectionKey) {
        self.sample_collections.retain(|k| *k != key);
    }

    pub fn pending_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn pending_instrument_sets(&self) -> usize {
        self.instrument_sets.len()
    }

    pub fn pending_sample_collections(&self) -> usize {
        self.sample_collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty() && self.instrument_sets.is_empty() && self.sample_collections.is_empty()
    }

    /// Greedily pair the queued objects into collections.
    ///
    /// Each round takes the front sequence and instrument set, plus the front
    /// sample collection unless the set carries its own samples. With a
    /// single partner on one side, the other side is sorted largest first;
    /// equal sizes keep their arrival order.
    pub fn pair(&mut self, library: &mut Library) -> Vec<CollectionKey> {
        let mut created = Vec::new();
        while !self.sequences.is_empty() && !self.instrument_sets.is_empty() {
            if self.sequences.len() == 1 && self.instrument_sets.len() > 1 {
                self.instrument_sets
                    .make_contiguous()
                    .sort_by(|a, b| set_size(library, *b).cmp(&set_size(library, *a)));
            }
            if self.sequences.len() == 1 && self.sample_collections.len() > 1 {
                self.sort_sample_collections(library);
            }
            if self.instrument_sets.len() == 1 && self.sample_collections.len() > 1 {
                self.sort_sample_collections(library);
            }

            let (Some(seq), Some(set)) = (self.sequences.pop_front(), self.instrument_sets.pop_front())
            else {
                break;
            };

            let has_embedded = library
                .instrument_sets
                .get(set)
                .is_some_and(|s| s.sample_collection.is_some());
            let sample_collection = if has_embedded {
                None
            } else {
                match self.sample_collections.pop_front() {
                    Some(coll) => Some(coll),
                    None => {
                        debug!("no sample collection left to pair, stopping");
                        break;
                    }
                }
            };

            let name = library
                .sequences
                .get(seq)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            let mut collection = Collection::new(&name);
            collection.sequence = Some(seq);
            collection.instrument_sets.push(set);
            collection.sample_collections.extend(sample_collection);

            if finalize(library, &collection) {
                info!(collection = %name, "matched collection");
                created.push(library.collections.insert(collection));
            } else {
                warn!(collection = %name, "discarding collection that failed to finalize");
            }
        }
        created
    }

    fn sort_sample_collections(&mut self, library: &Library) {
        self.sample_collections
            .make_contiguous()
            .sort_by(|a, b| collection_size(library, *b).cmp(&collection_size(library, *a)));
    }
}

fn set_size(library: &Library, key: InstrumentSetKey) -> u32 {
    library.instrument_sets.get(key).map_or(0, |s| s.length)
}

fn collection_size(library: &Library, key: SampleCollectionKey) -> u32 {
    library.sample_collections.get(key).map_or(0, |c| c.length)
}

/// Check that a collection can be converted: every handle is live, a
/// sample collection is resolvable and it holds samples.
pub fn finalize(library: &Library, collection: &Collection) -> bool {
    if collection.sequence.is_some_and(|k| !library.sequences.contains_key(k)) {
        return false;
    }
    if collection.instrument_sets.is_empty()
        || collection
            .instrument_sets
            .iter()
            .any(|k| !library.instrument_sets.contains_key(*k))
    {
        return false;
    }

    let sample_count: Option<usize> = if collection.sample_collections.is_empty() {
        let embedded: Vec<usize> = collection
            .instrument_sets
            .iter()
            .filter_map(|k| library.instrument_sets.get(*k)?.sample_collection.as_ref())
            .map(|c| c.len())
            .collect();
        (!embedded.is_empty()).then(|| embedded.iter().sum())
    } else {
        collection
            .sample_collections
            .iter()
            .map(|k| library.sample_collections.get(*k).map(|c| c.len()))
            .sum()
    };
    matches!(sample_count, Some(n) if n > 0)
}
