//! Format-neutral synthesis pass shared by the DLS and SF2 writers.
//!
//! [`SynthBank::build`] resolves every region of a bank source to a global
//! sample index, an effective loop, tuning and attenuation, and decodes all
//! samples to PCM once.

use bc_ir::{
    Collection, CollectionKey, Envelope, InstrumentSet, InstrumentSetKey, Library, Loop,
    LoopStatus, Region, ResolvedLoop, Sample, SampleCollection, SampleCollectionKey, SampleData,
    Vibrato, DEFAULT_UNITY_KEY,
};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Conditions that abort a whole conversion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthError {
    #[error("no instrument sets to convert")]
    NoInstrumentSets,
    #[error("no sample collection could be resolved")]
    NoSampleCollection,
    #[error("the resolved sample collections hold no samples")]
    NoSamples,
    #[error("sample {sample:?} and region at {region_offset:#x} both lack loop information")]
    MissingLoopInfo { sample: String, region_offset: u32 },
}

/// What to convert: instrument sets plus the external sample collections
/// that back them, resolved against a [`Library`].
#[derive(Clone, Debug)]
pub struct BankSource<'a> {
    pub library: &'a Library,
    pub name: String,
    pub instrument_sets: Vec<InstrumentSetKey>,
    /// External collections, in global-index order. When empty, each
    /// instrument set's embedded collection is used instead.
    pub sample_collections: Vec<SampleCollectionKey>,
}

impl<'a> BankSource<'a> {
    pub fn from_collection(library: &'a Library, key: CollectionKey) -> Option<Self> {
        let coll: &Collection = library.collection(key)?;
        Some(Self {
            library,
            name: coll.name.clone(),
            instrument_sets: coll.instrument_sets.clone(),
            sample_collections: coll.sample_collections.clone(),
        })
    }

    /// Bank-only export without a sequence.
    pub fn from_lists(
        library: &'a Library,
        name: &str,
        instrument_sets: &[InstrumentSetKey],
        sample_collections: &[SampleCollectionKey],
    ) -> Self {
        Self {
            library,
            name: name.to_string(),
            instrument_sets: instrument_sets.to_vec(),
            sample_collections: sample_collections.to_vec(),
        }
    }
}

/// Identity of an entry in the final sample collection list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleCollectionId {
    Registered(SampleCollectionKey),
    /// The collection embedded in this instrument set
    Embedded(InstrumentSetKey),
}

struct FinalCollection<'a> {
    id: SampleCollectionId,
    collection: &'a SampleCollection,
    /// Global index of the collection's first sample
    start: usize,
}

/// A decoded sample in global-index order.
#[derive(Clone, Debug)]
pub struct SynthSample {
    pub name: String,
    pub rate: u32,
    pub data: SampleData,
    /// The sample's own loop, in frames
    pub loop_info: ResolvedLoop,
    pub unity_key: u8,
    pub fine_tune: i16,
    pub attenuation_db: f64,
}

/// A region with every inherited value resolved.
#[derive(Clone, Debug)]
pub struct SynthRegion {
    pub key_low: u8,
    pub key_high: u8,
    pub vel_low: u8,
    pub vel_high: u8,
    /// Index into [`SynthBank::samples`]
    pub sample_index: usize,
    /// Effective loop in frames
    pub loop_info: ResolvedLoop,
    pub unity_key: u8,
    pub coarse_tune: i16,
    pub fine_tune: i16,
    pub attenuation_db: f64,
    pub pan: f64,
    pub envelope: Envelope,
    pub vibrato: Option<Vibrato>,
}

#[derive(Clone, Debug)]
pub struct SynthInstrument {
    pub name: String,
    /// 14-bit bank number (MSB << 7 | LSB)
    pub bank: u16,
    pub program: u8,
    pub drum_kit: bool,
    pub reverb: f64,
    pub regions: Vec<SynthRegion>,
}

impl SynthInstrument {
    pub fn bank_msb(&self) -> u8 {
        (self.bank >> 7) as u8 & 0x7F
    }

    pub fn bank_lsb(&self) -> u8 {
        self.bank as u8 & 0x7F
    }
}

/// The format-neutral bank both writers serialize.
#[derive(Clone, Debug)]
pub struct SynthBank {
    pub name: String,
    /// Instruments with at least one region, in source order
    pub instruments: Vec<SynthInstrument>,
    pub samples: Vec<SynthSample>,
}

impl SynthBank {
    pub fn build(source: &BankSource<'_>) -> Result<Self, SynthError> {
        let library = source.library;
        let sets: Vec<(InstrumentSetKey, &InstrumentSet)> = source
            .instrument_sets
            .iter()
            .filter_map(|&key| match library.instrument_sets.get(key) {
                Some(set) => Some((key, set)),
                None => {
                    warn!(?key, "skipping instrument set missing from the library");
                    None
                }
            })
            .collect();
        if sets.is_empty() {
            return Err(SynthError::NoInstrumentSets);
        }

        let finals = final_collections(source, &sets)?;
        let samples = decode_samples(&finals);
        if samples.is_empty() {
            return Err(SynthError::NoSamples);
        }

        let mut instruments = Vec::new();
        for &(set_key, set) in &sets {
            for instr in set.instruments.iter().filter(|i| !i.regions.is_empty()) {
                let mut regions = Vec::with_capacity(instr.regions.len());
                for rgn in &instr.regions {
                    regions.push(resolve_region(set_key, rgn, &finals, &samples)?);
                }
                instruments.push(SynthInstrument {
                    name: instr.name.to_string(),
                    bank: instr.bank,
                    program: instr.program,
                    drum_kit: instr.drum_kit,
                    reverb: instr.reverb,
                    regions,
                });
            }
        }

        debug!(
            name = %source.name,
            instruments = instruments.len(),
            samples = samples.len(),
            "resolved bank"
        );
        Ok(Self {
            name: source.name.clone(),
            instruments,
            samples,
        })
    }

    pub fn region_count(&self) -> usize {
        self.instruments.iter().map(|i| i.regions.len()).sum()
    }
}

fn final_collections<'a>(
    source: &BankSource<'a>,
    sets: &[(InstrumentSetKey, &'a InstrumentSet)],
) -> Result<Vec<FinalCollection<'a>>, SynthError> {
    let mut entries: Vec<(SampleCollectionId, &'a SampleCollection)> = Vec::new();
    if source.sample_collections.is_empty() {
        for &(key, set) in sets {
            if let Some(coll) = set.sample_collection.as_ref() {
                entries.push((SampleCollectionId::Embedded(key), coll));
            }
        }
    } else {
        for &key in &source.sample_collections {
            match source.library.sample_collections.get(key) {
                Some(coll) => entries.push((SampleCollectionId::Registered(key), coll)),
                None => warn!(?key, "skipping sample collection missing from the library"),
            }
        }
    }
    if entries.is_empty() {
        return Err(SynthError::NoSampleCollection);
    }

    let mut start = 0;
    Ok(entries
        .into_iter()
        .map(|(id, collection)| {
            let entry = FinalCollection { id, collection, start };
            start += collection.len();
            entry
        })
        .collect())
}

fn decode_samples(finals: &[FinalCollection<'_>]) -> Vec<SynthSample> {
    let mut out = Vec::new();
    for entry in finals {
        let coll = entry.collection;
        for (i, sample) in coll.samples.iter().enumerate() {
            let data = bc_codec::decode(sample, coll.sample_bytes(sample));
            let name = if sample.name.is_empty() {
                format!("{} {}", coll.name, i)
            } else {
                sample.name.to_string()
            };
            let loop_info = clamp_loop(sample.resolve_loop(&sample.loop_info), data.len());
            out.push(SynthSample {
                name,
                rate: sample.rate,
                data,
                loop_info,
                unity_key: sample.unity_key.unwrap_or(DEFAULT_UNITY_KEY),
                fine_tune: sample.fine_tune,
                attenuation_db: sample.attenuation_db,
            });
        }
    }
    out
}

/// Index into `finals` of the collection a region plays from.
fn resolve_collection(
    set_key: InstrumentSetKey,
    rgn: &Region,
    finals: &[FinalCollection<'_>],
) -> usize {
    if let Some(key) = rgn.sample_collection {
        let id = SampleCollectionId::Registered(key);
        if let Some(pos) = finals.iter().position(|f| f.id == id) {
            return pos;
        }
        error!(
            region = rgn.offset,
            ?key,
            "region references a sample collection outside this bank"
        );
    }
    let embedded = SampleCollectionId::Embedded(set_key);
    finals.iter().position(|f| f.id == embedded).unwrap_or(0)
}

/// Global sample index of a region.
fn resolve_sample_index(
    set_key: InstrumentSetKey,
    rgn: &Region,
    finals: &[FinalCollection<'_>],
    total: usize,
) -> usize {
    let entry = &finals[resolve_collection(set_key, rgn, finals)];
    let local = match rgn.sample_offset {
        Some(offset) => entry
            .collection
            .find_by_relative_offset(offset, rgn.sample_data_length)
            .unwrap_or_else(|| {
                error!(
                    region = rgn.offset,
                    sample_offset = offset,
                    collection = %entry.collection.name,
                    "no sample at region's sample offset, using the first sample"
                );
                0
            }),
        None => rgn.sample_num as usize,
    };
    let global = entry.start + local;
    if global >= total {
        error!(
            region = rgn.offset,
            index = global,
            samples = total,
            "sample index out of range, clamping to the last sample"
        );
        return total - 1;
    }
    global
}

/// Effective loop of a region playing `sample`.
pub fn effective_loop(sample: &Sample, rgn: &Region) -> Result<Loop, SynthError> {
    if sample.prioritize_own_loop {
        if !sample.loop_info.is_empty() {
            return Ok(sample.loop_info);
        }
        if !sample.loop_info.is_set() && !rgn.loop_info.is_set() {
            return Err(SynthError::MissingLoopInfo {
                sample: sample.name.to_string(),
                region_offset: rgn.offset,
            });
        }
        let status = match sample.loop_info.status {
            LoopStatus::Unset => rgn.loop_info.status,
            status => status,
        };
        return Ok(Loop { status, ..rgn.loop_info });
    }
    if rgn.loop_info.is_set() {
        Ok(rgn.loop_info)
    } else {
        Ok(sample.loop_info)
    }
}

fn clamp_loop(lp: ResolvedLoop, frames: usize) -> ResolvedLoop {
    let frames = u32::try_from(frames).unwrap_or(u32::MAX);
    if !lp.enabled || (lp.start < frames && lp.end() <= frames) {
        return lp;
    }
    if lp.start >= frames {
        debug!(start = lp.start, frames, "loop starts past the sample end, disabling");
        return ResolvedLoop::default();
    }
    ResolvedLoop {
        length: frames - lp.start,
        ..lp
    }
}

fn resolve_region(
    set_key: InstrumentSetKey,
    rgn: &Region,
    finals: &[FinalCollection<'_>],
    samples: &[SynthSample],
) -> Result<SynthRegion, SynthError> {
    let sample_index = resolve_sample_index(set_key, rgn, finals, samples.len());
    let source_sample = source_sample(finals, sample_index);
    let decoded = &samples[sample_index];

    let (loop_info, unity_key, fine_tune, sample_db) = match source_sample {
        Some(sample) => {
            let lp = effective_loop(sample, rgn)?;
            (
                clamp_loop(sample.resolve_loop(&lp), decoded.data.len()),
                rgn.unity_key.or(sample.unity_key).unwrap_or(DEFAULT_UNITY_KEY),
                if rgn.fine_tune != 0 { rgn.fine_tune } else { sample.fine_tune },
                sample.attenuation_db,
            )
        }
        None => (decoded.loop_info, decoded.unity_key, decoded.fine_tune, decoded.attenuation_db),
    };

    Ok(SynthRegion {
        key_low: rgn.key_low,
        key_high: rgn.key_high,
        vel_low: rgn.vel_low,
        vel_high: rgn.vel_high,
        sample_index,
        loop_info,
        unity_key,
        coarse_tune: rgn.coarse_tune,
        fine_tune,
        attenuation_db: rgn.attenuation_db + sample_db,
        pan: rgn.pan,
        envelope: rgn.envelope,
        vibrato: rgn.vibrato.filter(Vibrato::is_active),
    })
}

/// Source sample at a global index.
fn source_sample<'a>(finals: &[FinalCollection<'a>], global: usize) -> Option<&'a Sample> {
    finals
        .iter()
        .find(|entry| global >= entry.start && global < entry.start + entry.collection.len())
        .and_then(|entry| entry.collection.samples.get(global - entry.start))
}
