//! Core model types for bankconv.
//!
//! Format scanners populate this model from console sound banks; the
//! writers in `bc-formats` serialize it to DLS, SF2 and WAV.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod envelope;
mod error;
mod instrument;
mod library;
mod loop_info;
mod raw_file;
mod region;
mod sample;
mod sample_collection;
pub mod units;

pub use envelope::{Envelope, EnvelopeTransform, Vibrato};
pub use error::ModelError;
pub use instrument::{Instrument, InstrumentSet, DEFAULT_REVERB};
pub use library::{
    Collection, CollectionKey, InstrumentSetKey, Library, SampleCollectionKey, Sequence,
    SequenceKey,
};
pub use loop_info::{Loop, LoopMeasure, LoopStatus, ResolvedLoop};
pub use raw_file::RawFile;
pub use region::Region;
pub use sample::{Sample, SampleData, SampleDecoder, SampleEncoding, SampleFormat};
pub use sample_collection::SampleCollection;

/// Unity key used when neither region nor sample defines one (middle C).
pub const DEFAULT_UNITY_KEY: u8 = 60;
