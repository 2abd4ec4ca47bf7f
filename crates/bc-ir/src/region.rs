//! Key/velocity regions.

use crate::envelope::{Envelope, Vibrato};
use crate::library::SampleCollectionKey;
use crate::loop_info::Loop;

/// A key/velocity range of an instrument mapped to one sample.
#[derive(Clone, Debug)]
pub struct Region {
    /// Offset of the region record in the source image
    pub offset: u32,
    pub key_low: u8,
    pub key_high: u8,
    pub vel_low: u8,
    pub vel_high: u8,
    /// Index of the sample within its collection
    pub sample_num: u32,
    /// Sample offset relative to the collection's sample data area.
    /// Takes precedence over `sample_num` when set.
    pub sample_offset: Option<u32>,
    /// Encoded length used to tell apart samples sharing an offset
    pub sample_data_length: Option<u32>,
    /// Collection supplying the sample, when not the default one
    pub sample_collection: Option<SampleCollectionKey>,
    pub unity_key: Option<u8>,
    /// Coarse tune in semitones
    pub coarse_tune: i16,
    /// Fine tune in cents
    pub fine_tune: i16,
    /// Pan, 0.0 = left, 0.5 = center, 1.0 = right
    pub pan: f64,
    pub attenuation_db: f64,
    pub envelope: Envelope,
    pub loop_info: Loop,
    pub vibrato: Option<Vibrato>,
}

impl Region {
    /// A full-range, center-panned region playing `sample_num`.
    pub fn new(offset: u32, sample_num: u32) -> Self {
        Self {
            offset,
            key_low: 0,
            key_high: 127,
            vel_low: 0,
            vel_high: 127,
            sample_num,
            sample_offset: None,
            sample_data_length: None,
            sample_collection: None,
            unity_key: None,
            coarse_tune: 0,
            fine_tune: 0,
            pan: 0.5,
            attenuation_db: 0.0,
            envelope: Envelope::default(),
            loop_info: Loop::default(),
            vibrato: None,
        }
    }

    pub fn set_key_range(&mut self, low: u8, high: u8) -> &mut Self {
        self.key_low = low.min(127);
        self.key_high = high.min(127);
        self
    }

    pub fn set_vel_range(&mut self, low: u8, high: u8) -> &mut Self {
        self.vel_low = low.min(127);
        self.vel_high = high.min(127);
        self
    }

    /// Reference the sample by its offset in the collection instead of by
    /// index.
    pub fn set_sample_offset(&mut self, offset: u32, data_length: Option<u32>) -> &mut Self {
        self.sample_offset = Some(offset);
        self.sample_data_length = data_length;
        self
    }

    pub fn set_pan(&mut self, pan: f64) -> &mut Self {
        self.pan = pan.clamp(0.0, 1.0);
        self
    }

    /// Set the sustain level as an amplitude fraction.
    pub fn set_sustain_level(&mut self, level: f64) -> &mut Self {
        self.envelope.sustain_level = Some(level.clamp(0.0, 1.0));
        self
    }
}
