//! Sample definitions and decoded sample data.

use alloc::sync::Arc;
use alloc::vec::Vec;
use arrayvec::ArrayString;
use core::fmt;

use crate::loop_info::{Loop, LoopMeasure, ResolvedLoop};

/// Decodes the encoded bytes of a sample into PCM.
///
/// Implemented by the built-in codecs and by format scanners that carry
/// their own encodings.
pub trait SampleDecoder: Send + Sync {
    fn decode(&self, sample: &Sample, bytes: &[u8]) -> SampleData;

    /// Decoded bytes produced per encoded byte.
    fn compression_ratio(&self) -> f64 {
        1.0
    }
}

/// How a sample's bytes are encoded in the source image.
#[derive(Clone, Default)]
pub enum SampleEncoding {
    /// Signed 8-bit PCM
    Pcm8,
    /// Signed 16-bit little-endian PCM
    #[default]
    Pcm16,
    /// Signed 16-bit big-endian PCM
    Pcm16Be,
    /// 4-bit ADPCM with a 32-bit seed header
    Adpcm4,
    /// A tag the scanner could not map to a known codec
    Unknown(u16),
    /// Format-specific decoder
    Custom(Arc<dyn SampleDecoder>),
}

impl fmt::Debug for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pcm8 => f.write_str("Pcm8"),
            Self::Pcm16 => f.write_str("Pcm16"),
            Self::Pcm16Be => f.write_str("Pcm16Be"),
            Self::Adpcm4 => f.write_str("Adpcm4"),
            Self::Unknown(tag) => write!(f, "Unknown({:#x})", tag),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl SampleEncoding {
    pub fn compression_ratio(&self) -> f64 {
        match self {
            Self::Adpcm4 => 4.0,
            Self::Custom(decoder) => decoder.compression_ratio(),
            _ => 1.0,
        }
    }
}

/// Channel layout, depth and rate passed to `SampleCollection::add_sample`.
#[derive(Clone, Debug)]
pub struct SampleFormat {
    pub encoding: SampleEncoding,
    pub channels: u16,
    /// Decoded bit depth (16 for ADPCM)
    pub bits_per_sample: u16,
    pub rate: u32,
}

impl SampleFormat {
    pub fn mono(encoding: SampleEncoding, rate: u32) -> Self {
        let bits_per_sample = match encoding {
            SampleEncoding::Pcm8 => 8,
            _ => 16,
        };
        Self {
            encoding,
            channels: 1,
            bits_per_sample,
            rate,
        }
    }
}

/// One playable audio unit discovered in a source image.
#[derive(Clone, Debug)]
pub struct Sample {
    pub name: ArrayString<32>,
    /// Absolute offset of the sample record in the source image
    pub offset: u32,
    /// Length of the sample record in bytes
    pub length: u32,
    /// Absolute offset of the encoded audio
    pub data_offset: u32,
    /// Length of the encoded audio in bytes
    pub data_length: u32,
    pub encoding: SampleEncoding,
    pub channels: u16,
    /// Decoded bit depth
    pub bits_per_sample: u16,
    /// Sample rate in Hz
    pub rate: u32,
    pub loop_info: Loop,
    /// Decoded size in bytes, when the format states it up front
    pub uncompressed_size: Option<u32>,
    pub unity_key: Option<u8>,
    /// Fine tune in cents
    pub fine_tune: i16,
    pub attenuation_db: f64,
    /// Prefer this sample's loop over the region's
    pub prioritize_own_loop: bool,
}

impl Sample {
    pub fn new(offset: u32, length: u32, format: SampleFormat) -> Self {
        Self {
            name: ArrayString::new(),
            offset,
            length,
            data_offset: offset,
            data_length: length,
            encoding: format.encoding,
            channels: format.channels.max(1),
            bits_per_sample: format.bits_per_sample,
            rate: format.rate,
            loop_info: Loop::default(),
            uncompressed_size: None,
            unity_key: None,
            fine_tune: 0,
            attenuation_db: 0.0,
            prioritize_own_loop: false,
        }
    }

    /// Set the name, truncating at the capacity boundary.
    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        for ch in name.chars() {
            if self.name.try_push(ch).is_err() {
                break;
            }
        }
    }

    pub fn compression_ratio(&self) -> f64 {
        self.encoding.compression_ratio()
    }

    /// Bytes per decoded frame.
    pub fn bytes_per_frame(&self) -> u32 {
        (self.bits_per_sample as u32 / 8).max(1) * self.channels as u32
    }

    /// Decoded size in bytes.
    pub fn decoded_size(&self) -> u32 {
        self.uncompressed_size
            .unwrap_or_else(|| (self.data_length as f64 * self.compression_ratio()) as u32)
    }

    /// Convert a loop value to decoded frames.
    pub fn to_frames(&self, value: u32, measure: LoopMeasure) -> u32 {
        match measure {
            LoopMeasure::Samples => value,
            LoopMeasure::Bytes => {
                (value as f64 * self.compression_ratio() / self.bytes_per_frame() as f64) as u32
            }
        }
    }

    /// Convert a loop to decoded frames using this sample's encoding.
    pub fn resolve_loop(&self, lp: &Loop) -> ResolvedLoop {
        ResolvedLoop {
            enabled: lp.is_looping(),
            start: self.to_frames(lp.start, lp.start_measure),
            length: self.to_frames(lp.length, lp.length_measure),
        }
    }
}

/// Decoded PCM audio.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SampleData {
    /// 8-bit mono samples
    Mono8(Vec<i8>),
    /// 16-bit mono samples
    Mono16(Vec<i16>),
    /// 8-bit stereo samples (left, right)
    Stereo8(Vec<i8>, Vec<i8>),
    /// 16-bit stereo samples (left, right)
    Stereo16(Vec<i16>, Vec<i16>),
}

impl SampleData {
    /// Get the number of sample frames.
    pub fn len(&self) -> usize {
        match self {
            SampleData::Mono8(v) => v.len(),
            SampleData::Mono16(v) => v.len(),
            SampleData::Stereo8(l, _) => l.len(),
            SampleData::Stereo16(l, _) => l.len(),
        }
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of channels in the sample data.
    pub fn num_channels(&self) -> u16 {
        match self {
            SampleData::Mono8(_) | SampleData::Mono16(_) => 1,
            SampleData::Stereo8(_, _) | SampleData::Stereo16(_, _) => 2,
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self {
            SampleData::Mono8(_) | SampleData::Stereo8(_, _) => 8,
            SampleData::Mono16(_) | SampleData::Stereo16(_, _) => 16,
        }
    }

    /// Get a mono sample value at position (as i16).
    /// For stereo, averages both channels.
    pub fn get_mono(&self, pos: usize) -> i16 {
        match self {
            SampleData::Mono8(v) => v.get(pos).copied().unwrap_or(0) as i16 * 256,
            SampleData::Mono16(v) => v.get(pos).copied().unwrap_or(0),
            SampleData::Stereo8(l, r) => {
                let sum = l.get(pos).copied().unwrap_or(0) as i32 + r.get(pos).copied().unwrap_or(0) as i32;
                (sum * 128) as i16
            }
            SampleData::Stereo16(l, r) => {
                let sum = l.get(pos).copied().unwrap_or(0) as i32 + r.get(pos).copied().unwrap_or(0) as i32;
                (sum / 2) as i16
            }
        }
    }

    /// All frames as 16-bit mono.
    pub fn to_mono_i16(&self) -> Vec<i16> {
        match self {
            SampleData::Mono16(v) => v.clone(),
            _ => (0..self.len()).map(|i| self.get_mono(i)).collect(),
        }
    }

    /// Interleaved little-endian bytes in the RIFF convention: 8-bit data
    /// is unsigned (bias flipped with XOR 0x80), 16-bit data is signed.
    pub fn to_interleaved_bytes(&self) -> Vec<u8> {
        match self {
            SampleData::Mono8(v) => v.iter().map(|&s| s as u8 ^ 0x80).collect(),
            SampleData::Mono16(v) => v.iter().flat_map(|s| s.to_le_bytes()).collect(),
            SampleData::Stereo8(l, r) => l
                .iter()
                .zip(r)
                .flat_map(|(&a, &b)| [a as u8 ^ 0x80, b as u8 ^ 0x80])
                .collect(),
            SampleData::Stereo16(l, r) => {
                let mut out = Vec::with_capacity(l.len() * 4);
                for (a, b) in l.iter().zip(r) {
                    out.extend_from_slice(&a.to_le_bytes());
                    out.extend_from_slice(&b.to_le_bytes());
                }
                out
            }
        }
    }
}
