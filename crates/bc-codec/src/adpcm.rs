//! 4-bit console ADPCM.
//!
//! Layout: a 32-bit little-endian seed (low 16 bits initial PCM value, bits
//! 16..23 initial step index) followed by nibbles, low nibble first. Each
//! nibble produces one 16-bit sample.

use alloc::vec::Vec;

/// Decoded bytes per encoded byte (two 16-bit samples per byte).
pub const COMPRESSION_RATIO: f64 = 4.0;

/// Size of the seed header in bytes.
pub const HEADER_SIZE: usize = 4;

const MAX_STEP_INDEX: i32 = 88;
const SAMPLE_MAX: i32 = 0x7FFF;
const SAMPLE_MIN: i32 = -0x7FFF;

pub const STEP_TABLE: [i32; 89] = [
    0x0007, 0x0008, 0x0009, 0x000A, 0x000B, 0x000C, 0x000D, 0x000E, 0x0010, 0x0011, 0x0013,
    0x0015, 0x0017, 0x0019, 0x001C, 0x001F, 0x0022, 0x0025, 0x0029, 0x002D, 0x0032, 0x0037,
    0x003C, 0x0042, 0x0049, 0x0050, 0x0058, 0x0061, 0x006B, 0x0076, 0x0082, 0x008F, 0x009D,
    0x00AD, 0x00BE, 0x00D1, 0x00E6, 0x00FD, 0x0117, 0x0133, 0x0151, 0x0173, 0x0198, 0x01C1,
    0x01EE, 0x0220, 0x0256, 0x0292, 0x02D4, 0x031C, 0x036C, 0x03C3, 0x0424, 0x048E, 0x0502,
    0x0583, 0x0610, 0x06AB, 0x0756, 0x0812, 0x08E0, 0x09C3, 0x0ABD, 0x0BD0, 0x0CFF, 0x0E4C,
    0x0FBA, 0x114C, 0x1307, 0x14EE, 0x1706, 0x1954, 0x1BDC, 0x1EA5, 0x21B6, 0x2515, 0x28CA,
    0x2CDF, 0x315B, 0x364B, 0x3BB9, 0x41B2, 0x4844, 0x4F7E, 0x5771, 0x602F, 0x69CE, 0x7462,
    0x7FFF,
];

pub const INDEX_TABLE: [i32; 8] = [-1, -1, -1, -1, 2, 4, 6, 8];

/// Running decoder state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdpcmState {
    pub sample: i32,
    pub step_index: i32,
}

impl AdpcmState {
    /// Seed from the packed 32-bit header.
    pub fn from_header(header: u32) -> Self {
        let sample = (header & 0xFFFF) as u16 as i16 as i32;
        let step_index = ((header >> 16) & 0x7F) as i32;
        Self {
            sample: sample.clamp(SAMPLE_MIN, SAMPLE_MAX),
            step_index: step_index.min(MAX_STEP_INDEX),
        }
    }

    /// Advance by one nibble and return the new sample.
    pub fn step(&mut self, nibble: u8) -> i16 {
        let step = STEP_TABLE[self.step_index as usize];
        let mut diff = step >> 3;
        if nibble & 1 != 0 {
            diff += step >> 2;
        }
        if nibble & 2 != 0 {
            diff += step >> 1;
        }
        if nibble & 4 != 0 {
            diff += step;
        }
        if nibble & 8 == 0 {
            self.sample = (self.sample + diff).min(SAMPLE_MAX);
        } else {
            self.sample = (self.sample - diff).max(SAMPLE_MIN);
        }
        self.step_index =
            (self.step_index + INDEX_TABLE[(nibble & 7) as usize]).clamp(0, MAX_STEP_INDEX);
        self.sample as i16
    }
}

/// Decode a nibble stream starting from `state`.
pub fn decode_nibbles(state: &mut AdpcmState, data: &[u8]) -> Vec<i16> {
    let mut out = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        out.push(state.step(byte & 0x0F));
        out.push(state.step(byte >> 4));
    }
    out
}

/// Decode a complete block: 4-byte seed header followed by nibbles.
///
/// Returns an empty buffer when the header is truncated.
pub fn decode(data: &[u8]) -> Vec<i16> {
    if data.len() < HEADER_SIZE {
        return Vec::new();
    }
    let header = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let mut state = AdpcmState::from_header(header);
    decode_nibbles(&mut state, &data[HEADER_SIZE..])
}
