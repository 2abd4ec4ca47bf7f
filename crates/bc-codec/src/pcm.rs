//! Linear PCM passthrough.

use alloc::vec::Vec;
use bc_ir::SampleData;

/// Signed 8-bit PCM, interleaved when stereo.
pub fn decode_pcm8(data: &[u8], channels: u16) -> SampleData {
    if channels >= 2 {
        let mut left = Vec::with_capacity(data.len() / 2);
        let mut right = Vec::with_capacity(data.len() / 2);
        for frame in data.chunks_exact(2) {
            left.push(frame[0] as i8);
            right.push(frame[1] as i8);
        }
        SampleData::Stereo8(left, right)
    } else {
        SampleData::Mono8(data.iter().map(|&b| b as i8).collect())
    }
}

/// Signed 16-bit PCM, interleaved when stereo.
pub fn decode_pcm16(data: &[u8], channels: u16, big_endian: bool) -> SampleData {
    let read = |c: &[u8]| {
        if big_endian {
            i16::from_be_bytes([c[0], c[1]])
        } else {
            i16::from_le_bytes([c[0], c[1]])
        }
    };
    if channels >= 2 {
        let mut left = Vec::with_capacity(data.len() / 4);
        let mut right = Vec::with_capacity(data.len() / 4);
        for frame in data.chunks_exact(4) {
            left.push(read(&frame[0..2]));
            right.push(read(&frame[2..4]));
        }
        SampleData::Stereo16(left, right)
    } else {
        SampleData::Mono16(data.chunks_exact(2).map(read).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn pcm8_keeps_signed_values() {
        assert_eq!(decode_pcm8(&[0x00, 0x7F, 0x80, 0xFF], 1), SampleData::Mono8(vec![0, 127, -128, -1]));
    }

    #[test]
    fn pcm8_stereo_deinterleaves() {
        assert_eq!(
            decode_pcm8(&[1, 2, 3, 4, 5], 2),
            SampleData::Stereo8(vec![1, 3], vec![2, 4])
        );
    }

    #[test]
    fn pcm16_endianness() {
        let bytes = [0x34, 0x12, 0xFF, 0xFF];
        assert_eq!(decode_pcm16(&bytes, 1, false), SampleData::Mono16(vec![0x1234, -1]));
        assert_eq!(decode_pcm16(&bytes, 1, true), SampleData::Mono16(vec![0x3412, -1]));
    }

    #[test]
    fn pcm16_drops_trailing_odd_byte() {
        assert_eq!(decode_pcm16(&[1, 0, 9], 1, false).len(), 1);
    }
}
