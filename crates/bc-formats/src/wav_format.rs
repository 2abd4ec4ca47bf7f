//! WAV encoding and decoding for single samples.

use std::io::Write;

use bc_codec::pcm;
use bc_ir::{ResolvedLoop, Sample, SampleData};
use binrw::{BinRead, BinWrite};

use crate::chunk::{find_chunk, Chunk, ListChunk, RiffChunks};
use crate::{decode, encode, FormatError};

const WAVE_FORMAT_PCM: u16 = 1;

#[derive(BinRead, BinWrite)]
#[brw(little)]
struct FmtChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

#[derive(BinRead, BinWrite)]
#[brw(little)]
struct SamplerChunk {
    manufacturer: u32,
    product: u32,
    sample_period: u32,
    unity_note: u32,
    pitch_fraction: u32,
    smpte_format: u32,
    smpte_offset: u32,
    loop_count: u32,
    sampler_data: u32,
}

const SAMPLER_CHUNK_SIZE: usize = 36;

#[derive(BinRead, BinWrite)]
#[brw(little)]
struct SamplerLoop {
    cue_point: u32,
    loop_type: u32,
    start: u32,
    /// Inclusive
    end: u32,
    fraction: u32,
    play_count: u32,
}

// --- Writing ---

/// Write PCM as a WAV file, with a `smpl` chunk when `lp` is enabled.
pub fn write_sample_wav(
    w: &mut impl Write,
    data: &SampleData,
    sample_rate: u32,
    unity_key: u8,
    lp: ResolvedLoop,
) -> Result<(), FormatError> {
    let channels = data.num_channels();
    let bits_per_sample = data.bits_per_sample();
    let block_align = channels * (bits_per_sample / 8);

    let mut riff = ListChunk::riff(b"WAVE");
    riff.push(Chunk::new(
        b"fmt ",
        encode(&FmtChunk {
            format_tag: WAVE_FORMAT_PCM,
            channels,
            sample_rate,
            byte_rate: sample_rate.saturating_mul(block_align as u32),
            block_align,
            bits_per_sample,
        })?,
    ));
    riff.push(Chunk::new(b"data", data.to_interleaved_bytes()));

    if lp.enabled && lp.length > 0 {
        let mut smpl = encode(&SamplerChunk {
            manufacturer: 0,
            product: 0,
            sample_period: 1_000_000_000 / sample_rate.max(1),
            unity_note: unity_key as u32,
            pitch_fraction: 0,
            smpte_format: 0,
            smpte_offset: 0,
            loop_count: 1,
            sampler_data: 0,
        })?;
        smpl.extend(encode(&SamplerLoop {
            cue_point: 0,
            loop_type: 0,
            start: lp.start,
            end: lp.end() - 1,
            fraction: 0,
            play_count: 0,
        })?);
        riff.push(Chunk::new(b"smpl", smpl));
    }

    riff.write_to(w)?;
    Ok(())
}

/// Decode a sample and render it, with its own loop, as WAV.
pub fn sample_to_wav(sample: &Sample, bytes: &[u8]) -> Result<Vec<u8>, FormatError> {
    let data = bc_codec::decode(sample, bytes);
    let mut lp = sample.resolve_loop(&sample.loop_info);
    if lp.end() > data.len() as u32 {
        lp.enabled = false;
    }
    let mut buf = Vec::new();
    write_sample_wav(
        &mut buf,
        &data,
        sample.rate,
        sample.unity_key.unwrap_or(bc_ir::DEFAULT_UNITY_KEY),
        lp,
    )?;
    Ok(buf)
}

// --- Reading ---

/// Layout of a parsed WAV file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WavInfo {
    pub num_channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Offset of the PCM data within the file
    pub data_offset: usize,
    pub data_size: usize,
    /// First `smpl` loop, in frames
    pub loop_info: Option<ResolvedLoop>,
}

pub fn parse_wav(data: &[u8]) -> Result<WavInfo, FormatError> {
    if data.len() < 12 {
        return Err(FormatError::UnexpectedEof);
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let body = &data[12..];
    let fmt: FmtChunk =
        decode(find_chunk(RiffChunks::new(body), b"fmt ").ok_or(FormatError::InvalidHeader)?)?;
    if fmt.format_tag != WAVE_FORMAT_PCM {
        return Err(FormatError::UnsupportedVersion);
    }
    if fmt.bits_per_sample != 8 && fmt.bits_per_sample != 16 {
        return Err(FormatError::UnsupportedVersion);
    }
    if !(1..=2).contains(&fmt.channels) {
        return Err(FormatError::UnsupportedVersion);
    }

    let pcm = find_chunk(RiffChunks::new(body), b"data").ok_or(FormatError::InvalidHeader)?;
    // The reader hands out subslices of `data`, so the offset falls out of
    // the pointer difference.
    let data_offset = pcm.as_ptr() as usize - data.as_ptr() as usize;

    let loop_info = match find_chunk(RiffChunks::new(body), b"smpl") {
        Some(smpl) => first_loop(smpl)?,
        None => None,
    };

    Ok(WavInfo {
        num_channels: fmt.channels,
        sample_rate: fmt.sample_rate,
        bits_per_sample: fmt.bits_per_sample,
        data_offset,
        data_size: pcm.len(),
        loop_info,
    })
}

/// The first loop of a `smpl` chunk. Truncated chunks carry no loop.
fn first_loop(smpl: &[u8]) -> Result<Option<ResolvedLoop>, FormatError> {
    if smpl.len() < SAMPLER_CHUNK_SIZE + 24 {
        return Ok(None);
    }
    let header: SamplerChunk = decode(smpl)?;
    if header.loop_count == 0 {
        return Ok(None);
    }
    let lp: SamplerLoop = decode(&smpl[SAMPLER_CHUNK_SIZE..])?;
    Ok(Some(ResolvedLoop {
        enabled: true,
        start: lp.start,
        length: lp.end.saturating_sub(lp.start).saturating_add(1),
    }))
}

impl WavInfo {
    pub fn frame_count(&self) -> usize {
        self.data_size / (self.num_channels as usize * (self.bits_per_sample as usize / 8))
    }

    /// Decode the PCM data of the file this info was parsed from.
    pub fn read_pcm(&self, data: &[u8]) -> SampleData {
        let end = (self.data_offset + self.data_size).min(data.len());
        let raw = data.get(self.data_offset..end).unwrap_or(&[]);

        if self.bits_per_sample == 8 {
            // 8-bit WAV is unsigned, centered on 0x80
            let signed: Vec<u8> = raw.iter().map(|b| b ^ 0x80).collect();
            pcm::decode_pcm8(&signed, self.num_channels)
        } else {
            pcm::decode_pcm16(raw, self.num_channels, false)
        }
    }
}
