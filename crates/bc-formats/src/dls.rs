//! DLS (Downloadable Sounds, level 1 with the level 2 reverb destination)
//! writer.

use binrw::BinWrite;
use bc_ir::units::{dls_attenuation, dls_cents, dls_pan, dls_sustain_level, dls_time, lfo_frequency_to_cents};
use bc_ir::EnvelopeTransform;
use tracing::debug;

use crate::chunk::{Chunk, ListChunk};
use crate::synth::{BankSource, SynthBank, SynthInstrument, SynthRegion, SynthSample};
use crate::{encode, encode_all, FormatError};

const F_INSTRUMENT_DRUMS: u32 = 0x8000_0000;
const F_RGN_OPTION_SELFNONEXCLUSIVE: u16 = 0x0001;
const F_WSMP_NO_TRUNCATION: u32 = 0x0001;
const WLOOP_TYPE_FORWARD: u32 = 0;
const WAVELINK_CHANNEL_LEFT: u32 = 0x0001;
const WAVE_FORMAT_PCM: u16 = 1;

const CONN_SRC_NONE: u16 = 0x0000;
const CONN_SRC_LFO: u16 = 0x0001;

const CONN_DST_PITCH: u16 = 0x0003;
const CONN_DST_PAN: u16 = 0x0004;
const CONN_DST_REVERB: u16 = 0x0081;
const CONN_DST_LFO_FREQUENCY: u16 = 0x0104;
const CONN_DST_LFO_STARTDELAY: u16 = 0x0105;
const CONN_DST_EG1_ATTACKTIME: u16 = 0x0206;
const CONN_DST_EG1_DECAYTIME: u16 = 0x0207;
const CONN_DST_EG1_RELEASETIME: u16 = 0x0209;
const CONN_DST_EG1_SUSTAINLEVEL: u16 = 0x020A;
const CONN_DST_EG1_HOLDTIME: u16 = 0x020C;

const CONN_TRN_NONE: u16 = 0x0000;
const CONN_TRN_CONVEX: u16 = 0x0002;

/// Options for [`write_dls`].
#[derive(Clone, Debug)]
pub struct DlsOptions {
    /// Overrides the bank name stored in the INFO list
    pub name: Option<String>,
    /// Emit the `ptbl` wave pool table
    pub pool_table: bool,
}

impl Default for DlsOptions {
    fn default() -> Self {
        Self {
            name: None,
            pool_table: true,
        }
    }
}

#[derive(BinWrite)]
#[bw(little)]
struct CollectionHeader {
    instruments: u32,
}

#[derive(BinWrite)]
#[bw(little)]
struct InstrumentHeader {
    regions: u32,
    bank: u32,
    program: u32,
}

#[derive(BinWrite)]
#[bw(little)]
struct RegionHeader {
    key_low: u16,
    key_high: u16,
    vel_low: u16,
    vel_high: u16,
    options: u16,
    key_group: u16,
}

#[derive(BinWrite)]
#[bw(little)]
struct WaveSample {
    size: u32,
    unity_note: u16,
    fine_tune: i16,
    attenuation: i32,
    options: u32,
    loop_count: u32,
}

#[derive(BinWrite)]
#[bw(little)]
struct WaveSampleLoop {
    size: u32,
    loop_type: u32,
    start: u32,
    length: u32,
}

#[derive(BinWrite)]
#[bw(little)]
struct WaveLink {
    options: u16,
    phase_group: u16,
    channel: u32,
    table_index: u32,
}

#[derive(BinWrite)]
#[bw(little)]
struct ArticulationHeader {
    size: u32,
    connections: u32,
}

#[derive(BinWrite, Clone, Copy, Debug, PartialEq, Eq)]
#[bw(little)]
struct ConnectionBlock {
    source: u16,
    control: u16,
    destination: u16,
    transform: u16,
    scale: i32,
}

impl ConnectionBlock {
    fn new(destination: u16, scale: i32) -> Self {
        Self {
            source: CONN_SRC_NONE,
            control: CONN_SRC_NONE,
            destination,
            transform: CONN_TRN_NONE,
            scale,
        }
    }

    fn transform(mut self, transform: EnvelopeTransform) -> Self {
        self.transform = match transform {
            EnvelopeTransform::Linear => CONN_TRN_NONE,
            EnvelopeTransform::Convex => CONN_TRN_CONVEX,
        };
        self
    }
}

#[derive(BinWrite)]
#[bw(little)]
struct PoolTableHeader {
    size: u32,
    cues: u32,
}

#[derive(BinWrite)]
#[bw(little)]
struct WaveFormat {
    format_tag: u16,
    channels: u16,
    samples_per_sec: u32,
    avg_bytes_per_sec: u32,
    block_align: u16,
    bits_per_sample: u16,
}

/// Resolve `source` and serialize it as DLS.
pub fn produce_dls(source: &BankSource<'_>, opts: &DlsOptions) -> Result<Vec<u8>, FormatError> {
    let bank = SynthBank::build(source)?;
    write_dls(&bank, opts)
}

pub fn write_dls(bank: &SynthBank, opts: &DlsOptions) -> Result<Vec<u8>, FormatError> {
    let root = build_dls(bank, opts)?;
    let bytes = root.to_bytes();
    debug!(
        instruments = bank.instruments.len(),
        waves = bank.samples.len(),
        bytes = bytes.len(),
        "wrote DLS"
    );
    Ok(bytes)
}

/// Build the `RIFF 'DLS '` tree.
pub fn build_dls(bank: &SynthBank, opts: &DlsOptions) -> Result<ListChunk, FormatError> {
    let name = opts.name.as_deref().unwrap_or(&bank.name);
    let mut root = ListChunk::riff(b"DLS ");
    root.push(Chunk::new(
        b"colh",
        encode(&CollectionHeader {
            instruments: bank.instruments.len() as u32,
        })?,
    ));

    let mut lins = ListChunk::list(b"lins");
    for instr in &bank.instruments {
        lins.push(instrument_list(instr)?);
    }
    root.push(lins);

    let waves = bank
        .samples
        .iter()
        .map(wave_list)
        .collect::<Result<Vec<_>, _>>()?;
    if opts.pool_table {
        root.push(pool_table(&waves)?);
    }
    let mut wvpl = ListChunk::list(b"wvpl");
    for wave in waves {
        wvpl.push(wave);
    }
    root.push(wvpl);
    root.push(ListChunk::list(b"INFO").with(Chunk::string(b"INAM", name)));
    Ok(root)
}

fn instrument_list(instr: &SynthInstrument) -> Result<ListChunk, FormatError> {
    let mut bank = ((instr.bank_msb() as u32) << 8) | instr.bank_lsb() as u32;
    if instr.drum_kit {
        bank |= F_INSTRUMENT_DRUMS;
    }
    let mut ins = ListChunk::list(b"ins ");
    ins.push(Chunk::new(
        b"insh",
        encode(&InstrumentHeader {
            regions: instr.regions.len() as u32,
            bank,
            program: instr.program as u32,
        })?,
    ));

    let mut lrgn = ListChunk::list(b"lrgn");
    for rgn in &instr.regions {
        lrgn.push(region_list(rgn)?);
    }
    ins.push(lrgn);

    let reverb = (instr.reverb.clamp(0.0, 1.0) * 1000.0).round() as i32;
    ins.push(articulation(&[ConnectionBlock::new(CONN_DST_REVERB, reverb << 16)])?);
    ins.push(ListChunk::list(b"INFO").with(Chunk::string(b"INAM", &instr.name)));
    Ok(ins)
}

fn region_list(rgn: &SynthRegion) -> Result<ListChunk, FormatError> {
    let mut list = ListChunk::list(b"rgn ");
    list.push(Chunk::new(
        b"rgnh",
        encode(&RegionHeader {
            key_low: rgn.key_low as u16,
            key_high: rgn.key_high as u16,
            vel_low: rgn.vel_low as u16,
            vel_high: rgn.vel_high as u16,
            options: F_RGN_OPTION_SELFNONEXCLUSIVE,
            key_group: 0,
        })?,
    ));

    // DLS has no coarse tune field; fold it into the unity note.
    let unity = (rgn.unity_key as i32 - rgn.coarse_tune as i32).clamp(0, 127);
    let looping = rgn.loop_info.enabled;
    let mut wsmp = encode(&WaveSample {
        size: 20,
        unity_note: unity as u16,
        fine_tune: rgn.fine_tune,
        attenuation: dls_attenuation(rgn.attenuation_db),
        options: F_WSMP_NO_TRUNCATION,
        loop_count: looping as u32,
    })?;
    if looping {
        wsmp.extend(encode(&WaveSampleLoop {
            size: 16,
            loop_type: WLOOP_TYPE_FORWARD,
            start: rgn.loop_info.start,
            length: rgn.loop_info.length,
        })?);
    }
    list.push(Chunk::new(b"wsmp", wsmp));

    list.push(Chunk::new(
        b"wlnk",
        encode(&WaveLink {
            options: 0,
            phase_group: 0,
            channel: WAVELINK_CHANNEL_LEFT,
            table_index: rgn.sample_index as u32,
        })?,
    ));
    list.push(articulation(&region_connections(rgn))?);
    Ok(list)
}

fn region_connections(rgn: &SynthRegion) -> Vec<ConnectionBlock> {
    let env = &rgn.envelope;
    let mut blocks = vec![
        ConnectionBlock::new(CONN_DST_EG1_ATTACKTIME, dls_time(env.attack)).transform(env.attack_transform),
    ];
    if env.hold > 0.0 {
        blocks.push(ConnectionBlock::new(CONN_DST_EG1_HOLDTIME, dls_time(env.hold)));
    }
    blocks.push(ConnectionBlock::new(CONN_DST_EG1_DECAYTIME, dls_time(env.decay)));
    blocks.push(ConnectionBlock::new(
        CONN_DST_EG1_SUSTAINLEVEL,
        dls_sustain_level(env.sustain_or_full()),
    ));
    blocks.push(
        ConnectionBlock::new(CONN_DST_EG1_RELEASETIME, dls_time(env.release))
            .transform(env.release_transform),
    );
    blocks.push(ConnectionBlock::new(CONN_DST_PAN, dls_pan(rgn.pan)));

    if let Some(vib) = rgn.vibrato {
        blocks.push(ConnectionBlock::new(
            CONN_DST_LFO_FREQUENCY,
            dls_cents(lfo_frequency_to_cents(vib.frequency_hz)),
        ));
        blocks.push(ConnectionBlock {
            source: CONN_SRC_LFO,
            ..ConnectionBlock::new(CONN_DST_PITCH, dls_cents(vib.depth_cents))
        });
        if vib.delay_seconds > 0.0 {
            blocks.push(ConnectionBlock::new(
                CONN_DST_LFO_STARTDELAY,
                dls_time(vib.delay_seconds),
            ));
        }
    }
    blocks
}

fn articulation(blocks: &[ConnectionBlock]) -> Result<ListChunk, FormatError> {
    let mut art1 = encode(&ArticulationHeader {
        size: 8,
        connections: blocks.len() as u32,
    })?;
    art1.extend(encode_all(blocks)?);
    Ok(ListChunk::list(b"lart").with(Chunk::new(b"art1", art1)))
}

fn wave_list(sample: &SynthSample) -> Result<ListChunk, FormatError> {
    let channels = sample.data.num_channels();
    let bits = sample.data.bits_per_sample();
    let block_align = channels * (bits / 8);
    let fmt = encode(&WaveFormat {
        format_tag: WAVE_FORMAT_PCM,
        channels,
        samples_per_sec: sample.rate,
        avg_bytes_per_sec: sample.rate.saturating_mul(block_align as u32),
        block_align,
        bits_per_sample: bits,
    })?;
    Ok(ListChunk::list(b"wave")
        .with(Chunk::new(b"fmt ", fmt))
        .with(Chunk::new(b"data", sample.data.to_interleaved_bytes()))
        .with(ListChunk::list(b"INFO").with(Chunk::string(b"INAM", &sample.name))))
}

/// Cue offsets of each wave relative to the first byte after the `wvpl`
/// list type.
fn pool_table(waves: &[ListChunk]) -> Result<Chunk, FormatError> {
    let mut data = encode(&PoolTableHeader {
        size: 8,
        cues: waves.len() as u32,
    })?;
    let mut offset = 0u32;
    for wave in waves {
        data.extend_from_slice(&offset.to_le_bytes());
        offset += wave.size();
    }
    Ok(Chunk::new(b"ptbl", data))
}
