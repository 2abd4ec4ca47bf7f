//! SoundFont 2.01 writer.
//!
//! One preset and one instrument per bank instrument. Samples are stored
//! as 16-bit mono, each followed by the 46 zero points the format requires.

use binrw::BinWrite;
use bc_ir::units::{
    lfo_frequency_to_cents, percent_to_pan_units, sf2_attenuation, sf2_cents, sf2_sustain_level,
    sf2_time,
};
use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::chunk::{Chunk, ListChunk};
use crate::synth::{BankSource, SynthBank, SynthRegion};
use crate::{encode, encode_all, name_field, FormatError};

/// Zero points appended after every sample.
pub const SAMPLE_PADDING: usize = 46;

const DRUM_BANK: u16 = 128;
const MONO_SAMPLE: u16 = 1;
const LOOP_CONTINUOUS: u16 = 1;

// Generator operators
const GEN_VIB_LFO_TO_PITCH: u16 = 6;
const GEN_REVERB_EFFECTS_SEND: u16 = 16;
const GEN_PAN: u16 = 17;
const GEN_DELAY_VIB_LFO: u16 = 23;
const GEN_FREQ_VIB_LFO: u16 = 24;
const GEN_ATTACK_VOL_ENV: u16 = 34;
const GEN_HOLD_VOL_ENV: u16 = 35;
const GEN_DECAY_VOL_ENV: u16 = 36;
const GEN_SUSTAIN_VOL_ENV: u16 = 37;
const GEN_RELEASE_VOL_ENV: u16 = 38;
const GEN_INSTRUMENT: u16 = 41;
const GEN_KEY_RANGE: u16 = 43;
const GEN_VEL_RANGE: u16 = 44;
const GEN_INITIAL_ATTENUATION: u16 = 48;
const GEN_COARSE_TUNE: u16 = 51;
const GEN_FINE_TUNE: u16 = 52;
const GEN_SAMPLE_ID: u16 = 53;
const GEN_SAMPLE_MODES: u16 = 54;
const GEN_OVERRIDING_ROOT_KEY: u16 = 58;

/// Options for [`write_sf2`].
#[derive(Clone, Debug)]
pub struct Sf2Options {
    /// Overrides the bank name (`INAM`)
    pub name: Option<String>,
    /// Creation date (`ICRD`); today when unset
    pub creation_date: Option<NaiveDate>,
    /// Tool name (`ISFT`)
    pub software: String,
}

impl Default for Sf2Options {
    fn default() -> Self {
        Self {
            name: None,
            creation_date: None,
            software: concat!("bankconv ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(BinWrite)]
#[bw(little)]
struct Version {
    major: u16,
    minor: u16,
}

#[derive(BinWrite)]
#[bw(little)]
struct PresetHeader {
    name: [u8; 20],
    preset: u16,
    bank: u16,
    bag_index: u16,
    library: u32,
    genre: u32,
    morphology: u32,
}

#[derive(BinWrite)]
#[bw(little)]
struct Bag {
    gen_index: u16,
    mod_index: u16,
}

#[derive(BinWrite, Default)]
#[bw(little)]
struct Modulator {
    source: u16,
    destination: u16,
    amount: i16,
    amount_source: u16,
    transform: u16,
}

#[derive(BinWrite, Clone, Copy, Debug, PartialEq, Eq)]
#[bw(little)]
struct Generator {
    operator: u16,
    amount: u16,
}

impl Generator {
    fn new(operator: u16, amount: i16) -> Self {
        Self {
            operator,
            amount: amount as u16,
        }
    }

    fn range(operator: u16, low: u8, high: u8) -> Self {
        Self {
            operator,
            amount: u16::from_le_bytes([low, high]),
        }
    }

    fn word(operator: u16, amount: u16) -> Self {
        Self { operator, amount }
    }
}

#[derive(BinWrite)]
#[bw(little)]
struct InstrumentHeader {
    name: [u8; 20],
    bag_index: u16,
}

#[derive(BinWrite)]
#[bw(little)]
struct SampleHeader {
    name: [u8; 20],
    start: u32,
    end: u32,
    loop_start: u32,
    loop_end: u32,
    sample_rate: u32,
    original_pitch: u8,
    pitch_correction: i8,
    sample_link: u16,
    sample_type: u16,
}

/// Resolve `source` and serialize it as SF2.
pub fn produce_sf2(source: &BankSource<'_>, opts: &Sf2Options) -> Result<Vec<u8>, FormatError> {
    let bank = SynthBank::build(source)?;
    write_sf2(&bank, opts)
}

pub fn write_sf2(bank: &SynthBank, opts: &Sf2Options) -> Result<Vec<u8>, FormatError> {
    let name = opts.name.as_deref().unwrap_or(&bank.name);
    let date = opts.creation_date.unwrap_or_else(|| Local::now().date_naive());

    let info = ListChunk::list(b"INFO")
        .with(Chunk::new(b"ifil", encode(&Version { major: 2, minor: 1 })?))
        .with(Chunk::string(b"isng", "EMU8000"))
        .with(Chunk::string(b"INAM", name))
        .with(Chunk::string(b"ICRD", &date.format("%Y-%m-%d").to_string()))
        .with(Chunk::string(b"ISFT", &opts.software));

    let (smpl, starts) = sample_data(bank);
    let sdta = ListChunk::list(b"sdta").with(Chunk::new(b"smpl", smpl));
    let pdta = preset_data(bank, &starts)?;

    let bytes = ListChunk::riff(b"sfbk").with(info).with(sdta).with(pdta).to_bytes();
    debug!(
        presets = bank.instruments.len(),
        samples = bank.samples.len(),
        bytes = bytes.len(),
        "wrote SF2"
    );
    Ok(bytes)
}

/// The `smpl` payload and the start point of every sample.
fn sample_data(bank: &SynthBank) -> (Vec<u8>, Vec<u32>) {
    let mut data = Vec::new();
    let mut starts = Vec::with_capacity(bank.samples.len());
    let mut point = 0u32;
    for sample in &bank.samples {
        starts.push(point);
        for s in sample.data.to_mono_i16() {
            data.extend_from_slice(&s.to_le_bytes());
        }
        data.resize(data.len() + SAMPLE_PADDING * 2, 0);
        point = point.saturating_add((sample.data.len() + SAMPLE_PADDING) as u32);
    }
    (data, starts)
}

fn preset_data(bank: &SynthBank, starts: &[u32]) -> Result<ListChunk, FormatError> {
    let mut phdr = Vec::new();
    let mut pbag = Vec::new();
    let mut pgen = Vec::new();
    let mut inst = Vec::new();
    let mut ibag = Vec::new();
    let mut igen = Vec::new();

    for (i, instr) in bank.instruments.iter().enumerate() {
        phdr.push(PresetHeader {
            name: name_field(&instr.name),
            preset: instr.program as u16,
            bank: if instr.drum_kit { DRUM_BANK } else { instr.bank },
            bag_index: index16(pbag.len(), "preset bags")?,
            library: 0,
            genre: 0,
            morphology: 0,
        });
        pbag.push(Bag {
            gen_index: index16(pgen.len(), "preset generators")?,
            mod_index: 0,
        });
        let reverb = (instr.reverb.clamp(0.0, 1.0) * 1000.0).round() as i16;
        pgen.push(Generator::new(GEN_REVERB_EFFECTS_SEND, reverb));
        pgen.push(Generator::word(GEN_INSTRUMENT, index16(i, "instruments")?));

        inst.push(InstrumentHeader {
            name: name_field(&instr.name),
            bag_index: index16(ibag.len(), "instrument bags")?,
        });
        for rgn in &instr.regions {
            ibag.push(Bag {
                gen_index: index16(igen.len(), "instrument generators")?,
                mod_index: 0,
            });
            igen.extend(region_generators(rgn)?);
        }
    }

    phdr.push(PresetHeader {
        name: name_field("EOP"),
        preset: 0,
        bank: 0,
        bag_index: index16(pbag.len(), "preset bags")?,
        library: 0,
        genre: 0,
        morphology: 0,
    });
    pbag.push(Bag {
        gen_index: index16(pgen.len(), "preset generators")?,
        mod_index: 0,
    });
    pgen.push(Generator::word(0, 0));
    inst.push(InstrumentHeader {
        name: name_field("EOI"),
        bag_index: index16(ibag.len(), "instrument bags")?,
    });
    ibag.push(Bag {
        gen_index: index16(igen.len(), "instrument generators")?,
        mod_index: 0,
    });
    igen.push(Generator::word(0, 0));

    let shdr = sample_headers(bank, starts);

    Ok(ListChunk::list(b"pdta")
        .with(Chunk::new(b"phdr", encode_all(&phdr)?))
        .with(Chunk::new(b"pbag", encode_all(&pbag)?))
        .with(Chunk::new(b"pmod", encode(&Modulator::default())?))
        .with(Chunk::new(b"pgen", encode_all(&pgen)?))
        .with(Chunk::new(b"inst", encode_all(&inst)?))
        .with(Chunk::new(b"ibag", encode_all(&ibag)?))
        .with(Chunk::new(b"imod", encode(&Modulator::default())?))
        .with(Chunk::new(b"igen", encode_all(&igen)?))
        .with(Chunk::new(b"shdr", encode_all(&shdr)?)))
}

fn region_generators(rgn: &SynthRegion) -> Result<Vec<Generator>, FormatError> {
    let env = &rgn.envelope;
    let mut gens = vec![
        Generator::range(GEN_KEY_RANGE, rgn.key_low, rgn.key_high),
        Generator::range(GEN_VEL_RANGE, rgn.vel_low, rgn.vel_high),
        Generator::new(GEN_INITIAL_ATTENUATION, sf2_attenuation(rgn.attenuation_db)),
        Generator::new(GEN_PAN, percent_to_pan_units(rgn.pan)),
        Generator::word(
            GEN_SAMPLE_MODES,
            if rgn.loop_info.enabled { LOOP_CONTINUOUS } else { 0 },
        ),
        Generator::word(GEN_OVERRIDING_ROOT_KEY, rgn.unity_key as u16),
        Generator::new(GEN_COARSE_TUNE, rgn.coarse_tune),
        Generator::new(GEN_FINE_TUNE, rgn.fine_tune),
        Generator::new(GEN_ATTACK_VOL_ENV, sf2_time(env.attack)),
        Generator::new(GEN_HOLD_VOL_ENV, sf2_time(env.hold)),
        Generator::new(GEN_DECAY_VOL_ENV, sf2_time(env.decay)),
        Generator::new(GEN_SUSTAIN_VOL_ENV, sf2_sustain_level(env.sustain_or_full())),
        Generator::new(GEN_RELEASE_VOL_ENV, sf2_time(env.release)),
    ];
    if let Some(vib) = rgn.vibrato {
        gens.push(Generator::new(GEN_VIB_LFO_TO_PITCH, sf2_cents(vib.depth_cents)));
        gens.push(Generator::new(
            GEN_FREQ_VIB_LFO,
            sf2_cents(lfo_frequency_to_cents(vib.frequency_hz)),
        ));
        if vib.delay_seconds > 0.0 {
            gens.push(Generator::new(GEN_DELAY_VIB_LFO, sf2_time(vib.delay_seconds)));
        }
    }
    gens.push(Generator::word(GEN_SAMPLE_ID, index16(rgn.sample_index, "samples")?));
    Ok(gens)
}

/// Bag, generator, instrument and sample references are 16-bit.
fn index16(count: usize, what: &'static str) -> Result<u16, FormatError> {
    u16::try_from(count).map_err(|_| FormatError::TooLarge { what, count })
}

/// Loop points come from the first region playing the sample, else the
/// sample's own loop.
fn sample_headers(bank: &SynthBank, starts: &[u32]) -> Vec<SampleHeader> {
    let mut headers = Vec::with_capacity(bank.samples.len() + 1);
    for (index, (sample, &start)) in bank.samples.iter().zip(starts).enumerate() {
        let end = start.saturating_add(sample.data.len() as u32);
        let lp = bank
            .instruments
            .iter()
            .flat_map(|i| i.regions.iter())
            .find(|r| r.sample_index == index)
            .map(|r| r.loop_info)
            .unwrap_or(sample.loop_info);
        let (loop_start, loop_end) = if lp.enabled {
            (start.saturating_add(lp.start), start.saturating_add(lp.end()))
        } else {
            (start, end)
        };
        headers.push(SampleHeader {
            name: name_field(&sample.name),
            start,
            end,
            loop_start,
            loop_end,
            sample_rate: sample.rate,
            original_pitch: sample.unity_key.min(127),
            pitch_correction: sample.fine_tune.clamp(-99, 99) as i8,
            sample_link: 0,
            sample_type: MONO_SAMPLE,
        });
    }
    headers.push(SampleHeader {
        name: name_field("EOS"),
        start: 0,
        end: 0,
        loop_start: 0,
        loop_end: 0,
        sample_rate: 0,
        original_pitch: 0,
        pitch_correction: 0,
        sample_link: 0,
        sample_type: 0,
    });
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{find_chunk, find_list, RiffChunks};
    use crate::synth::{SynthInstrument, SynthSample};
    use bc_ir::{Envelope, ResolvedLoop, SampleData, Vibrato};

    fn region(sample_index: usize) -> SynthRegion {
        SynthRegion {
            key_low: 10,
            key_high: 20,
            vel_low: 0,
            vel_high: 127,
            sample_index,
            loop_info: ResolvedLoop::default(),
            unity_key: 60,
            coarse_tune: -2,
            fine_tune: 5,
            attenuation_db: 6.0,
            pan: 0.25,
            envelope: Envelope::default(),
            vibrato: None,
        }
    }

    fn sample(name: &str, len: usize) -> SynthSample {
        SynthSample {
            name: name.into(),
            rate: 22050,
            data: SampleData::Mono16(vec![7; len]),
            loop_info: ResolvedLoop::default(),
            unity_key: 64,
            fine_tune: 0,
            attenuation_db: 0.0,
        }
    }

    fn bank() -> SynthBank {
        let mut looped = region(1);
        looped.loop_info = ResolvedLoop { enabled: true, start: 2, length: 4 };
        SynthBank {
            name: "soundfont".into(),
            instruments: vec![
                SynthInstrument {
                    name: "piano".into(),
                    bank: 3,
                    program: 1,
                    drum_kit: false,
                    reverb: 0.5,
                    regions: vec![region(0), looped],
                },
                SynthInstrument {
                    name: "kit".into(),
                    bank: 0,
                    program: 0,
                    drum_kit: true,
                    reverb: 0.0,
                    regions: vec![region(0)],
                },
            ],
            samples: vec![sample("one", 10), sample("two", 8)],
        }
    }

    fn opts() -> Sf2Options {
        Sf2Options {
            creation_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..Sf2Options::default()
        }
    }

    fn pdta_chunk<'a>(bytes: &'a [u8], id: &[u8; 4]) -> &'a [u8] {
        let pdta = find_list(RiffChunks::in_list(&bytes[8..]), b"pdta").unwrap();
        find_chunk(RiffChunks::in_list(pdta), id).unwrap()
    }

    fn u16_at(data: &[u8], pos: usize) -> u16 {
        u16::from_le_bytes([data[pos], data[pos + 1]])
    }

    fn u32_at(data: &[u8], pos: usize) -> u32 {
        u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
    }

    #[test]
    fn table_sizes_follow_record_counts() {
        let bytes = write_sf2(&bank(), &opts()).unwrap();
        assert_eq!(u32_at(&bytes, 4) as usize, bytes.len() - 8);
        assert_eq!(pdta_chunk(&bytes, b"phdr").len(), 38 * 3);
        assert_eq!(pdta_chunk(&bytes, b"pbag").len(), 4 * 3);
        assert_eq!(pdta_chunk(&bytes, b"pmod").len(), 10);
        assert_eq!(pdta_chunk(&bytes, b"pgen").len(), 4 * 5);
        assert_eq!(pdta_chunk(&bytes, b"inst").len(), 22 * 3);
        assert_eq!(pdta_chunk(&bytes, b"ibag").len(), 4 * 4);
        assert_eq!(pdta_chunk(&bytes, b"imod").len(), 10);
        assert_eq!(pdta_chunk(&bytes, b"igen").len(), 4 * (14 * 3 + 1));
        assert_eq!(pdta_chunk(&bytes, b"shdr").len(), 46 * 3);
    }

    #[test]
    fn terminal_records_carry_indices() {
        let bytes = write_sf2(&bank(), &opts()).unwrap();
        let phdr = pdta_chunk(&bytes, b"phdr");
        assert_eq!(&phdr[76..79], b"EOP");
        assert_eq!(u16_at(phdr, 76 + 24), 2);
        let pbag = pdta_chunk(&bytes, b"pbag");
        assert_eq!(u16_at(pbag, 8), 4);
        let inst = pdta_chunk(&bytes, b"inst");
        assert_eq!(&inst[44..47], b"EOI");
        assert_eq!(u16_at(inst, 64), 3);
        let ibag = pdta_chunk(&bytes, b"ibag");
        assert_eq!(u16_at(ibag, 12), 42);
        let shdr = pdta_chunk(&bytes, b"shdr");
        assert_eq!(&shdr[92..95], b"EOS");
        assert!(shdr[95..].iter().all(|&b| b == 0));
    }

    #[test]
    fn drum_presets_use_bank_128() {
        let bytes = write_sf2(&bank(), &opts()).unwrap();
        let phdr = pdta_chunk(&bytes, b"phdr");
        assert_eq!((u16_at(phdr, 20), u16_at(phdr, 22)), (1, 3));
        assert_eq!((u16_at(phdr, 38 + 20), u16_at(phdr, 38 + 22)), (0, 128));
        let pgen = pdta_chunk(&bytes, b"pgen");
        assert_eq!((u16_at(pgen, 0), u16_at(pgen, 2)), (GEN_REVERB_EFFECTS_SEND, 500));
        assert_eq!((u16_at(pgen, 12), u16_at(pgen, 14)), (GEN_INSTRUMENT, 1));
    }

    #[test]
    fn generator_order_is_fixed() {
        let ops: Vec<u16> = region_generators(&region(0)).unwrap().iter().map(|g| g.operator).collect();
        assert_eq!(
            ops,
            vec![43, 44, 48, 17, 54, 58, 51, 52, 34, 35, 36, 37, 38, 53]
        );
        let mut rgn = region(0);
        rgn.vibrato = Some(Vibrato { frequency_hz: 8.176, depth_cents: 50.0, delay_seconds: 0.5 });
        let gens = region_generators(&rgn).unwrap();
        let ops: Vec<u16> = gens.iter().map(|g| g.operator).collect();
        assert_eq!(&ops[13..], &[6, 24, 23, 53]);
        assert_eq!(gens[13].amount, 50);
        assert_eq!(gens[14].amount, 0);
        assert_eq!(gens[15].amount as i16, -1200);
    }

    #[test]
    fn generator_amounts() {
        let gens = region_generators(&region(3)).unwrap();
        assert_eq!(gens[0].amount, u16::from_le_bytes([10, 20]));
        assert_eq!(gens[2].amount, 60);
        assert_eq!(gens[3].amount as i16, -250);
        assert_eq!(gens[6].amount as i16, -2);
        assert_eq!(gens[8].amount as i16, i16::MIN);
        assert_eq!(gens[11].amount, 0);
        assert_eq!(gens[13].amount, 3);
    }

    #[test]
    fn samples_are_padded_and_loops_absolute() {
        let bytes = write_sf2(&bank(), &opts()).unwrap();
        let sdta = find_list(RiffChunks::in_list(&bytes[8..]), b"sdta").unwrap();
        let smpl = find_chunk(RiffChunks::in_list(sdta), b"smpl").unwrap();
        assert_eq!(smpl.len(), (10 + 46 + 8 + 46) * 2);
        assert!(smpl[20..20 + 92].iter().all(|&b| b == 0));

        let shdr = pdta_chunk(&bytes, b"shdr");
        let second = 46;
        assert_eq!(u32_at(shdr, second + 20), 56);
        assert_eq!(u32_at(shdr, second + 24), 64);
        assert_eq!(u32_at(shdr, second + 28), 58);
        assert_eq!(u32_at(shdr, second + 32), 62);
        assert_eq!(shdr[40], 64);
        assert_eq!(u16_at(shdr, 44), MONO_SAMPLE);
    }

    #[test]
    fn info_list_fields() {
        let bytes = write_sf2(&bank(), &opts()).unwrap();
        let info = find_list(RiffChunks::in_list(&bytes[8..]), b"INFO").unwrap();
        let ifil = find_chunk(RiffChunks::in_list(info), b"ifil").unwrap();
        assert_eq!((u16_at(ifil, 0), u16_at(ifil, 2)), (2, 1));
        assert_eq!(find_chunk(RiffChunks::in_list(info), b"isng"), Some(&b"EMU8000\0"[..]));
        assert_eq!(find_chunk(RiffChunks::in_list(info), b"ICRD"), Some(&b"2024-03-01\0\0"[..]));
        assert_eq!(find_chunk(RiffChunks::in_list(info), b"INAM"), Some(&b"soundfont\0"[..]));
    }

    #[test]
    fn empty_bank_still_has_terminals() {
        let mut bank = bank();
        bank.instruments.clear();
        let bytes = write_sf2(&bank, &opts()).unwrap();
        assert_eq!(pdta_chunk(&bytes, b"phdr").len(), 38);
        assert_eq!(pdta_chunk(&bytes, b"igen").len(), 4);
    }

    #[test]
    fn generator_indices_past_16_bits_are_rejected() {
        let mut bank = bank();
        // 14 generators per region overflows the 16-bit igen index
        bank.instruments[0].regions = vec![region(0); 5000];
        let err = write_sf2(&bank, &opts()).unwrap_err();
        assert!(matches!(
            err,
            FormatError::TooLarge { what: "instrument generators", count } if count > 0xFFFF
        ));
    }

    #[test]
    fn sample_ids_past_16_bits_are_rejected() {
        assert_eq!(region_generators(&region(0xFFFF)).unwrap().last().unwrap().amount, 0xFFFF);
        assert!(matches!(
            region_generators(&region(70_000)),
            Err(FormatError::TooLarge { what: "samples", count: 70_000 })
        ));
    }
}
