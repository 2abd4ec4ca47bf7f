//! End-to-end checks of the DLS, SF2 and WAV writers over a small library.

use std::io::Cursor;

use bc_formats::chunk::{find_chunk, find_list};
use bc_formats::{
    produce_dls, produce_sf2, sample_to_wav, BankSource, DlsOptions, FormatError, RiffChunks,
    Sf2Options, SynthError,
};
use bc_ir::{
    InstrumentSet, InstrumentSetKey, Library, Loop, RawFile, SampleCollection, SampleCollectionKey,
    SampleEncoding, SampleFormat, Vibrato,
};

fn adpcm_block(nibble_bytes: usize) -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x10, 0x00];
    data.extend((0..nibble_bytes).map(|i| (i * 29 % 256) as u8));
    data
}

/// One external collection with a PCM16 sample and an ADPCM sample, and a
/// set with two instruments, one of them empty.
fn library() -> (Library, InstrumentSetKey, SampleCollectionKey) {
    let mut image = vec![0u8; 0x40];
    for (i, b) in image.iter_mut().enumerate().take(0x40) {
        *b = (i as u8).wrapping_mul(3);
    }
    image.extend(adpcm_block(0x20));
    let raw = RawFile::new("wave.bin", image);

    let mut coll = SampleCollection::new("wave", raw.clone(), 0, raw.len() as u32);
    let pcm = coll
        .add_sample(0, 0x40, SampleFormat::mono(SampleEncoding::Pcm16, 22050))
        .unwrap();
    pcm.set_name("pcm");
    pcm.loop_info = Loop::bytes(0x10, 0x20);
    let adpcm = coll
        .add_sample(0x40, 0x24, SampleFormat::mono(SampleEncoding::Adpcm4, 32000))
        .unwrap();
    adpcm.set_name("adpcm");
    adpcm.loop_info = Loop::off();
    coll.mark_loaded();

    let mut set = InstrumentSet::new("bank", RawFile::new("bank.bin", vec![0; 4]), 0, 4);
    let lead = set.add_instrument(0, 0, 3).unwrap();
    set.instruments[lead].set_name("lead");
    set.add_region(lead, 0, 0).unwrap().set_key_range(0, 59);
    let rgn = set.add_region(lead, 0, 0).unwrap();
    rgn.set_key_range(60, 127).set_sample_offset(0x40, None);
    rgn.vibrato = Some(Vibrato { frequency_hz: 5.5, depth_cents: 20.0, delay_seconds: 0.1 });
    set.add_instrument(0, 0, 4).unwrap();
    set.mark_loaded();

    let mut lib = Library::new();
    let c = lib.sample_collections.insert(coll);
    let s = lib.instrument_sets.insert(set);
    (lib, s, c)
}

#[test]
fn dls_reparses_with_the_chunk_reader() {
    let (lib, set, coll) = library();
    let source = BankSource::from_lists(&lib, "test", &[set], &[coll]);
    let bytes = produce_dls(&source, &DlsOptions::default()).unwrap();

    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize, bytes.len() - 8);
    let body = &bytes[8..];

    let colh = find_chunk(RiffChunks::in_list(body), b"colh").unwrap();
    assert_eq!(colh, &1u32.to_le_bytes());

    let lins = find_list(RiffChunks::in_list(body), b"lins").unwrap();
    assert_eq!(RiffChunks::in_list(lins).count(), 1);

    let wvpl = find_list(RiffChunks::in_list(body), b"wvpl").unwrap();
    let waves: Vec<_> = RiffChunks::in_list(wvpl).collect();
    assert_eq!(waves.len(), 2);
    let adpcm_wave = find_chunk(RiffChunks::in_list(waves[1].1), b"data").unwrap();
    // 0x20 nibble bytes decode to 0x40 16-bit samples
    assert_eq!(adpcm_wave.len(), 0x80);
}

#[test]
fn sf2_reparses_with_the_chunk_reader() {
    let (lib, set, coll) = library();
    let source = BankSource::from_lists(&lib, "test", &[set], &[coll]);
    let bytes = produce_sf2(&source, &Sf2Options::default()).unwrap();
    let body = &bytes[8..];
    assert_eq!(&body[0..4], b"sfbk");

    let lists: Vec<_> = RiffChunks::in_list(body).map(|(_, d)| [d[0], d[1], d[2], d[3]]).collect();
    assert_eq!(lists, vec![*b"INFO", *b"sdta", *b"pdta"]);

    let pdta = find_list(RiffChunks::in_list(body), b"pdta").unwrap();
    let ids: Vec<_> = RiffChunks::in_list(pdta).map(|(id, _)| id).collect();
    assert_eq!(
        ids,
        vec![*b"phdr", *b"pbag", *b"pmod", *b"pgen", *b"inst", *b"ibag", *b"imod", *b"igen", *b"shdr"]
    );

    // regions: 14 generators, plus 3 vibrato entries on the second
    let igen = find_chunk(RiffChunks::in_list(pdta), b"igen").unwrap();
    assert_eq!(igen.len(), 4 * (14 + 17 + 1));
    // the second region resolved sample offset 0x40 to the ADPCM sample
    let last_gen = &igen[igen.len() - 8..igen.len() - 4];
    assert_eq!(last_gen, &[53, 0, 1, 0]);

    let sdta = find_list(RiffChunks::in_list(body), b"sdta").unwrap();
    let smpl = find_chunk(RiffChunks::in_list(sdta), b"smpl").unwrap();
    assert_eq!(smpl.len(), (0x20 + 46 + 0x40 + 46) * 2);
}

#[test]
fn synthesis_without_instrument_sets_fails() {
    let (lib, _, coll) = library();
    let source = BankSource::from_lists(&lib, "test", &[], &[coll]);
    assert!(matches!(
        produce_dls(&source, &DlsOptions::default()),
        Err(FormatError::Synth(SynthError::NoInstrumentSets))
    ));
    assert!(matches!(
        produce_sf2(&source, &Sf2Options::default()),
        Err(FormatError::Synth(SynthError::NoInstrumentSets))
    ));
}

#[test]
fn set_with_only_an_empty_instrument_still_converts() {
    let mut lib = Library::new();
    let raw = RawFile::new("s.bin", vec![0; 16]);
    let mut set = InstrumentSet::new("bank", raw.clone(), 0, 16);
    set.add_instrument(0, 0, 0).unwrap();
    let mut coll = SampleCollection::new("embedded", raw, 0, 16);
    coll.add_sample(0, 16, SampleFormat::mono(SampleEncoding::Pcm8, 8000)).unwrap();
    set.sample_collection = Some(coll);
    set.mark_loaded();
    let set = lib.instrument_sets.insert(set);

    let source = BankSource::from_lists(&lib, "empty", &[set], &[]);
    let dls = produce_dls(&source, &DlsOptions::default()).unwrap();
    let colh = find_chunk(RiffChunks::in_list(&dls[8..]), b"colh").unwrap();
    assert_eq!(colh, &0u32.to_le_bytes());

    let sf2 = produce_sf2(&source, &Sf2Options::default()).unwrap();
    let pdta = find_list(RiffChunks::in_list(&sf2[8..]), b"pdta").unwrap();
    assert_eq!(find_chunk(RiffChunks::in_list(pdta), b"phdr").unwrap().len(), 38);
}

#[test]
fn wav_output_is_accepted_by_hound() {
    let (lib, _, coll) = library();
    let coll = &lib.sample_collections[coll];
    let sample = &coll.samples[0];
    let wav = sample_to_wav(sample, coll.sample_bytes(sample)).unwrap();

    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 22050);
    assert_eq!(spec.bits_per_sample, 16);
    let samples: Vec<i16> = reader.into_samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(samples.len(), 0x20);
    assert_eq!(samples[0], i16::from_le_bytes([0, 3]));
}

#[test]
fn adpcm_wav_has_decoded_length() {
    let (lib, _, coll) = library();
    let coll = &lib.sample_collections[coll];
    let sample = &coll.samples[1];
    let wav = sample_to_wav(sample, coll.sample_bytes(sample)).unwrap();
    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    assert_eq!(reader.duration(), 0x40);
}
