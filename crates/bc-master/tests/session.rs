use bc_ir::{ResolvedLoop, SampleData, SampleEncoding};
use bc_master::{
    BankSelection, CollectionKey, DirectorySink, ExportOptions, FormatError, MatcherConfig,
    MemorySink, RawFile, RawSampleConfig, RawSampleScanner, Session, SessionError, SynthError,
};

fn wav_file(name: &str) -> RawFile {
    let data = SampleData::Mono16((0..64).map(|i| (i * 256) as i16).collect());
    let lp = ResolvedLoop {
        enabled: true,
        start: 16,
        length: 32,
    };
    let mut buf = Vec::new();
    bc_formats::write_sample_wav(&mut buf, &data, 22050, 60, lp).unwrap();
    RawFile::new(name, buf)
}

fn raw_session() -> Session {
    let mut session = Session::default();
    session.add_scanner(RawSampleScanner::new(RawSampleConfig {
        extensions: vec!["adp".into()],
        encoding: SampleEncoding::Adpcm4,
        rate: 16000,
        ..RawSampleConfig::default()
    }));
    session
}

#[test]
fn wav_without_sequence_creates_no_collection() {
    let mut session = Session::default();
    let created = session.load_file(wav_file("piano.wav")).unwrap();
    assert!(created.is_empty());
    assert_eq!(session.library().instrument_sets.len(), 1);
}

#[test]
fn bank_only_export_writes_every_format() {
    let mut session = Session::default();
    session.load_file(wav_file("piano.wav")).unwrap();
    session.load_file(wav_file("bass.wav")).unwrap();

    let selection = BankSelection::everything(session.library(), "combined");
    let mut sink = MemorySink::new();
    let opts = ExportOptions {
        wav: true,
        ..ExportOptions::default()
    };
    let written = session.export(&selection, &mut sink, &opts).unwrap();
    assert_eq!(written, 4);

    let dls = sink.get("combined.dls").unwrap();
    assert_eq!(&dls[0..4], b"RIFF");
    assert_eq!(&dls[8..12], b"DLS ");
    let sf2 = sink.get("combined.sf2").unwrap();
    assert_eq!(&sf2[8..12], b"sfbk");
    assert!(sink.get("piano 000 piano.wav").is_some());
    assert!(sink.get("bass 000 bass.wav").is_some());
}

#[test]
fn unrecognized_files_are_reported() {
    let mut session = Session::default();
    let err = session
        .load_file(RawFile::new("notes.txt", b"hello".to_vec()))
        .unwrap_err();
    assert!(matches!(err, SessionError::Unrecognized(name) if name == "notes.txt"));
    assert!(session.library().instrument_sets.is_empty());
}

#[test]
fn raw_adpcm_sample_decodes_to_wav() {
    let mut session = raw_session();
    session
        .load_file(RawFile::new("voice.adp", vec![0x11; 20]))
        .unwrap();
    let key = session.library().sample_collections.keys().next().unwrap();

    let wav = session.produce_wav(key, 0).unwrap();
    assert_eq!(wav_header(&wav), (1, 16000, 16));

    assert!(matches!(
        session.produce_wav(key, 1),
        Err(SessionError::NoSuchSample(1))
    ));
}

/// Channels, rate and depth of a WAV buffer.
fn wav_header(wav: &[u8]) -> (u16, u32, u16) {
    let info = bc_formats::parse_wav(wav).unwrap();
    (info.num_channels, info.sample_rate, info.bits_per_sample)
}

#[test]
fn unknown_handles_are_errors() {
    let session = Session::default();
    let mut sink = MemorySink::new();
    assert!(matches!(
        session.export_collection(CollectionKey::default(), &mut sink, &ExportOptions::default()),
        Err(SessionError::UnknownCollection)
    ));
    assert!(matches!(
        session.produce_wav(Default::default(), 0),
        Err(SessionError::UnknownSampleCollection)
    ));
    assert!(sink.files.is_empty());
}

#[test]
fn empty_selection_fails_without_output() {
    let session = Session::new(MatcherConfig::default());
    let selection = BankSelection::everything(session.library(), "empty");
    let mut sink = MemorySink::new();
    let err = session
        .export(&selection, &mut sink, &ExportOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Format(FormatError::Synth(SynthError::NoInstrumentSets))
    ));
    assert!(sink.files.is_empty());
}

#[test]
fn directory_export() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = Session::default();
    session.load_file(wav_file("lead.wav")).unwrap();

    let selection = BankSelection::everything(session.library(), "lead");
    let mut sink = DirectorySink::new(tmp.path());
    let opts = ExportOptions {
        dls: None,
        ..ExportOptions::default()
    };
    assert_eq!(session.export(&selection, &mut sink, &opts).unwrap(), 1);
    assert!(tmp.path().join("lead.sf2").exists());
    assert!(!tmp.path().join("lead.dls").exists());
}
