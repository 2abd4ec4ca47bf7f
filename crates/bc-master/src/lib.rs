//! Headless conversion session for bankconv.
//!
//! Owns the library of scanned objects and provides the entry points that
//! turn them into DLS, SF2 and WAV files, shared by the CLI and tests.

mod loader;
mod matcher;
mod scan;
pub mod scanners;
mod sink;

use std::fs;
use std::io;
use std::path::Path;

use bc_formats::BankSource;
use thiserror::Error;
use tracing::{debug, info, warn};

// Re-export common types so callers don't need bc-ir/bc-formats directly.
pub use bc_formats::{DlsOptions, FormatError, Sf2Options, SynthError};
pub use bc_ir::{
    CollectionKey, InstrumentSetKey, Library, RawFile, SampleCollection, SampleCollectionKey,
};

pub use loader::{
    load_instrument_set, load_sample_collection, InstrumentSetLoader, LoadError,
    SampleCollectionLoader,
};
pub use matcher::{finalize, Matcher, MatcherConfig};
pub use scan::{FormatScanner, ScanContext};
pub use scanners::{RawSampleConfig, RawSampleScanner, WavScanner};
pub use sink::{sanitize_file_name, DirectorySink, MemorySink, OutputSink};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no such collection")]
    UnknownCollection,
    #[error("no such sample collection")]
    UnknownSampleCollection,
    #[error("no sample at index {0}")]
    NoSuchSample(usize),
    #[error("no scanner recognized {0}")]
    Unrecognized(String),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What to convert: a matched collection, or explicit lists for a
/// bank-only export.
#[derive(Clone, Debug)]
pub enum BankSelection {
    Collection(CollectionKey),
    Lists {
        name: String,
        instrument_sets: Vec<InstrumentSetKey>,
        sample_collections: Vec<SampleCollectionKey>,
    },
}

impl BankSelection {
    /// Every instrument set and sample collection in the library.
    pub fn everything(library: &Library, name: &str) -> Self {
        Self::Lists {
            name: name.to_string(),
            instrument_sets: library.instrument_sets.keys().collect(),
            sample_collections: library.sample_collections.keys().collect(),
        }
    }
}

/// Which files an export writes.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub dls: Option<DlsOptions>,
    pub sf2: Option<Sf2Options>,
    /// Also write every sample as its own WAV file
    pub wav: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            dls: Some(DlsOptions::default()),
            sf2: Some(Sf2Options::default()),
            wav: false,
        }
    }
}

/// Scanners plus the library they fill.
pub struct Session {
    library: Library,
    scanners: Vec<Box<dyn FormatScanner>>,
    config: MatcherConfig,
}

impl Session {
    /// A session without scanners.
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            library: Library::new(),
            scanners: Vec::new(),
            config,
        }
    }

    pub fn with_default_scanners(config: MatcherConfig) -> Self {
        let mut session = Self::new(config);
        session.add_scanner(WavScanner);
        session
    }

    pub fn add_scanner(&mut self, scanner: impl FormatScanner + 'static) {
        self.scanners.push(Box::new(scanner));
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    // --- Scanning ---

    /// Run the scanners over `file` until one recognizes it, then pair
    /// what was found. Returns the collections created.
    pub fn load_file(&mut self, file: RawFile) -> Result<Vec<CollectionKey>, SessionError> {
        let name = file.name().to_string();
        let mut ctx = ScanContext::new(&mut self.library, file, &self.config);
        for scanner in &self.scanners {
            match scanner.scan(&mut ctx) {
                Ok(()) if ctx.registered() > 0 => {
                    debug!(file = %name, scanner = scanner.name(), "recognized");
                    break;
                }
                Ok(()) => {}
                Err(err) => warn!(file = %name, scanner = scanner.name(), %err, "scan failed"),
            }
        }
        if ctx.registered() == 0 {
            return Err(SessionError::Unrecognized(name));
        }
        Ok(ctx.finish())
    }

    pub fn load_path(&mut self, path: &Path) -> Result<Vec<CollectionKey>, SessionError> {
        let data = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.load_file(RawFile::new(&name, data))
    }

    // --- Conversion ---

    fn source(&self, selection: &BankSelection) -> Result<BankSource<'_>, SessionError> {
        match selection {
            BankSelection::Collection(key) => BankSource::from_collection(&self.library, *key)
                .ok_or(SessionError::UnknownCollection),
            BankSelection::Lists {
                name,
                instrument_sets,
                sample_collections,
            } => Ok(BankSource::from_lists(
                &self.library,
                name,
                instrument_sets,
                sample_collections,
            )),
        }
    }

    pub fn produce_dls(
        &self,
        selection: &BankSelection,
        opts: &DlsOptions,
    ) -> Result<Vec<u8>, SessionError> {
        Ok(bc_formats::produce_dls(&self.source(selection)?, opts)?)
    }

    pub fn produce_sf2(
        &self,
        selection: &BankSelection,
        opts: &Sf2Options,
    ) -> Result<Vec<u8>, SessionError> {
        Ok(bc_formats::produce_sf2(&self.source(selection)?, opts)?)
    }

    /// Decode sample `index` of a registered collection to WAV.
    pub fn produce_wav(
        &self,
        key: SampleCollectionKey,
        index: usize,
    ) -> Result<Vec<u8>, SessionError> {
        let coll = self
            .library
            .sample_collections
            .get(key)
            .ok_or(SessionError::UnknownSampleCollection)?;
        collection_wav(coll, index)
    }

    /// Write the selection's bank files, and optionally its samples, to
    /// `sink`. Returns the number of files written.
    pub fn export(
        &self,
        selection: &BankSelection,
        sink: &mut dyn OutputSink,
        opts: &ExportOptions,
    ) -> Result<usize, SessionError> {
        let source = self.source(selection)?;
        let mut written = 0;

        if let Some(dls) = &opts.dls {
            let data = bc_formats::produce_dls(&source, dls)?;
            sink.write(&format!("{}.dls", source.name), &data)?;
            written += 1;
        }
        if let Some(sf2) = &opts.sf2 {
            let data = bc_formats::produce_sf2(&source, sf2)?;
            sink.write(&format!("{}.sf2", source.name), &data)?;
            written += 1;
        }
        if opts.wav {
            let embedded = source
                .instrument_sets
                .iter()
                .filter_map(|k| self.library.instrument_sets.get(*k)?.sample_collection.as_ref());
            let registered = source
                .sample_collections
                .iter()
                .filter_map(|k| self.library.sample_collections.get(*k));
            for coll in registered.chain(embedded) {
                for (index, sample) in coll.samples.iter().enumerate() {
                    let data = collection_wav(coll, index)?;
                    let file_name = if sample.name.is_empty() {
                        format!("{} {:03}.wav", coll.name, index)
                    } else {
                        format!("{} {:03} {}.wav", coll.name, index, sample.name)
                    };
                    sink.write(&file_name, &data)?;
                    written += 1;
                }
            }
        }

        info!(bank = %source.name, files = written, "export finished");
        Ok(written)
    }

    pub fn export_collection(
        &self,
        key: CollectionKey,
        sink: &mut dyn OutputSink,
        opts: &ExportOptions,
    ) -> Result<usize, SessionError> {
        self.export(&BankSelection::Collection(key), sink, opts)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::with_default_scanners(MatcherConfig::default())
    }
}

fn collection_wav(coll: &SampleCollection, index: usize) -> Result<Vec<u8>, SessionError> {
    let sample = coll
        .samples
        .get(index)
        .ok_or(SessionError::NoSuchSample(index))?;
    Ok(bc_formats::sample_to_wav(sample, coll.sample_bytes(sample))?)
}
