//! bankconv CLI: scan sound-bank files and convert them to DLS, SF2 and WAV.
//!
//! Usage:
//!   bc-cli convert bank.wav other.wav -o out/
//!   bc-cli convert voice.adp --raw-ext adp --raw-encoding adpcm4 --raw-rate 32000 -o out/
//!   bc-cli info bank.wav

use std::error::Error;
use std::path::PathBuf;

use bc_ir::{Loop, SampleEncoding};
use bc_master::{
    BankSelection, CollectionKey, DirectorySink, DlsOptions, ExportOptions, MatcherConfig,
    RawSampleConfig, RawSampleScanner, Session, Sf2Options,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Converts console sound banks into DLS, SF2 and WAV")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every bank found in the inputs.
    Convert(ConvertArgs),
    /// List what the scanners find in the inputs.
    Info(ScanArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Files to scan, in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Extension suffix of files that only carry dependencies
    #[arg(long, default_value = "lib")]
    aux_suffix: String,
    /// Treat files with this extension as headerless sample data
    #[arg(long)]
    raw_ext: Vec<String>,
    #[arg(long, value_enum, default_value_t = RawEncoding::Pcm16)]
    raw_encoding: RawEncoding,
    #[arg(long, default_value_t = 22050)]
    raw_rate: u32,
    #[arg(long, default_value_t = 1)]
    raw_channels: u16,
}

#[derive(Args)]
struct ConvertArgs {
    #[command(flatten)]
    scan: ScanArgs,
    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
    /// Formats to write
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [OutputFormat::Dls, OutputFormat::Sf2])]
    format: Vec<OutputFormat>,
    /// Bank name for a bank-only export
    #[arg(long)]
    name: Option<String>,
    /// Omit the DLS wave pool table
    #[arg(long)]
    no_pool_table: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Dls,
    Sf2,
    Wav,
}

#[derive(Clone, Copy, ValueEnum)]
enum RawEncoding {
    Pcm8,
    Pcm16,
    Pcm16be,
    Adpcm4,
}

impl From<RawEncoding> for SampleEncoding {
    fn from(enc: RawEncoding) -> Self {
        match enc {
            RawEncoding::Pcm8 => SampleEncoding::Pcm8,
            RawEncoding::Pcm16 => SampleEncoding::Pcm16,
            RawEncoding::Pcm16be => SampleEncoding::Pcm16Be,
            RawEncoding::Adpcm4 => SampleEncoding::Adpcm4,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => convert(args),
        Commands::Info(args) => {
            let (session, _) = scan(&args);
            print_library(&session);
            Ok(())
        }
    }
}

fn scan(args: &ScanArgs) -> (Session, Vec<CollectionKey>) {
    let config = MatcherConfig {
        aux_suffix: args.aux_suffix.to_ascii_lowercase(),
    };
    let mut session = Session::with_default_scanners(config);
    if !args.raw_ext.is_empty() {
        session.add_scanner(RawSampleScanner::new(RawSampleConfig {
            extensions: args.raw_ext.iter().map(|e| e.to_ascii_lowercase()).collect(),
            encoding: args.raw_encoding.into(),
            channels: args.raw_channels,
            rate: args.raw_rate,
            loop_info: Loop::off(),
        }));
    }

    let mut collections = Vec::new();
    for path in &args.inputs {
        match session.load_path(path) {
            Ok(created) => collections.extend(created),
            Err(err) => error!(path = %path.display(), %err, "failed to load"),
        }
    }
    (session, collections)
}

fn convert(args: ConvertArgs) -> Result<(), Box<dyn Error>> {
    let (session, collections) = scan(&args.scan);
    if session.library().instrument_sets.is_empty() {
        return Err("no instrument sets found in the inputs".into());
    }

    let opts = ExportOptions {
        dls: args.format.contains(&OutputFormat::Dls).then(|| DlsOptions {
            name: None,
            pool_table: !args.no_pool_table,
        }),
        sf2: args
            .format
            .contains(&OutputFormat::Sf2)
            .then(Sf2Options::default),
        wav: args.format.contains(&OutputFormat::Wav),
    };
    let mut sink = DirectorySink::new(&args.output);

    let mut failures = 0;
    if collections.is_empty() {
        let name = args
            .name
            .clone()
            .unwrap_or_else(|| default_bank_name(&args.scan.inputs));
        info!(bank = %name, "no collections matched, exporting every bank");
        let selection = BankSelection::everything(session.library(), &name);
        if let Err(err) = session.export(&selection, &mut sink, &opts) {
            error!(bank = %name, %err, "conversion failed");
            failures += 1;
        }
    } else {
        for key in &collections {
            if let Err(err) = session.export_collection(*key, &mut sink, &opts) {
                warn!(%err, "collection conversion failed");
                failures += 1;
            }
        }
    }

    println!("Wrote {} file(s) to {}", sink.written().len(), sink.dir().display());
    if sink.written().is_empty() && failures > 0 {
        return Err("nothing was converted".into());
    }
    Ok(())
}

fn default_bank_name(inputs: &[PathBuf]) -> String {
    inputs
        .first()
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bank".to_string())
}

fn print_library(session: &Session) {
    let lib = session.library();

    println!("Instrument sets: {}", lib.instrument_sets.len());
    for set in lib.instrument_sets.values() {
        println!(
            "  {:<24} {:>4} instruments {:>5} regions{}",
            set.name,
            set.instruments.len(),
            set.region_count(),
            set.sample_collection
                .as_ref()
                .map(|c| format!(", {} embedded samples", c.len()))
                .unwrap_or_default()
        );
        for instr in &set.instruments {
            println!(
                "    {:03}:{:03} {:<32} {} regions{}",
                instr.bank,
                instr.program,
                instr.name.as_str(),
                instr.regions.len(),
                if instr.drum_kit { " (drums)" } else { "" }
            );
        }
    }

    println!("Sample collections: {}", lib.sample_collections.len());
    for coll in lib.sample_collections.values() {
        println!("  {:<24} {:>4} samples", coll.name, coll.len());
        for sample in &coll.samples {
            println!(
                "    {:<32} {:?} {}ch {} Hz {} bytes",
                sample.name.as_str(),
                sample.encoding,
                sample.channels,
                sample.rate,
                sample.data_length
            );
        }
    }

    println!("Collections: {}", lib.collections.len());
    for coll in lib.collections.values() {
        println!(
            "  {:<24} {} instrument sets, {} sample collections",
            coll.name,
            coll.instrument_sets.len(),
            coll.sample_collections.len()
        );
    }
}
