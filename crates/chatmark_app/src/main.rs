//! Headless export runner: converts a saved chat page snapshot to Markdown.
//!
//! Stands in for the in-page trigger button: point it at an HTML snapshot of
//! a ChatGPT or Gemini conversation and it writes `<title>.md` next to it.

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use chatmark_core::RecoverySettings;
use chatmark_engine::{
    decode_snapshot, ChannelProgressSink, ExportEvent, ExportSettings, Exporter, PlatformProfile,
    ReplayPage,
};
use clap::Parser;
use export_logging::{export_error, export_info};

#[derive(Debug, Parser)]
#[command(name = "chatmark", about = "Export a saved chat page snapshot to Markdown")]
struct Args {
    /// Saved page snapshot (HTML) to export.
    #[arg(long)]
    snapshot: PathBuf,

    /// Host name the snapshot was saved from, e.g. chatgpt.com.
    #[arg(long)]
    host: String,

    /// Output directory for the Markdown artifact.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Custom platform profile (JSON), overriding host detection.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Delay between history-recovery rounds, in milliseconds.
    #[arg(long, default_value_t = 1200)]
    round_delay_ms: u64,

    /// Consecutive unchanged rounds counted as convergence.
    #[arg(long, default_value_t = 3)]
    stall_limit: u32,

    /// Hard ceiling on recovery rounds.
    #[arg(long, default_value_t = 60)]
    max_rounds: u32,

    /// Also write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::initialize(args.log_file.as_deref());

    let bytes = match std::fs::read(&args.snapshot) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("Could not read snapshot {}: {err}", args.snapshot.display());
            return ExitCode::FAILURE;
        }
    };
    let decoded = match decode_snapshot(&bytes) {
        Ok(decoded) => decoded,
        Err(err) => {
            eprintln!("Could not decode snapshot: {err}");
            return ExitCode::FAILURE;
        }
    };
    export_info!(
        "decoded {} byte snapshot as {}",
        bytes.len(),
        decoded.encoding_label
    );

    let profile = match load_profile(args.profile.as_deref()) {
        Ok(profile) => profile,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let page = ReplayPage::new(args.host, decoded.html);
    let exporter = Exporter::new(ExportSettings {
        output_dir: args.out,
        recovery: RecoverySettings {
            max_rounds: args.max_rounds,
            stall_limit: args.stall_limit,
            round_delay: Duration::from_millis(args.round_delay_ms),
        },
    });

    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            match event {
                ExportEvent::Progress(progress) => println!("{}", progress.status),
                ExportEvent::Completed {
                    artifact,
                    message_count,
                } => println!(
                    "exported {message_count} messages to {}",
                    artifact.display()
                ),
            }
        }
    });

    let result = exporter
        .export(&page, profile, &ChannelProgressSink::new(tx))
        .await;
    // The sink (and its sender) is gone once export returns, so the printer
    // thread drains the channel and exits.
    let _ = printer.join();

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            export_error!("export failed: {err}");
            eprintln!("Export failed; scroll the conversation to the top and retry. ({err})");
            ExitCode::FAILURE
        }
    }
}

fn load_profile(path: Option<&Path>) -> Result<Option<PlatformProfile>, String> {
    let Some(path) = path else {
        return Ok(None);
    };
    let json = std::fs::read_to_string(path)
        .map_err(|err| format!("Could not read profile {}: {err}", path.display()))?;
    PlatformProfile::from_json(&json)
        .map(Some)
        .map_err(|err| format!("Could not parse profile {}: {err}", path.display()))
}
