use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use clap::{Parser, Subcommand};
use log::{info, warn};
use speed_recorder::{
    AppConfig, ExportOutcome, ReplaySampleSource, SampleSource, SessionController,
    SpeedRecorderError, export_session,
};

const PUMP_INTERVAL_MS: u64 = 50;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a session by replaying location fixes, then export it
    Record {
        /// JSON Lines file with one location fix per line
        #[arg(short, long)]
        input: PathBuf,

        /// Directory the export folder is created in
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Delay between replayed fixes
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Export without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Write the default configuration file
    InitConfig,
}

fn record(
    input: &Path,
    output: Option<PathBuf>,
    interval_ms: Option<u64>,
    yes: bool,
    interrupts: &Interrupts,
) -> Result<(), SpeedRecorderError> {
    let config = AppConfig::from_local_file()?.unwrap_or_default();
    let interval = Duration::from_millis(interval_ms.unwrap_or(config.replay_interval_ms));
    let source = ReplaySampleSource::from_file(input)?.with_interval(interval);

    // replayed fixes carry their recorded timestamps, so the session starts at the first one
    let started_at = source.next_timestamp();
    let mut controller = SessionController::new(source);
    match started_at {
        Some(started_at) => controller.start_at(started_at)?,
        None => controller.start()?,
    }

    let mut shown = 0;
    loop {
        let stop_requested = interrupts.stop_requested.load(Ordering::SeqCst);
        let finished = !controller.source().is_updating() || stop_requested;
        controller.pump();

        let session = controller.session();
        for sample in session.samples().since(shown) {
            info!("{}", session.reading_line(sample));
        }
        shown = session.samples().len();

        if finished {
            break;
        }
        thread::sleep(Duration::from_millis(PUMP_INTERVAL_MS));
    }
    controller.stop()?;

    let session = controller.session();
    info!(
        "Captured {} samples over {:.1}s",
        session.samples().len(),
        session.duration_s()
    );

    let confirm = config.confirm_export && !yes;
    if confirm && !confirm_download(interrupts)? {
        info!("Export skipped");
        return Ok(());
    }

    let destination_root = match output {
        Some(output) => output,
        None => config.export_root()?,
    };
    match export_session(session, &destination_root)? {
        ExportOutcome::Written(path) => println!("Saved {}", path.display()),
        ExportOutcome::WriteFailed => warn!("Nothing was saved"),
    }
    Ok(())
}

/// Ctrl-C state shared with the signal handler
#[derive(Default)]
struct Interrupts {
    stop_requested: AtomicBool,
    prompting: AtomicBool,
}

fn confirm_download(interrupts: &Interrupts) -> Result<bool, SpeedRecorderError> {
    interrupts.prompting.store(true, Ordering::SeqCst);
    // a Ctrl-C that stopped the recording must not count as an answer
    interrupts.stop_requested.store(false, Ordering::SeqCst);
    print!("Download data? This will save csv files to your phone. [y/N] ");
    io::stdout()
        .flush()
        .map_err(|e| SpeedRecorderError::PromptError { source: e })?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| SpeedRecorderError::PromptError { source: e })?;
    interrupts.prompting.store(false, Ordering::SeqCst);

    let interrupted = interrupts.stop_requested.load(Ordering::SeqCst);
    Ok(!interrupted && is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn init_config() -> Result<(), SpeedRecorderError> {
    let path = AppConfig::default().save()?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn main() {
    colog::init();

    let cli = Args::parse();
    let interrupts = Arc::new(Interrupts::default());
    let handler_interrupts = interrupts.clone();
    ctrlc::set_handler(move || {
        if handler_interrupts.prompting.load(Ordering::SeqCst) {
            println!("\nExport cancelled, exiting...");
            std::process::exit(0);
        }
        println!("Stopping...");
        handler_interrupts
            .stop_requested
            .store(true, Ordering::SeqCst);
    })
    .expect("Could not set Ctrl-C handler");

    match &cli.command {
        Commands::Record {
            input,
            output,
            interval_ms,
            yes,
        } => record(input, output.clone(), *interval_ms, *yes, &interrupts)
            .expect("Error while recording"),
        Commands::InitConfig => init_config().expect("Error while writing config file"),
    };
}
