use anyhow::{Context, Result};
use bulkwipe::config::{RunContext, RunOptions, Settings};
use bulkwipe::drives::LinuxHost;
use bulkwipe::inventory::InventoryClient;
use bulkwipe::ui::Prompt;
use bulkwipe::wipe::{execute_job, is_root, WorkerCommand, WorkerJob, EXIT_INFRA_FAILURE};
use bulkwipe::{Orchestrator, RunOutcome};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bulkwipe")]
#[command(about = "Wipe and verify many disks at once, keeping the inventory service up to date")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Shut the machine down once every disk is done
    #[arg(short, long)]
    shutdown: bool,

    /// Only print notices, warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Go through the whole run without wiping anything; inventory items
    /// created or found are removed again at the end
    #[arg(short, long)]
    dry: bool,

    /// Also offer USB and removable disks
    #[arg(long)]
    usb: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", env = "BULKWIPE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Wipe the single disk described by the job on stdin
    #[command(hide = true)]
    Worker,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Worker) = cli.command {
        std::process::exit(run_worker(cli.debug));
    }

    #[cfg(not(feature = "color-output"))]
    colored::control::set_override(false);

    init_tracing(if cli.debug {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    });

    setup_signal_handlers()?;

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    };

    let options = RunOptions {
        quiet: cli.quiet,
        simulate: cli.dry,
        usb_allowed: cli.usb,
        shutdown: cli.shutdown,
    };

    // Check for root privileges
    if !options.simulate && settings.wipe.require_root && !is_root() {
        eprintln!("Error: This program requires root privileges.");
        eprintln!("Please run with sudo or as root user, or try a --dry run.");
        std::process::exit(1);
    }

    let ctx = RunContext::new(options, settings);
    let host = LinuxHost::new(&ctx.settings);
    let worker = WorkerCommand::current_exe().context("Cannot locate the bulkwipe executable")?;
    let mut prompt = Prompt::stdio();

    let mut orchestrator = Orchestrator::new(&ctx, &host, &mut prompt, worker);
    match orchestrator.run(InventoryClient::connect).await {
        Ok(RunOutcome::Completed(summary)) => {
            tracing::debug!(run_id = %summary.run_id, admitted = summary.admitted(), "Run completed");
            Ok(())
        }
        Ok(outcome) => {
            tracing::info!(?outcome, "Run ended early");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run aborted: {}", e);
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Worker mode: read one job, wipe one disk, exit with the state's code
fn run_worker(debug: bool) -> i32 {
    let mut payload = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut payload) {
        eprintln!("worker: cannot read job: {}", e);
        return EXIT_INFRA_FAILURE;
    }

    let job: WorkerJob = match serde_json::from_str(&payload) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("worker: malformed job: {}", e);
            return EXIT_INFRA_FAILURE;
        }
    };

    // Workers share the terminal with the coordinator's spinners
    init_tracing(if debug {
        "debug"
    } else if job.quiet {
        "error"
    } else {
        "warn"
    });

    let state = execute_job(&job, InventoryClient::connect);
    tracing::debug!(device = %job.disk.device_path, %state, "Worker done");
    state.exit_code()
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

// Signal handler: before the wipe phase an interrupt ends the run, during it
// the running wipes are left to finish
fn setup_signal_handlers() -> Result<()> {
    use signal_hook::{consts::SIGINT, iterator::Signals};

    let mut signals = Signals::new([SIGINT])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if sig != SIGINT {
                continue;
            }
            bulkwipe::set_interrupted();
            if bulkwipe::is_wipe_active() {
                eprintln!("\n\nInterrupt received! Running wipes cannot be stopped and will finish.");
                eprintln!("   The machine will not be shut down after this run.");
            } else {
                eprintln!("\n\nInterrupted.");
                std::process::exit(130);
            }
        }
    });

    Ok(())
}
