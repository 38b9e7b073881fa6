//! pulse-monitor CLI
//!
//! Background monitor producing periodic typing and pointer-motion
//! statistics as append-only CSV files.

use clap::{Parser, Subcommand};
use pulse_monitor::{
    capture::check_permission,
    config::{Config, SourceConfig},
    AnyMonitor, KeyboardMonitor, Monitor, PointerMonitor, StopSignal, KEYBOARD_HEADER,
    POINTER_HEADER, VERSION,
};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pulse-monitor")]
#[command(version = VERSION)]
#[command(about = "Background input-behavior monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a monitoring session
    Start {
        /// Input sources to monitor (keyboard, pointer, or all); defaults
        /// to the configured sources
        #[arg(long)]
        sources: Option<String>,

        /// Analysis period in seconds (overrides the config file)
        #[arg(long)]
        interval: Option<u64>,

        /// Directory for the result files (overrides the config file)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Print the CSV schema of the result files
    Schema,

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            sources,
            interval,
            output_dir,
        } => cmd_start(sources.as_deref(), interval, output_dir),
        Commands::Schema => cmd_schema(),
        Commands::Config => cmd_config(),
    }
}

fn cmd_start(sources: Option<&str>, interval: Option<u64>, output_dir: Option<PathBuf>) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("pulse-monitor v{VERSION}");
    println!();

    if !check_permission() {
        eprintln!("Error: input monitoring permission not granted.");
        eprintln!("Grant the permission in your system settings and restart.");
        std::process::exit(1);
    }

    let mut config = Config::load().unwrap_or_default();
    let source_config = resolve_sources(sources, &config);
    if !source_config.any_enabled() {
        eprintln!("Error: at least one source must be enabled (keyboard or pointer)");
        std::process::exit(1);
    }

    if let Some(secs) = interval {
        config.analysis_interval_secs = secs;
    }
    if let Some(dir) = output_dir {
        config.data_dir = dir;
    }
    if config.analysis_interval_secs == 0 {
        eprintln!("Error: analysis interval must be greater than zero");
        std::process::exit(1);
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: could not create data directory: {e}");
    }

    println!("Starting session...");
    println!(
        "  Keyboard: {}",
        if source_config.keyboard {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Pointer: {}",
        if source_config.pointer {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("  Analysis period: {}s", config.analysis_interval_secs);
    println!("  Data directory: {:?}", config.data_dir);
    println!();
    println!("Press ESC or Ctrl+C to stop");
    println!();

    // The caller owns the signal and shares it into every monitor; the
    // keyboard monitor's panic key sets the same flag as Ctrl+C does.
    let stop = StopSignal::new();
    ctrlc_handler(stop.clone());

    let mut monitors: Vec<AnyMonitor> = Vec::new();
    if source_config.keyboard {
        monitors.push(AnyMonitor::Keyboard(KeyboardMonitor::new(
            config.analysis_interval_secs,
            config.keyboard_output(),
            stop.clone(),
        )));
    }
    if source_config.pointer {
        monitors.push(AnyMonitor::Pointer(PointerMonitor::new(
            config.analysis_interval_secs,
            config.pointer_output(),
            stop.clone(),
        )));
    }

    let mut start_failed = false;
    for monitor in &mut monitors {
        if let Err(e) = monitor.start() {
            eprintln!("Error starting {} monitor: {e}", monitor.modality());
            start_failed = true;
            break;
        }
        println!("  {} monitor running", monitor.modality());
    }
    if start_failed {
        stop.request_stop();
        for monitor in &mut monitors {
            monitor.wait();
        }
        std::process::exit(1);
    }

    while !stop.is_stop_requested() {
        thread::sleep(Duration::from_secs(1));
    }

    println!();
    println!("Stopping session...");
    for monitor in &mut monitors {
        monitor.wait();
        println!("  {} monitor stopped", monitor.modality());
    }

    println!();
    println!("Results:");
    if source_config.keyboard {
        println!("  {:?}", config.keyboard_output());
    }
    if source_config.pointer {
        println!("  {:?}", config.pointer_output());
    }
}

fn cmd_schema() {
    println!("keyboard_performance.csv:");
    println!("  {}", KEYBOARD_HEADER.join(","));
    println!();
    println!("pointer_performance.csv:");
    println!("  {}", POINTER_HEADER.join(","));
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Map Ctrl+C to the session stop signal.
fn ctrlc_handler(stop: StopSignal) {
    ctrlc::set_handler(move || {
        stop.request_stop();
    })
    .expect("Error setting Ctrl+C handler");
}

/// The `--sources` flag wins when present; otherwise the configured sources
/// apply.
fn resolve_sources(flag: Option<&str>, config: &Config) -> SourceConfig {
    match flag {
        Some(s) => SourceConfig::from_csv(s),
        None => config.sources.clone(),
    }
}
