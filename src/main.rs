//! pointprof CLI Entry Point
//!
//! Runs a small synthetic workload under the profiler and prints the
//! resulting report, as a quick way to see what the output looks like.
//!
//! # Usage
//!
//! ```bash
//! # Default run
//! pointprof
//!
//! # Mirror every event to the log
//! pointprof --log
//!
//! # More iterations, longer pauses, JSON snapshot
//! pointprof --iterations 5 --sleep 20 --json
//! ```

use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use std::{env, io::Write};

use colored::Colorize;
use log::info;

use pointprof::profiler::global;
use pointprof::{ProfilerConfig, APP_NAME, VERSION};

/// Default number of workload iterations.
const DEFAULT_ITERATIONS: usize = 3;

/// Default pause between checkpoints in milliseconds.
const DEFAULT_SLEEP_MS: u64 = 10;

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    log_output: bool,
    disabled: bool,
    iterations: usize,
    sleep_ms: u64,
    json: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_output: false,
            disabled: false,
            iterations: DEFAULT_ITERATIONS,
            sleep_ms: DEFAULT_SLEEP_MS,
            json: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| match record.level() {
            log::Level::Warn | log::Level::Error => {
                writeln!(buf, "[{}] {}", record.level(), record.args())
            }
            _ => writeln!(buf, "{}", record.args()),
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Checkpoint Profiler");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: pointprof [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --log               Mirror checkpoints and traces to the log");
    println!("  --disabled          Run with the profiler switched off");
    println!("  --iterations N      Workload iterations (default: {})", DEFAULT_ITERATIONS);
    println!("  --sleep MS          Pause between checkpoints (default: {})", DEFAULT_SLEEP_MS);
    println!("  --json              Also print the recorded data as JSON");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Environment:");
    println!("  POINTPROF_ENABLED, POINTPROF_LOG_OUTPUT, POINTPROF_MEMORY_LIMIT");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--log" => config.log_output = true,
            "--disabled" => config.disabled = true,
            "--json" => config.json = true,
            "--verbose" | "-v" => config.verbose = true,
            "--iterations" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or("--iterations requires a number argument")?;
                config.iterations = value
                    .parse()
                    .map_err(|_| format!("Invalid iterations value: {}", value))?;
            }
            "--sleep" => {
                i += 1;
                let value = args.get(i).ok_or("--sleep requires a number argument")?;
                config.sleep_ms = value
                    .parse()
                    .map_err(|_| format!("Invalid sleep value: {}", value))?;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
        i += 1;
    }

    Ok(config)
}

/// Simulated unit of work recorded across two groups.
fn run_workload(iterations: usize, pause: Duration) {
    global::checkpoint("start");

    for i in 0..iterations {
        global::checkpoint_in(&format!("fetch #{}", i + 1), "io");
        thread::sleep(pause);

        let buffer: Vec<u64> = (0..50_000).map(|n| n * n).collect();
        global::checkpoint_in(&format!("compute #{} ({} items)", i + 1, buffer.len()), "cpu");
        thread::sleep(pause);
    }

    global::trace("workload");
    global::checkpoint("end");
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    let mut profiler_config = ProfilerConfig::from_env_or_default();
    profiler_config.log_output |= config.log_output;
    if config.disabled {
        profiler_config.enabled = false;
    }
    global::configure(&profiler_config);

    info!(
        "Running {} iterations with {} ms pauses",
        config.iterations, config.sleep_ms
    );
    run_workload(config.iterations, Duration::from_millis(config.sleep_ms));

    if !global::is_enabled() {
        info!("Profiler disabled, no report generated");
        return Ok(());
    }

    global::report(true);
    println!();

    if config.json {
        let snapshot = global::with_profiler(|p| p.snapshot());
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}
