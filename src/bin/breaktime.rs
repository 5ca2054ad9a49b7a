// BreakTime daemon - drives the activity monitor and break timers
// Activity arrives on stdin from an external input hook, timer events go to stdout

use anyhow::{Context, Result};
use breaktime::constants::{
    STATE_CHECKPOINT_TICKS, TICK_INTERVAL_DEFAULT_MS, TICK_INTERVAL_MAX_MS, TICK_INTERVAL_MIN_MS,
};
use breaktime::hook_protocol::{self, HookCommand};
use breaktime::state_file::TimerStateStore;
use breaktime::time_source::SystemTimeSource;
use breaktime::utils::format_span;
use breaktime::{config, config_file::Config, BreakTimeCore};
use clap::Parser;
use log::{error, info, warn};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Break reminder core: tracks activity and reports when breaks are due
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Break reminder core: tracks activity and reports when breaks are due",
    long_about = "Break reminder core: tracks activity and reports when breaks are due.

Reads activity from an input hook on stdin, one command per line:
  input                 local mouse or keyboard event
  peer <who> <0|1>      activity report from another instance
  suspend | resume      suspend or resume monitoring
  idle                  force the monitor idle
  shift <secs>          the clock jumped by <secs> seconds
  reset <timer>         the user took the break
  snooze <timer>        postpone the next reminder

Writes one line per timer event to stdout:
  <timer> limit_reached | reset | natural_reset

SETUP:
  breaktime --setup writes the default configuration to
    ~/.config/breaktime/config.toml (Linux)
    ~/Library/Application Support/breaktime/config.toml (macOS)"
)]
struct Args {
    /// Configuration file (default: standard config location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Timer state file (default: standard data location)
    #[arg(long)]
    state: Option<PathBuf>,

    /// Write the default configuration file and exit
    #[arg(long)]
    setup: bool,

    /// Print the saved timer state and exit
    #[arg(long)]
    show_state: bool,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Tick period in milliseconds (100-10000, overrides environment)
    /// NOTE: Keep range/default values in sync with TICK_INTERVAL_* constants
    #[arg(long)]
    tick_interval_ms: Option<u64>,

    /// Display or seat identity passed to the local activity source
    #[arg(long, default_value = "default")]
    display: String,
}

fn config_path(args: &Args) -> Result<PathBuf> {
    match args.config {
        Some(ref path) => Ok(path.clone()),
        None => Config::config_path(),
    }
}

fn state_path(args: &Args) -> Result<PathBuf> {
    match args.state {
        Some(ref path) => Ok(path.clone()),
        None => TimerStateStore::state_path(),
    }
}

/// Write the default configuration
fn run_setup(args: &Args) -> Result<()> {
    let path = config_path(args)?;
    if path.exists() {
        anyhow::bail!(
            "Configuration already exists at {}. Remove it first to recreate defaults.",
            path.display()
        );
    }

    Config::default()
        .save_to_path(&path)
        .context("Failed to save configuration")?;

    println!("Configuration saved to: {}", path.display());
    println!("Edit it to adjust the breaks, then run 'breaktime'.");
    Ok(())
}

fn show_state(args: &Args) -> Result<()> {
    let path = state_path(args)?;
    let store = TimerStateStore::load_from_path(&path)?;
    if store.is_empty() {
        println!("No saved timer state at {}", path.display());
        return Ok(());
    }

    println!("Timer state (format version {}) at {}", store.version(), path.display());
    for id in store.ids() {
        println!("  {:<16} {}", id, store.record(id).unwrap_or_default());
    }
    Ok(())
}

fn tick_interval(args: &Args) -> Duration {
    let ms = match args.tick_interval_ms {
        Some(ms) if (TICK_INTERVAL_MIN_MS..=TICK_INTERVAL_MAX_MS).contains(&ms) => {
            info!("Tick interval set via --tick-interval-ms argument: {} ms", ms);
            ms
        }
        Some(ms) => {
            warn!(
                "Invalid --tick-interval-ms value: {} (must be {}-{}). Using environment or default.",
                ms, TICK_INTERVAL_MIN_MS, TICK_INTERVAL_MAX_MS
            );
            config::parse_tick_interval().unwrap_or(TICK_INTERVAL_DEFAULT_MS)
        }
        None => config::parse_tick_interval().unwrap_or(TICK_INTERVAL_DEFAULT_MS),
    };
    Duration::from_millis(ms)
}

/// Forward hook commands from stdin; the channel closes at end of input
fn spawn_stdin_reader(
    core: &BreakTimeCore,
    tx: mpsc::Sender<HookCommand>,
) -> Result<thread::JoinHandle<()>> {
    let tracker = core.tracker().cloned();
    thread::Builder::new()
        .name("hook-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        error!("Failed to read from input hook: {}", e);
                        break;
                    }
                };
                match hook_protocol::parse_line(&line) {
                    // Raw input goes straight to the tracker
                    Ok(Some(HookCommand::Input)) => match tracker {
                        Some(ref tracker) => tracker.action_notify(),
                        None => warn!("No input tracker, ignoring raw input"),
                    },
                    Ok(Some(command)) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Ignoring hook line: {:#}", e),
                }
            }
            info!("Input hook closed stdin");
        })
        .context("Failed to spawn hook reader thread")
}

fn save_state(core: &BreakTimeCore, path: &Path) {
    if let Err(e) = core.save_state().save_to_path(path) {
        error!("Failed to save timer state: {:#}", e);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    if args.setup {
        return run_setup(&args);
    }
    if args.show_state {
        return show_state(&args);
    }

    info!("Starting BreakTime");

    // Precedence: CLI arg > env var > config file > default
    let cfg_path = config_path(&args)?;
    let mut cfg = Config::load_or_default(&cfg_path).context("Failed to load configuration")?;
    if let Some(window) = config::parse_staleness_window() {
        cfg.monitor.staleness_window_secs = window;
    }
    let interval = tick_interval(&args);

    let clock = Arc::new(SystemTimeSource::new());
    let mut core = BreakTimeCore::new(&cfg, clock).context("Failed to initialize BreakTime")?;
    core.init(&args.display);

    let state_path = state_path(&args)?;
    match TimerStateStore::load_from_path(&state_path) {
        Ok(store) => {
            core.restore_state(&store);
        }
        Err(e) => warn!("Starting with fresh timers: {:#}", e),
    }

    let (tx, rx) = mpsc::channel();
    let _reader = spawn_stdin_reader(&core, tx)?;

    let stdout = io::stdout();
    let mut tick_count: u64 = 0;
    let mut next_tick = Instant::now() + interval;
    let mut hook_open = true;

    loop {
        // Apply hook commands until the next tick is due
        while hook_open {
            let remaining = next_tick.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(command) => {
                    if let Err(e) = core.apply(command) {
                        warn!("{:#}", e);
                    }
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => hook_open = false,
            }
        }
        if !hook_open && args.ticks.is_none() {
            break;
        }
        thread::sleep(next_tick.saturating_duration_since(Instant::now()));
        next_tick += interval;

        let events = core.tick();
        tick_count += 1;

        let mut out = stdout.lock();
        for event in &events {
            writeln!(out, "{} {}", event.timer_id, event.event)?;
        }
        out.flush()?;
        drop(out);

        if tick_count % STATE_CHECKPOINT_TICKS == 0 {
            for timer in core.timers() {
                info!(
                    "Timer '{}': {} active, {} idle, {} overdue",
                    timer.get_id(),
                    format_span(timer.get_elapsed_time()),
                    format_span(timer.get_elapsed_idle_time()),
                    format_span(timer.get_total_overdue_time())
                );
            }
            save_state(&core, &state_path);
        }

        if args.ticks.is_some_and(|limit| tick_count >= limit) {
            info!("Stopping after {} ticks", tick_count);
            break;
        }
    }

    save_state(&core, &state_path);
    core.shutdown();
    info!("BreakTime stopped");
    Ok(())
}
