//! padscript - type with a game controller
//!
//! # Usage
//!
//! ```bash
//! padscript
//! padscript --calibrate
//! padscript --policy switch --deadzone 0.4
//! padscript --lock-slot 1 --config-dir ./cfg
//! ```
//!
//! While running, stdin accepts `calibrate`, `skip`, `force`, `cancel` and
//! `reset [text]`.

use chrono::Local;
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use padscript::controller::event_collector::{DevicePoller, Polling};
use padscript::gesture::ConflictPolicy;
use padscript::mapping::MappingTable;
use padscript::persistence::persistence_worker::PersistenceManager;
use padscript::persistence::store::TomlStore;
use padscript::persistence::{self, MAPPINGS_FILE};
use padscript::session::{TickOutput, TypingSession};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "padscript")]
#[command(author, version, about = "Type syllables with a dual-stick game controller")]
struct Args {
    /// Calibrate the active controller as soon as one is connected
    #[arg(long)]
    calibrate: bool,

    /// Directory holding settings.toml and mappings.toml
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Stick deadzone override (0..1)
    #[arg(long)]
    deadzone: Option<f32>,

    /// Onset conflict policy: commit, ignore or switch
    #[arg(long)]
    policy: Option<ConflictPolicy>,

    /// Only listen to the controller in this slot
    #[arg(long)]
    lock_slot: Option<usize>,
}

// Befehle von stdin während die Schleife läuft
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Calibrate,
    Skip,
    Force,
    Cancel,
    Reset(String),
}

impl Command {
    fn parse(line: &str) -> Option<Command> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        match word {
            "calibrate" => Some(Command::Calibrate),
            "skip" => Some(Command::Skip),
            "force" => Some(Command::Force),
            "cancel" => Some(Command::Cancel),
            "reset" => Some(Command::Reset(rest.to_string())),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;
    let args = Args::parse();
    debug!("Arguments: {:?}", args);

    let dir = args.config_dir.clone().unwrap_or_else(persistence::config_dir);
    if let Err(e) = persistence::ensure_default_settings(&dir).await {
        warn!("Could not write default settings: {}", e);
    }
    let mut settings = persistence::load_settings(&dir).await;
    if let Some(deadzone) = args.deadzone {
        settings.stick_deadzone = deadzone;
    }
    if let Some(policy) = args.policy {
        settings.conflict_policy = policy;
    }
    info!("Settings: {:?}", settings);

    let store = TomlStore::open(dir.join(MAPPINGS_FILE))
        .map_err(|e| eyre!("Failed to open mapping store: {}", e))?;
    let persistence = PersistenceManager::spawn(store);

    // gilrs liefert schon das Standardlayout, die eingebauten Rohlayouts
    // würden doppelt mappen
    let mut table = MappingTable::empty();
    match persistence.load_mappings().await {
        Ok(records) => table.load_records(&records),
        Err(e) => warn!("Could not load stored mappings: {}", e),
    }

    let mut session = TypingSession::new(settings, table);
    if let Some(slot) = args.lock_slot {
        session.registry_mut().lock_focus(slot);
    }

    let poller = DevicePoller::create()
        .map_err(|e| eyre!("Failed to start controller backend: {}", e))?;
    let mut poller = poller.initialize(session.registry_mut());

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            token.cancel();
        }
    });

    let commands = spawn_command_reader(cancel.clone());
    run_loop(&mut poller, &mut session, &persistence, args.calibrate, commands, cancel).await;

    info!("Final text: {:?}", session.engine().text());
    persistence.shutdown().await;
    Ok(())
}

fn spawn_command_reader(cancel: CancellationToken) -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line,
            };
            match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Some(command) => {
                        if tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    None => warn!("Unknown command: {}", line.trim()),
                },
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

async fn run_loop(
    poller: &mut DevicePoller<Polling>,
    session: &mut TypingSession,
    persistence: &PersistenceManager,
    calibrate: bool,
    mut commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
) {
    let period = Duration::from_millis(session.settings().poll_interval_ms.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Polling every {:?}", period);

    let mut pending_calibration = calibrate;
    let mut last_summary = String::new();
    let mut last_stats = Local::now();
    let stats_interval = chrono::Duration::seconds(10);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            Some(command) = commands.recv() => {
                apply_command(session, command, &mut pending_calibration);
                continue;
            }
            _ = interval.tick() => {}
        }

        poller.poll(session.registry_mut());
        if pending_calibration && session.start_calibration() {
            pending_calibration = false;
        }

        match session.tick(Local::now()) {
            TickOutput::Idle => {}
            TickOutput::Gesture(out) => {
                if !out.committed.is_empty() || out.action.is_some() {
                    info!("Text: {:?}", out.text);
                }
            }
            TickOutput::Calibrating(status) => {
                let summary = status.summary();
                if summary != last_summary {
                    info!("{}", summary);
                    last_summary = summary;
                }
            }
            TickOutput::Calibrated(record) => {
                info!("Calibrated '{}': {}", record.key, record.mapping);
                last_summary.clear();
                if let Err(e) = persistence.save_mapping(record) {
                    error!("Could not queue mapping save: {}", e);
                }
            }
        }

        let now = Local::now();
        if now - last_stats > stats_interval {
            debug!(
                "Poller stats: {} platform events, {} controllers",
                poller.event_count(),
                session.registry().len()
            );
            last_stats = now;
        }
    }
}

fn apply_command(session: &mut TypingSession, command: Command, pending_calibration: &mut bool) {
    match command {
        Command::Calibrate => {
            if !session.start_calibration() {
                info!("Calibration starts once a controller is active");
                *pending_calibration = true;
            }
        }
        Command::Skip => match session.calibration_mut() {
            Some(calibration) => calibration.skip(),
            None => warn!("No calibration running"),
        },
        Command::Force => match session.calibration_mut() {
            Some(calibration) => calibration.force_advance(),
            None => warn!("No calibration running"),
        },
        Command::Cancel => {
            *pending_calibration = false;
            session.cancel_calibration();
        }
        Command::Reset(text) => session.reset_buffer(text),
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse() {
        assert_eq!(Command::parse("skip\n"), Some(Command::Skip));
        assert_eq!(Command::parse("  force "), Some(Command::Force));
        assert_eq!(
            Command::parse("reset hello world"),
            Some(Command::Reset("hello world".to_string()))
        );
        assert_eq!(Command::parse("reset"), Some(Command::Reset(String::new())));
        assert_eq!(Command::parse("dance"), None);
    }

    #[test]
    fn policy_flag_parses() {
        let args = Args::try_parse_from(["padscript", "--policy", "ignore", "--lock-slot", "2"])
            .expect("valid args");
        assert_eq!(args.policy, Some(ConflictPolicy::Ignore));
        assert_eq!(args.lock_slot, Some(2));
        assert!(Args::try_parse_from(["padscript", "--policy", "later"]).is_err());
    }
}
