use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};

use airscriber::app::{self, AppOptions, ExitReason};
use airscriber::config::Config;
use airscriber::device::{PortEnumerator, SysfsEnumerator, matching_ports};
use airscriber::session::{self, SessionInspection};

#[derive(Parser, Debug)]
#[command(name = "airscriber")]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("AIRSCRIBER_GIT_HASH"), ")"),
    about = "Draw in the air with hand gestures, recognise the handwriting and speak it"
)]
struct Cli {
    /// Read landmark frames (JSON lines) from FILE, or from stdin with '-'
    #[arg(long, short = 'r', value_name = "FILE|-")]
    replay: Option<PathBuf>,

    /// Use this configuration file instead of ~/.config/airscriber/config.toml
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not restore the last session after an unclean shutdown
    #[arg(long, action = ArgAction::SetTrue)]
    no_recover: bool,

    /// Write the composite preview (canvas, buttons, status) to this PNG
    #[arg(long, short = 'p', value_name = "PNG")]
    preview: Option<PathBuf>,

    /// Show stored session files and exit
    #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["clear_sessions", "list_devices"])]
    session_info: bool,

    /// Remove stored session files and the crash marker, then exit
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "list_devices")]
    clear_sessions: bool,

    /// List serial ports and which ones match the configured identifiers, then exit
    #[arg(long, action = ArgAction::SetTrue)]
    list_devices: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let (config, config_dir) = load_config(cli.config.as_ref())?;

    if cli.session_info {
        let options = session::options_from_config(&config.session, &config_dir)?;
        print_session_info(&session::inspect_sessions(&options)?);
        return Ok(());
    }

    if cli.clear_sessions {
        let options = session::options_from_config(&config.session, &config_dir)?;
        let outcome = session::clear_sessions(&options)?;
        println!(
            "Removed {} session file(s) from {}",
            outcome.removed_sessions,
            options.base_dir.display()
        );
        if outcome.removed_marker {
            println!("Removed crash marker");
        }
        return Ok(());
    }

    if cli.list_devices {
        list_devices(&config);
        return Ok(());
    }

    let Some(replay) = cli.replay else {
        println!("airscriber: draw in the air, recognise the handwriting and speak it");
        println!();
        println!("Usage:");
        println!("  hand-tracker | airscriber --replay -     Read landmark frames from stdin");
        println!("  airscriber --replay frames.jsonl         Replay recorded landmark frames");
        println!("  airscriber --session-info                Show stored sessions");
        println!("  airscriber --list-devices                Show serial ports");
        println!("  airscriber --help                        Show help");
        println!();
        println!("Gestures:");
        println!("  - Index finger only: draw (after selecting Dibujar)");
        println!("  - Closed fist on a button: select it");
        println!("  - Any other gesture: lift the pen");
        return Ok(());
    };

    let source = app::open_source(&replay)?;
    let summary = app::run(
        &config,
        source,
        AppOptions {
            config_dir,
            no_recover: cli.no_recover,
            preview: cli.preview,
        },
    )?;

    let reason = match summary.exit_reason {
        ExitReason::SourceEnded => "landmark source ended",
        ExitReason::ExitButton => "Salir selected",
        ExitReason::Signal => "interrupted",
    };
    println!(
        "Processed {} frames, {} strokes on canvas, {} recognition request(s) ({})",
        summary.frames, summary.strokes, summary.recognitions_requested, reason
    );
    if summary.recovered {
        println!("Canvas was recovered from the previous session");
    }
    Ok(())
}

fn load_config(explicit: Option<&PathBuf>) -> Result<(Config, PathBuf)> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            let config = Config::load_from(path)?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            Ok((config, dir))
        }
        None => {
            let config = Config::load().context("Failed to load configuration")?;
            Ok((config, Config::config_dir()?))
        }
    }
}

fn print_session_info(info: &SessionInspection) {
    println!("Session directory: {}", info.base_dir.display());
    println!("Persistence enabled: {}", info.enabled);
    println!(
        "Autosave every {}s, keeping {} file(s)",
        info.autosave_interval_secs, info.history_limit
    );
    if info.marker_present {
        println!("Previous run did not shut down cleanly");
    }

    if info.files.is_empty() {
        println!("No session files");
        return;
    }
    println!("Session files ({}):", info.files.len());
    for file in &info.files {
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match (&file.stroke_count, &file.error) {
            (Some(strokes), _) => println!(
                "  {} - {} bytes, {} strokes{}",
                name,
                file.size_bytes,
                strokes,
                if file.compressed { ", gzip" } else { "" }
            ),
            (None, Some(error)) => println!("  {} - unreadable: {}", name, error),
            (None, None) => println!("  {} - unreadable", name),
        }
    }
    if let Some(newest) = info.newest_loadable() {
        println!("Recoverable: {}", newest.path.display());
    }
}

fn list_devices(config: &Config) {
    let ports = SysfsEnumerator::default().ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    let matches = matching_ports(&ports, &config.device.identifiers);
    for port in &ports {
        let configured = config
            .device
            .port
            .as_deref()
            .is_some_and(|p| port.path.as_os_str() == p);
        let marker = if configured {
            "configured"
        } else if matches.contains(port) {
            "match"
        } else {
            ""
        };
        println!("{}\t{}\t{}", port.path.display(), port.description, marker);
    }
}
