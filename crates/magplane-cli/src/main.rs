//! `magplane-cli` – headless runner for the magnetic-field plane.
//!
//! 1. Initialises tracing (see `magplane_runtime::telemetry`).
//! 2. Loads `~/.magplane/config.toml`, writing a default one on first run.
//! 3. Drives a session from the synthetic sensor at the configured frame
//!    rate, printing readouts (and optionally JSON frames) to stdout.
//! 4. Stops cleanly on Ctrl-C or after `max_frames`.

mod config;
mod terminal;

use std::sync::Arc;

use colored::Colorize;
use magplane_middleware::{IntervalClock, SampleSource, SimSource};
use magplane_runtime::{FrameSink, NullSink, Runner, Session, init_tracing};
use tracing::warn;

use crate::terminal::{JsonFrameWriter, ReadoutPrinter};

fn main() {
    let _telemetry = init_tracing("magplane");

    print_banner();

    let (cfg, origin) = config::load();
    match origin {
        config::Origin::File => println!(
            "  Config loaded from {}",
            config::config_path().display().to_string().bold()
        ),
        config::Origin::Missing => match config::save(&config::Config::default()) {
            Ok(()) => println!(
                "  {} Default config written to {}",
                "✓".green().bold(),
                config::config_path().display().to_string().bold()
            ),
            Err(e) => println!("{}: {}", "Error saving config".red(), e),
        },
        config::Origin::Invalid(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
        }
    }

    let session = match Session::new(cfg.session.clone()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", "Invalid configuration".red().bold(), e);
            std::process::exit(2);
        }
    };
    let source = match SimSource::new(cfg.sim.clone()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", "Invalid simulator settings".red().bold(), e);
            std::process::exit(2);
        }
    };
    let clock = match IntervalClock::new(cfg.fps) {
        Ok(c) => match cfg.max_frames {
            Some(n) => c.with_limit(n),
            None => c,
        },
        Err(e) => {
            eprintln!("{}: {}", "Invalid frame rate".red().bold(), e);
            std::process::exit(2);
        }
    };

    println!(
        "  Session {}  ·  {} fps  ·  warmup {} samples",
        session.id().to_string().dimmed(),
        cfg.fps,
        cfg.session.filter.warmup_samples
    );
    println!("  Press {} to stop.\n", "Ctrl-C".bold());

    let source: Arc<dyn SampleSource> = Arc::new(source);
    let frames: Box<dyn FrameSink> = if cfg.dump_frames {
        Box::new(JsonFrameWriter::new(std::io::stdout()))
    } else {
        Box::new(NullSink)
    };
    let (runner, handle) = Runner::new(session, source, Box::new(clock));
    let runner = runner
        .with_frame_sink(frames)
        .with_text_sink(Box::new(ReadoutPrinter::new(cfg.readout_every)));

    let ctrlc_handle = handle.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping …".yellow().bold());
        ctrlc_handle.stop();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; stop with SIGKILL or max_frames");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red().bold(), e);
            std::process::exit(1);
        }
    };

    let started = chrono::Utc::now();
    let session = runtime.block_on(runner.run());
    let elapsed = chrono::Utc::now() - started;

    println!();
    println!(
        "  {} {} frames, {} samples in {:.1}s",
        "✓".green().bold(),
        session.tick_count(),
        session.sample_count(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    println!("  Last reading: {}", session.readout());
}

fn print_banner() {
    println!();
    println!("{}", r#"   __ _  __ _  __ _ _ __ | | __ _ _ __   ___ "#.bold().cyan());
    println!("{}", r#"  |  ' \/ _` |/ _` | '_ \| |/ _` | '_ \ / -_)"#.bold().cyan());
    println!("{}", r#"  |_|_|_\__,_|\__, | .__/|_|\__,_|_| |_|\___|"#.bold().cyan());
    println!("{}", r#"              |___/|_|                      "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "magplane".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Magnetic field visualiser");
    println!();
}
