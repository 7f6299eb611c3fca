//! dawn CLI: load a song, play it on the default audio device or render it
//! to a WAV file.
//!
//! Usage:
//!   dawn path/to/song.dawn
//!   dawn path/to/song.sheet --wav output.wav

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use dawn_master::{Controller, DEFAULT_SAMPLE_RATE};

/// Highest accepted `--sample-rate`.
const MAX_SAMPLE_RATE: u32 = 384_000;

/// Longest render when `--max-seconds` isn't given.
const DEFAULT_MAX_WAV_SECONDS: u32 = 600;

#[derive(Parser, Debug)]
#[command(name = "dawn", version, about = "Play or render a dawn tracker song")]
struct Cli {
    /// Song file (.dawn or row sheet)
    song: PathBuf,

    /// Render to this WAV file instead of playing
    #[arg(long, value_name = "FILE")]
    wav: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long, value_name = "N")]
    max_seconds: Option<u32>,

    /// Output sample rate in Hz
    #[arg(
        long,
        value_name = "HZ",
        default_value_t = DEFAULT_SAMPLE_RATE,
        value_parser = clap::value_parser!(u32).range(1..=MAX_SAMPLE_RATE as i64)
    )]
    sample_rate: u32,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut ctrl = Controller::new();
    ctrl.load_file(&cli.song)
        .with_context(|| format!("Failed to load {}", cli.song.display()))?;
    ctrl.set_sample_rate(cli.sample_rate);

    print_summary(&ctrl);

    match &cli.wav {
        Some(path) => render_to_wav(&ctrl, path, cli.max_seconds)?,
        None => play_audio(&mut ctrl, cli.max_seconds)?,
    }

    println!("Playback finished.");
    Ok(())
}

fn print_summary(ctrl: &Controller) {
    let song = ctrl.song();
    println!(
        "Loaded '{}' BPM={} TPB={} channels={} patterns={} order={}",
        song.title,
        song.bpm,
        song.ticks_per_beat,
        song.channel_count,
        song.patterns.len(),
        song.order.len()
    );
    println!();
    print!("{}", ctrl.features());
    println!();
}

fn play_audio(ctrl: &mut Controller, max_seconds: Option<u32>) -> Result<()> {
    ctrl.play().context("Failed to start audio output")?;
    println!("Playing...");

    let started = Instant::now();
    let limit = max_seconds.map(|s| Duration::from_secs(s as u64));

    let mut timed_out = false;
    while ctrl.is_playing() {
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            tracing::info!("time limit reached, stopping");
            timed_out = true;
            break;
        }
        if let Some(pos) = ctrl.position() {
            let pattern = pos
                .pattern_id
                .map_or_else(|| "--".to_string(), |id| format!("{:02}", id));
            print!(
                "\rOrd: {:03} | Pat: {} | Tick: {:06}",
                pos.order_index, pattern, pos.tick
            );
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    if timed_out {
        ctrl.stop();
    } else {
        ctrl.wait();
    }
    println!("\r{:40}", "");
    Ok(())
}

fn render_to_wav(ctrl: &Controller, path: &Path, max_seconds: Option<u32>) -> Result<()> {
    let sample_rate = ctrl.sample_rate();
    let max_seconds = max_seconds.unwrap_or(DEFAULT_MAX_WAV_SECONDS);
    println!("Rendering to {} at {} Hz...", path.display(), sample_rate);

    let wav = ctrl.render_to_wav(sample_rate, max_seconds);
    println!("Rendered {} bytes", wav.len());

    std::fs::write(path, &wav).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
