//! LyricSync - play synchronized lyrics in the terminal
//!
//! Reads stdin commands while playing: `pause`, `play`, `seek <ms>`, `quit`.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use lyricsync::features::Settings;
use lyricsync::features::lyrics::{LyricLine, LyricSource, format_timestamp};
use lyricsync::playback::{LineActivation, LyricScheduler, Timer, TokioTimer, line_event_channel};

#[derive(Debug, Parser)]
#[command(name = "lyricsync", version, about = "Play synchronized lyrics in the terminal")]
struct Args {
    /// LRC file, or a JSON lyric payload with --json
    path: PathBuf,

    /// Translation LRC file. Defaults to a sibling file with the configured suffix.
    #[arg(short, long)]
    translation: Option<PathBuf>,

    /// Treat PATH as a JSON lyric payload
    #[arg(long, conflicts_with = "translation")]
    json: bool,

    /// Start position in milliseconds
    #[arg(short, long, default_value_t = 0)]
    start: u64,

    /// Hide translated lines
    #[arg(long)]
    no_translation: bool,
}

/// Playback command read from stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pause,
    Play,
    Seek(u64),
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let command = match parts.next() {
            Some("pause" | "p") => Command::Pause,
            Some("play" | "resume" | "r") => Command::Play,
            Some("seek" | "s") => {
                let ms = parts.next().context("seek needs a position in ms")?;
                Command::Seek(ms.parse().with_context(|| format!("bad position {:?}", ms))?)
            }
            Some("quit" | "q" | "exit") => Command::Quit,
            Some(other) => bail!("unknown command {:?}", other),
            None => bail!("empty command"),
        };
        Ok(command)
    }
}

fn load_source(args: &Args, settings: &Settings) -> Result<LyricSource> {
    if args.json {
        let json = std::fs::read_to_string(&args.path)
            .with_context(|| format!("Failed to read {:?}", args.path))?;
        return LyricSource::from_json(&json);
    }
    match &args.translation {
        Some(translation) => LyricSource::from_paths(&args.path, translation),
        None => LyricSource::from_path(&args.path, &settings.lyrics.translation_suffix),
    }
}

fn render(event: &LineActivation, lines: &[LyricLine], show_translation: bool) {
    let timestamp = lines
        .get(event.line_index)
        .map(|line| format_timestamp(line.timestamp_ms))
        .unwrap_or_default();
    println!("{} {}", timestamp, event.original_text);
    if show_translation && !event.translated_text.is_empty() {
        println!("{:width$} {}", "", event.translated_text, width = timestamp.len());
    }
}

/// Nothing more will be shown without a command
fn playback_done<T: Timer>(scheduler: &LyricScheduler<T>) -> bool {
    !scheduler.is_playing() || scheduler.is_finished()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load();
    let show_translation = settings.lyrics.show_translation && !args.no_translation;

    let source = load_source(&args, &settings)?;
    let lines = source.parse();
    if lines.is_empty() {
        tracing::warn!("No synchronized lyric lines found in {:?}", args.path);
        return Ok(());
    }
    tracing::info!(
        "Loaded {} lines{}",
        lines.len(),
        if source.has_translation() { " with translation" } else { "" }
    );

    let (event_tx, mut event_rx) = line_event_channel();
    let scheduler = LyricScheduler::new(lines, TokioTimer::current(), event_tx);
    let lines = scheduler.lines().clone();

    scheduler.play(settings.lyrics.adjust(args.start));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                render(&event, &lines, show_translation);
                // With stdin open the user can still seek back
                if !stdin_open && playback_done(&scheduler) {
                    break;
                }
            }
            line = stdin.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        stdin_open = false;
                        if playback_done(&scheduler) {
                            break;
                        }
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read stdin: {}", e);
                        stdin_open = false;
                        if playback_done(&scheduler) {
                            break;
                        }
                        continue;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Pause) => scheduler.pause(),
                    Ok(Command::Play) => {
                        if !scheduler.is_playing() {
                            scheduler.play(scheduler.paused_offset().unwrap_or(0));
                        }
                    }
                    Ok(Command::Seek(ms)) => scheduler.play(settings.lyrics.adjust(ms)),
                    Ok(Command::Quit) => break,
                    Err(e) => tracing::warn!("{}", e),
                }
            }
            else => break,
        }
    }

    scheduler.stop();
    Ok(())
}
