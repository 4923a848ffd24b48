// Pulse Downloader - resumable media downloads with extraction-tool fallback
// Copyright (C) 2025 Pulse Downloader contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Console front ends for Pulse Downloader.
//!
//! One-shot mode takes a URL from the command line and renders progress on
//! a single bar. Without a URL (and without `--no-gui`) an interactive
//! session starts: a prompt loop where each transfer runs on a dedicated
//! background thread and reports back over a channel, so the prompt side
//! only ever consumes one-way progress/completion events.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{error, info};

use pulsedl::error::PulseError;
use pulsedl::fetch::{FetchOptions, FetchOutcome, Fetcher, MediaKind};
use pulsedl::telemetry;
use pulsedl::tool::TOOL_NAME;
use pulsedl::transfer::progress::TransferProgress;

/// Append-only log shared by every run.
const LOG_FILE: &str = "downloader.log";

#[derive(Parser)]
#[command(
    name = "pulsedl",
    version,
    about = "Media downloader: direct streaming with resume, yt-dlp fallback"
)]
struct Cli {
    /// Media URL to download
    url: Option<String>,

    /// Output directory
    #[arg(short = 'o', long, default_value = ".")]
    out_dir: PathBuf,

    /// Do not launch the interactive session; a URL is then required
    #[arg(long)]
    no_gui: bool,

    /// Fall back to the extraction tool automatically when a direct
    /// download fails
    #[arg(long)]
    auto_fallback: bool,

    /// Never prompt (for automation); a failed direct download is then
    /// surfaced instead of asking about the fallback
    #[arg(long)]
    no_prompt: bool,

    /// Extract the audio track as mp3 instead of downloading the video
    #[arg(long)]
    audio: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = telemetry::init(Path::new(LOG_FILE)) {
        eprintln!("error: could not open {LOG_FILE}: {err}");
        std::process::exit(1);
    }

    if let Err(err) = run(cli) {
        match err.downcast_ref::<PulseError>() {
            Some(pulse) => error!("{}", pulse.user_message()),
            None => error!("{err:#}"),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Reminder: only download content you have permission to download.");

    match cli.url.clone() {
        Some(url) => run_once(&cli, &url),
        None if cli.no_gui => {
            let usage = Cli::command().render_usage().to_string();
            anyhow::bail!("no URL provided\n{usage}")
        }
        None => interactive_session(cli.out_dir),
    }
}

/// One-shot console run: fetch a single URL, render progress in place.
fn run_once(cli: &Cli, url: &str) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not start the async runtime")?;
    let fetcher = Fetcher::new()?;
    let options = FetchOptions {
        out_dir: cli.out_dir.clone(),
        kind: if cli.audio {
            MediaKind::Audio
        } else {
            MediaKind::Video
        },
    };

    let bar = TransferBar::new();
    let auto_fallback = cli.auto_fallback;
    let no_prompt = cli.no_prompt;

    let outcome = runtime.block_on(fetcher.fetch(
        url,
        &options,
        |progress| bar.render(progress),
        |err| {
            bar.clear();
            if auto_fallback {
                return true;
            }
            if no_prompt {
                return false;
            }
            Confirm::new()
                .with_prompt(format!(
                    "Direct download failed ({err}). Try {TOOL_NAME} instead?"
                ))
                .default(true)
                .interact()
                .unwrap_or(false)
        },
    ))?;
    bar.clear();

    report_outcome(&outcome);
    Ok(())
}

/// Interactive prompt loop. Each transfer runs on its own background
/// thread; this thread only renders the events it sends back.
fn interactive_session(default_dir: PathBuf) -> anyhow::Result<()> {
    println!(
        "Pulse Downloader v{} (interactive session)",
        env!("CARGO_PKG_VERSION")
    );
    println!("Press Enter on an empty URL to quit.");

    loop {
        let url: String = Input::new()
            .with_prompt("Media URL")
            .allow_empty(true)
            .interact_text()?;
        let url = url.trim().to_string();
        if url.is_empty() {
            break;
        }

        let kind_index = Select::new()
            .with_prompt("What to download")
            .items(&["Video", "Audio (mp3)"])
            .default(0)
            .interact()?;
        let kind = if kind_index == 1 {
            MediaKind::Audio
        } else {
            MediaKind::Video
        };

        let base: String = Input::new()
            .with_prompt("Save folder")
            .default(default_dir.display().to_string())
            .interact_text()?;
        let base = PathBuf::from(base.trim());
        let out_dir = match kind {
            MediaKind::Video => base.join("OS-Videos"),
            MediaKind::Audio => base.join("OS-Music"),
        };

        run_transfer(url, FetchOptions { out_dir, kind });
    }
    Ok(())
}

/// Events crossing from the transfer thread to the prompt thread. These
/// notifications are the only communication between the two.
enum TransferEvent {
    Progress(TransferProgress),
    Done(Result<FetchOutcome, PulseError>),
}

fn run_transfer(url: String, options: FetchOptions) {
    let (tx, rx) = mpsc::channel();
    let progress_tx = tx.clone();

    let worker = thread::spawn(move || {
        let result = (|| -> Result<FetchOutcome, PulseError> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let fetcher = Fetcher::new()?;
            runtime.block_on(fetcher.fetch(
                &url,
                &options,
                move |progress| {
                    let _ = progress_tx.send(TransferEvent::Progress(progress.clone()));
                },
                // The interactive session always falls back automatically.
                |_| true,
            ))
        })();
        let _ = tx.send(TransferEvent::Done(result));
    });

    let bar = TransferBar::new();
    for event in rx.iter() {
        match event {
            TransferEvent::Progress(progress) => bar.render(&progress),
            TransferEvent::Done(result) => {
                bar.clear();
                match result {
                    Ok(outcome) => report_outcome(&outcome),
                    Err(err) => {
                        error!("{err}");
                        println!("Failed: {}", err.user_message());
                    }
                }
                break;
            }
        }
    }
    let _ = worker.join();
}

fn report_outcome(outcome: &FetchOutcome) {
    match outcome {
        FetchOutcome::File(path) => info!("Saved: {}", path.display()),
        FetchOutcome::ToolOutput(dir) => {
            info!("Extraction tool finished; files are in {}", dir.display())
        }
    }
}

/// Progress rendering shared by both front ends: hidden until the first
/// progress event arrives, then a sized bar when the total is known or a
/// spinner when it is not.
struct TransferBar {
    bar: ProgressBar,
    started: AtomicBool,
}

impl TransferBar {
    fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            started: AtomicBool::new(false),
        }
    }

    fn render(&self, progress: &TransferProgress) {
        if !self.started.swap(true, Ordering::Relaxed) {
            match progress.total_bytes {
                Some(total) => {
                    self.bar.set_style(
                        ProgressStyle::with_template(
                            "[{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})",
                        )
                        .unwrap()
                        .progress_chars("#>-"),
                    );
                    self.bar.set_length(total);
                }
                None => {
                    self.bar.set_style(
                        ProgressStyle::with_template("{spinner} {bytes} ({bytes_per_sec})")
                            .unwrap(),
                    );
                    self.bar.enable_steady_tick(Duration::from_millis(100));
                }
            }
            self.bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        self.bar.set_position(progress.bytes_transferred);
    }

    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}
