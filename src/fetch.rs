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


//! Fallback orchestration between direct streaming and the extraction tool
//!
//! Direct media URLs are streamed first; when that fails recoverably, the
//! presentation layer is consulted through `on_fallback` and the extraction
//! tool takes over. URLs that do not look like direct media files skip the
//! streaming attempt entirely.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::{PulseError, Result};
use crate::sanitize;
use crate::tool::ExtractionTool;
use crate::transfer::progress::TransferProgress;
use crate::transfer::stream::HttpDownloader;

/// What a fetch should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    /// Audio track only, extracted as mp3 (always via the extraction tool)
    Audio,
}

/// Per-fetch configuration.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub out_dir: PathBuf,
    pub kind: MediaKind,
}

/// Where the fetched content ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Direct streaming wrote this file
    File(PathBuf),
    /// The extraction tool populated this directory
    ToolOutput(PathBuf),
}

/// Presentation-free fetch service shared by the console front ends.
pub struct Fetcher {
    http: HttpDownloader,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: HttpDownloader::new()?,
        })
    }

    /// Fetch `raw_url` according to `options`.
    ///
    /// `on_progress` receives direct-transfer progress snapshots.
    /// `on_fallback` is consulted once when a direct transfer fails
    /// recoverably; returning `false` surfaces the error instead of
    /// invoking the extraction tool. Tool-first paths (audio requests and
    /// non-direct URLs) never consult it.
    pub async fn fetch<F, C>(
        &self,
        raw_url: &str,
        options: &FetchOptions,
        mut on_progress: F,
        on_fallback: C,
    ) -> Result<FetchOutcome>
    where
        F: FnMut(&TransferProgress) + Send,
        C: FnOnce(&PulseError) -> bool,
    {
        let url = sanitize::sanitize_url(raw_url)?;
        tokio::fs::create_dir_all(&options.out_dir).await?;

        if options.kind == MediaKind::Audio {
            let tool = ExtractionTool::locate()?;
            tool.fetch_audio(&url, &options.out_dir).await?;
            return Ok(FetchOutcome::ToolOutput(options.out_dir.clone()));
        }

        if sanitize::is_direct_media_url(&url) {
            let dest = options.out_dir.join(sanitize::derive_filename(&url));
            info!(url = %url, dest = %dest.display(), "direct media URL, streaming");
            match self.http.download(&url, &dest, &mut on_progress).await {
                Ok(path) => return Ok(FetchOutcome::File(path)),
                Err(err) if err.is_recoverable() => {
                    warn!(error = %err, "direct download failed");
                    if !on_fallback(&err) {
                        return Err(err);
                    }
                    info!("falling back to the extraction tool");
                }
                Err(err) => return Err(err),
            }
        } else {
            info!(url = %url, "not a direct media URL, using the extraction tool");
        }

        let tool = ExtractionTool::locate()?;
        tool.fetch_media(&url, &options.out_dir).await?;
        Ok(FetchOutcome::ToolOutput(options.out_dir.clone()))
    }
}
