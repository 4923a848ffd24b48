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


//! HTTP streaming with resume support
//!
//! # Resume mechanism
//!
//! The resume offset is always the byte length of whatever partial file is
//! already on disk; there is no side-channel state. The transfer only ever
//! appends from that offset or starts fresh; it never seeks and never
//! truncates an existing partial file. Because failed transfers leave the
//! partial file intact, a later call picks up exactly where this one
//! stopped:
//!
//! 1. Send `Range: bytes=<offset>-` when a partial file exists.
//! 2. The server answers `206 Partial Content` and the remainder is
//!    appended.
//! 3. A server that ignores the `Range` header answers `200` with the full
//!    body; appending that would duplicate the prefix already on disk, so
//!    the transfer fails instead.
//!
//! The total size reported by the server is used for progress reporting
//! only; no completeness check is performed against it afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{header, Client, Response, StatusCode};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::error::{PulseError, Result};
use crate::transfer::progress::{ProgressTracker, TransferProgress};

/// Per-request socket timeout: applied to connection setup and to the wait
/// for each body chunk. A whole-transfer timeout would kill any download
/// larger than the line speed allows, so inactivity is what is bounded.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Write-buffer size for the destination file.
const CHUNK_SIZE: usize = 1024 * 1024;

/// Streams a URL to a local file, resuming partial files in place.
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Download `url` into `dest`, appending to any partial file already
    /// present.
    ///
    /// `on_progress` receives throttled [`TransferProgress`] snapshots and a
    /// final forced one. On success the destination path is returned. On any
    /// failure the partial file is left intact so a subsequent call can
    /// resume; nothing is retried here.
    pub async fn download<F>(&self, url: &str, dest: &Path, mut on_progress: F) -> Result<PathBuf>
    where
        F: FnMut(&TransferProgress) + Send,
    {
        let resume_offset = match tokio::fs::metadata(dest).await {
            Ok(metadata) => metadata.len(),
            Err(_) => 0,
        };

        let mut request = self.client.get(url);
        if resume_offset > 0 {
            request = request.header(header::RANGE, format!("bytes={resume_offset}-"));
            info!(offset = resume_offset, "resuming partial download");
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PulseError::transfer_status(
                format!("server responded with {status}"),
                status.as_u16(),
            ));
        }
        if resume_offset > 0 && status != StatusCode::PARTIAL_CONTENT {
            // 200 here means the server ignored the Range header and is
            // replaying the file from the start; appending would duplicate
            // the prefix already on disk.
            return Err(PulseError::transfer(
                "server ignored the range request; not appending a full response to a partial file",
            ));
        }

        let total_bytes = expected_total(&response, resume_offset);
        debug!(?total_bytes, offset = resume_offset, "starting transfer");

        let file = if resume_offset > 0 {
            OpenOptions::new().append(true).open(dest).await?
        } else {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(dest)
                .await?
        };
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);

        let mut tracker = ProgressTracker::new(resume_offset, total_bytes);
        let mut written = resume_offset;
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::time::timeout(REQUEST_TIMEOUT, stream.next())
                .await
                .map_err(|_| {
                    PulseError::transfer(format!(
                        "no data received for {} seconds",
                        REQUEST_TIMEOUT.as_secs()
                    ))
                })?;
            let Some(chunk) = next else { break };
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }

            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if let Some(progress) = tracker.update(written) {
                on_progress(progress);
            }
        }

        writer.flush().await?;
        on_progress(tracker.finish(written));

        info!(path = %dest.display(), bytes = written, "download complete");
        Ok(dest.to_path_buf())
    }
}

/// Expected final size of the file on disk, when the server reports one:
/// the `Content-Range` total for a partial response, otherwise
/// `Content-Length` plus the resume offset. A present but malformed
/// `Content-Range` means the size stays unknown.
fn expected_total(response: &Response, resume_offset: u64) -> Option<u64> {
    if let Some(value) = response.headers().get(header::CONTENT_RANGE) {
        return value
            .to_str()
            .ok()?
            .rsplit('/')
            .next()?
            .trim()
            .parse::<u64>()
            .ok();
    }
    response
        .content_length()
        .map(|length| length + resume_offset)
}
