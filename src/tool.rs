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


//! External extraction tool collaborator
//!
//! URLs that are not direct media files are handed to yt-dlp, which knows
//! how to extract media from hosting platforms. The tool is an opaque
//! collaborator: it is driven through its command line and observed only
//! through its exit status and captured output streams. Whether a given
//! URL is supported is the tool's call; a failed invocation reports it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{error, info};

use crate::error::{PulseError, Result};

/// Name of the external extraction tool binary.
pub const TOOL_NAME: &str = "yt-dlp";

/// A located extraction tool, ready to invoke.
#[derive(Debug, Clone)]
pub struct ExtractionTool {
    program: PathBuf,
}

impl ExtractionTool {
    /// Locate the tool. A `yt-dlp/` directory next to the current
    /// executable wins over PATH so that a bundled copy is preferred.
    ///
    /// Fails with [`PulseError::ToolNotFound`] before any network activity
    /// when neither location has it.
    pub fn locate() -> Result<Self> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::locate_named(TOOL_NAME, exe_dir.as_deref())
    }

    fn locate_named(name: &str, exe_dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = exe_dir {
            let bundled = dir.join(name).join(binary_name(name));
            if bundled.is_file() {
                return Ok(Self { program: bundled });
            }
        }
        which::which(name)
            .map(|program| Self { program })
            .map_err(|_| PulseError::ToolNotFound {
                tool: name.to_string(),
            })
    }

    /// Download the media behind `url` into `out_dir` using the tool's
    /// title-based output template.
    pub async fn fetch_media(&self, url: &str, out_dir: &Path) -> Result<()> {
        self.run(&media_args(url, out_dir), None).await
    }

    /// Extract the audio track behind `url` as mp3, written into `out_dir`.
    pub async fn fetch_audio(&self, url: &str, out_dir: &Path) -> Result<()> {
        self.run(&audio_args(url), Some(out_dir)).await
    }

    async fn run(&self, args: &[OsString], cwd: Option<&Path>) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        info!(program = %self.program.display(), "running extraction tool");
        let output = command.output().await.map_err(|err| {
            PulseError::ToolExecutionFailed {
                tool: TOOL_NAME.to_string(),
                code: -1,
                detail: format!("failed to start: {err}"),
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            info!("{TOOL_NAME} stdout:\n{stdout}");
        }
        if !stderr.trim().is_empty() {
            info!("{TOOL_NAME} stderr:\n{stderr}");
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let detail = stderr
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .next_back()
                .unwrap_or("unknown tool error")
                .to_string();
            error!(code, %detail, "extraction tool failed");
            return Err(PulseError::ToolExecutionFailed {
                tool: TOOL_NAME.to_string(),
                code,
                detail,
            });
        }

        info!("extraction tool finished");
        Ok(())
    }
}

fn binary_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn media_args(url: &str, out_dir: &Path) -> Vec<OsString> {
    vec![
        "-f".into(),
        "best".into(),
        "-o".into(),
        out_dir.join("%(title)s.%(ext)s").into_os_string(),
        url.into(),
    ]
}

fn audio_args(url: &str) -> Vec<OsString> {
    vec![
        "-x".into(),
        "--audio-format".into(),
        "mp3".into(),
        url.into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_invocation_uses_title_template() {
        let args = media_args("https://example.com/watch?v=1", Path::new("/tmp/out"));
        assert_eq!(args[0], "-f");
        assert_eq!(args[1], "best");
        assert_eq!(args[2], "-o");
        assert_eq!(
            args[3],
            Path::new("/tmp/out").join("%(title)s.%(ext)s").into_os_string()
        );
        assert_eq!(args[4], "https://example.com/watch?v=1");
    }

    #[test]
    fn audio_invocation_requests_mp3() {
        let args = audio_args("https://example.com/watch?v=1");
        assert_eq!(
            args,
            vec![
                OsString::from("-x"),
                OsString::from("--audio-format"),
                OsString::from("mp3"),
                OsString::from("https://example.com/watch?v=1"),
            ]
        );
    }

    #[test]
    fn bundled_copy_next_to_executable_wins() {
        let dir = tempfile::tempdir().unwrap();
        let bundled_dir = dir.path().join("fake-extractor");
        std::fs::create_dir(&bundled_dir).unwrap();
        let bundled = bundled_dir.join(binary_name("fake-extractor"));
        std::fs::write(&bundled, b"").unwrap();

        let tool = ExtractionTool::locate_named("fake-extractor", Some(dir.path())).unwrap();
        assert_eq!(tool.program, bundled);
    }

    #[test]
    fn missing_tool_is_reported_before_any_network_activity() {
        let err =
            ExtractionTool::locate_named("surely-not-installed-anywhere-zq1", None).unwrap_err();
        assert!(matches!(err, PulseError::ToolNotFound { .. }));
    }
}
