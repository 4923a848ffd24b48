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


//! Error types for Pulse Downloader
//!
//! Errors are grouped by the stage that produced them:
//!
//! - [`PulseError::InvalidInput`]: malformed URL or path, rejected before
//!   any I/O happens.
//! - [`PulseError::TransferFailed`]: network, HTTP, or I/O failure during
//!   a streaming transfer. Recoverable: the orchestration layer may retry
//!   or fall back to the extraction tool.
//! - [`PulseError::ToolNotFound`] / [`PulseError::ToolExecutionFailed`]:
//!   the external extraction tool is missing or exited non-zero. Fatal for
//!   that code path.

use thiserror::Error;

/// Result type alias using [`PulseError`].
pub type Result<T> = std::result::Result<T, PulseError>;

/// Main error type for Pulse Downloader.
#[derive(Error, Debug)]
pub enum PulseError {
    /// Malformed URL or filesystem path, rejected before any I/O
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Network, HTTP, or I/O failure during a streaming transfer
    #[error("transfer failed: {message}")]
    TransferFailed {
        message: String,
        /// HTTP status code when the server answered at all
        status: Option<u16>,
    },

    /// The external extraction tool could not be located
    #[error("{tool} was not found next to the executable or on PATH")]
    ToolNotFound { tool: String },

    /// The external extraction tool ran but exited non-zero
    #[error("{tool} exited with code {code}: {detail}")]
    ToolExecutionFailed {
        tool: String,
        code: i32,
        detail: String,
    },
}

impl From<reqwest::Error> for PulseError {
    fn from(err: reqwest::Error) -> Self {
        PulseError::TransferFailed {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for PulseError {
    fn from(err: std::io::Error) -> Self {
        PulseError::TransferFailed {
            message: format!("I/O error: {err}"),
            status: None,
        }
    }
}

impl PulseError {
    /// Create an `InvalidInput` error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        PulseError::InvalidInput(message.into())
    }

    /// Create a `TransferFailed` error without an HTTP status
    pub fn transfer<S: Into<String>>(message: S) -> Self {
        PulseError::TransferFailed {
            message: message.into(),
            status: None,
        }
    }

    /// Create a `TransferFailed` error carrying the HTTP status the server
    /// answered with
    pub fn transfer_status<S: Into<String>>(message: S, status: u16) -> Self {
        PulseError::TransferFailed {
            message: message.into(),
            status: Some(status),
        }
    }

    /// True when the orchestration layer may recover by retrying or by
    /// falling back to the extraction tool.
    ///
    /// Input validation failures and tool failures are final: retrying the
    /// same input cannot change the outcome.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PulseError::TransferFailed { .. })
    }

    /// User-facing message with remediation where one exists.
    pub fn user_message(&self) -> String {
        match self {
            PulseError::ToolNotFound { tool } => format!(
                "{tool} is required for this URL but was not found. \
                 Install {tool} and make sure it is on your PATH."
            ),
            PulseError::ToolExecutionFailed { tool, code, detail } => format!(
                "{tool} failed (exit code {code}): {detail}. \
                 The full output is in the log file."
            ),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_errors_are_recoverable() {
        assert!(PulseError::transfer("connection reset").is_recoverable());
        assert!(PulseError::transfer_status("not found", 404).is_recoverable());
        assert!(!PulseError::invalid_input("bad url").is_recoverable());
        assert!(!PulseError::ToolNotFound {
            tool: "yt-dlp".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn tool_not_found_message_names_a_remedy() {
        let err = PulseError::ToolNotFound {
            tool: "yt-dlp".to_string(),
        };
        assert!(err.user_message().contains("Install yt-dlp"));
    }
}
