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


//! Pulse Downloader core library
//!
//! Downloads a remote media file either by streaming it directly over HTTP
//! (resuming any partial file already on disk) or by handing the URL to an
//! external extraction tool when it points at a hosting platform rather
//! than a file.
//!
//! The library is presentation-free: transfers report progress through an
//! explicit callback, and the fallback decision is a callback as well. The
//! console front ends live in the `pulsedl` binary.

pub mod error;
pub mod fetch;
pub mod sanitize;
pub mod telemetry;
pub mod tool;
pub mod transfer;

pub use error::{PulseError, Result};
pub use fetch::{FetchOptions, FetchOutcome, Fetcher, MediaKind};
pub use transfer::progress::TransferProgress;
