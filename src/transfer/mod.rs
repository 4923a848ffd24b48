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


//! Streaming transfer and progress reporting
//!
//! The transfer itself lives in [`stream`]; [`progress`] holds the snapshot
//! type handed to presentation callbacks plus the trackers that compute
//! speed and throttle callback emission.

pub mod progress;
pub mod stream;

pub use progress::TransferProgress;
pub use stream::HttpDownloader;
