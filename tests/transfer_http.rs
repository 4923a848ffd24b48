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


//! HTTP transfer behavior against local fixture servers.
//!
//! Each test runs a one-connection TCP server with a canned HTTP response
//! and asserts on the bytes that end up on disk plus the request the
//! downloader actually sent.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use pulsedl::error::PulseError;
use pulsedl::transfer::progress::TransferProgress;
use pulsedl::transfer::stream::HttpDownloader;

/// Serve exactly one connection with a canned response. Returns the bound
/// address and a handle resolving to the raw request that was received.
async fn serve_once(response: Vec<u8>) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture listener");
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept connection");

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let read = socket.read(&mut buf).await.expect("read request");
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buf[..read]);
            if request.windows(4).any(|window| window == b"\r\n\r\n") {
                break;
            }
        }

        // The client may hang up before the body is written (e.g. after an
        // error status), which is fine.
        let _ = socket.write_all(&response).await;
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    (addr, handle)
}

/// Deterministic non-repeating test payload.
fn body_of(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn fresh_download_matches_content_length() {
    let body = body_of(64 * 1024);
    let response = [
        format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes(),
        body.clone(),
    ]
    .concat();
    let (addr, server) = serve_once(response).await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("video.mp4");
    let downloader = HttpDownloader::new().unwrap();

    let mut seen: Vec<TransferProgress> = Vec::new();
    let path = downloader
        .download(&format!("http://{addr}/video.mp4"), &dest, |progress| {
            seen.push(progress.clone())
        })
        .await
        .unwrap();

    assert_eq!(path, dest);
    assert_eq!(std::fs::read(&dest).unwrap(), body);

    let last = seen.last().expect("final progress snapshot");
    assert_eq!(last.bytes_transferred, body.len() as u64);
    assert_eq!(last.total_bytes, Some(body.len() as u64));

    let request = server.await.unwrap().to_lowercase();
    assert!(!request.contains("range:"));
}

#[tokio::test]
async fn resume_requests_remainder_and_appends() {
    let body = body_of(96 * 1024);
    let offset = 32 * 1024;
    let remainder = &body[offset..];
    let response = [
        format!(
            "HTTP/1.1 206 Partial Content\r\nContent-Range: bytes {}-{}/{}\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n",
            offset,
            body.len() - 1,
            body.len(),
            remainder.len()
        )
        .into_bytes(),
        remainder.to_vec(),
    ]
    .concat();
    let (addr, server) = serve_once(response).await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("video.mp4");
    std::fs::write(&dest, &body[..offset]).unwrap();

    let downloader = HttpDownloader::new().unwrap();
    let mut seen: Vec<TransferProgress> = Vec::new();
    downloader
        .download(&format!("http://{addr}/video.mp4"), &dest, |progress| {
            seen.push(progress.clone())
        })
        .await
        .unwrap();

    // The existing prefix was never re-written or duplicated.
    assert_eq!(std::fs::read(&dest).unwrap(), body);

    let last = seen.last().expect("final progress snapshot");
    assert_eq!(last.bytes_transferred, body.len() as u64);
    assert_eq!(last.total_bytes, Some(body.len() as u64));

    let request = server.await.unwrap().to_lowercase();
    assert!(
        request.contains(&format!("range: bytes={offset}-")),
        "missing range header in: {request}"
    );
}

#[tokio::test]
async fn error_status_surfaces_and_leaves_partial_intact() {
    let partial = body_of(100);
    let response =
        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec();
    let (addr, _server) = serve_once(response).await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("video.mp4");
    std::fs::write(&dest, &partial).unwrap();

    let downloader = HttpDownloader::new().unwrap();
    let err = downloader
        .download(&format!("http://{addr}/video.mp4"), &dest, |_| {})
        .await
        .unwrap_err();

    match err {
        PulseError::TransferFailed { status, .. } => assert_eq!(status, Some(404)),
        other => panic!("expected TransferFailed, got {other:?}"),
    }
    assert_eq!(std::fs::read(&dest).unwrap(), partial);
}

#[tokio::test]
async fn full_response_to_a_range_request_is_refused() {
    let body = body_of(8 * 1024);
    let offset = 512;
    let response = [
        format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes(),
        body.clone(),
    ]
    .concat();
    let (addr, server) = serve_once(response).await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("video.mp4");
    std::fs::write(&dest, &body[..offset]).unwrap();

    let downloader = HttpDownloader::new().unwrap();
    let err = downloader
        .download(&format!("http://{addr}/video.mp4"), &dest, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, PulseError::TransferFailed { .. }));
    // Nothing was appended: the partial file is exactly as it was.
    assert_eq!(std::fs::read(&dest).unwrap(), &body[..offset]);

    let request = server.await.unwrap().to_lowercase();
    assert!(request.contains(&format!("range: bytes={offset}-")));
}

#[tokio::test]
async fn unknown_length_completes_with_indeterminate_total() {
    let body = body_of(16 * 1024);
    let response = [
        b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_vec(),
        body.clone(),
    ]
    .concat();
    let (addr, _server) = serve_once(response).await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("video.mp4");

    let downloader = HttpDownloader::new().unwrap();
    let mut seen: Vec<TransferProgress> = Vec::new();
    downloader
        .download(&format!("http://{addr}/video.mp4"), &dest, |progress| {
            seen.push(progress.clone())
        })
        .await
        .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), body);
    let last = seen.last().expect("final progress snapshot");
    assert_eq!(last.total_bytes, None);
    assert_eq!(last.bytes_transferred, body.len() as u64);
}
