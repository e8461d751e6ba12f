//! Test utilities and fixtures for grabtune tests.
//!
//! Real audio is never checked in; tests that need an MP3 build a silent one
//! here and write it into a `tempfile` directory.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::silent_mp3_file;
//!
//! #[test]
//! fn test_something() {
//!     let (dir, path) = silent_mp3_file("song.mp3");
//!     // ... test logic
//! }
//! ```

use std::path::PathBuf;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::catalog::CatalogTrack;
use crate::catalog::CoverRef;

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, no CRC, no padding
const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

/// 144 * 128000 / 44100, rounded down
const FRAME_LEN: usize = 417;

/// Bytes of a silent MP3 with `frames` frames and no tags.
///
/// Frame bodies are all zero, which decoders treat as silence and which is
/// enough for lofty to read MPEG properties.
pub fn silent_mp3(frames: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frames * FRAME_LEN);
    for _ in 0..frames {
        bytes.extend_from_slice(&FRAME_HEADER);
        bytes.resize(bytes.len() + FRAME_LEN - FRAME_HEADER.len(), 0);
    }
    bytes
}

/// Writes a silent MP3 named `name` into a fresh temp directory.
///
/// Keep the returned `TempDir` alive for the duration of your test.
pub fn silent_mp3_file(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let path = dir.path().join(name);
    std::fs::write(&path, silent_mp3(40)).expect("Failed to write test MP3");
    (dir, path)
}

/// Creates a mock CatalogTrack with sensible defaults.
///
/// Customize using struct update syntax:
///
/// ```ignore
/// let track = CatalogTrack {
///     album: "Other".to_string(),
///     ..mock_catalog_track()
/// };
/// ```
pub fn mock_catalog_track() -> CatalogTrack {
    CatalogTrack {
        title: "Test Track".to_string(),
        artist: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        cover: Some(CoverRef::new("https://cdn.example.com/cover.jpg")),
    }
}

/// Serves `response` verbatim to the first connection on a local port and
/// closes it. Returns the base URL, e.g. `http://127.0.0.1:40123`.
///
/// The response is raw HTTP, so tests can send a status line, headers and a
/// body that disagrees with its own Content-Length.
pub async fn serve_once(response: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        // Read the request head; GETs carry no body
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = socket.write_all(&response).await;
        let _ = socket.shutdown().await;
    });

    format!("http://{}", addr)
}

/// Raw HTTP/1.1 response with the given status line, headers and body.
/// `Connection: close` is always added.
pub fn http_response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_mp3_layout() {
        let bytes = silent_mp3(3);
        assert_eq!(bytes.len(), 3 * FRAME_LEN);
        assert_eq!(&bytes[..4], &FRAME_HEADER);
        assert_eq!(&bytes[FRAME_LEN..FRAME_LEN + 4], &FRAME_HEADER);
        assert_eq!(&bytes[2 * FRAME_LEN..2 * FRAME_LEN + 4], &FRAME_HEADER);
    }

    #[test]
    fn test_silent_mp3_file_exists() {
        let (_dir, path) = silent_mp3_file("song.mp3");
        assert!(path.exists());
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, 40 * FRAME_LEN);
    }

    #[test]
    fn test_mock_catalog_track_defaults() {
        let track = mock_catalog_track();
        assert_eq!(track.display_title(), "Test Artist - Test Track");
        assert!(track.cover.is_some());
    }

    #[test]
    fn test_http_response_layout() {
        let raw = http_response("200 OK", &[("Content-Length", "2")], b"hi");
        assert_eq!(
            raw,
            b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 2\r\n\r\nhi".to_vec()
        );
    }
}
