//! Deezer API Data Transfer Objects
//!
//! These types match what the Deezer API returns.
//! DO NOT use these types outside the deezer module - convert to domain types.
//!
//! API Reference: https://developers.deezer.com/api/search
//!
//! Deezer reports errors with HTTP 200 and an `error` object in the body,
//! so every response type carries an optional [`ApiError`].

use serde::{Deserialize, Serialize};

/// `/search` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    /// Matching tracks, best first
    #[serde(default)]
    pub data: Vec<Track>,
    /// Present instead of `data` when the request failed
    pub error: Option<ApiError>,
}

/// A track in search results
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Track {
    pub id: u64,
    pub title: String,
    pub artist: Artist,
    pub album: Album,
}

/// Artist summary embedded in a track
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub id: u64,
    pub name: String,
}

/// Album summary embedded in a track
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Album {
    pub id: u64,
    pub title: String,
    /// Redirecting image endpoint (`/album/{id}/image`)
    pub cover: Option<String>,
    /// 56x56
    pub cover_small: Option<String>,
    /// 250x250
    pub cover_medium: Option<String>,
    /// 500x500
    pub cover_big: Option<String>,
    /// 1000x1000
    pub cover_xl: Option<String>,
}

/// Error object
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub message: String,
    pub code: Option<i64>,
}

/// Error code Deezer uses for "Quota limit exceeded"
pub const QUOTA_EXCEEDED: i64 = 4;

#[cfg(test)]
mod contract_tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "data": [{
                "id": 3135556,
                "readable": true,
                "title": "Harder, Better, Faster, Stronger",
                "title_short": "Harder, Better, Faster, Stronger",
                "link": "https://www.deezer.com/track/3135556",
                "duration": 224,
                "rank": 956167,
                "explicit_lyrics": false,
                "preview": "https://cdns-preview-d.dzcdn.net/stream/abc.mp3",
                "artist": {
                    "id": 27,
                    "name": "Daft Punk",
                    "link": "https://www.deezer.com/artist/27",
                    "type": "artist"
                },
                "album": {
                    "id": 302127,
                    "title": "Discovery",
                    "cover": "https://api.deezer.com/album/302127/image",
                    "cover_small": "https://e-cdns-images.dzcdn.net/images/cover/2e01/56x56-000000-80-0-0.jpg",
                    "cover_medium": "https://e-cdns-images.dzcdn.net/images/cover/2e01/250x250-000000-80-0-0.jpg",
                    "cover_big": "https://e-cdns-images.dzcdn.net/images/cover/2e01/500x500-000000-80-0-0.jpg",
                    "cover_xl": "https://e-cdns-images.dzcdn.net/images/cover/2e01/1000x1000-000000-80-0-0.jpg",
                    "type": "album"
                },
                "type": "track"
            }],
            "total": 62,
            "next": "https://api.deezer.com/search?q=daft+punk&limit=1&index=1"
        }"#;

        let response: SearchResponse =
            serde_json::from_str(json).expect("Should parse search response");

        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].artist.name, "Daft Punk");
        assert_eq!(response.data[0].album.title, "Discovery");
        assert_eq!(response.data[0].title, "Harder, Better, Faster, Stronger");
        assert!(response.error.is_none());
    }

    #[test]
    fn test_parse_empty_response() {
        let json = r#"{"data": [], "total": 0}"#;

        let response: SearchResponse =
            serde_json::from_str(json).expect("Should parse empty response");

        assert!(response.data.is_empty());
    }

    #[test]
    fn test_parse_error_response() {
        let json = r#"{
            "error": {
                "type": "Exception",
                "message": "Quota limit exceeded",
                "code": 4
            }
        }"#;

        let response: SearchResponse =
            serde_json::from_str(json).expect("Should parse error response");

        assert!(response.data.is_empty());
        let error = response.error.expect("error object");
        assert_eq!(error.code, Some(QUOTA_EXCEEDED));
        assert_eq!(error.message, "Quota limit exceeded");
    }

    #[test]
    fn test_parse_album_without_covers() {
        let json = r#"{
            "data": [{
                "id": 1,
                "title": "Song",
                "artist": {"id": 2, "name": "Artist"},
                "album": {"id": 3, "title": "Album"}
            }]
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(response.data[0].album.cover_xl.is_none());
    }
}
