//! Adapter layer: Convert Deezer DTOs to domain models
//!
//! This is the ONLY place where Deezer DTO types are converted to domain types.

use super::dto;
use crate::catalog::domain::{CatalogError, CatalogTrack, CoverRef};

/// Convert a search response to the best-matching track, if any.
///
/// Deezer orders results by relevance, so the first entry wins.
pub fn to_catalog_track(
    response: dto::SearchResponse,
) -> Result<Option<CatalogTrack>, CatalogError> {
    if let Some(error) = response.error {
        return Err(match error.code {
            Some(dto::QUOTA_EXCEEDED) => CatalogError::RateLimited,
            _ => CatalogError::Api(error.message),
        });
    }

    Ok(response.data.into_iter().next().map(convert_track))
}

fn convert_track(track: dto::Track) -> CatalogTrack {
    let cover = best_cover(&track.album).map(CoverRef::new);

    CatalogTrack {
        title: track.title,
        artist: track.artist.name,
        album: track.album.title,
        cover,
    }
}

/// Largest available cover, falling back to the redirecting image endpoint
fn best_cover(album: &dto::Album) -> Option<String> {
    [
        &album.cover_xl,
        &album.cover_big,
        &album.cover_medium,
        &album.cover,
        &album.cover_small,
    ]
    .into_iter()
    .flatten()
    .find(|url| !url.is_empty())
    .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_track(title: &str, artist: &str, album: dto::Album) -> dto::Track {
        dto::Track {
            id: 1,
            title: title.to_string(),
            artist: dto::Artist {
                id: 2,
                name: artist.to_string(),
            },
            album,
        }
    }

    fn make_album(title: &str) -> dto::Album {
        dto::Album {
            id: 3,
            title: title.to_string(),
            cover: Some("https://api.deezer.com/album/3/image".to_string()),
            cover_small: None,
            cover_medium: Some("https://cdn/250.jpg".to_string()),
            cover_big: Some("https://cdn/500.jpg".to_string()),
            cover_xl: Some("https://cdn/1000.jpg".to_string()),
        }
    }

    fn response(data: Vec<dto::Track>) -> dto::SearchResponse {
        dto::SearchResponse {
            data,
            error: None,
        }
    }

    #[test]
    fn test_first_result_wins() {
        let resp = response(vec![
            make_track("T", "A", make_album("Al")),
            make_track("Other", "Someone", make_album("Else")),
        ]);

        let track = to_catalog_track(resp).unwrap().expect("a match");
        assert_eq!(track.title, "T");
        assert_eq!(track.artist, "A");
        assert_eq!(track.album, "Al");
        assert_eq!(track.cover, Some(CoverRef::new("https://cdn/1000.jpg")));
    }

    #[test]
    fn test_empty_result_is_none() {
        assert!(to_catalog_track(response(vec![])).unwrap().is_none());
    }

    #[test]
    fn test_cover_fallback_order() {
        let mut album = make_album("Al");
        album.cover_xl = None;
        album.cover_big = Some(String::new());
        let track = to_catalog_track(response(vec![make_track("T", "A", album)]))
            .unwrap()
            .unwrap();
        assert_eq!(track.cover, Some(CoverRef::new("https://cdn/250.jpg")));
    }

    #[test]
    fn test_no_cover_at_all() {
        let album = dto::Album {
            id: 3,
            title: "Al".to_string(),
            cover: None,
            cover_small: None,
            cover_medium: None,
            cover_big: None,
            cover_xl: None,
        };
        let track = to_catalog_track(response(vec![make_track("T", "A", album)]))
            .unwrap()
            .unwrap();
        assert!(track.cover.is_none());
    }

    #[test]
    fn test_quota_error_maps_to_rate_limited() {
        let resp = dto::SearchResponse {
            data: vec![],
            error: Some(dto::ApiError {
                error_type: Some("Exception".to_string()),
                message: "Quota limit exceeded".to_string(),
                code: Some(dto::QUOTA_EXCEEDED),
            }),
        };
        assert!(matches!(
            to_catalog_track(resp),
            Err(CatalogError::RateLimited)
        ));
    }

    #[test]
    fn test_other_error_maps_to_api() {
        let resp = dto::SearchResponse {
            data: vec![],
            error: Some(dto::ApiError {
                error_type: Some("ParameterException".to_string()),
                message: "Wrong parameter".to_string(),
                code: Some(500),
            }),
        };
        match to_catalog_track(resp) {
            Err(CatalogError::Api(msg)) => assert_eq!(msg, "Wrong parameter"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
