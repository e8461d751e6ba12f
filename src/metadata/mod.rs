//! MP3 tag reading and writing.
//!
//! Uses the lofty crate for ID3v2 access.
//!
//! # Features
//! - Write title, artist, album and a front cover to a finished MP3
//! - Read tags back for inspection
//!
//! Writes never modify the target in place: the file is copied to a sibling
//! temp file, tagged there and renamed over the original, so a failed write
//! leaves the untagged MP3 intact. Writing the same tags twice gives the same
//! result as writing them once (one front cover, text frames replaced).

use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag, TagExt, TagType};
use std::io::Write;
use std::path::Path;

use crate::catalog::{CatalogApi, CatalogTrack};
use crate::error::Error;

/// Tags read back from an MP3
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_secs: u64,
    /// Number of embedded pictures of any type
    pub picture_count: usize,
    /// MIME type of the front cover, if there is one
    pub front_cover_mime: Option<String>,
}

/// What to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagData {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Front cover image bytes
    pub cover: Option<Vec<u8>>,
}

impl TagData {
    pub fn from_track(track: &CatalogTrack, cover: Option<Vec<u8>>) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            cover,
        }
    }
}

/// Image format from magic bytes
pub fn sniff_mime(data: &[u8]) -> Option<MimeType> {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => Some(MimeType::Jpeg),
        [0x89, b'P', b'N', b'G', ..] => Some(MimeType::Png),
        [b'G', b'I', b'F', b'8', ..] => Some(MimeType::Gif),
        [b'B', b'M', ..] => Some(MimeType::Bmp),
        _ => None,
    }
}

pub fn read(path: &Path) -> Result<TrackTags> {
    let tagged_file = Probe::open(path)
        .context("Failed to open file for probing")?
        .read()
        .context("Failed to read file metadata")?;

    let tag = tagged_file
        .tag(TagType::Id3v2)
        .or_else(|| tagged_file.primary_tag())
        .or_else(|| tagged_file.first_tag());

    let front_cover_mime = tag
        .and_then(|t| {
            t.pictures()
                .iter()
                .find(|p| p.pic_type() == PictureType::CoverFront)
        })
        .and_then(|p| p.mime_type())
        .map(|m| m.as_str().to_string());

    Ok(TrackTags {
        title: tag.and_then(|t| t.title().map(|s| s.to_string())),
        artist: tag.and_then(|t| t.artist().map(|s| s.to_string())),
        album: tag.and_then(|t| t.album().map(|s| s.to_string())),
        duration_secs: tagged_file.properties().duration().as_secs(),
        picture_count: tag.map(|t| t.pictures().len()).unwrap_or(0),
        front_cover_mime,
    })
}

/// Write `data` to the MP3 at `path`, atomically.
///
/// Existing title, artist and album are replaced; any existing front cover is
/// replaced by `data.cover`. Other frames the encoder wrote are kept.
pub fn write_tags(path: &Path, data: &TagData) -> crate::error::Result<()> {
    let fail = |message: String| Error::tag_write(path, message);

    let bytes = std::fs::read(path).map_err(|e| fail(format!("read failed: {}", e)))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut staged = tempfile::Builder::new()
        .prefix(".tagging-")
        .suffix(".mp3")
        .tempfile_in(dir)
        .map_err(|e| fail(format!("cannot create temp file: {}", e)))?;
    staged
        .write_all(&bytes)
        .and_then(|()| staged.flush())
        .map_err(|e| fail(format!("cannot stage copy: {}", e)))?;

    let mut tagged_file = Probe::open(staged.path())
        .and_then(|p| p.read())
        .map_err(|e| fail(format!("not a readable MP3: {}", e)))?;
    if tagged_file.file_type() != FileType::Mpeg {
        return Err(fail(format!("not an MP3 ({:?})", tagged_file.file_type())));
    }

    if tagged_file.tag(TagType::Id3v2).is_none() {
        tagged_file.insert_tag(Tag::new(TagType::Id3v2));
    }
    let tag = tagged_file
        .tag_mut(TagType::Id3v2)
        .ok_or_else(|| fail("no ID3v2 tag after insert".to_string()))?;

    tag.set_title(data.title.clone());
    tag.set_artist(data.artist.clone());
    tag.set_album(data.album.clone());

    if let Some(cover) = &data.cover {
        let mime = sniff_mime(cover);
        if mime.is_none() {
            tracing::warn!("Cover image for {:?} has an unrecognised format", path);
        }
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            mime,
            Some("Front cover".to_string()),
            cover.clone(),
        ));
    }

    tag.save_to_path(staged.path(), WriteOptions::default())
        .map_err(|e| fail(format!("tag write failed: {}", e)))?;

    // The staged file is created 0600; the result keeps the original's mode
    let permissions = std::fs::metadata(path)
        .map_err(|e| fail(format!("cannot read permissions: {}", e)))?
        .permissions();
    staged
        .as_file()
        .set_permissions(permissions)
        .map_err(|e| fail(format!("cannot set permissions: {}", e)))?;

    staged
        .persist(path)
        .map_err(|e| fail(format!("cannot replace original: {}", e.error)))?;

    tracing::debug!("Tagged {:?}", path);
    Ok(())
}

/// Fetch the cover for `track` from the catalog and write all tags to `path`.
///
/// A track without a cover gets text frames only. A cover that can't be
/// fetched fails with `CoverFetchFailed` and leaves the file untagged.
pub async fn tag_file(
    path: &Path,
    track: &CatalogTrack,
    catalog: &dyn CatalogApi,
) -> crate::error::Result<()> {
    let cover = match &track.cover {
        Some(cover_ref) => {
            let image = catalog
                .cover_image(cover_ref)
                .await
                .map_err(|e| Error::cover_fetch(format!("{}: {}", cover_ref, e)))?;
            tracing::debug!(
                "Fetched cover {} ({}, {} bytes)",
                image.url,
                image.mime_type,
                image.data.len()
            );
            Some(image.data)
        }
        None => {
            tracing::info!("No cover for {:?}, writing text tags only", track.display_title());
            None
        }
    };

    let data = TagData::from_track(track, cover);
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_tags(&target, &data))
        .await
        .map_err(|e| Error::tag_write(path, format!("tagging task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::traits::mocks::{FAKE_JPEG, MockCatalog};
    use crate::catalog::CatalogError;
    use crate::test_utils::{mock_catalog_track, silent_mp3_file};
    use tempfile::NamedTempFile;

    fn tag_data(cover: Option<&[u8]>) -> TagData {
        TagData {
            title: "T".to_string(),
            artist: "A".to_string(),
            album: "Al".to_string(),
            cover: cover.map(<[u8]>::to_vec),
        }
    }

    #[test]
    fn test_read_non_audio_file_returns_error() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "This is just some text, not music.").expect("Failed to write to temp file");

        assert!(read(file.path()).is_err());
    }

    #[test]
    fn test_read_non_existent_file_returns_error() {
        assert!(read(Path::new("non_existent_file.mp3")).is_err());
    }

    #[test]
    fn test_read_untagged_mp3() {
        let (_dir, path) = silent_mp3_file("untagged.mp3");
        let tags = read(&path).unwrap();
        assert_eq!(tags.title, None);
        assert_eq!(tags.picture_count, 0);
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, path) = silent_mp3_file("song.mp3");
        write_tags(&path, &tag_data(Some(FAKE_JPEG))).unwrap();

        let tags = read(&path).unwrap();
        assert_eq!(tags.title.as_deref(), Some("T"));
        assert_eq!(tags.artist.as_deref(), Some("A"));
        assert_eq!(tags.album.as_deref(), Some("Al"));
        assert_eq!(tags.picture_count, 1);
        assert_eq!(tags.front_cover_mime.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let (_dir, path) = silent_mp3_file("song.mp3");
        write_tags(&path, &tag_data(Some(FAKE_JPEG))).unwrap();
        let once = read(&path).unwrap();
        let size_once = std::fs::metadata(&path).unwrap().len();

        write_tags(&path, &tag_data(Some(FAKE_JPEG))).unwrap();
        let twice = read(&path).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.picture_count, 1);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), size_once);
    }

    #[test]
    fn test_text_only_when_no_cover() {
        let (_dir, path) = silent_mp3_file("song.mp3");
        write_tags(&path, &tag_data(None)).unwrap();

        let tags = read(&path).unwrap();
        assert_eq!(tags.title.as_deref(), Some("T"));
        assert_eq!(tags.picture_count, 0);
    }

    #[test]
    fn test_failed_write_leaves_original_untouched() {
        let mut file = NamedTempFile::with_suffix(".mp3").unwrap();
        file.write_all(b"definitely not mpeg audio").unwrap();
        let before = std::fs::read(file.path()).unwrap();

        let err = write_tags(file.path(), &tag_data(Some(FAKE_JPEG))).unwrap_err();
        assert!(matches!(err, Error::TagWriteFailed { .. }));
        assert_eq!(std::fs::read(file.path()).unwrap(), before);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let (dir, path) = silent_mp3_file("song.mp3");
        write_tags(&path, &tag_data(Some(FAKE_JPEG))).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["song.mp3".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_tagging_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, path) = silent_mp3_file("song.mp3");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_tags(&path, &tag_data(Some(FAKE_JPEG))).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
        assert_eq!(read(&path).unwrap().picture_count, 1);
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(FAKE_JPEG), Some(MimeType::Jpeg));
        assert_eq!(
            sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]),
            Some(MimeType::Png)
        );
        assert_eq!(sniff_mime(b"GIF89a"), Some(MimeType::Gif));
        assert_eq!(sniff_mime(b"<html>"), None);
        assert_eq!(sniff_mime(&[]), None);
    }

    #[tokio::test]
    async fn test_tag_file_with_catalog_cover() {
        let (_dir, path) = silent_mp3_file("song.mp3");
        let catalog = MockCatalog::single_match("T", "A", "Al");
        let track = catalog.track.clone().unwrap();

        tag_file(&path, &track, &catalog).await.unwrap();

        let tags = read(&path).unwrap();
        assert_eq!(tags.artist.as_deref(), Some("A"));
        assert_eq!(tags.front_cover_mime.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn test_tag_file_cover_failure_leaves_file_untagged() {
        let (_dir, path) = silent_mp3_file("song.mp3");
        let before = std::fs::read(&path).unwrap();
        let catalog = MockCatalog::no_matches()
            .failing_cover(CatalogError::InvalidImage("cover.jpg".to_string()));

        let err = tag_file(&path, &mock_catalog_track(), &catalog)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CoverFetchFailed(_)));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_tag_file_without_cover_ref() {
        let (_dir, path) = silent_mp3_file("song.mp3");
        let track = CatalogTrack {
            cover: None,
            ..mock_catalog_track()
        };

        tag_file(&path, &track, &MockCatalog::no_matches()).await.unwrap();

        let tags = read(&path).unwrap();
        assert_eq!(tags.title.as_deref(), Some("Test Track"));
        assert_eq!(tags.picture_count, 0);
    }
}
