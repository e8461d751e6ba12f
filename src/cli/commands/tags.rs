//! Tag writing and inspection commands.

use anyhow::Context;
use std::path::PathBuf;

use crate::metadata::{self, TagData};

/// Write title, artist, album and an optional cover to an MP3
pub fn cmd_tag(
    path: &PathBuf,
    title: &str,
    artist: &str,
    album: &str,
    cover: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let cover = match cover {
        Some(cover_path) => Some(
            std::fs::read(cover_path)
                .with_context(|| format!("Failed to read cover image {:?}", cover_path))?,
        ),
        None => None,
    };

    let data = TagData {
        title: title.to_string(),
        artist: artist.to_string(),
        album: album.to_string(),
        cover,
    };

    metadata::write_tags(path, &data)?;
    println!("✓ Tags written to {:?}", path);
    Ok(())
}

/// Print the tags of an MP3
pub fn cmd_inspect(path: &PathBuf) -> anyhow::Result<()> {
    let tags = metadata::read(path).with_context(|| format!("Failed to read {:?}", path))?;

    println!("File:     {:?}", path);
    println!("Title:    {}", tags.title.as_deref().unwrap_or("-"));
    println!("Artist:   {}", tags.artist.as_deref().unwrap_or("-"));
    println!("Album:    {}", tags.album.as_deref().unwrap_or("-"));
    println!(
        "Duration: {}:{:02}",
        tags.duration_secs / 60,
        tags.duration_secs % 60
    );
    match &tags.front_cover_mime {
        Some(mime) => println!("Cover:    {} ({} picture(s))", mime, tags.picture_count),
        None if tags.picture_count > 0 => {
            println!("Cover:    no front cover ({} other picture(s))", tags.picture_count)
        }
        None => println!("Cover:    -"),
    }
    Ok(())
}
