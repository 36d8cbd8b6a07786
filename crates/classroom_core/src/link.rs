//! crates/classroom_core/src/link.rs
//!
//! Validation of pasted video links.
//!
//! `is_valid_link` is the strict check applied to the whole (trimmed) input,
//! `extract_video_id` is a looser search for the id anywhere in the string.
//! Every link the strict check accepts yields an id; the reverse does not hold,
//! so callers go through [`parse_link`], which requires both.

use crate::domain::VideoId;
use regex::Regex;
use std::sync::LazyLock;

static VALID_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com/watch\?v=|youtu\.be/)[\w-]{11}")
        .expect("link pattern is valid")
});

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/.*v=|youtu\.be/)([a-zA-Z0-9_-]{11})")
        .expect("video id pattern is valid")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Please enter a video link.")]
    Empty,
    #[error("Invalid YouTube link.")]
    Invalid,
}

pub fn is_valid_link(url: &str) -> bool {
    let trimmed = url.trim();
    // `\w` in the regex crate is Unicode-aware, the id itself is ASCII only.
    VALID_LINK
        .find(trimmed)
        .map(|m| m.as_str().is_ascii())
        .unwrap_or(false)
}

pub fn extract_video_id(url: &str) -> Option<VideoId> {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId::new(m.as_str()))
}

/// Accepts `url` only when it is a valid link *and* carries an id.
pub fn parse_link(url: &str) -> Result<VideoId, LinkError> {
    if url.trim().is_empty() {
        return Err(LinkError::Empty);
    }
    match extract_video_id(url.trim()) {
        Some(id) if is_valid_link(url) => Ok(id),
        _ => Err(LinkError::Invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCEPTED: &[&str] = &[
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "http://youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
        "www.youtube.com/watch?v=dQw4w9WgXcQ",
        "youtu.be/dQw4w9WgXcQ",
        "  https://youtu.be/a-b_c-d_e-f  ",
    ];

    #[test]
    fn accepts_watch_and_short_links() {
        for link in ACCEPTED {
            assert!(is_valid_link(link), "{link} should be valid");
        }
    }

    #[test]
    fn rejects_other_input() {
        for link in [
            "",
            "   ",
            "https://vimeo.com/123456789",
            "https://www.youtube.com/watch?v=short",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "watch this: https://youtu.be/dQw4w9WgXcQ",
        ] {
            assert!(!is_valid_link(link), "{link:?} should be invalid");
        }
    }

    #[test]
    fn every_valid_link_has_an_id() {
        for link in ACCEPTED {
            assert!(extract_video_id(link).is_some(), "{link} lost its id");
        }
    }

    #[test]
    fn extracts_the_id() {
        let id = extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn loose_extraction_is_not_enough_on_its_own() {
        let embedded = "watch this: https://youtu.be/dQw4w9WgXcQ";
        assert!(extract_video_id(embedded).is_some());
        assert_eq!(parse_link(embedded), Err(LinkError::Invalid));
    }

    #[test]
    fn parse_link_reports_empty_input() {
        assert_eq!(parse_link("  \n"), Err(LinkError::Empty));
        assert_eq!(
            parse_link(" youtu.be/dQw4w9WgXcQ ").map(|id| id.to_string()),
            Ok("dQw4w9WgXcQ".to_string())
        );
    }
}
