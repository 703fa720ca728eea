//! Turns stored image references into absolute URLs for the widget.

use anyhow::{Context, Result};
use url::Url;

use crate::config::Settings;

#[derive(Debug, Clone)]
pub struct MediaUrls {
    base: Url,
    media_prefix: String,
}

impl MediaUrls {
    pub fn new(public_base_url: &str, media_url: &str) -> Result<Self> {
        let base = Url::parse(public_base_url).context("PUBLIC_BASE_URL must be an absolute URL")?;
        let trimmed = media_url.trim().trim_matches('/');
        let media_prefix = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        };
        Ok(Self { base, media_prefix })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.public_base_url, &settings.media_url)
    }

    /// Absolute URLs pass through; `/path` is resolved against the public
    /// base; anything else is treated as relative to the media prefix.
    pub fn resolve(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with("http://") || raw.starts_with("https://") {
            return raw.to_string();
        }

        let path = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("{}{}", self.media_prefix, raw)
        };
        self.base
            .join(&path)
            .map(String::from)
            .unwrap_or_else(|_| raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> MediaUrls {
        MediaUrls::new("http://bot.test", "/media/").unwrap()
    }

    #[test]
    fn media_relative_paths_get_prefix() {
        assert_eq!(
            urls().resolve("answers/hours.png"),
            "http://bot.test/media/answers/hours.png"
        );
        let bare = MediaUrls::new("http://bot.test/", "media").unwrap();
        assert_eq!(bare.resolve("a.png"), "http://bot.test/media/a.png");
    }

    #[test]
    fn rooted_and_absolute_urls() {
        assert_eq!(urls().resolve("/static/x.png"), "http://bot.test/static/x.png");
        assert_eq!(urls().resolve("https://cdn.example/x.png"), "https://cdn.example/x.png");
        assert_eq!(urls().resolve("  "), "");
    }

    #[test]
    fn rejects_relative_base() {
        assert!(MediaUrls::new("bot.test", "/media/").is_err());
    }
}
