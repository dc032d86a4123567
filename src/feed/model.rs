use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The vocabulary a [`Feed`] was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedFormat {
    #[serde(rename = "RSS2", alias = "rss2")]
    Rss2,
    #[serde(rename = "RSS1", alias = "rss1")]
    Rss1,
    #[serde(rename = "Atom", alias = "atom")]
    Atom,
}

impl FeedFormat {
    pub const ALL: [FeedFormat; 3] = [FeedFormat::Rss2, FeedFormat::Atom, FeedFormat::Rss1];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedFormat::Rss2 => "RSS2",
            FeedFormat::Rss1 => "RSS1",
            FeedFormat::Atom => "Atom",
        }
    }

    /// Maps a declared MIME type such as `application/atom+xml; charset=utf-8`.
    pub fn from_content_type(content_type: &str) -> Option<FeedFormat> {
        let lowered = content_type.to_ascii_lowercase();
        if lowered.contains("application/rss+xml") {
            Some(FeedFormat::Rss2)
        } else if lowered.contains("application/atom+xml") {
            Some(FeedFormat::Atom)
        } else if lowered.contains("application/rdf+xml") {
            Some(FeedFormat::Rss1)
        } else {
            None
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feed in canonical, vocabulary-independent form.
///
/// Text fields are empty when the source omitted them. Timestamps are `None` both when
/// the source omitted them and when they could not be parsed; the latter case is also
/// reported through [`Decoded::error`](super::Decoded::error).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub updated: Option<DateTime<Utc>>,
    /// Human-facing website, not the feed's own URL.
    pub www_url: String,
    pub format: FeedFormat,
    /// PubSubHubbub topic (`rel="self"`).
    pub topic: String,
    /// PubSubHubbub hub (`rel="hub"`).
    pub hub_url: String,
    /// Updates per hour derived from `updatePeriod`/`updateFrequency`.
    pub hourly_update_frequency: Option<f64>,
    /// Entries in document order.
    pub entries: Vec<Entry>,
}

impl Feed {
    pub(crate) fn empty(format: FeedFormat) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            updated: None,
            www_url: String::new(),
            format,
            topic: String::new(),
            hub_url: String::new(),
            hourly_update_frequency: None,
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    /// Source identifier; may be empty; callers choose any fallback identity.
    pub guid: String,
    pub author: String,
    pub title: String,
    pub www_url: String,
    /// Rich content when present and non-empty, otherwise the plain description.
    pub content: String,
    pub published: Option<DateTime<Utc>>,
    pub media: Vec<Media>,
}

/// An enclosure or attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Media {
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: String,
}
