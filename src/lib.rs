//! Decodes RSS 2.0, RSS 1.0 (RDF) and Atom documents into one canonical
//! [`Feed`] shape, normalizing the many date formats found in the wild.
//!
//! ```
//! let xml = br#"<feed xmlns="http://www.w3.org/2005/Atom">
//!   <title>Example</title>
//!   <entry><id>1</id><title>Hello</title><updated>2024-01-01T00:00:00Z</updated></entry>
//! </feed>"#;
//!
//! let decoded = feedcanon::decode("https://example.com/atom.xml", xml).unwrap();
//! assert_eq!(decoded.feed.format, feedcanon::FeedFormat::Atom);
//! assert_eq!(decoded.feed.entries[0].title, "Hello");
//! ```

pub mod config;
pub mod feed;
pub mod timestamp;
pub mod util;

pub use config::{ConfigError, DecoderConfig};
pub use feed::{
    decode, extract_autodiscovery_link, DecodeError, Decoded, Entry, Feed, FeedDecoder,
    FeedError, FeedFormat, MarshalError, Media, Resolution,
};
pub use timestamp::{parse_timestamp, TimestampError};
