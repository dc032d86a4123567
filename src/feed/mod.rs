//! Feed decoding: raw bytes in, canonical [`Feed`] out.
//!
//! This module turns syndication documents into one vocabulary-independent shape:
//!
//! - **Decoding**: each vocabulary reads a parsed element tree into its own native structure
//! - **Marshalling**: native structures are canonicalized into [`Feed`] / [`Entry`] values
//! - **Dispatch**: [`FeedDecoder`] picks the vocabulary, falling back through a fixed order
//! - **Autodiscovery**: when nothing matches, HTML pages can still yield a feed link
//!
//! # Architecture
//!
//! - [`xml`] - Namespace-aware element tree built once per document
//! - [`rss2`], [`rss1`], [`atom`] - One decoder per vocabulary
//! - [`model`] - The canonical types
//! - [`discovery`] - `<link rel="alternate">` extraction from HTML
//!
//! # Example
//!
//! ```
//! use feedcanon::feed::{FeedDecoder, FeedFormat};
//!
//! let xml = br#"<rss version="2.0"><channel><title>Example</title></channel></rss>"#;
//! let decoded = FeedDecoder::default()
//!     .decode("https://example.com/feed.xml", xml)
//!     .unwrap();
//! assert_eq!(decoded.feed.format, FeedFormat::Rss2);
//! assert_eq!(decoded.feed.title, "Example");
//! ```

use std::io::Read;

use thiserror::Error;

use crate::config::DecoderConfig;

pub mod atom;
pub mod discovery;
mod marshal;
pub mod model;
pub mod rss1;
pub mod rss2;
pub mod xml;

pub use atom::AtomFeed;
pub use discovery::extract_autodiscovery_link;
pub use marshal::{Decoded, MarshalError, MarshalOptions, UpdateSchedule};
pub use model::{Entry, Feed, FeedFormat, Media};
pub use rss1::RdfFeed;
pub use rss2::Rss2Feed;

use xml::{parse_document, Element, ATOM03_NS, ATOM_NS, RDF_NS};

/// Element nesting allowed before a document is rejected.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Documents larger than this are refused before parsing.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// The bytes do not fit one vocabulary's structural expectations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("document has no root element")]
    Empty,

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("elements nested deeper than {0} levels")]
    MaxDepthExceeded(usize),

    #[error("expected root <{expected}>, found <{found}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("missing required <{0}> element")]
    MissingElement(&'static str),
}

/// Errors that leave the caller with no feed at all.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Every vocabulary was tried and none matched. This is the cue for autodiscovery.
    #[error("no recognized feed format ({})", describe_attempts(.attempts))]
    NoRecognizedFormat {
        attempts: Vec<(FeedFormat, DecodeError)>,
    },

    #[error("document is {size} bytes (max {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_attempts(attempts: &[(FeedFormat, DecodeError)]) -> String {
    attempts
        .iter()
        .map(|(format, error)| format!("{format}: {error}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A decoded document in its vocabulary's own shape.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeFeed {
    Rss2(Rss2Feed),
    Rss1(RdfFeed),
    Atom(AtomFeed),
}

impl NativeFeed {
    /// Reads `root` as the given vocabulary. `origin_url` resolves relative RDF identifiers.
    pub fn from_document(
        format: FeedFormat,
        root: &Element,
        origin_url: &str,
    ) -> Result<Self, DecodeError> {
        match format {
            FeedFormat::Rss2 => Rss2Feed::from_document(root).map(NativeFeed::Rss2),
            FeedFormat::Rss1 => RdfFeed::from_document(root, origin_url).map(NativeFeed::Rss1),
            FeedFormat::Atom => AtomFeed::from_document(root).map(NativeFeed::Atom),
        }
    }

    pub fn format(&self) -> FeedFormat {
        match self {
            NativeFeed::Rss2(_) => FeedFormat::Rss2,
            NativeFeed::Rss1(_) => FeedFormat::Rss1,
            NativeFeed::Atom(_) => FeedFormat::Atom,
        }
    }

    pub fn marshal(self, options: MarshalOptions) -> Decoded {
        match self {
            NativeFeed::Rss2(feed) => feed.marshal(options),
            NativeFeed::Rss1(feed) => feed.marshal(options),
            NativeFeed::Atom(feed) => feed.marshal(options),
        }
    }
}

/// The vocabulary a root element announces, if any.
fn sniff_root(root: &Element) -> Option<FeedFormat> {
    match (root.namespace(), root.name.as_str()) {
        (None, "rss") => Some(FeedFormat::Rss2),
        (Some(RDF_NS), "RDF") => Some(FeedFormat::Rss1),
        (Some(ATOM_NS | ATOM03_NS), "feed") => Some(FeedFormat::Atom),
        _ => None,
    }
}

/// Outcome of [`FeedDecoder::decode_or_discover`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Feed(Box<Decoded>),
    /// The document was an HTML page advertising this feed URL.
    Discovered(String),
}

/// Picks a vocabulary for each document and canonicalizes it.
#[derive(Debug, Clone, Default)]
pub struct FeedDecoder {
    config: DecoderConfig,
}

impl FeedDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes `bytes` fetched from `url`.
    ///
    /// # Errors
    ///
    /// - [`FeedError::TooLarge`] when `bytes` exceeds `max_document_bytes`
    /// - [`FeedError::NoRecognizedFormat`] when no vocabulary matches
    pub fn decode(&self, url: &str, bytes: &[u8]) -> Result<Decoded, FeedError> {
        self.decode_with_content_type(url, None, bytes)
    }

    /// Like [`decode`](Self::decode), trying the vocabulary named by a declared MIME
    /// type first. Unknown or generic types (`text/xml`) are ignored.
    pub fn decode_with_content_type(
        &self,
        url: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Decoded, FeedError> {
        let span = tracing::debug_span!("decode_feed", url = %url);
        let _enter = span.enter();

        let max = self.config.max_document_bytes;
        if bytes.len() > max {
            return Err(FeedError::TooLarge {
                size: bytes.len(),
                max,
            });
        }

        let hint = content_type.and_then(FeedFormat::from_content_type);

        let root = match parse_document(bytes, self.config.max_depth) {
            Ok(root) => root,
            Err(e) => {
                tracing::debug!(error = %e, "Document is not well-formed XML");
                let attempts = self
                    .attempt_order(hint, None)
                    .into_iter()
                    .map(|format| (format, e.clone()))
                    .collect();
                return Err(FeedError::NoRecognizedFormat { attempts });
            }
        };

        let mut attempts = Vec::new();
        for format in self.attempt_order(hint, sniff_root(&root)) {
            match NativeFeed::from_document(format, &root, url) {
                Ok(native) => {
                    let decoded = native.marshal(self.config.marshal_options());
                    tracing::debug!(
                        format = %format,
                        entries = decoded.feed.entries.len(),
                        skipped = decoded.skipped_entries,
                        "Decoded feed"
                    );
                    return Ok(decoded);
                }
                Err(e) => {
                    tracing::debug!(format = %format, error = %e, "Vocabulary did not match");
                    attempts.push((format, e));
                }
            }
        }

        Err(FeedError::NoRecognizedFormat { attempts })
    }

    /// Reads at most `max_document_bytes` from `reader`, then decodes.
    pub fn decode_reader<R: Read>(&self, url: &str, reader: R) -> Result<Decoded, FeedError> {
        let max = self.config.max_document_bytes;
        let mut bytes = Vec::new();
        // One byte past the limit is enough to know it was exceeded.
        reader
            .take((max as u64).saturating_add(1))
            .read_to_end(&mut bytes)?;
        if bytes.len() > max {
            return Err(FeedError::TooLarge {
                size: bytes.len(),
                max,
            });
        }
        self.decode(url, &bytes)
    }

    /// Decodes `bytes`, or, when they match no vocabulary, looks for an
    /// autodiscovery link in case they are an HTML page.
    ///
    /// The discovered URL is not fetched.
    pub fn decode_or_discover(&self, url: &str, bytes: &[u8]) -> Result<Resolution, FeedError> {
        match self.decode(url, bytes) {
            Ok(decoded) => Ok(Resolution::Feed(Box::new(decoded))),
            Err(FeedError::NoRecognizedFormat { attempts }) => {
                match extract_autodiscovery_link(bytes, url) {
                    Some(link) => {
                        tracing::debug!(url = %url, link = %link, "Found feed link in HTML");
                        Ok(Resolution::Discovered(link))
                    }
                    None => Err(FeedError::NoRecognizedFormat { attempts }),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Declared type, then sniffed root, then the configured order; each vocabulary once.
    fn attempt_order(
        &self,
        hint: Option<FeedFormat>,
        sniffed: Option<FeedFormat>,
    ) -> Vec<FeedFormat> {
        let mut order = Vec::with_capacity(FeedFormat::ALL.len());
        let candidates = hint
            .into_iter()
            .chain(sniffed)
            .chain(self.config.format_order.iter().copied());
        for format in candidates {
            if !order.contains(&format) {
                order.push(format);
            }
        }
        order
    }
}

/// Decodes with the default configuration.
pub fn decode(url: &str, bytes: &[u8]) -> Result<Decoded, FeedError> {
    FeedDecoder::default().decode(url, bytes)
}
