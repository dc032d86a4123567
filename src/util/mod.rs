//! Utility functions shared by the decoders.
//!
//! - **URL resolution**: relative and protocol-relative links against a document's origin
//!
//! # Examples
//!
//! ```
//! use feedcanon::util::resolve_url;
//!
//! assert_eq!(
//!     resolve_url("/feed.xml", "https://example.com/blog/"),
//!     "https://example.com/feed.xml"
//! );
//! ```

mod url;

pub use self::url::resolve_url;
