//! Integration tests for the decode pipeline: dispatch, canonicalization and
//! autodiscovery, driven through the public API only.

use chrono::{TimeZone, Utc};
use feedcanon::feed::{DecodeError, MarshalError};
use feedcanon::{
    decode, DecoderConfig, FeedDecoder, FeedError, FeedFormat, Resolution, TimestampError,
};
use pretty_assertions::assert_eq;

const RSS_WITH_BAD_ENTRY: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Mostly Fine</title>
    <link>https://example.com/</link>
    <item><guid>a</guid><title>A</title><pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate></item>
    <item><guid>b</guid><title>B</title><pubDate>Tue, 03 Jan 2006 10:00:00 GMT</pubDate></item>
    <item><guid>bad</guid><title>Bad</title><pubDate>sometime last week</pubDate></item>
    <item><guid>c</guid><title>C</title><pubDate>2006-01-04T08:00:00Z</pubDate></item>
  </channel>
</rss>"#;

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Site</title>
  <link href="https://example.org/"/>
  <updated>2024-03-01T12:00:00+01:00</updated>
  <entry>
    <id>tag:example.org,2024:1</id>
    <title>Entry</title>
    <updated>2024-03-01T12:00:00+01:00</updated>
  </entry>
</feed>"#;

const RDF: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns="http://purl.org/rss/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="https://example.net/">
    <title>RDF Site</title>
    <link>https://example.net/</link>
  </channel>
  <item rdf:about="https://example.net/1">
    <title>One</title>
    <link>https://example.net/1</link>
    <dc:date>2005-06-07</dc:date>
  </item>
</rdf:RDF>"#;

const HTML_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>A blog</title>
  <link rel="stylesheet" href="/style.css">
  <link rel="alternate" type="application/rss+xml" title="Feed" href="/feed.xml">
</head>
<body><p>Hello<br></p></body>
</html>"#;

#[test]
fn test_one_bad_entry_among_good_ones() {
    let decoded = decode("https://example.com/feed.xml", RSS_WITH_BAD_ENTRY.as_bytes()).unwrap();

    let guids: Vec<_> = decoded.feed.entries.iter().map(|e| e.guid.as_str()).collect();
    assert_eq!(guids, vec!["a", "b", "c"]);
    assert_eq!(decoded.skipped_entries, 1);
    assert_eq!(
        decoded.error,
        Some(MarshalError::Entry {
            index: 2,
            source: TimestampError::Unrecognized("sometime last week".to_string()),
        })
    );

    assert_eq!(
        decoded.feed.entries[0].published,
        Some(Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap())
    );
    assert_eq!(
        decoded.feed.entries[1].published,
        Some(Utc.with_ymd_and_hms(2006, 1, 3, 10, 0, 0).unwrap())
    );
}

#[test]
fn test_keep_undated_entries_from_config() {
    let decoder = FeedDecoder::new(DecoderConfig {
        keep_undated_entries: true,
        ..DecoderConfig::default()
    });
    let decoded = decoder.decode("", RSS_WITH_BAD_ENTRY.as_bytes()).unwrap();

    assert_eq!(decoded.feed.entries.len(), 4);
    assert_eq!(decoded.feed.entries[2].guid, "bad");
    assert_eq!(decoded.feed.entries[2].published, None);
    assert_eq!(decoded.skipped_entries, 0);
    assert!(decoded.error.is_some());
}

#[test]
fn test_every_format_is_tagged() {
    let cases = [
        (RSS_WITH_BAD_ENTRY, FeedFormat::Rss2, "Mostly Fine"),
        (ATOM, FeedFormat::Atom, "Atom Site"),
        (RDF, FeedFormat::Rss1, "RDF Site"),
    ];
    for (doc, format, title) in cases {
        let decoded = decode("https://example.com/", doc.as_bytes()).unwrap();
        assert_eq!(decoded.feed.format, format);
        assert_eq!(decoded.feed.title, title);
    }
}

#[test]
fn test_timestamps_are_utc() {
    let decoded = decode("", ATOM.as_bytes()).unwrap();
    let expected = Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap();
    assert_eq!(decoded.feed.updated, Some(expected));
    assert_eq!(decoded.feed.entries[0].published, Some(expected));

    let decoded = decode("", RDF.as_bytes()).unwrap();
    assert_eq!(
        decoded.feed.entries[0].published,
        Some(Utc.with_ymd_and_hms(2005, 6, 7, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_content_type_hint_is_tried_first() {
    let decoder = FeedDecoder::default();
    let decoded = decoder
        .decode_with_content_type(
            "",
            Some("application/atom+xml; charset=utf-8"),
            ATOM.as_bytes(),
        )
        .unwrap();
    assert_eq!(decoded.feed.format, FeedFormat::Atom);

    // A wrong hint costs one attempt, not the decode
    let decoded = decoder
        .decode_with_content_type("", Some("application/atom+xml"), RDF.as_bytes())
        .unwrap();
    assert_eq!(decoded.feed.format, FeedFormat::Rss1);
}

#[test]
fn test_wrong_hint_is_listed_first_when_nothing_matches() {
    let err = FeedDecoder::default()
        .decode_with_content_type("", Some("application/rdf+xml"), b"<opml/>")
        .unwrap_err();
    let FeedError::NoRecognizedFormat { attempts } = err else {
        panic!("expected NoRecognizedFormat");
    };
    assert_eq!(attempts[0].0, FeedFormat::Rss1);
    assert_eq!(attempts.len(), 3);
}

#[test]
fn test_html_page_is_not_a_feed() {
    let err = decode("https://blog.example.com/", HTML_PAGE.as_bytes()).unwrap_err();
    assert!(matches!(err, FeedError::NoRecognizedFormat { .. }));
}

#[test]
fn test_html_page_yields_discovered_link() {
    let resolution = FeedDecoder::default()
        .decode_or_discover("https://blog.example.com/post/1", HTML_PAGE.as_bytes())
        .unwrap();
    assert_eq!(
        resolution,
        Resolution::Discovered("https://blog.example.com/feed.xml".to_string())
    );
}

#[test]
fn test_feed_document_is_never_discovered() {
    // The description mentions a feed link; it must not be followed.
    let rss = r#"<rss><channel><title>T</title>
        <description>&lt;link rel="alternate" type="application/rss+xml" href="/other"&gt;</description>
        </channel></rss>"#;
    let resolution = FeedDecoder::default()
        .decode_or_discover("https://example.com/", rss.as_bytes())
        .unwrap();
    match resolution {
        Resolution::Feed(decoded) => assert_eq!(decoded.feed.title, "T"),
        Resolution::Discovered(link) => panic!("unexpected discovery of {link}"),
    }
}

#[test]
fn test_html_without_feed_link_stays_an_error() {
    let err = FeedDecoder::default()
        .decode_or_discover("https://example.com/", b"<html><head></head></html>")
        .unwrap_err();
    let FeedError::NoRecognizedFormat { attempts } = err else {
        panic!("expected NoRecognizedFormat");
    };
    assert!(attempts
        .iter()
        .all(|(_, e)| matches!(e, DecodeError::UnexpectedRoot { .. })));
}

#[test]
fn test_size_limit_applies_to_readers() {
    let decoder = FeedDecoder::new(DecoderConfig {
        max_document_bytes: 64,
        ..DecoderConfig::default()
    });
    let err = decoder
        .decode_reader("", std::io::Cursor::new(ATOM.as_bytes()))
        .unwrap_err();
    assert!(matches!(err, FeedError::TooLarge { max: 64, .. }));
}

#[test]
fn test_canonical_json_shape() {
    let decoded = decode("", RDF.as_bytes()).unwrap();
    let json = serde_json::to_value(&decoded.feed).unwrap();
    assert_eq!(json["format"], "RSS1");
    assert_eq!(json["www_url"], "https://example.net/");
    assert_eq!(json["entries"][0]["guid"], "https://example.net/1");
    assert_eq!(json["entries"][0]["published"], "2005-06-07T00:00:00Z");
}
