//! Atom 1.0, plus the legacy 0.3 namespace still served by some older producers.

use chrono::{DateTime, Utc};

use super::marshal::{resolve_content, HubLinks, MarshalOptions, Marshaller, UpdateSchedule};
use super::model::{Entry, Feed, FeedFormat, Media};
use super::xml::{parse_document, Element, ATOM03_NS, ATOM_NS};
use super::{DecodeError, Decoded, DEFAULT_MAX_DEPTH};
use crate::timestamp::parse_timestamp;

/// `<feed>` document, shaped like the vocabulary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomFeed {
    pub title: String,
    pub subtitle: String,
    pub updated: String,
    pub links: Vec<AtomLink>,
    pub schedule: UpdateSchedule,
    pub entries: Vec<AtomEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomLink {
    pub rel: String,
    pub href: String,
    pub media_type: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomEntry {
    pub id: String,
    pub title: String,
    pub author: String,
    pub links: Vec<AtomLink>,
    pub summary: String,
    pub content: String,
    pub published: String,
    pub updated: String,
}

pub fn decode(bytes: &[u8]) -> Result<AtomFeed, DecodeError> {
    let root = parse_document(bytes, DEFAULT_MAX_DEPTH)?;
    AtomFeed::from_document(&root)
}

/// Text of an Atom text construct. `type="xhtml"` content is markup, so it is
/// written back out rather than flattened.
fn text_construct(element: &Element) -> String {
    if element.attr("type") != Some("xhtml") {
        return element.text();
    }
    let body = element.child("div").unwrap_or(element);
    match body.inner_xml() {
        Ok(markup) => markup,
        Err(e) => {
            tracing::debug!(error = %e, "Falling back to plain text for xhtml content");
            element.text()
        }
    }
}

fn child_construct(parent: &Element, ns: &str, name: &str) -> String {
    parent
        .child_ns(ns, name)
        .map(text_construct)
        .unwrap_or_default()
}

fn links(parent: &Element, ns: &str) -> Vec<AtomLink> {
    parent
        .children_ns(ns, "link")
        .map(|l| AtomLink {
            rel: l.attr("rel").unwrap_or_default().to_string(),
            href: l.attr("href").unwrap_or_default().to_string(),
            media_type: l.attr("type").unwrap_or_default().to_string(),
        })
        .collect()
}

/// The page a link list points readers at: the first `alternate`, or the first link
/// without a `rel` (which defaults to `alternate`).
fn alternate_href(links: &[AtomLink]) -> String {
    links
        .iter()
        .find(|l| l.rel.is_empty() || l.rel.split_whitespace().any(|r| r == "alternate"))
        .map(|l| l.href.clone())
        .unwrap_or_default()
}

impl AtomFeed {
    pub fn from_document(root: &Element) -> Result<Self, DecodeError> {
        let ns = match root.namespace() {
            Some(ATOM03_NS) if root.name == "feed" => ATOM03_NS,
            _ if root.is(Some(ATOM_NS), "feed") => ATOM_NS,
            _ => {
                return Err(DecodeError::UnexpectedRoot {
                    expected: "feed",
                    found: root.name.clone(),
                })
            }
        };
        let legacy = ns == ATOM03_NS;

        let (subtitle, updated) = if legacy {
            ("tagline", "modified")
        } else {
            ("subtitle", "updated")
        };

        Ok(Self {
            title: child_construct(root, ns, "title"),
            subtitle: child_construct(root, ns, subtitle),
            updated: root.child_text_ns(ns, updated),
            links: links(root, ns),
            schedule: UpdateSchedule::from_element(root),
            entries: root
                .children_ns(ns, "entry")
                .map(|e| AtomEntry::from_element(e, ns, legacy))
                .collect(),
        })
    }

    pub fn marshal(self, options: MarshalOptions) -> Decoded {
        let mut marshaller = Marshaller::new(options);
        let mut feed = Feed::empty(FeedFormat::Atom);

        feed.updated = marshaller.feed_timestamp(&self.updated);

        let mut hub = HubLinks::default();
        for link in &self.links {
            hub.observe(&link.rel, &link.href);
        }

        feed.www_url = alternate_href(&self.links);
        feed.title = self.title;
        feed.description = self.subtitle;
        feed.topic = hub.topic;
        feed.hub_url = hub.hub_url;
        feed.hourly_update_frequency = self.schedule.hourly_frequency();
        feed.entries = self
            .entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let published = entry.date().to_string();
                marshaller.entry(index, &published, |published| entry.into_entry(published))
            })
            .collect();

        marshaller.finish(feed)
    }
}

impl AtomEntry {
    fn from_element(entry: &Element, ns: &str, legacy: bool) -> Self {
        let author = entry
            .child_ns(ns, "author")
            .map(|a| a.child_text_ns(ns, "name"))
            .unwrap_or_default();
        let (published, updated) = if legacy {
            ("issued", "modified")
        } else {
            ("published", "updated")
        };

        Self {
            id: entry.child_text_ns(ns, "id"),
            title: child_construct(entry, ns, "title"),
            author,
            links: links(entry, ns),
            summary: child_construct(entry, ns, "summary"),
            content: child_construct(entry, ns, "content"),
            published: entry.child_text_ns(ns, published),
            updated: entry.child_text_ns(ns, updated),
        }
    }

    /// The raw date to publish under: `published`, unless it is missing or unreadable
    /// and `updated` parses.
    fn date(&self) -> &str {
        if self.published.is_empty() {
            return &self.updated;
        }
        if parse_timestamp(&self.published).is_err()
            && matches!(parse_timestamp(&self.updated), Ok(Some(_)))
        {
            tracing::debug!(id = %self.id, "Unreadable published date, using updated");
            return &self.updated;
        }
        &self.published
    }

    fn into_entry(self, published: Option<DateTime<Utc>>) -> Entry {
        let media = self
            .links
            .iter()
            .filter(|l| l.rel.split_whitespace().any(|r| r == "enclosure"))
            .map(|l| Media {
                url: l.href.clone(),
                media_type: l.media_type.clone(),
            })
            .collect();

        Entry {
            content: resolve_content(&self.content, &self.summary),
            www_url: alternate_href(&self.links),
            guid: self.id,
            author: self.author,
            title: self.title,
            published,
            media,
        }
    }
}
