//! RSS 1.0 (RDF Site Summary).
//!
//! Unlike RSS 2.0, items are siblings of `<channel>` under `<rdf:RDF>`, and dates come
//! from Dublin Core (`dc:date`).

use chrono::{DateTime, Utc};

use super::marshal::{resolve_content, HubLinks, MarshalOptions, Marshaller, UpdateSchedule};
use super::model::{Entry, Feed, FeedFormat, Media};
use super::xml::{parse_document, Element, ATOM_NS, CONTENT_NS, ENCLOSURE_NS, RDF_NS, RSS1_NS};
use super::{DecodeError, Decoded, DEFAULT_MAX_DEPTH};
use crate::util::resolve_url;

/// `<rdf:RDF>` document, shaped like the vocabulary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RdfFeed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub date: String,
    pub atom_links: Vec<(String, String)>,
    pub schedule: UpdateSchedule,
    pub items: Vec<RdfItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RdfItem {
    /// `rdf:about`, resolved against the document's origin URL.
    pub about: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub encoded_content: String,
    pub creator: String,
    pub date: String,
    pub enclosures: Vec<RdfEnclosure>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RdfEnclosure {
    pub url: String,
    pub length: Option<u64>,
    pub media_type: String,
}

/// Decodes an RSS 1.0 document fetched from `origin_url`.
pub fn decode(bytes: &[u8], origin_url: &str) -> Result<RdfFeed, DecodeError> {
    let root = parse_document(bytes, DEFAULT_MAX_DEPTH)?;
    RdfFeed::from_document(&root, origin_url)
}

/// RSS 1.0 core elements live in their own namespace; fall back to any namespace
/// for producers that forget to declare it.
fn core_text(element: &Element, name: &str) -> String {
    match element.child_ns(RSS1_NS, name) {
        Some(e) => e.text(),
        None => element.child_text(name),
    }
}

impl RdfFeed {
    pub fn from_document(root: &Element, origin_url: &str) -> Result<Self, DecodeError> {
        if !root.is(Some(RDF_NS), "RDF") {
            return Err(DecodeError::UnexpectedRoot {
                expected: "rdf:RDF",
                found: root.name.clone(),
            });
        }
        let channel = root
            .child("channel")
            .ok_or(DecodeError::MissingElement("channel"))?;

        let atom_links = channel
            .children_ns(ATOM_NS, "link")
            .map(|l| {
                (
                    l.attr("rel").unwrap_or_default().to_string(),
                    l.attr("href").unwrap_or_default().to_string(),
                )
            })
            .collect();

        Ok(Self {
            title: core_text(channel, "title"),
            description: core_text(channel, "description"),
            link: core_text(channel, "link"),
            date: channel.child_text("date"),
            atom_links,
            schedule: UpdateSchedule::from_element(channel),
            items: root
                .children("item")
                .map(|item| RdfItem::from_element(item, origin_url))
                .collect(),
        })
    }

    pub fn marshal(self, options: MarshalOptions) -> Decoded {
        let mut marshaller = Marshaller::new(options);
        let mut feed = Feed::empty(FeedFormat::Rss1);

        feed.updated = marshaller.feed_timestamp(&self.date);

        let mut hub = HubLinks::default();
        for (rel, href) in &self.atom_links {
            hub.observe(rel, href);
        }

        feed.title = self.title;
        feed.description = self.description;
        feed.www_url = self.link;
        feed.topic = hub.topic;
        feed.hub_url = hub.hub_url;
        feed.hourly_update_frequency = self.schedule.hourly_frequency();
        feed.entries = self
            .items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let date = item.date.clone();
                marshaller.entry(index, &date, |published| item.into_entry(published))
            })
            .collect();

        marshaller.finish(feed)
    }
}

impl RdfItem {
    fn from_element(item: &Element, origin_url: &str) -> Self {
        let about = item
            .attr_ns(RDF_NS, "about")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| resolve_url(a, origin_url))
            .unwrap_or_default();

        Self {
            about,
            title: core_text(item, "title"),
            link: core_text(item, "link"),
            description: core_text(item, "description"),
            encoded_content: item.child_text_ns(CONTENT_NS, "encoded"),
            creator: item.child_text("creator"),
            date: item.child_text("date"),
            enclosures: item
                .children_ns(ENCLOSURE_NS, "enclosure")
                .map(|e| RdfEnclosure {
                    url: e
                        .attr_ns(RDF_NS, "resource")
                        .or_else(|| e.attr_ns(ENCLOSURE_NS, "url"))
                        .unwrap_or_default()
                        .to_string(),
                    length: e
                        .attr_ns(ENCLOSURE_NS, "length")
                        .and_then(|l| l.trim().parse().ok()),
                    media_type: e.attr_ns(ENCLOSURE_NS, "type").unwrap_or_default().to_string(),
                })
                .collect(),
        }
    }

    fn into_entry(self, published: Option<DateTime<Utc>>) -> Entry {
        let guid = if self.about.is_empty() {
            self.link.clone()
        } else {
            self.about
        };
        Entry {
            content: resolve_content(&self.encoded_content, &self.description),
            guid,
            author: self.creator,
            title: self.title,
            www_url: self.link,
            published,
            media: self
                .enclosures
                .into_iter()
                .map(|e| Media {
                    url: e.url,
                    media_type: e.media_type,
                })
                .collect(),
        }
    }
}
