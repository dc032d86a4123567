//! RSS 2.0 (and the 0.9x dialects that share its `<rss><channel>` layout).

use super::marshal::{resolve_content, HubLinks, MarshalOptions, Marshaller, UpdateSchedule};
use super::model::{Entry, Feed, FeedFormat, Media};
use super::xml::{parse_document, Element, ATOM_NS, CONTENT_NS};
use super::{DecodeError, Decoded, DEFAULT_MAX_DEPTH};

/// `<rss>` document, shaped like the vocabulary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rss2Feed {
    pub title: String,
    pub description: String,
    pub last_build_date: String,
    pub links: Vec<Rss2Link>,
    pub schedule: UpdateSchedule,
    pub items: Vec<Rss2Item>,
}

/// A channel `<link>`: either the plain site link or an `atom:link`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rss2Link {
    pub namespace: Option<String>,
    pub rel: String,
    pub href: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rss2Item {
    pub guid: String,
    pub pub_date: String,
    pub title: String,
    pub link: String,
    pub creator: String,
    pub encoded_content: String,
    pub description: String,
    pub enclosures: Vec<Rss2Enclosure>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rss2Enclosure {
    pub url: String,
    pub length: Option<u64>,
    pub media_type: String,
}

/// Decodes an RSS 2.0 document.
///
/// # Errors
///
/// Fails when the bytes are not XML, the root is not `<rss>`, or there is no `<channel>`.
pub fn decode(bytes: &[u8]) -> Result<Rss2Feed, DecodeError> {
    let root = parse_document(bytes, DEFAULT_MAX_DEPTH)?;
    Rss2Feed::from_document(&root)
}

impl Rss2Feed {
    pub fn from_document(root: &Element) -> Result<Self, DecodeError> {
        if !root.is(None, "rss") {
            return Err(DecodeError::UnexpectedRoot {
                expected: "rss",
                found: root.name.clone(),
            });
        }
        let channel = root
            .child("channel")
            .ok_or(DecodeError::MissingElement("channel"))?;

        let links = channel
            .children("link")
            .map(|link| Rss2Link {
                namespace: link.namespace.clone(),
                rel: link.attr("rel").unwrap_or_default().to_string(),
                href: link.attr("href").unwrap_or_default().to_string(),
                content: link.text(),
            })
            .collect();

        Ok(Self {
            title: channel.child_text("title"),
            description: channel.child_text("description"),
            last_build_date: channel.child_text("lastBuildDate"),
            links,
            schedule: UpdateSchedule::from_element(channel),
            items: channel.children("item").map(Rss2Item::from_element).collect(),
        })
    }

    pub fn marshal(self, options: MarshalOptions) -> Decoded {
        let mut marshaller = Marshaller::new(options);
        let mut feed = Feed::empty(FeedFormat::Rss2);

        feed.updated = marshaller.feed_timestamp(&self.last_build_date);

        let mut hub = HubLinks::default();
        for link in &self.links {
            match link.namespace.as_deref() {
                None => feed.www_url = link.content.clone(),
                Some(ATOM_NS) => hub.observe(&link.rel, &link.href),
                Some(_) => {}
            }
        }

        feed.title = self.title;
        feed.description = self.description;
        feed.topic = hub.topic;
        feed.hub_url = hub.hub_url;
        feed.hourly_update_frequency = self.schedule.hourly_frequency();
        feed.entries = self
            .items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let published = item.pub_date.clone();
                marshaller.entry(index, &published, |published| item.into_entry(published))
            })
            .collect();

        marshaller.finish(feed)
    }
}

impl Rss2Item {
    fn from_element(item: &Element) -> Self {
        let creator = match item.child_text("creator") {
            c if c.is_empty() => item.child_text("author"),
            c => c,
        };
        Self {
            guid: item.child_text("guid"),
            pub_date: item.child_text("pubDate"),
            title: item.child_text("title"),
            link: item.child_text("link"),
            creator,
            encoded_content: item.child_text_ns(CONTENT_NS, "encoded"),
            description: item.child_text("description"),
            enclosures: item
                .children("enclosure")
                .map(|e| Rss2Enclosure {
                    url: e.attr("url").unwrap_or_default().to_string(),
                    length: e.attr("length").and_then(|l| l.trim().parse().ok()),
                    media_type: e.attr("type").unwrap_or_default().to_string(),
                })
                .collect(),
        }
    }

    fn into_entry(self, published: Option<chrono::DateTime<chrono::Utc>>) -> Entry {
        Entry {
            content: resolve_content(&self.encoded_content, &self.description),
            guid: self.guid,
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
