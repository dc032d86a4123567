//! Canonicalization helpers shared by every vocabulary's `marshal` step.
//!
//! Per-entry failures never abort a feed. The first failure is kept on the
//! [`Decoded`] result and the offending entry is left out (or kept undated, see
//! [`MarshalOptions::keep_undated_entries`]).

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::model::{Entry, Feed};
use super::xml::Element;
use crate::timestamp::{parse_timestamp, TimestampError};

const HOURS_PER_DAY: f64 = 24.0;
const DAYS_PER_WEEK: f64 = 7.0;
const DAYS_PER_MONTH: f64 = 30.42;
const DAYS_PER_YEAR: f64 = 365.25;

/// A recoverable problem found while canonicalizing a decoded document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// The feed-level date could not be parsed; `Feed::updated` is `None`.
    #[error("feed date: {0}")]
    FeedTimestamp(#[source] TimestampError),

    /// One entry could not be canonicalized. `index` is its position in the document.
    #[error("entry {index}: {source}")]
    Entry {
        index: usize,
        #[source]
        source: TimestampError,
    },
}

/// A canonical feed plus the first problem recorded while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub feed: Feed,
    /// First recorded failure, if any. The feed is still usable.
    pub error: Option<MarshalError>,
    /// Entries left out because they failed to canonicalize.
    pub skipped_entries: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarshalOptions {
    /// Keep entries whose date is unparseable (with `published: None`) instead of
    /// leaving them out. The failure is recorded either way.
    pub keep_undated_entries: bool,
}

/// Tracks the first error and skipped entries across one marshal pass.
pub(crate) struct Marshaller {
    options: MarshalOptions,
    error: Option<MarshalError>,
    skipped: usize,
}

impl Marshaller {
    pub fn new(options: MarshalOptions) -> Self {
        Self {
            options,
            error: None,
            skipped: 0,
        }
    }

    fn record(&mut self, error: MarshalError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Parses a feed-level date. Failures are recorded and yield `None`.
    pub fn feed_timestamp(&mut self, raw: &str) -> Option<DateTime<Utc>> {
        match parse_timestamp(raw) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unparseable feed date");
                self.record(MarshalError::FeedTimestamp(e));
                None
            }
        }
    }

    /// Builds one entry from its raw date and a constructor for the remaining fields.
    ///
    /// Returns `None` when the entry is left out.
    pub fn entry<F>(&mut self, index: usize, raw_published: &str, build: F) -> Option<Entry>
    where
        F: FnOnce(Option<DateTime<Utc>>) -> Entry,
    {
        match parse_timestamp(raw_published) {
            Ok(published) => Some(build(published)),
            Err(source) => {
                self.record(MarshalError::Entry {
                    index,
                    source: source.clone(),
                });
                if self.options.keep_undated_entries {
                    tracing::debug!(index, error = %source, "Keeping entry without a date");
                    Some(build(None))
                } else {
                    tracing::warn!(index, error = %source, "Skipping entry with unparseable date");
                    self.skipped += 1;
                    None
                }
            }
        }
    }

    pub fn finish(self, feed: Feed) -> Decoded {
        Decoded {
            feed,
            error: self.error,
            skipped_entries: self.skipped,
        }
    }
}

/// Rich content wins when present and non-empty; otherwise the plain field.
pub fn resolve_content(rich: &str, plain: &str) -> String {
    if rich.is_empty() {
        plain.to_string()
    } else {
        rich.to_string()
    }
}

/// Converts a syndication schedule hint into updates per hour.
///
/// Both parts must be present. An unrecognized period is read as daily. Monthly and
/// yearly use averaged calendar lengths.
pub fn hourly_update_frequency(period: &str, frequency: Option<u32>) -> Option<f64> {
    let frequency = f64::from(frequency.filter(|f| *f != 0)?);
    if period.is_empty() {
        return None;
    }

    let hours = match period.to_lowercase().as_str() {
        "hourly" => 1.0,
        "weekly" => HOURS_PER_DAY * DAYS_PER_WEEK,
        "monthly" => HOURS_PER_DAY * DAYS_PER_MONTH,
        "yearly" => HOURS_PER_DAY * DAYS_PER_YEAR,
        _ => HOURS_PER_DAY,
    };
    Some(hours / frequency)
}

/// The `updatePeriod`/`updateFrequency` pair from a channel-like element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSchedule {
    pub period: String,
    pub frequency: Option<u32>,
}

impl UpdateSchedule {
    pub fn from_element(element: &Element) -> Self {
        let raw_frequency = element.child_text("updateFrequency");
        let frequency = match raw_frequency.parse::<u32>() {
            Ok(f) => Some(f),
            Err(_) if raw_frequency.is_empty() => None,
            Err(e) => {
                tracing::debug!(value = %raw_frequency, error = %e, "Ignoring non-numeric updateFrequency");
                None
            }
        };
        Self {
            period: element.child_text("updatePeriod"),
            frequency,
        }
    }

    pub fn hourly_frequency(&self) -> Option<f64> {
        hourly_update_frequency(&self.period, self.frequency)
    }
}

/// PubSubHubbub hints gathered from link relations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubLinks {
    pub topic: String,
    pub hub_url: String,
}

impl HubLinks {
    /// Looks at one link's space-separated `rel` list. The first `self` or `hub` in the
    /// list decides; later links overwrite earlier ones.
    pub fn observe(&mut self, rel: &str, href: &str) {
        for token in rel.split_whitespace() {
            match token {
                "self" => {
                    self.topic = href.to_string();
                    break;
                }
                "hub" => {
                    self.hub_url = href.to_string();
                    break;
                }
                _ => {}
            }
        }
    }
}
