//! Monitor identity: names and tag sets
//!
//! [`MonitorConfig`] is the canonical key for a dynamically created monitor.
//! Tags are kept ordered by key, so two configs built from the same tags in a
//! different order are equal and hash identically.
//!
//! ```
//! use dynmon::tag::{MonitorConfig, TagList};
//!
//! let a = MonitorConfig::builder("requests").tag("region", "eu").tag("code", "200").build()?;
//! let b = MonitorConfig::builder("requests").tag("code", "200").tag("region", "eu").build()?;
//! assert_eq!(a, b);
//! assert_eq!(a.to_string(), "requests{code=200,region=eu}");
//!
//! let tags = TagList::from_pairs(&["code", "200", "region", "eu"]).unwrap();
//! assert_eq!(MonitorConfig::with_tags("requests", tags)?, a);
//! # Ok::<(), dynmon::MonitorError>(())
//! ```

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// Tag key used to classify a monitor (`RATE`, `TIMER`, ...)
pub const TYPE_TAG: &str = "type";
/// Tag key naming the statistic a timer sub-monitor reports
pub const STATISTIC_TAG: &str = "statistic";
/// Tag key naming the time unit of a timer
pub const UNIT_TAG: &str = "unit";

/// A single key/value tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    /// Create a new tag
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    /// Tag key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Tag value
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Ordered set of tags, unique by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagList {
    tags: BTreeMap<String, String>,
}

impl TagList {
    /// Create an empty tag list
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tag list from flattened `key, value, key, value, ...` strings.
    ///
    /// Returns `None` when the slice has an odd length. Empty keys and values
    /// are accepted as-is.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Option<Self> {
        if pairs.len() % 2 != 0 {
            return None;
        }
        Some(
            pairs
                .chunks_exact(2)
                .map(|pair| (pair[0].as_ref().to_owned(), pair[1].as_ref().to_owned()))
                .collect(),
        )
    }

    /// Insert a tag, replacing any existing value for the same key
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.tags.insert(key.into(), value.into());
    }

    /// Return a copy of this list with an extra tag
    #[must_use]
    pub fn with<K: Into<String>, V: Into<String>>(&self, key: K, value: V) -> Self {
        let mut tags = self.clone();
        tags.insert(key, value);
        tags
    }

    /// Look up a tag value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Look up a tag by key
    pub fn tag(&self, key: &str) -> Option<Tag> {
        self.tags.get_key_value(key).map(|(k, v)| Tag::new(k.clone(), v.clone()))
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the list has no tags
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate tags in key order
    pub fn iter(&self) -> Iter<'_> {
        Iter { inner: self.tags.iter() }
    }
}

/// Iterator over `(key, value)` pairs of a [`TagList`]
#[derive(Debug)]
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, String, String>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> IntoIterator for &'a TagList {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { tags: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl FromIterator<Tag> for TagList {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        iter.into_iter().map(|tag| (tag.key, tag.value)).collect()
    }
}

impl From<Vec<Tag>> for TagList {
    fn from(tags: Vec<Tag>) -> Self {
        tags.into_iter().collect()
    }
}

impl fmt::Display for TagList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Identity of a monitor: a non-empty name plus a tag set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MonitorConfig {
    name: String,
    tags: TagList,
}

impl MonitorConfig {
    /// Create a new configuration builder
    pub fn builder<S: Into<String>>(name: S) -> MonitorConfigBuilder {
        MonitorConfigBuilder { name: name.into(), tags: TagList::new() }
    }

    /// Create a configuration with no tags
    pub fn new<S: Into<String>>(name: S) -> MonitorResult<Self> {
        Self::builder(name).build()
    }

    /// Create a configuration from a name and an existing tag list
    pub fn with_tags<S: Into<String>>(name: S, tags: TagList) -> MonitorResult<Self> {
        MonitorConfigBuilder { name: name.into(), tags }.build()
    }

    /// Monitor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Monitor tags
    pub fn tags(&self) -> &TagList {
        &self.tags
    }

    /// Return a copy of this configuration with an extra tag
    #[must_use]
    pub fn with_tag<K: Into<String>, V: Into<String>>(&self, key: K, value: V) -> Self {
        Self { name: self.name.clone(), tags: self.tags.with(key, value) }
    }
}

impl fmt::Display for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tags.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}{{{}}}", self.name, self.tags)
        }
    }
}

/// Builder for [`MonitorConfig`]
#[derive(Debug, Clone)]
pub struct MonitorConfigBuilder {
    name: String,
    tags: TagList,
}

impl MonitorConfigBuilder {
    /// Add a single tag
    #[must_use]
    pub fn tag<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.tags.insert(key, value);
        self
    }

    /// Add every tag of `tags`
    #[must_use]
    pub fn tags(mut self, tags: &TagList) -> Self {
        for (key, value) in tags {
            self.tags.insert(key, value);
        }
        self
    }

    /// Validate the name and build the configuration
    pub fn build(self) -> MonitorResult<MonitorConfig> {
        if self.name.trim().is_empty() {
            return Err(MonitorError::invalid_name(self.name));
        }
        Ok(MonitorConfig { name: self.name, tags: self.tags })
    }
}
