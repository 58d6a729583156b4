//! # Topic Set
//!
//! Ordered, validated topic collections used by both the publish and the
//! subscribe paths. Duplicates are kept; deduplication is left to the
//! transport.

use crate::errors::BridgeError;

/// Check a single topic.
pub fn validate_topic(topic: &str) -> Result<&str, BridgeError> {
    if topic.is_empty() {
        return Err(BridgeError::EmptyTopic);
    }
    Ok(topic)
}

/// Non-empty ordered list of non-empty topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    topics: Vec<String>,
}

impl TopicSet {
    /// A set holding exactly one topic.
    pub fn single(topic: impl Into<String>) -> Result<Self, BridgeError> {
        let topic = topic.into();
        validate_topic(&topic)?;
        Ok(Self {
            topics: vec![topic],
        })
    }

    /// Build from a caller-supplied list, preserving order.
    pub fn from_list<I, S>(topics: I) -> Result<Self, BridgeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let topics: Vec<String> = topics.into_iter().map(Into::into).collect();
        if topics.is_empty() {
            return Err(BridgeError::EmptyTopicList);
        }
        for topic in &topics {
            validate_topic(topic)?;
        }
        Ok(Self { topics })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// True when the set holds no topics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.topics
    }
}

impl<'a> IntoIterator for &'a TopicSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.topics.iter()
    }
}
