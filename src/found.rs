use std::collections::HashMap;

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::values::{Tag, Value};

/// What happens when a tag id is decoded more than once during a parse,
/// e.g. the same id in IFD0 and IFD1, or a root/overlay scope collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// The tag decoded last replaces the earlier one.
    #[default]
    LastWins,
    /// The tag decoded first is kept, later ones are dropped.
    FirstWins,
}

/// Decoded tags, keyed by tag id.
///
/// The map is flat: tags from IFD0, the following IFDs of the chain and every
/// visited sub-directory (Exif, GPS, Interoperability) all land here. Use
/// [`Tag::scope`] to tell where a name was resolved.
#[cfg_attr(feature = "json_dump", derive(Serialize))]
#[cfg_attr(feature = "json_dump", serde(transparent))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoundTags {
    tags: HashMap<u16, Tag>,
}

impl FoundTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u16) -> Option<&Tag> {
        self.tags.get(&id)
    }

    pub fn value(&self, id: u16) -> Option<&Value> {
        self.tags.get(&id).map(|t| &t.value)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.tags.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate over all tags, ordered by tag id.
    pub fn iter(&self) -> std::vec::IntoIter<&Tag> {
        let mut tags: Vec<&Tag> = self.tags.values().collect();
        tags.sort_by_key(|t| t.id);
        tags.into_iter()
    }

    /// Store `tag` according to `policy`. Returns `true` if the map now holds
    /// this tag.
    pub fn insert(&mut self, tag: Tag, policy: DuplicatePolicy) -> bool {
        match policy {
            DuplicatePolicy::LastWins => {
                if let Some(old) = self.tags.insert(tag.id, tag) {
                    tracing::debug!(id = format!("0x{:04x}", old.id), name = old.name, "tag overwritten");
                }
                true
            }
            DuplicatePolicy::FirstWins => {
                if self.tags.contains_key(&tag.id) {
                    tracing::debug!(id = format!("0x{:04x}", tag.id), name = tag.name, "duplicate tag dropped");
                    false
                } else {
                    self.tags.insert(tag.id, tag);
                    true
                }
            }
        }
    }
}

impl IntoIterator for FoundTags {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    /// Consume the map, yielding tags ordered by tag id.
    fn into_iter(self) -> Self::IntoIter {
        let mut tags: Vec<Tag> = self.tags.into_values().collect();
        tags.sort_by_key(|t| t.id);
        tags.into_iter()
    }
}

impl<'a> IntoIterator for &'a FoundTags {
    type Item = &'a Tag;
    type IntoIter = std::vec::IntoIter<&'a Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
