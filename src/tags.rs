//! Taxonomy Tag Sets
//!
//! Sorted, deduplicated string sets backing category, tag, attribute, and
//! customer-group matching.

use std::cmp::Ordering;
use std::string::ToString;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A sorted string set using `SmallVec<[String; 5]>`; cart items rarely
/// carry more than a handful of categories or tags.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet {
    tags: SmallVec<[String; 5]>,
}

impl TagSet {
    /// Creates a tag set from raw tags, sorting and deduplicating them.
    #[must_use]
    pub fn new(tags: SmallVec<[String; 5]>) -> Self {
        let mut set = Self { tags };

        set.tags.sort();
        set.tags.dedup();

        set
    }

    /// Creates a tag set from string slices.
    pub fn from_strs(tags: &[&str]) -> Self {
        Self::new(
            tags.iter()
                .map(ToString::to_string)
                .collect::<SmallVec<[String; 5]>>(),
        )
    }

    /// The empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tags: SmallVec::with_capacity(0),
        }
    }

    /// Whether `tag` is in the set.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.binary_search_by(|probe| probe.as_str().cmp(tag)).is_ok()
    }

    /// Whether every tag of `other` is in the set.
    #[must_use]
    pub fn contains_all(&self, other: &Self) -> bool {
        self.intersection_count(other) == other.len()
    }

    /// How many tags the two sets share.
    ///
    /// Two-pointer walk over the sorted vectors, O(n + m).
    #[must_use]
    pub fn intersection_count(&self, other: &Self) -> usize {
        let mut count = 0;
        let mut left = self.tags.iter();
        let mut right = other.tags.iter();
        let mut left_tag = left.next();
        let mut right_tag = right.next();

        while let (Some(left_ref), Some(right_ref)) = (left_tag, right_tag) {
            match left_ref.cmp(right_ref) {
                Ordering::Equal => {
                    count += 1;
                    left_tag = left.next();
                    right_tag = right.next();
                }
                Ordering::Less => left_tag = left.next(),
                Ordering::Greater => right_tag = right.next(),
            }
        }

        count
    }

    /// Whether the set has no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Number of distinct tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Iterates the tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for TagSet {
    fn from(tags: Vec<String>) -> Self {
        Self::new(tags.into_iter().collect())
    }
}

impl From<TagSet> for Vec<String> {
    fn from(set: TagSet) -> Self {
        set.tags.into_vec()
    }
}
