use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::comment::Comment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortCriterion {
    /// Creation timestamp.
    Creation,
    /// Last modification timestamp, or the creation timestamp if never modified.
    Modification,
    Likes,
    Dislikes,
    /// Likes minus dislikes.
    LikeSum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub criterion: SortCriterion,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(criterion: SortCriterion, direction: SortDirection) -> Self {
        Self {
            criterion,
            direction,
        }
    }

    pub fn ascending(criterion: SortCriterion) -> Self {
        Self::new(criterion, SortDirection::Ascending)
    }

    pub fn descending(criterion: SortCriterion) -> Self {
        Self::new(criterion, SortDirection::Descending)
    }

    fn compare(&self, a: &Comment, b: &Comment) -> Ordering {
        let ordering = self.criterion.key(a).cmp(&self.criterion.key(b));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl SortCriterion {
    fn key(self, comment: &Comment) -> i64 {
        match self {
            SortCriterion::Creation => millis(comment.created_on()),
            SortCriterion::Modification => {
                millis(comment.last_modified_on().or_else(|| comment.created_on()))
            }
            SortCriterion::Likes => i64::from(comment.likes()),
            SortCriterion::Dislikes => i64::from(comment.dislikes()),
            SortCriterion::LikeSum => i64::from(comment.likes()) - i64::from(comment.dislikes()),
        }
    }
}

fn millis(time: Option<DateTime<Utc>>) -> i64 {
    time.map_or(i64::MIN, |t| t.timestamp_millis())
}

/// A comparator chain. Always ends with ascending creation time, which makes
/// the order total for comments with distinct creation times and stable
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SortOrder {
    keys: Vec<SortKey>,
}

impl SortOrder {
    pub(crate) fn new(keys: impl IntoIterator<Item = SortKey>) -> Self {
        let mut keys: Vec<SortKey> = keys.into_iter().collect();
        keys.push(SortKey::ascending(SortCriterion::Creation));
        Self { keys }
    }

    pub(crate) fn compare(&self, a: &Comment, b: &Comment) -> Ordering {
        self.keys
            .iter()
            .map(|key| key.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::new([])
    }
}
