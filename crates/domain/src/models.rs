use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::protocol::{timestamp, RecordError};

/// Publication state of a comment as encoded by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Mode {
    Published,
    AwaitingModeration,
    /// Deleted, but kept because other comments still reply to it.
    Deleted,
    Other(i64),
}

impl From<i64> for Mode {
    fn from(code: i64) -> Self {
        match code {
            1 => Mode::Published,
            2 => Mode::AwaitingModeration,
            4 => Mode::Deleted,
            other => Mode::Other(other),
        }
    }
}

impl From<Mode> for i64 {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Published => 1,
            Mode::AwaitingModeration => 2,
            Mode::Deleted => 4,
            Mode::Other(code) => code,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Published => write!(f, "published"),
            Mode::AwaitingModeration => write!(f, "awaiting moderation"),
            Mode::Deleted => write!(f, "deleted"),
            Mode::Other(code) => write!(f, "mode {}", code),
        }
    }
}

/// One comment as the server describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: u64,
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub text: Option<String>,
    pub mode: Mode,
    /// Author identity computed by the server.
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    pub created: f64,
    #[serde(default)]
    pub modified: Option<f64>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub dislikes: u32,
    #[serde(default)]
    pub total_replies: Option<u64>,
    #[serde(default)]
    pub hidden_replies: Option<u64>,
    #[serde(default)]
    pub replies: Option<Vec<CommentRecord>>,
}

impl CommentRecord {
    pub fn created_on(&self) -> Result<DateTime<Utc>, RecordError> {
        timestamp(self.id, "created", self.created)
    }

    pub fn modified_on(&self) -> Result<Option<DateTime<Utc>>, RecordError> {
        self.modified
            .map(|secs| timestamp(self.id, "modified", secs))
            .transpose()
    }

    /// The nested reply collection, if the server sent one.
    pub fn reply_listing(&self) -> Option<Listing<'_>> {
        let replies = self.replies.as_deref()?;
        let total = self.total_replies.unwrap_or(replies.len() as u64);
        Some(Listing {
            total_replies: total,
            hidden_replies: self.hidden_replies.unwrap_or(0),
            replies,
        })
    }

    /// Checks every timestamp in this record and its nested replies.
    pub fn validate(&self) -> Result<(), RecordError> {
        self.created_on()?;
        self.modified_on()?;
        for reply in self.replies.iter().flatten() {
            reply.validate()?;
        }
        Ok(())
    }
}

/// Response to a listing request: the direct children of a page or comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(default)]
    pub id: Option<u64>,
    pub total_replies: u64,
    #[serde(default)]
    pub hidden_replies: u64,
    #[serde(default)]
    pub replies: Vec<CommentRecord>,
}

impl ListingRecord {
    pub fn listing(&self) -> Listing<'_> {
        Listing {
            total_replies: self.total_replies,
            hidden_replies: self.hidden_replies,
            replies: &self.replies,
        }
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        self.replies.iter().try_for_each(CommentRecord::validate)
    }
}

/// Borrowed view shared by top level listings and nested reply collections.
#[derive(Debug, Clone, Copy)]
pub struct Listing<'a> {
    pub total_replies: u64,
    pub hidden_replies: u64,
    pub replies: &'a [CommentRecord],
}

impl Listing<'_> {
    /// The server withheld every reply, so only the count is meaningful.
    pub fn is_count_only(&self) -> bool {
        self.total_replies > 0 && self.hidden_replies == self.total_replies && self.replies.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub likes: u32,
    pub dislikes: u32,
}
