use adapter::TransportError;
use domain::RecordError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced through the futures returned by pages, lists and comments.
///
/// Cheap to clone: the outcome of a batched count request is handed to every
/// participant.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("The parent comment was not sent yet")]
    ParentNotSent,
    #[error("The comment does not have an ID yet")]
    MissingId,
    #[error("The page this object belongs to no longer exists")]
    PageDropped,
    #[error("The comment this reply belongs to no longer exists")]
    ParentDropped,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Malformed server response: {0}")]
    Decode(Arc<serde_json::Error>),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("Count response has {got} entries for {expected} pages")]
    CountMismatch { expected: usize, got: usize },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(Arc::new(e))
    }
}

/// Turns a response body into a typed record at the ingestion boundary.
pub(crate) fn decode<T: DeserializeOwned>(body: Value) -> Result<T> {
    Ok(serde_json::from_value(body)?)
}
