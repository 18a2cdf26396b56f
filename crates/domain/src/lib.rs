mod commands;
mod models;
pub mod protocol;

pub use commands::{Body, Endpoint, Method, ServerCall, Vote};
pub use models::{CommentRecord, Listing, ListingRecord, Mode, VoteRecord};
pub use protocol::{CommentPayload, RecordError};
