//! Client side mirror of the comment trees an isso style comment server keeps
//! per page.
//!
//! Everything here is single threaded: handles are reference counted and
//! futures are `!Send`. Run them on a current thread runtime or a `LocalSet`.

mod author;
mod batch;
mod comment;
mod comment_list;
mod error;
mod event;
mod page;
mod queue;
mod server;
mod sort;

pub use author::{Author, AuthorEvents};
pub use comment::{Comment, CommentEvents, Parent};
pub use comment_list::{CommentList, ListEvents};
pub use error::{Error, Result};
pub use event::{Event, Subscription, TryRecvError};
pub use page::{Page, PendingCall};
pub use server::Server;
pub use sort::{SortCriterion, SortDirection, SortKey};

/// Wire records and server calls.
pub mod wire {
    pub use domain::*;
}

/// Transports the client can talk through.
pub mod transport {
    pub use adapter::*;
}
