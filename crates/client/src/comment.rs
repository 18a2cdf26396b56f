use chrono::{DateTime, Utc};
use domain::{CommentPayload, CommentRecord, Mode, ServerCall, Vote, VoteRecord};
use futures::future::LocalBoxFuture;
use serde_json::Value;
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};
use tracing::debug;

use crate::{
    author::Author,
    comment_list::{CommentList, ListParent},
    error::{decode, Error, Result},
    event::Event,
    page::{settled, Page, PageInner, PendingCall},
};

/// Where a comment lives: at the top level of a page or below another comment.
#[derive(Debug, Clone, PartialEq)]
pub enum Parent {
    Page(Page),
    Comment(Comment),
}

impl Parent {
    /// The list new children of this parent are inserted into.
    pub fn list(&self) -> &CommentList {
        match self {
            Parent::Page(page) => page.comments(),
            Parent::Comment(comment) => comment.replies(),
        }
    }

    pub fn page(&self) -> Result<Page> {
        match self {
            Parent::Page(page) => Ok(page.clone()),
            Parent::Comment(comment) => comment.page(),
        }
    }

    /// The `parent` query parameter for listings of this parent's children.
    pub(crate) fn listing_parent(&self) -> Result<Option<u64>> {
        match self {
            Parent::Page(_) => Ok(None),
            Parent::Comment(comment) => comment.id().map(Some).ok_or(Error::MissingId),
        }
    }
}

impl From<&Page> for Parent {
    fn from(page: &Page) -> Self {
        Parent::Page(page.clone())
    }
}

impl From<&Comment> for Parent {
    fn from(comment: &Comment) -> Self {
        Parent::Comment(comment.clone())
    }
}

#[derive(Debug, Default)]
pub struct CommentEvents {
    pub deleted: Event<()>,
    pub text_changed: Event<String>,
    pub modified_changed: Event<DateTime<Utc>>,
    pub likes_changed: Event<u32>,
    pub dislikes_changed: Event<u32>,
    pub id_assigned: Event<u64>,
    /// Posted when the comment first shows up in its parent's list.
    pub published: Event<()>,
}

#[derive(Debug)]
struct CommentState {
    id: Option<u64>,
    text: Option<String>,
    raw_text: Option<String>,
    created_on: Option<DateTime<Utc>>,
    last_modified_on: Option<DateTime<Utc>>,
    likes: u32,
    dislikes: u32,
    deleted: bool,
    dirty: bool,
    exists_on_server: bool,
    awaits_moderation: bool,
    in_parent_list: bool,
}

impl CommentState {
    fn draft() -> Self {
        Self {
            id: None,
            text: None,
            raw_text: None,
            created_on: None,
            last_modified_on: None,
            likes: 0,
            dislikes: 0,
            deleted: false,
            dirty: true,
            exists_on_server: false,
            awaits_moderation: false,
            in_parent_list: false,
        }
    }
}

/// One comment, either a local draft or a mirror of a server record.
///
/// Cheap to clone; clones are the same comment. Equality is identity.
#[derive(Clone)]
pub struct Comment {
    inner: Rc<CommentInner>,
}

pub(crate) struct CommentInner {
    state: RefCell<CommentState>,
    author: Author,
    replies: CommentList,
    page: Weak<PageInner>,
    replies_to: Option<Weak<CommentInner>>,
    events: CommentEvents,
}

impl Comment {
    /// Creates a local draft below `parent`. It is not inserted anywhere until
    /// the server reports it as published.
    pub fn new(parent: impl Into<Parent>) -> Self {
        let parent = parent.into();
        let (page, replies_to) = match &parent {
            Parent::Page(page) => (page.downgrade(), None),
            Parent::Comment(comment) => (
                comment.inner.page.clone(),
                Some(Rc::downgrade(&comment.inner)),
            ),
        };
        let inner = Rc::new_cyclic(|comment: &Weak<CommentInner>| CommentInner {
            state: RefCell::new(CommentState::draft()),
            author: Author::new(comment.clone()),
            replies: CommentList::new(ListParent::Comment(comment.clone()), page.clone()),
            page,
            replies_to,
            events: CommentEvents::default(),
        });
        Self { inner }
    }

    /// Materializes a server record below `parent`. The caller is responsible
    /// for placing it into the parent's list.
    pub fn from_record(record: &CommentRecord, parent: impl Into<Parent>) -> Result<Self> {
        record.validate()?;
        Self::materialize(record, parent.into())
    }

    /// Like [`Comment::from_record`] for a record that was already validated.
    pub(crate) fn materialize(record: &CommentRecord, parent: Parent) -> Result<Self> {
        let comment = Self::new(parent);
        {
            let mut state = comment.inner.state.borrow_mut();
            state.exists_on_server = true;
            state.in_parent_list = true;
        }
        comment.apply_record(record)?;
        Ok(comment)
    }

    pub(crate) fn from_inner(inner: Rc<CommentInner>) -> Self {
        Self { inner }
    }

    pub fn ptr_eq(&self, other: &Comment) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn id(&self) -> Option<u64> {
        self.inner.state.borrow().id
    }

    /// Rendered HTML as returned by the server.
    pub fn text(&self) -> Option<String> {
        self.inner.state.borrow().text.clone()
    }

    /// Markup written locally, sent instead of `text` when present.
    pub fn raw_text(&self) -> Option<String> {
        self.inner.state.borrow().raw_text.clone()
    }

    pub fn set_raw_text(&self, raw_text: Option<String>) {
        let mut state = self.inner.state.borrow_mut();
        if state.raw_text != raw_text {
            state.raw_text = raw_text;
            state.dirty = true;
        }
    }

    pub fn created_on(&self) -> Option<DateTime<Utc>> {
        self.inner.state.borrow().created_on
    }

    pub fn last_modified_on(&self) -> Option<DateTime<Utc>> {
        self.inner.state.borrow().last_modified_on
    }

    pub fn likes(&self) -> u32 {
        self.inner.state.borrow().likes
    }

    pub fn dislikes(&self) -> u32 {
        self.inner.state.borrow().dislikes
    }

    pub fn deleted(&self) -> bool {
        self.inner.state.borrow().deleted
    }

    pub fn awaits_moderation(&self) -> bool {
        self.inner.state.borrow().awaits_moderation
    }

    /// Known to the server, visible to everyone and not deleted.
    pub fn published(&self) -> bool {
        let state = self.inner.state.borrow();
        state.exists_on_server && !state.awaits_moderation && !state.deleted
    }

    /// Not known to the server yet.
    pub fn is_draft(&self) -> bool {
        !self.inner.state.borrow().exists_on_server
    }

    /// Has local changes that [`Comment::send`] would transmit.
    pub fn is_dirty(&self) -> bool {
        self.inner.state.borrow().dirty
    }

    pub fn author(&self) -> &Author {
        &self.inner.author
    }

    pub fn replies(&self) -> &CommentList {
        &self.inner.replies
    }

    pub fn events(&self) -> &CommentEvents {
        &self.inner.events
    }

    /// The comment this one replies to, if any.
    pub fn replies_to(&self) -> Option<Comment> {
        self.inner
            .replies_to
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Comment::from_inner)
    }

    pub fn page(&self) -> Result<Page> {
        Page::upgrade(&self.inner.page)
    }

    pub fn parent(&self) -> Result<Parent> {
        match &self.inner.replies_to {
            Some(comment) => comment
                .upgrade()
                .map(|inner| Parent::Comment(Comment::from_inner(inner)))
                .ok_or(Error::ParentDropped),
            None => self.page().map(Parent::Page),
        }
    }

    /// Creates the comment on the server, or updates it if it already exists.
    /// Resolves without a request when there is nothing to send.
    ///
    /// What to send is decided when the request's turn comes, so sending twice
    /// in a row issues a single create.
    pub fn send(&self) -> LocalBoxFuture<'static, Result<Comment>> {
        if !self.is_draft() && !self.is_dirty() {
            return settled(Ok(self.clone()));
        }
        let page = match self.page() {
            Ok(page) => page,
            Err(e) => return settled(Err(e)),
        };
        let transport = page.server().transport();
        let comment = self.clone();
        page.on_no_request(async move {
            let Some(call) = comment.send_call()? else {
                return Ok(comment);
            };
            debug!("Sending comment: {}", call);
            let body = transport.call(call).await?;
            comment.ingest(body)?;
            Ok::<_, Error>(comment)
        })
    }

    /// Reloads this comment and its replies from the server.
    pub fn fetch(&self) -> LocalBoxFuture<'static, Result<Comment>> {
        self.request(
            |comment| {
                Ok(ServerCall::Fetch {
                    id: comment.require_id()?,
                })
            },
            |comment, body| {
                comment.ingest(body)?;
                Ok(comment)
            },
        )
    }

    /// Resolves with the like count the server reports afterwards.
    pub fn send_like(&self) -> LocalBoxFuture<'static, Result<u32>> {
        self.vote(Vote::Like)
    }

    /// Resolves with the dislike count the server reports afterwards.
    pub fn send_dislike(&self) -> LocalBoxFuture<'static, Result<u32>> {
        self.vote(Vote::Dislike)
    }

    /// Deletes the comment on the server and takes it out of its parent's list.
    /// Resolves without a request when the comment is already deleted by the
    /// time the request's turn comes.
    pub fn delete(&self) -> LocalBoxFuture<'static, Result<()>> {
        if self.deleted() {
            return settled(Ok(()));
        }
        let page = match self.page() {
            Ok(page) => page,
            Err(e) => return settled(Err(e)),
        };
        let transport = page.server().transport();
        let comment = self.clone();
        page.on_no_request(async move {
            if comment.deleted() {
                return Ok(());
            }
            let call = ServerCall::Delete {
                id: comment.require_id()?,
            };
            debug!("Deleting comment: {}", call);
            transport.call(call).await?;
            if let Ok(parent) = comment.parent() {
                parent.list().remove(&comment);
            }
            comment.mark_deleted();
            Ok::<_, Error>(())
        })
    }

    fn vote(&self, vote: Vote) -> LocalBoxFuture<'static, Result<u32>> {
        self.request(
            move |comment| {
                Ok(ServerCall::Vote {
                    id: comment.require_id()?,
                    vote,
                })
            },
            move |comment, body| {
                let votes: VoteRecord = decode(body)?;
                comment.apply_votes(votes.likes, votes.dislikes);
                Ok(match vote {
                    Vote::Like => comment.likes(),
                    Vote::Dislike => comment.dislikes(),
                })
            },
        )
    }

    /// Enqueues a request on the owning page. `build` runs at the request's
    /// turn.
    fn request<R, B, P>(&self, build: B, process: P) -> LocalBoxFuture<'static, Result<R>>
    where
        R: 'static,
        B: FnOnce(&Comment) -> Result<ServerCall> + 'static,
        P: FnOnce(Comment, Value) -> Result<R> + 'static,
    {
        let page = match self.page() {
            Ok(page) => page,
            Err(e) => return settled(Err(e)),
        };
        let call = PendingCall::deferred({
            let comment = self.clone();
            move || build(&comment)
        });
        let comment = self.clone();
        page.send(call, move |body| process(comment, body))
    }

    fn send_call(&self) -> Result<Option<ServerCall>> {
        {
            let state = self.inner.state.borrow();
            if state.exists_on_server && !state.dirty {
                return Ok(None);
            }
        }
        if let Some(parent) = &self.inner.replies_to {
            let parent = parent.upgrade().ok_or(Error::ParentDropped)?;
            if !parent.state.borrow().exists_on_server {
                return Err(Error::ParentNotSent);
            }
        }
        let payload = self.to_payload()?;
        let state = self.inner.state.borrow();
        let call = if state.exists_on_server {
            ServerCall::Update {
                id: state.id.ok_or(Error::MissingId)?,
                payload,
            }
        } else {
            ServerCall::Create {
                uri: self.page()?.uri().to_string(),
                payload,
            }
        };
        Ok(Some(call))
    }

    /// The body of a create or update request.
    pub fn to_payload(&self) -> Result<CommentPayload> {
        let parent = match self.replies_to() {
            Some(parent) => Some(parent.id().ok_or(Error::ParentNotSent)?),
            None if self.inner.replies_to.is_some() => return Err(Error::ParentDropped),
            None => None,
        };
        let state = self.inner.state.borrow();
        let text = [&state.raw_text, &state.text]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
            .cloned()
            .unwrap_or_default();
        let author = &self.inner.author;
        Ok(CommentPayload {
            text,
            author: non_empty(author.name()),
            website: non_empty(author.website()),
            email: non_empty(author.email()),
            parent,
        })
    }

    fn require_id(&self) -> Result<u64> {
        self.id().ok_or(Error::MissingId)
    }

    fn ingest(&self, body: Value) -> Result<()> {
        let record: CommentRecord = decode(body)?;
        record.validate()?;
        self.apply_record(&record)
    }

    /// Merges a server record into this comment. Notifications fire only for
    /// fields that actually change.
    pub(crate) fn apply_record(&self, record: &CommentRecord) -> Result<()> {
        let created_on = record.created_on()?;
        let modified_on = record.modified_on()?;

        // 1. deletion and moderation
        if record.mode == Mode::Deleted {
            self.mark_deleted();
        }
        let events = &self.inner.events;
        {
            let mut state = self.inner.state.borrow_mut();
            state.awaits_moderation = record.mode == Mode::AwaitingModeration;

            // 2. scalar fields
            if state.id.is_none() {
                state.id = Some(record.id);
                events.id_assigned.post(record.id);
            }
            if let Some(text) = &record.text {
                if state.text.as_ref() != Some(text) {
                    state.text = Some(text.clone());
                    events.text_changed.post(text.clone());
                }
            }
            if state.created_on.is_none() {
                state.created_on = Some(created_on);
            }
            if let Some(modified_on) = modified_on {
                if state.last_modified_on != Some(modified_on) {
                    state.last_modified_on = Some(modified_on);
                    events.modified_changed.post(modified_on);
                }
            }
        }
        self.apply_votes(record.likes, record.dislikes);

        // 3. author, outside the state borrow since it marks us dirty
        let author = &self.inner.author;
        author.set_ident(record.hash.clone());
        author.set_website(record.website.clone());
        author.set_name(record.author.clone());

        // 4. replies
        if let Some(listing) = record.reply_listing() {
            self.inner.replies.apply_listing(listing)?;
        }

        // 5. the server copy is now the reference
        let announce = {
            let mut state = self.inner.state.borrow_mut();
            state.dirty = false;
            state.exists_on_server = true;
            record.mode == Mode::Published && !state.in_parent_list
        };
        if announce {
            self.parent()?.list().insert(self)?;
            events.published.post(());
        }
        Ok(())
    }

    fn apply_votes(&self, likes: u32, dislikes: u32) {
        let mut state = self.inner.state.borrow_mut();
        if state.likes != likes {
            state.likes = likes;
            self.inner.events.likes_changed.post(likes);
        }
        if state.dislikes != dislikes {
            state.dislikes = dislikes;
            self.inner.events.dislikes_changed.post(dislikes);
        }
    }

    pub(crate) fn mark_deleted(&self) {
        let newly_deleted = !std::mem::replace(&mut self.inner.state.borrow_mut().deleted, true);
        if newly_deleted {
            self.inner.events.deleted.post(());
        }
    }

    pub(crate) fn mark_dirty(&self) {
        self.inner.state.borrow_mut().dirty = true;
    }

    pub(crate) fn set_in_parent_list(&self, listed: bool) {
        self.inner.state.borrow_mut().in_parent_list = listed;
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl PartialEq for Comment {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl std::fmt::Debug for Comment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Comment")
            .field("id", &state.id)
            .field("deleted", &state.deleted)
            .field("exists_on_server", &state.exists_on_server)
            .finish()
    }
}
