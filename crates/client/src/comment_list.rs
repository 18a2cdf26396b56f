use domain::{Listing, ListingRecord, ServerCall};
use futures::future::LocalBoxFuture;
use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Weak,
};
use tracing::trace;

use crate::{
    comment::{Comment, CommentInner, Parent},
    error::{decode, Error, Result},
    event::Event,
    page::{settled, Page, PageInner, PendingCall},
    sort::{SortCriterion, SortDirection, SortKey, SortOrder},
};

/// Owner of a list, held weakly since the owner holds the list.
pub(crate) enum ListParent {
    Page(Weak<PageInner>),
    Comment(Weak<CommentInner>),
}

#[derive(Debug, Default)]
pub struct ListEvents {
    /// A comment was materialized from server data and added to this list.
    pub new: Event<Comment>,
    pub count_changed: Event<u64>,
    pub deep_count_changed: Event<u64>,
    pub length_changed: Event<usize>,
}

#[derive(Default)]
struct ListState {
    entries: Vec<Comment>,
    by_id: HashMap<u64, Comment>,
    count: u64,
    deep_count: u64,
    order: SortOrder,
}

/// The ordered direct children of a page or a comment.
///
/// `count` is the number of direct children the server reports, which may
/// exceed the number of entries held locally. `deep_count` covers the whole
/// subtree.
pub struct CommentList {
    parent: ListParent,
    page: Weak<PageInner>,
    state: RefCell<ListState>,
    events: ListEvents,
}

impl CommentList {
    pub(crate) fn new(parent: ListParent, page: Weak<PageInner>) -> Self {
        Self {
            parent,
            page,
            state: RefCell::new(ListState::default()),
            events: ListEvents::default(),
        }
    }

    pub fn count(&self) -> u64 {
        self.state.borrow().count
    }

    pub fn deep_count(&self) -> u64 {
        self.state.borrow().deep_count
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Comment> {
        self.state.borrow().entries.get(index).cloned()
    }

    pub fn by_id(&self, id: u64) -> Option<Comment> {
        self.state.borrow().by_id.get(&id).cloned()
    }

    /// A snapshot of the current entries in order.
    pub fn entries(&self) -> Vec<Comment> {
        self.state.borrow().entries.clone()
    }

    pub fn map<T>(&self, f: impl FnMut(&Comment) -> T) -> Vec<T> {
        self.entries().iter().map(f).collect()
    }

    /// Visits the whole subtree in pre-order: each comment, then its replies.
    pub fn flat_map<T>(&self, mut f: impl FnMut(&Comment) -> T) -> Vec<T> {
        let mut out = Vec::new();
        self.walk(&mut f, &mut out);
        out
    }

    fn walk<T>(&self, f: &mut impl FnMut(&Comment) -> T, out: &mut Vec<T>) {
        for comment in self.entries() {
            out.push(f(&comment));
            comment.replies().walk(f, out);
        }
    }

    pub fn events(&self) -> &ListEvents {
        &self.events
    }

    /// Whether this is the top level list of a page.
    pub fn is_root(&self) -> bool {
        matches!(self.parent, ListParent::Page(_))
    }

    pub fn owner(&self) -> Result<Parent> {
        match &self.parent {
            ListParent::Page(page) => Page::upgrade(page).map(Parent::Page),
            ListParent::Comment(comment) => comment
                .upgrade()
                .map(|inner| Parent::Comment(Comment::from_inner(inner)))
                .ok_or(Error::ParentDropped),
        }
    }

    /// Adds `comment` at its sorted position, after any entries it ties with.
    /// A comment already in the list is moved to its current position.
    pub fn insert(&self, comment: &Comment) -> Result<()> {
        let id = comment.id().ok_or(Error::MissingId)?;
        let (before, after) = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let before = state.entries.len();
            if let Some(previous) = state.by_id.remove(&id) {
                state.entries.retain(|c| !c.ptr_eq(&previous));
            }
            let mut position = state.entries.len();
            while position > 0
                && state.order.compare(&state.entries[position - 1], comment).is_gt()
            {
                position -= 1;
            }
            state.entries.insert(position, comment.clone());
            state.by_id.insert(id, comment.clone());
            (before, state.entries.len())
        };
        comment.set_in_parent_list(true);
        if before != after {
            self.events.length_changed.post(after);
        }
        Ok(())
    }

    /// Takes `comment` out of the list. Counts are left alone, they reflect
    /// the server. Returns whether it was listed.
    pub fn remove(&self, comment: &Comment) -> bool {
        let len = {
            let mut state = self.state.borrow_mut();
            let Some(position) = state.entries.iter().rposition(|c| c.ptr_eq(comment)) else {
                return false;
            };
            state.entries.remove(position);
            if let Some(id) = comment.id() {
                if state.by_id.get(&id).is_some_and(|c| c.ptr_eq(comment)) {
                    state.by_id.remove(&id);
                }
            }
            state.entries.len()
        };
        comment.set_in_parent_list(false);
        self.events.length_changed.post(len);
        true
    }

    /// Re-sorts by a single criterion. Ties fall back to creation time.
    pub fn sort_by(&self, criterion: SortCriterion, direction: SortDirection) {
        self.sort_bys([SortKey::new(criterion, direction)]);
    }

    /// Re-sorts by a chain of keys. The order sticks for later inserts and
    /// fetches.
    pub fn sort_bys(&self, keys: impl IntoIterator<Item = SortKey>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.order = SortOrder::new(keys);
        let order = &state.order;
        state.entries.sort_by(|a, b| order.compare(a, b));
    }

    /// Loads every direct child (and whatever nested replies the server
    /// includes) and merges them into the list.
    pub fn fetch(&self) -> LocalBoxFuture<'static, Result<()>> {
        self.request_listing(None, |list, listing| list.apply_listing(listing))
    }

    /// Asks only for the number of direct children. Entries are left alone.
    pub fn fetch_count(&self) -> LocalBoxFuture<'static, Result<u64>> {
        self.request_listing(Some(0), |list, listing| {
            list.set_count(listing.total_replies);
            Ok(list.count())
        })
    }

    /// Resolves with the number of comments in the whole subtree.
    ///
    /// Reply lists fetch themselves fully. Top level lists join the deep count
    /// batch of their server, which asks for every waiting page at once.
    pub fn fetch_deep_count(&self) -> LocalBoxFuture<'static, Result<u64>> {
        match &self.parent {
            ListParent::Comment(_) => self.request_listing(None, |list, listing| {
                list.apply_listing(listing)?;
                Ok(list.deep_count())
            }),
            ListParent::Page(page) => match Page::upgrade(page) {
                Ok(page) => {
                    let counts = page.server().counts().clone();
                    counts.join(page)
                }
                Err(e) => settled(Err(e)),
            },
        }
    }

    fn request_listing<R, A>(&self, limit: Option<u32>, apply: A) -> LocalBoxFuture<'static, Result<R>>
    where
        R: 'static,
        A: FnOnce(&CommentList, Listing<'_>) -> Result<R> + 'static,
    {
        let (owner, page) = match self.owner().and_then(|owner| Ok((owner, Page::upgrade(&self.page)?))) {
            Ok(found) => found,
            Err(e) => return settled(Err(e)),
        };
        let call = PendingCall::deferred({
            let owner = owner.clone();
            let uri = page.uri().to_string();
            move || {
                Ok(ServerCall::List {
                    uri,
                    parent: owner.listing_parent()?,
                    limit,
                })
            }
        });
        page.send(call, move |body| {
            let record: ListingRecord = decode(body)?;
            record.validate()?;
            apply(owner.list(), record.listing())
        })
    }

    /// Merges a listing: known comments are updated in place, unknown ones are
    /// materialized, and comments the server no longer lists are marked
    /// deleted.
    pub(crate) fn apply_listing(&self, listing: Listing<'_>) -> Result<()> {
        if listing.is_count_only() {
            self.set_count(listing.total_replies);
            return Ok(());
        }
        let owner = self.owner()?;

        let mut entries = Vec::with_capacity(listing.replies.len());
        let mut by_id = HashMap::with_capacity(listing.replies.len());
        let mut nested = 0;
        for record in listing.replies {
            let known = self.by_id(record.id);
            let comment = match known {
                Some(comment) => {
                    comment.apply_record(record)?;
                    comment
                }
                None => {
                    let comment = Comment::materialize(record, owner.clone())?;
                    self.events.new.post(comment.clone());
                    comment
                }
            };
            nested += comment.replies().deep_count();
            by_id.insert(record.id, comment.clone());
            entries.push(comment);
        }

        let (vanished, before, after) = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let before = state.entries.len();
            let order = &state.order;
            entries.sort_by(|a, b| order.compare(a, b));
            state.entries = entries;
            let previous = std::mem::replace(&mut state.by_id, by_id);
            let vanished: Vec<Comment> = previous
                .into_iter()
                .filter(|(id, _)| !state.by_id.contains_key(id))
                .map(|(_, comment)| comment)
                .collect();
            (vanished, before, state.entries.len())
        };
        for comment in &vanished {
            comment.set_in_parent_list(false);
            comment.mark_deleted();
        }
        trace!(
            "Merged {} comments, {} vanished",
            listing.replies.len(),
            vanished.len()
        );

        if before != after {
            self.events.length_changed.post(after);
        }
        self.set_deep_count(nested + listing.total_replies);
        self.set_count(listing.total_replies);
        Ok(())
    }

    fn set_count(&self, count: u64) {
        let changed = {
            let mut state = self.state.borrow_mut();
            std::mem::replace(&mut state.count, count) != count
        };
        if changed {
            self.events.count_changed.post(count);
        }
    }

    pub(crate) fn set_deep_count(&self, deep_count: u64) {
        let changed = {
            let mut state = self.state.borrow_mut();
            std::mem::replace(&mut state.deep_count, deep_count) != deep_count
        };
        if changed {
            self.events.deep_count_changed.post(deep_count);
        }
    }
}

impl std::fmt::Debug for CommentList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CommentList")
            .field("len", &state.entries.len())
            .field("count", &state.count)
            .field("deep_count", &state.deep_count)
            .finish()
    }
}
