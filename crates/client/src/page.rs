use domain::ServerCall;
use futures::{
    future::{self, LocalBoxFuture},
    Future, FutureExt,
};
use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::debug;

use crate::{
    comment_list::{CommentList, ListParent},
    error::{Error, Result},
    queue::RequestQueue,
    server::Server,
};

/// A server call that is either known up front or built when its turn in the
/// page queue comes.
///
/// Deferred calls see the state left behind by every request enqueued before
/// them, e.g. the ID a pending create assigns.
pub enum PendingCall {
    Ready(ServerCall),
    Deferred(Box<dyn FnOnce() -> Result<ServerCall>>),
}

impl PendingCall {
    pub fn deferred(build: impl FnOnce() -> Result<ServerCall> + 'static) -> Self {
        PendingCall::Deferred(Box::new(build))
    }

    fn build(self) -> Result<ServerCall> {
        match self {
            PendingCall::Ready(call) => Ok(call),
            PendingCall::Deferred(build) => build(),
        }
    }
}

impl From<ServerCall> for PendingCall {
    fn from(call: ServerCall) -> Self {
        PendingCall::Ready(call)
    }
}

/// Client side mirror of the comments attached to one page.
///
/// All requests issued on behalf of a page, its comments and their replies are
/// serialized: each one is dispatched only after the previous one settled.
#[derive(Clone)]
pub struct Page {
    inner: Rc<PageInner>,
}

pub(crate) struct PageInner {
    uri: String,
    server: Server,
    comments: CommentList,
    queue: RequestQueue,
}

impl Page {
    pub(crate) fn new(server: &Server, uri: &str) -> Self {
        let uri = normalize_uri(uri);
        let inner = Rc::new_cyclic(|page: &Weak<PageInner>| PageInner {
            uri,
            server: server.clone(),
            comments: CommentList::new(ListParent::Page(page.clone()), page.clone()),
            queue: RequestQueue::new(),
        });
        Self { inner }
    }

    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    pub fn server(&self) -> &Server {
        &self.inner.server
    }

    /// The top level comments.
    pub fn comments(&self) -> &CommentList {
        &self.inner.comments
    }

    /// Enqueues `call` and hands the response body to `process`.
    ///
    /// The request is enqueued now, not when the returned future is first
    /// polled. Once enqueued it runs whenever this or any later request on
    /// the page is awaited, so holding the future does not stall the page. A
    /// failed request does not block the ones behind it.
    pub fn send<R, P>(
        &self,
        call: impl Into<PendingCall>,
        process: P,
    ) -> LocalBoxFuture<'static, Result<R>>
    where
        R: 'static,
        P: FnOnce(Value) -> Result<R> + 'static,
    {
        let call = call.into();
        let transport = self.inner.server.transport();
        let uri = self.inner.uri.clone();
        self.on_no_request(async move {
            let call = call.build()?;
            debug!("Page {} dispatching {}", uri, call);
            let body = transport.call(call).await?;
            process(body)
        })
    }

    /// Runs `work` once every request enqueued before it has settled. Nothing
    /// enqueued after it starts until it completes.
    pub fn on_no_request<F>(&self, work: F) -> LocalBoxFuture<'static, F::Output>
    where
        F: Future + 'static,
    {
        self.inner.queue.enqueue(work)
    }

    pub fn ptr_eq(&self, other: &Page) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<PageInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(page: &Weak<PageInner>) -> Result<Page> {
        page.upgrade()
            .map(|inner| Page { inner })
            .ok_or(Error::PageDropped)
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").field("uri", &self.inner.uri).finish()
    }
}

fn normalize_uri(uri: &str) -> String {
    if uri.starts_with('/') {
        uri.to_string()
    } else {
        format!("/{}", uri)
    }
}

/// Wraps an already known outcome in the future type the request methods
/// return.
pub(crate) fn settled<T: 'static>(outcome: Result<T>) -> LocalBoxFuture<'static, Result<T>> {
    future::ready(outcome).boxed_local()
}
