use adapter::{HttpConfig, HttpTransport, Transport};
use std::rc::Rc;

use crate::{batch::CountBatcher, error::Result, page::Page};

/// Handle to one comment server.
///
/// Cheap to clone. Pages created from the same handle share its transport and
/// take part in the same deep count batches.
#[derive(Clone)]
pub struct Server {
    inner: Rc<ServerInner>,
}

struct ServerInner {
    transport: Rc<dyn Transport>,
    counts: Rc<CountBatcher>,
}

impl Server {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self {
            inner: Rc::new(ServerInner {
                transport,
                counts: Rc::new(CountBatcher::new()),
            }),
        }
    }

    /// Connects over HTTP with a fresh cookie store.
    pub fn http(config: HttpConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Rc::new(transport)))
    }

    /// Creates an empty mirror of the page at `uri`. Nothing is fetched yet.
    pub fn page(&self, uri: impl AsRef<str>) -> Page {
        Page::new(self, uri.as_ref())
    }

    pub(crate) fn transport(&self) -> Rc<dyn Transport> {
        self.inner.transport.clone()
    }

    pub(crate) fn counts(&self) -> &Rc<CountBatcher> {
        &self.inner.counts
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").finish_non_exhaustive()
    }
}
