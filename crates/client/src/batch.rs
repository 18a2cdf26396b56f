use adapter::Transport;
use domain::ServerCall;
use futures::{
    channel::oneshot,
    future::{join_all, LocalBoxFuture, Shared},
    FutureExt,
};
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};
use tracing::debug;

use crate::{
    error::{decode, Error, Result},
    page::Page,
};

type Outcome = Shared<LocalBoxFuture<'static, Result<()>>>;

struct PendingBatch {
    pages: Vec<Page>,
    outcome: Outcome,
}

/// Collects top level deep count requests and answers them with one count
/// request per batch.
///
/// Pages join until the batch is first polled and yields once; after that a
/// new batch starts. The request is only dispatched once every participating
/// page has no request in flight, and each page stays blocked until the
/// counts are applied.
pub(crate) struct CountBatcher {
    pending: RefCell<Option<PendingBatch>>,
}

impl CountBatcher {
    pub(crate) fn new() -> Self {
        Self {
            pending: RefCell::new(None),
        }
    }

    pub(crate) fn join(self: &Rc<Self>, page: Page) -> LocalBoxFuture<'static, Result<u64>> {
        let outcome = {
            let mut pending = self.pending.borrow_mut();
            let batch = pending.get_or_insert_with(|| PendingBatch {
                pages: Vec::new(),
                outcome: dispatch(Rc::downgrade(self)).boxed_local().shared(),
            });
            // a page counted twice would wait on itself
            if !batch.pages.iter().any(|p| p.ptr_eq(&page)) {
                batch.pages.push(page.clone());
            }
            batch.outcome.clone()
        };

        async move {
            outcome.await?;
            Ok(page.comments().deep_count())
        }
        .boxed_local()
    }
}

async fn dispatch(batcher: Weak<CountBatcher>) -> Result<()> {
    tokio::task::yield_now().await;

    let Some(pages) = batcher
        .upgrade()
        .and_then(|batcher| {
            let batch = batcher.pending.borrow_mut().take();
            batch
        })
        .map(|batch| batch.pages)
    else {
        return Ok(());
    };
    let Some(driver) = pages.first().cloned() else {
        return Ok(());
    };
    debug!("Counting comments of {} pages in one request", pages.len());

    // 1. hold every other page once its queue drains
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let release = release_rx.map(|_| ()).shared();
    let mut ready = Vec::with_capacity(pages.len() - 1);
    let holds: Vec<_> = pages[1..]
        .iter()
        .map(|page| {
            let (ready_tx, ready_rx) = oneshot::channel::<()>();
            ready.push(ready_rx);
            let release = release.clone();
            page.on_no_request(async move {
                let _ = ready_tx.send(());
                release.await;
            })
        })
        .collect();

    // 2. ask from the first page once all of them are idle
    let transport = driver.server().transport();
    let exchange = driver.on_no_request(async move {
        join_all(ready).await;
        count(transport, &pages).await
    });
    // the held pages are released here, or when this batch is dropped
    let exchange = async move {
        let outcome = exchange.await;
        drop(release_tx);
        outcome
    };

    let (outcome, _) = futures::join!(exchange, join_all(holds));
    outcome
}

async fn count(transport: Rc<dyn Transport>, pages: &[Page]) -> Result<()> {
    let uris = pages.iter().map(|p| p.uri().to_string()).collect();
    let body = transport.call(ServerCall::Count { uris }).await?;
    let counts: Vec<u64> = decode(body)?;
    if counts.len() != pages.len() {
        return Err(Error::CountMismatch {
            expected: pages.len(),
            got: counts.len(),
        });
    }
    for (page, count) in pages.iter().zip(counts) {
        page.comments().set_deep_count(count);
    }
    Ok(())
}
