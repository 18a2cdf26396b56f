use futures::{
    future::{self, LocalBoxFuture, Shared},
    Future, FutureExt,
};
use std::{cell::RefCell, rc::Rc};

type Link = Shared<LocalBoxFuture<'static, ()>>;

/// A chain of queue slots: work enqueued here starts only after everything
/// enqueued before it has settled.
///
/// Each slot is a shared future that runs its predecessor and then its own
/// work, so awaiting any slot drives every slot before it. Work enqueued here
/// therefore runs even if its own future is held unpolled or dropped, as soon
/// as anything behind it is awaited.
pub(crate) struct RequestQueue {
    tail: RefCell<Link>,
}

impl RequestQueue {
    pub(crate) fn new() -> Self {
        Self {
            tail: RefCell::new(future::ready(()).boxed_local().shared()),
        }
    }

    pub(crate) fn enqueue<F>(&self, work: F) -> LocalBoxFuture<'static, F::Output>
    where
        F: Future + 'static,
    {
        let output = Rc::new(RefCell::new(None));
        let previous = self.tail.borrow().clone();
        let link = {
            let output = output.clone();
            async move {
                previous.await;
                let value = work.await;
                *output.borrow_mut() = Some(value);
            }
            .boxed_local()
            .shared()
        };
        *self.tail.borrow_mut() = link.clone();

        async move {
            link.await;
            output
                .borrow_mut()
                .take()
                .expect("a settled queue slot holds its output")
        }
        .boxed_local()
    }
}
