use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::{noop_waker_ref, Context, Poll},
    Stream, StreamExt,
};
use std::{cell::RefCell, pin::Pin};

/// A typed notification.
///
/// Every subscriber gets its own unbounded queue; dropping the
/// [`Subscription`] unsubscribes. Posting never blocks, never drops a value
/// and never runs subscriber code inline, so it is safe to post while the
/// object that owns the event is being mutated.
pub struct Event<T: Clone> {
    subscribers: RefCell<Vec<UnboundedSender<T>>>,
}

impl<T: Clone> Event<T> {
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = mpsc::unbounded();
        self.subscribers.borrow_mut().push(sender);
        Subscription { receiver }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|s| !s.is_closed());
        subscribers.len()
    }

    pub(crate) fn post(&self, value: T) {
        self.subscribers
            .borrow_mut()
            .retain(|s| s.unbounded_send(value.clone()).is_ok());
    }
}

impl<T: Clone> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> std::fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// Nothing was posted since the last receive.
    Empty,
    /// The event is gone and everything posted was received.
    Closed,
}

/// The receiving end of an [`Event`]. Also a [`Stream`] of posted values.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Takes the oldest value not yet received, without waiting.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        let mut cx = Context::from_waker(noop_waker_ref());
        match self.receiver.poll_next_unpin(&mut cx) {
            Poll::Ready(Some(value)) => Ok(value),
            Poll::Ready(None) => Err(TryRecvError::Closed),
            Poll::Pending => Err(TryRecvError::Empty),
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_reaches_every_subscriber() {
        let event = Event::<u32>::new();
        let mut first = event.subscribe();
        let mut second = event.subscribe();

        event.post(3);
        assert_eq!(first.try_recv(), Ok(3));
        assert_eq!(second.try_recv(), Ok(3));
        assert_eq!(first.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_dropping_a_subscription_unsubscribes() {
        let event = Event::<()>::new();
        let subscription = event.subscribe();
        assert_eq!(event.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(event.subscriber_count(), 0);
        // posting without subscribers is a no-op
        event.post(());
    }

    #[test]
    fn test_unread_posts_are_kept() {
        let event = Event::<usize>::new();
        let mut subscription = event.subscribe();

        for i in 0..100 {
            event.post(i);
        }
        let received: Vec<_> = std::iter::from_fn(|| subscription.try_recv().ok()).collect();
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_dropped_event_closes_subscriptions() {
        let event = Event::<u8>::new();
        let mut subscription = event.subscribe();
        event.post(1);
        drop(event);

        assert_eq!(subscription.try_recv(), Ok(1));
        assert_eq!(subscription.try_recv(), Err(TryRecvError::Closed));
    }

    #[tokio::test]
    async fn test_subscription_is_a_stream() {
        let event = Event::<&str>::new();
        let mut subscription = event.subscribe();
        event.post("hello");

        assert_eq!(subscription.next().await, Some("hello"));
    }
}
