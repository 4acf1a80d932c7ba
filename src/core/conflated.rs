//! # Conflated Channel
//!
//! A single-slot mailbox with overwrite-on-full semantics and any number of
//! readers. Built on `tokio::sync::watch`.
//!
//! ```text
//!   offer(a)  offer(b)  offer(c)        reader attaches here
//!   ────┬─────────┬─────────┬──────────────────┬─────────
//!   slot: a       b         c                  └─► sees c, then whatever comes next
//! ```
//!
//! - `offer` never blocks and never fails, even with no readers.
//! - A new reader (or a clone of an existing one) first sees the latest value.
//! - Values a slow reader did not get to are dropped; it only sees the newest.
//! - Once every sender is dropped, readers drain the last unseen value and
//!   then get `None`.

use futures::Stream;
use tokio::sync::watch;

/// Creates a new empty conflated channel.
pub fn channel<T: Clone>() -> (ConflatedSender<T>, ConflatedReceiver<T>) {
    let sender = ConflatedSender::new();
    let receiver = sender.subscribe();
    (sender, receiver)
}

/// Writing side of a conflated channel.
#[derive(Debug)]
pub struct ConflatedSender<T> {
    inner: watch::Sender<Option<T>>,
}

impl<T: Clone> ConflatedSender<T> {
    pub fn new() -> Self {
        let (inner, _) = watch::channel(None);
        Self { inner }
    }

    /// Overwrites the slot. Never blocks, never fails.
    pub fn offer(&self, value: T) {
        self.inner.send_replace(Some(value));
    }

    /// Stores `value` only if nothing was ever offered. Returns whether it was stored.
    pub fn offer_if_empty(&self, value: T) -> bool {
        let mut value = Some(value);
        self.inner.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = value.take();
                true
            } else {
                false
            }
        })
    }

    /// Latest offered value.
    pub fn latest(&self) -> Option<T> {
        self.inner.borrow().clone()
    }

    pub fn receiver_count(&self) -> usize {
        self.inner.receiver_count()
    }

    /// Attaches a new reader. It will see the latest value first, if there is one.
    pub fn subscribe(&self) -> ConflatedReceiver<T> {
        ConflatedReceiver {
            inner: self.inner.subscribe(),
            replayed: false,
        }
    }
}

impl<T: Clone> Default for ConflatedSender<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reading side of a conflated channel.
#[derive(Debug)]
pub struct ConflatedReceiver<T> {
    inner: watch::Receiver<Option<T>>,
    replayed: bool,
}

impl<T: Clone> ConflatedReceiver<T> {
    /// Waits for the next value.
    ///
    /// The first call returns the latest value immediately if one exists.
    /// Returns `None` once all senders are gone and nothing unseen remains.
    pub async fn recv(&mut self) -> Option<T> {
        if !self.replayed {
            self.replayed = true;
            let latest = self.inner.borrow_and_update().clone();
            if let Some(value) = latest {
                return Some(value);
            }
        }

        loop {
            if self.inner.changed().await.is_err() {
                return None;
            }
            let latest = self.inner.borrow_and_update().clone();
            if let Some(value) = latest {
                return Some(value);
            }
        }
    }

    /// Turns this reader into a `Stream`.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + Unpin + 'static
    where
        T: Send + Sync + 'static,
    {
        Box::pin(futures::stream::unfold(self, |mut receiver| async move {
            let value = receiver.recv().await?;
            Some((value, receiver))
        }))
    }
}

impl<T: Clone> Clone for ConflatedReceiver<T> {
    /// The clone is an independent reader that replays the latest value.
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            replayed: false,
        }
    }
}
