//! Bounded fan-out of work items to a fixed number of worker threads.
//!
//! [`distribute`] runs a producer on the calling thread and `concurrency`
//! consumers on scoped threads, connected by a queue holding at most
//! `concurrency` items. The first error from either side cancels the shared
//! [`Cancellation`] and is returned once every thread has stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Errors raised by the distributor itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DistributeError {
    #[error("concurrency must be greater than zero")]
    NotEnoughConcurrency,

    #[error("work distribution was cancelled")]
    Cancelled,
}

/// A cancellation flag shared between a run and everything it spawns.
///
/// Cancelling a token also cancels every token derived from it with
/// [`Cancellation::child`], but never its parent.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    // Shared by every token derived from the same root.
    notify: Arc<Notify>,
    parent: Option<Cancellation>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that is cancelled together with this one.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                notify: Arc::clone(&self.inner.notify),
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
            || self
                .inner
                .parent
                .as_ref()
                .is_some_and(Cancellation::is_cancelled)
    }

    /// Wait until this token or one of its ancestors is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Handle the producer uses to queue work items.
pub struct Feeder<'a, T> {
    sender: Sender<T>,
    cancel: &'a Cancellation,
}

impl<T> Feeder<'_, T> {
    /// Queue `item`, blocking while the queue is full.
    ///
    /// Fails with [`DistributeError::Cancelled`] once the run is cancelled or
    /// every worker has stopped, so a producer never blocks on a queue that
    /// nobody drains.
    pub fn send(&self, item: T) -> Result<(), DistributeError> {
        if self.cancel.is_cancelled() {
            return Err(DistributeError::Cancelled);
        }
        self.sender
            .send(item)
            .map_err(|_| DistributeError::Cancelled)
    }

    pub fn cancellation(&self) -> &Cancellation {
        self.cancel
    }
}

/// Feed the items emitted by `produce` to `concurrency` parallel `consume`
/// calls.
///
/// Returns once every queued item has been consumed, or with the first error
/// raised by the producer or any consumer. Workers finish the item they are
/// working on and check for cancellation before taking the next one. A
/// cancelled `cancel` token makes the call fail with
/// [`DistributeError::Cancelled`].
pub fn distribute<T, E, P, C>(
    cancel: &Cancellation,
    produce: P,
    consume: C,
    concurrency: usize,
) -> Result<(), E>
where
    T: Send,
    E: From<DistributeError> + Send,
    P: FnOnce(&Feeder<'_, T>) -> Result<(), E>,
    C: Fn(&Cancellation, T) -> Result<(), E> + Sync,
{
    if concurrency == 0 {
        return Err(DistributeError::NotEnoughConcurrency.into());
    }

    let cancel = cancel.child();
    let failure: Mutex<Option<E>> = Mutex::new(None);
    let fail = |err: E| {
        let mut slot = failure.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);
        cancel.cancel();
    };

    let (sender, receiver) = crossbeam_channel::bounded::<T>(concurrency);

    thread::scope(|scope| {
        // Workers own every receiver, so the queue closes as soon as the last
        // of them stops.
        for _ in 0..concurrency {
            let receiver = receiver.clone();
            let (cancel, consume, fail) = (&cancel, &consume, &fail);
            scope.spawn(move || loop {
                if cancel.is_cancelled() {
                    break;
                }
                let item = match receiver.recv() {
                    Ok(item) => item,
                    Err(_) => break,
                };
                if let Err(err) = consume(cancel, item) {
                    fail(err);
                    break;
                }
            });
        }
        drop(receiver);

        let feeder = Feeder {
            sender,
            cancel: &cancel,
        };
        if let Err(err) = produce(&feeder) {
            fail(err);
        }
    });

    if let Some(err) = failure.into_inner() {
        return Err(err);
    }
    if cancel.is_cancelled() {
        return Err(DistributeError::Cancelled.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Debug, PartialEq, thiserror::Error)]
    enum TestError {
        #[error("item {0} failed")]
        Item(usize),

        #[error("producer failed")]
        Producer,

        #[error(transparent)]
        Distribute(#[from] DistributeError),
    }

    fn feed_range(count: usize) -> impl FnOnce(&Feeder<'_, usize>) -> Result<(), TestError> {
        move |feeder| {
            for item in 0..count {
                feeder.send(item)?;
            }
            Ok(())
        }
    }

    #[test]
    fn delivers_every_item_exactly_once() {
        for concurrency in 1..=8 {
            let seen = Mutex::new(Vec::new());

            let result = distribute(
                &Cancellation::new(),
                feed_range(100),
                |_, item| {
                    seen.lock().push(item);
                    Ok::<_, TestError>(())
                },
                concurrency,
            );

            assert_eq!(result, Ok(()));
            let mut seen = seen.into_inner();
            seen.sort_unstable();
            assert_eq!(seen, (0..100).collect::<Vec<_>>(), "concurrency {concurrency}");
        }
    }

    #[test]
    fn consumers_run_in_parallel() {
        let barrier = std::sync::Barrier::new(4);

        let result = distribute(
            &Cancellation::new(),
            feed_range(4),
            |_, _| {
                barrier.wait();
                Ok::<_, TestError>(())
            },
            4,
        );

        assert_eq!(result, Ok(()));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let calls = AtomicUsize::new(0);

        let result = distribute(
            &Cancellation::new(),
            |feeder: &Feeder<'_, usize>| {
                calls.fetch_add(1, Ordering::SeqCst);
                feeder.send(1).map_err(TestError::from)
            },
            |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            0,
        );

        assert_eq!(
            result,
            Err(TestError::Distribute(DistributeError::NotEnoughConcurrency))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn returns_consumer_error() {
        let result = distribute(
            &Cancellation::new(),
            feed_range(50),
            |_, item| {
                if item == 7 {
                    return Err(TestError::Item(item));
                }
                Ok(())
            },
            4,
        );

        assert_eq!(result, Err(TestError::Item(7)));
    }

    #[test]
    fn returns_producer_error() {
        let consumed = AtomicUsize::new(0);

        let result = distribute(
            &Cancellation::new(),
            |feeder: &Feeder<'_, usize>| {
                feeder.send(1)?;
                Err(TestError::Producer)
            },
            |_, _| {
                consumed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            2,
        );

        assert_eq!(result, Err(TestError::Producer));
        assert!(consumed.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn producer_is_released_when_all_workers_fail() {
        // A single worker fails on the first item while the producer still
        // has far more items than the queue can hold.
        let result = distribute(
            &Cancellation::new(),
            feed_range(10_000),
            |_, item| Err(TestError::Item(item)),
            1,
        );

        assert_eq!(result, Err(TestError::Item(0)));
    }

    #[test]
    fn stops_taking_work_after_failure() {
        let consumed = AtomicUsize::new(0);

        let result = distribute(
            &Cancellation::new(),
            feed_range(1_000),
            |cancel, item| {
                consumed.fetch_add(1, Ordering::SeqCst);
                if item == 0 {
                    return Err(TestError::Item(item));
                }
                while !cancel.is_cancelled() {
                    thread::sleep(Duration::from_millis(1));
                }
                Ok(())
            },
            2,
        );

        assert_eq!(result, Err(TestError::Item(0)));
        assert!(consumed.load(Ordering::SeqCst) < 1_000);
    }

    #[test]
    fn observes_cancelled_parent() {
        let parent = Cancellation::new();
        parent.cancel();
        let consumed = AtomicUsize::new(0);

        let result = distribute(
            &parent,
            feed_range(10),
            |_, _| {
                consumed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            2,
        );

        assert_eq!(result, Err(TestError::Distribute(DistributeError::Cancelled)));
        assert_eq!(consumed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn child_follows_parent_but_not_the_other_way() {
        let parent = Cancellation::new();
        let child = parent.child();

        child.cancel();
        assert!(!parent.is_cancelled());

        let sibling = parent.child();
        parent.cancel();
        assert!(sibling.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_for_descendants() {
        let root = Cancellation::new();
        let grandchild = root.child().child();

        let waiter = tokio::spawn(async move { grandchild.cancelled().await });
        tokio::task::yield_now().await;
        root.cancel();

        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("cancellation was not observed")
            .unwrap();
    }
}
