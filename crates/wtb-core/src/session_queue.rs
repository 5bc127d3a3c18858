//! Per-user FIFO execution.
//!
//! Each key maps to the tail of its chain: a receiver that resolves when the
//! most recently queued task for that key settles. A new task takes the
//! previous tail out of the map, installs its own, and waits on the previous
//! one before running. Tasks for different keys never wait on each other.
//!
//! A task dropped while still waiting passes its unfinished predecessor on:
//! to its successor if there is one, otherwise back into the map as the tail.
//!
//! Entries are removed as soon as their task settles, but only if no newer
//! task has replaced them (compare-and-delete on a ticket number).

use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::oneshot::{self, error::TryRecvError};

struct Tail {
    ticket: u64,
    settled: oneshot::Receiver<Handoff>,
}

/// Sent when a task settles. Carries the predecessor a dropped task was
/// still waiting on, if any.
struct Handoff(Option<Tail>);

struct Inner<K> {
    next_ticket: u64,
    tails: HashMap<K, Tail>,
}

pub struct SessionQueue<K> {
    inner: Arc<Mutex<Inner<K>>>,
}

impl<K> Clone for SessionQueue<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Eq + Hash + Clone> Default for SessionQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<K>(inner: &Mutex<Inner<K>>) -> MutexGuard<'_, Inner<K>> {
    // Map mutations never panic midway, so a poisoned lock still holds a
    // consistent map.
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K: Eq + Hash + Clone> SessionQueue<K> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_ticket: 0,
                tails: HashMap::new(),
            })),
        }
    }

    /// Queue `task` behind everything already queued for `key`.
    ///
    /// The slot is taken when `enqueue` is called, not when the returned
    /// future is first polled, so call order is execution order. The previous
    /// task's outcome is ignored for sequencing; the caller still gets this
    /// task's own output. Dropping the returned future gives up the slot
    /// without letting later tasks jump ahead of a running one.
    pub fn enqueue<F>(&self, key: K, task: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        let (tx, rx) = oneshot::channel();
        let (ticket, previous) = {
            let mut inner = lock(&self.inner);
            inner.next_ticket += 1;
            let ticket = inner.next_ticket;
            let previous = inner.tails.insert(
                key.clone(),
                Tail {
                    ticket,
                    settled: rx,
                },
            );
            (ticket, previous)
        };

        let mut release = Release {
            inner: Arc::clone(&self.inner),
            key,
            ticket,
            previous,
            settled: Some(tx),
        };

        async move {
            while let Some(previous) = release.previous.as_mut() {
                // A closed channel means the sender is gone: nothing left to wait on.
                let next = (&mut previous.settled).await.ok().and_then(|h| h.0);
                release.previous = next;
            }
            task.await
        }
    }

    /// Number of keys with queued or running work.
    pub fn len(&self) -> usize {
        lock(&self.inner).tails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Signals the successor and garbage-collects the entry when a task settles,
/// whether it finished, failed, panicked, or was dropped.
struct Release<K: Eq + Hash + Clone> {
    inner: Arc<Mutex<Inner<K>>>,
    key: K,
    ticket: u64,
    /// Predecessor not yet settled; `None` once this task is running.
    previous: Option<Tail>,
    settled: Option<oneshot::Sender<Handoff>>,
}

impl<K: Eq + Hash + Clone> Drop for Release<K> {
    fn drop(&mut self) {
        // The handoff is sent under the lock so a predecessor cannot settle
        // between the `try_recv` below and its own map check.
        let mut inner = lock(&self.inner);
        let mut pending = self.previous.take();

        if inner.tails.get(&self.key).map(|t| t.ticket) == Some(self.ticket) {
            inner.tails.remove(&self.key);
            while let Some(mut prev) = pending.take() {
                match prev.settled.try_recv() {
                    Err(TryRecvError::Empty) => {
                        inner.tails.insert(self.key.clone(), prev);
                    }
                    Ok(Handoff(next)) => pending = next,
                    Err(TryRecvError::Closed) => {}
                }
            }
        }

        if let Some(tx) = self.settled.take() {
            let _ = tx.send(Handoff(pending));
        }
    }
}
