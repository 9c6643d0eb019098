// MIT License - Copyright (c) 2026 Peter Wright
// One-shot waiters for async messages, registered before the request is sent

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::time::{timeout, Duration};

use crate::error::{Result, StackError};
use crate::znp::{AsyncMessage, Indication};

type Predicate = Box<dyn Fn(&AsyncMessage) -> bool + Send>;

struct Waiter {
    id: u64,
    predicate: Predicate,
    reply: oneshot::Sender<AsyncMessage>,
}

#[derive(Default)]
struct Waiters {
    next_id: u64,
    pending: Vec<Waiter>,
    closed: bool,
}

/// Registry of `(predicate, completion)` pairs behind a single lock.
///
/// The event loop calls [`dispatch`](Subscriptions::dispatch) for every async
/// message; the first message accepted by a waiter's predicate completes it
/// and removes it from the registry.
#[derive(Default)]
pub struct Subscriptions {
    waiters: Mutex<Waiters>,
}

impl Subscriptions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait for the next `T` accepted by `filter`.
    ///
    /// The waiter is live as soon as this returns, so a response that
    /// arrives before [`Subscription::wait`] is polled is not missed.
    pub fn register<T, F>(self: &Arc<Self>, filter: F) -> Subscription<T>
    where
        T: Indication,
        F: Fn(&T) -> bool + Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();
        let predicate: Predicate = Box::new(move |message| T::from_message(message).is_some_and(|m| filter(m)));

        let mut waiters = self.lock();
        waiters.next_id += 1;
        let id = waiters.next_id;
        if !waiters.closed {
            waiters.pending.push(Waiter { id, predicate, reply });
        }

        Subscription {
            id,
            registry: Arc::clone(self),
            receiver,
            _kind: PhantomData,
        }
    }

    /// Complete every waiter that accepts `message`; returns how many were woken.
    pub fn dispatch(&self, message: &AsyncMessage) -> usize {
        let mut waiters = self.lock();
        let mut woken = 0;
        let mut i = 0;
        while i < waiters.pending.len() {
            if (waiters.pending[i].predicate)(message) {
                let waiter = waiters.pending.remove(i);
                if waiter.reply.send(message.clone()).is_ok() {
                    woken += 1;
                }
            } else {
                i += 1;
            }
        }
        woken
    }

    /// Fail all current and future waiters with `TransportClosed`.
    pub fn close(&self) {
        let mut waiters = self.lock();
        waiters.closed = true;
        waiters.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.lock().pending.retain(|waiter| waiter.id != id);
    }

    fn lock(&self) -> MutexGuard<'_, Waiters> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A registered waiter. Dropping it unregisters.
pub struct Subscription<T> {
    id: u64,
    registry: Arc<Subscriptions>,
    receiver: oneshot::Receiver<AsyncMessage>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Indication> Subscription<T> {
    pub async fn wait(mut self, limit: Duration) -> Result<T> {
        match timeout(limit, &mut self.receiver).await {
            Ok(Ok(message)) => T::from_message(&message).cloned().ok_or_else(|| StackError::UnexpectedResponse {
                details: format!("expected {}, got {}", T::NAME, message.name()),
            }),
            Ok(Err(_)) => Err(StackError::TransportClosed),
            Err(_) => Err(StackError::Timeout(limit, T::NAME)),
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
