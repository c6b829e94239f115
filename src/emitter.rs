use std::cell::RefCell;
use std::collections::VecDeque;
use std::error::Error;
use std::rc::{Rc, Weak};

/// A shared, reference-counted failure delivered on the error channel.
///
/// Faults fan out to every registered error listener, hence the `Rc`.
pub type Fault = Rc<dyn Error + 'static>;

/// The channels a stream signals on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Next,
    Error,
    Complete,
    Subscribe,
}

/// A signal paired with its payload.
pub enum Notification<T> {
    Next(T),
    Error(Fault),
    Complete,
    Subscribe,
}

impl<T> Notification<T> {
    pub fn channel(&self) -> Channel {
        match self {
            Notification::Next(_) => Channel::Next,
            Notification::Error(_) => Channel::Error,
            Notification::Complete => Channel::Complete,
            Notification::Subscribe => Channel::Subscribe,
        }
    }
}

/// Identifies a single registration so it can be removed without touching
/// other listeners on the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerToken(u64);

type Callback<T> = Rc<RefCell<dyn FnMut(&Notification<T>)>>;

struct Entry<T> {
    token: ListenerToken,
    channel: Channel,
    once: bool,
    callback: Callback<T>,
}

/// A multicast hub mapping channels to ordered listener lists.
///
/// Cloning yields another handle to the same hub; every observable owns
/// exactly one hub and shares it by handle with its observers and pipeline
/// stages. Delivery is synchronous: [`EventEmitter::emit`] runs every
/// listener to completion before it returns, and a panicking listener
/// unwinds to the emitting call site.
pub struct EventEmitter<T> {
    inner: Rc<RefCell<EmitterInner<T>>>,
}

struct EmitterInner<T> {
    entries: Vec<Entry<T>>,
    queue: VecDeque<Notification<T>>,
    emitting: bool,
    closed: bool,
    next_token: u64,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        EventEmitter {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        EventEmitter {
            inner: Rc::new(RefCell::new(EmitterInner {
                entries: Vec::new(),
                queue: VecDeque::new(),
                emitting: false,
                closed: false,
                next_token: 0,
            })),
        }
    }

    /// Registers `callback` for `channel`. Listeners on one channel fire in
    /// registration order.
    pub fn on(
        &self,
        channel: Channel,
        callback: impl FnMut(&Notification<T>) + 'static,
    ) -> ListenerToken {
        self.register(channel, false, callback)
    }

    /// Registers `callback` for `channel`, deregistering it after its first
    /// invocation. The entry is removed before the callback runs, so a
    /// re-entrant emit of the same channel cannot re-trigger it.
    pub fn once(
        &self,
        channel: Channel,
        callback: impl FnMut(&Notification<T>) + 'static,
    ) -> ListenerToken {
        self.register(channel, true, callback)
    }

    fn register(
        &self,
        channel: Channel,
        once: bool,
        callback: impl FnMut(&Notification<T>) + 'static,
    ) -> ListenerToken {
        let mut inner = self.inner.borrow_mut();
        let token = ListenerToken(inner.next_token);
        inner.next_token += 1;
        // a closed hub never fires again; the token is dead on arrival
        if inner.closed {
            return token;
        }
        inner.entries.push(Entry {
            token,
            channel,
            once,
            callback: Rc::new(RefCell::new(callback)),
        });
        token
    }

    /// Synchronously invokes every listener currently registered for the
    /// notification's channel, in registration order, then returns.
    ///
    /// The listener list is snapshotted per notification: listeners
    /// registered while an emit is in flight see only later notifications,
    /// and `once` entries are already gone when their callback runs.
    /// Emitting on a closed hub is a no-op.
    ///
    /// Emits issued from inside a listener are queued and run to
    /// completion, in order, before the outermost `emit` returns. A
    /// listener therefore never re-enters itself, but still observes every
    /// delivery it caused before its own triggering call finishes.
    pub fn emit(&self, notification: Notification<T>) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.closed {
                return;
            }
            if inner.emitting {
                inner.queue.push_back(notification);
                return;
            }
            inner.emitting = true;
        }
        let mut current = Some(notification);
        while let Some(notification) = current.take() {
            let channel = notification.channel();
            let batch: Vec<Callback<T>> = {
                let mut inner = self.inner.borrow_mut();
                if inner.closed {
                    // closed mid-run: nothing queued may be delivered
                    inner.queue.clear();
                    Vec::new()
                } else {
                    let mut batch = Vec::new();
                    inner.entries.retain(|entry| {
                        if entry.channel != channel {
                            return true;
                        }
                        batch.push(Rc::clone(&entry.callback));
                        !entry.once
                    });
                    batch
                }
            };
            log::trace!("emit on {:?}: {} listener(s)", channel, batch.len());
            for callback in batch {
                (callback.borrow_mut())(&notification);
            }
            current = self.inner.borrow_mut().queue.pop_front();
        }
        self.inner.borrow_mut().emitting = false;
    }

    /// Removes the registration behind `token`; `false` when it was already
    /// gone.
    pub fn remove_listener(&self, token: ListenerToken) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.entries.len();
        inner.entries.retain(|entry| entry.token != token);
        inner.entries.len() < before
    }

    /// Terminal transition: clears every channel's listeners and marks the
    /// hub closed. Every later emit is a no-op, for all co-subscribers at
    /// once.
    pub fn remove_all_listeners(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.entries.clear();
        inner.queue.clear();
        inner.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    pub(crate) fn downgrade(&self) -> WeakEmitter<T> {
        WeakEmitter(Rc::downgrade(&self.inner))
    }
}

/// Non-owning emitter handle, so internal listeners stored inside the hub
/// do not keep the hub alive through themselves.
pub(crate) struct WeakEmitter<T>(Weak<RefCell<EmitterInner<T>>>);

impl<T> WeakEmitter<T> {
    pub(crate) fn upgrade(&self) -> Option<EventEmitter<T>> {
        self.0.upgrade().map(|inner| EventEmitter { inner })
    }
}
