use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use thiserror::Error;

use crate::emitter::{Channel, EventEmitter, Fault, Notification};

mod observer;
mod pipeline;
mod subject;

pub use observer::*;
pub use pipeline::*;
pub use subject::*;

/// Callback invoked with each delivered value.
pub type ValueCallback<T> = Box<dyn FnMut(T)>;
/// Callback invoked with each delivered fault.
pub type ErrorCallback = Box<dyn FnMut(Fault)>;
/// Callback invoked on completion.
pub type CompleteCallback = Box<dyn FnMut()>;

/// A transformation applied to every value flowing through a pipeline
/// stage. Returning `Err` routes that value to the subscriber's error
/// callback instead of its value callback.
pub type Operator<T> = Rc<dyn Fn(T) -> Result<T, Box<dyn std::error::Error>>>;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("stream closed")]
    Closed,
}

/// A buffered element: a plain value, or a fault delivered on the error
/// channel in place of a value.
#[derive(Clone)]
pub enum Item<T> {
    Value(T),
    Fault(Fault),
}

/// Anything that hands out subscriptions and grows pipelines.
///
/// Both [`Observable`] and [`PipedObservable`] implement this, so pipeline
/// stages nest to arbitrary depth under one contract.
pub trait Subscribable<T: Clone + 'static> {
    /// Registers up to three callbacks against the stream's dispatcher and
    /// returns the handle owning those registrations.
    ///
    /// Delivery may happen synchronously inside this call: the first
    /// subscription on a cold observable drains the whole buffer before
    /// `subscribe` returns, and a panicking callback or operator unwinds
    /// out of it.
    fn subscribe(
        &self,
        on_value: Option<ValueCallback<T>>,
        on_error: Option<ErrorCallback>,
        on_complete: Option<CompleteCallback>,
    ) -> Observer<T>;

    /// Returns a stage applying `operators` left to right to every value
    /// before it reaches that stage's subscribers. Does not itself trigger
    /// subscription.
    fn pipe(&self, operators: Vec<Operator<T>>) -> PipedObservable<T>;
}

struct SourceState<T> {
    buffer: VecDeque<Item<T>>,
    started: bool,
    kept_open: bool,
}

/// A push-based data source over a single shared [`EventEmitter`].
///
/// A cold observable replays its construction-time buffer to the first
/// subscriber only; later subscribers see just the deliveries that happen
/// after they register. [`Observable::create`] builds the hot variant.
/// Clones are handles to the same stream.
pub struct Observable<T: Clone + 'static> {
    state: Rc<RefCell<SourceState<T>>>,
    emitter: EventEmitter<T>,
}

impl<T: Clone + 'static> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Observable {
            state: Rc::clone(&self.state),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Builds a cold observable from an ordered batch of values.
    pub fn new(values: impl IntoIterator<Item = T>) -> Self {
        Self::from_items(values.into_iter().map(Item::Value))
    }

    /// Builds a cold observable whose batch may carry faults alongside
    /// values.
    pub fn from_items(items: impl IntoIterator<Item = Item<T>>) -> Self {
        let state = Rc::new(RefCell::new(SourceState {
            buffer: items.into_iter().collect(),
            started: false,
            kept_open: false,
        }));
        let emitter = EventEmitter::new();
        let drain_state = Rc::clone(&state);
        let weak = emitter.downgrade();
        emitter.once(Channel::Subscribe, move |_| {
            if let Some(emitter) = weak.upgrade() {
                drain(&drain_state, &emitter);
            }
        });
        Observable { state, emitter }
    }

    /// Builds a hot observable: `kept_open` is set before any subscription,
    /// so draining never auto-completes, and the returned [`Subject`]
    /// injects values and closes the stream explicitly.
    pub fn create(values: impl IntoIterator<Item = T>) -> Subject<T> {
        Subject::new(Self::new(values))
    }

    /// True once the first subscription has fired; never resets.
    pub fn has_started(&self) -> bool {
        self.state.borrow().started
    }

    /// True once the dispatcher has been closed for every subscriber.
    pub fn is_closed(&self) -> bool {
        self.emitter.is_closed()
    }
}

/// Delivers the buffer front to back. A fault halts the drain with no
/// completion; otherwise completion fires exactly once, right after the
/// item that emptied the buffer of a stream that is not kept open. An
/// initially empty buffer emits nothing.
fn drain<T: Clone + 'static>(state: &Rc<RefCell<SourceState<T>>>, emitter: &EventEmitter<T>) {
    state.borrow_mut().started = true;
    log::debug!("draining {} buffered item(s)", state.borrow().buffer.len());
    loop {
        // take one item per iteration so listeners never observe a held borrow
        let item = state.borrow_mut().buffer.pop_front();
        match item {
            Some(Item::Value(value)) => emitter.emit(Notification::Next(value)),
            Some(Item::Fault(fault)) => {
                emitter.emit(Notification::Error(fault));
                return;
            }
            None => return,
        }
        let finished = {
            let state = state.borrow();
            state.buffer.is_empty() && !state.kept_open
        };
        if finished {
            emitter.emit(Notification::Complete);
            return;
        }
    }
}

impl<T: Clone + 'static> Subscribable<T> for Observable<T> {
    fn subscribe(
        &self,
        on_value: Option<ValueCallback<T>>,
        on_error: Option<ErrorCallback>,
        on_complete: Option<CompleteCallback>,
    ) -> Observer<T> {
        let observer = Observer::attach(self.emitter.clone(), on_value, on_error, on_complete);
        self.emitter.emit(Notification::Subscribe);
        observer
    }

    fn pipe(&self, operators: Vec<Operator<T>>) -> PipedObservable<T> {
        PipedObservable::new(self.emitter.clone(), operators)
    }
}
