//! Push-based reactive streams delivered synchronously over a shared
//! multicast dispatcher.
//!
//! A cold [`Observable`] replays its construction-time buffer to the first
//! subscriber; [`Observable::create`] returns a hot [`Subject`] that stays
//! open for injected values until closed. [`Subscribable::pipe`] chains
//! transformation stages over the same dispatcher without re-implementing
//! dispatch.
//!
//! Delivery is single-threaded and fully synchronous: an emit runs every
//! listener to completion before returning, so a panicking callback or
//! operator unwinds straight out of whichever call triggered delivery.
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//! use pushstream::{map, Observable, Subscribable};
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//!
//! let stream = Observable::new([1, 2, 3]);
//! let _handle = stream.pipe(vec![map(|n| n * 2)]).subscribe(
//!     Some(Box::new(move |n| sink.borrow_mut().push(n))),
//!     None,
//!     None,
//! );
//!
//! assert_eq!(*seen.borrow(), vec![2, 4, 6]);
//! ```

mod emitter;
mod observable;

pub use emitter::{Channel, EventEmitter, Fault, ListenerToken, Notification};
pub use observable::*;
