use crate::emitter::Notification;

use super::{Observable, StreamError};

/// Hot-stream handle produced by [`Observable::create`].
///
/// The underlying observable is kept open past buffer drainage: completion
/// never fires on its own, values are injected with [`Subject::next`], and
/// [`Subject::close`] ends delivery for every subscriber at once.
pub struct Subject<T: Clone + 'static> {
    observable: Observable<T>,
}

impl<T: Clone + 'static> Subject<T> {
    pub(crate) fn new(observable: Observable<T>) -> Self {
        observable.state.borrow_mut().kept_open = true;
        Subject { observable }
    }

    /// Emits `value` straight on the next channel, bypassing the buffer.
    /// Fails once the stream has been closed.
    pub fn next(&self, value: T) -> Result<(), StreamError> {
        if self.observable.emitter.is_closed() {
            return Err(StreamError::Closed);
        }
        self.observable.emitter.emit(Notification::Next(value));
        Ok(())
    }

    /// Emits one final completion, then closes the dispatcher for good:
    /// no listener of this stream ever fires again.
    pub fn close(&self) -> Result<(), StreamError> {
        if self.observable.emitter.is_closed() {
            return Err(StreamError::Closed);
        }
        self.observable.state.borrow_mut().kept_open = false;
        self.observable.emitter.emit(Notification::Complete);
        self.observable.emitter.remove_all_listeners();
        Ok(())
    }

    /// The underlying observable, for `subscribe` and `pipe`.
    pub fn observable(&self) -> &Observable<T> {
        &self.observable
    }
}
