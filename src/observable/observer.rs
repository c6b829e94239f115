use std::rc::Rc;

use crate::emitter::{Channel, EventEmitter, ListenerToken, Notification};

use super::{CompleteCallback, ErrorCallback, ValueCallback};

/// Subscription handle: owns the dispatcher registrations made by one
/// `subscribe` call and can detach them without touching co-subscribers.
///
/// Dropping the handle does not detach; removal is explicit via
/// [`Observer::unsubscribe`].
pub struct Observer<T: Clone + 'static> {
    emitter: EventEmitter<T>,
    tokens: Vec<ListenerToken>,
}

impl<T: Clone + 'static> Observer<T> {
    pub(crate) fn attach(
        emitter: EventEmitter<T>,
        on_value: Option<ValueCallback<T>>,
        on_error: Option<ErrorCallback>,
        on_complete: Option<CompleteCallback>,
    ) -> Self {
        let mut tokens = Vec::new();
        if let Some(mut callback) = on_value {
            tokens.push(emitter.on(Channel::Next, move |notification| {
                if let Notification::Next(value) = notification {
                    callback(value.clone());
                }
            }));
        }
        if let Some(mut callback) = on_error {
            tokens.push(emitter.on(Channel::Error, move |notification| {
                if let Notification::Error(fault) = notification {
                    callback(Rc::clone(fault));
                }
            }));
        }
        if let Some(mut callback) = on_complete {
            tokens.push(emitter.on(Channel::Complete, move |_| callback()));
        }
        Observer { emitter, tokens }
    }

    /// Removes exactly this handle's registrations; future deliveries no
    /// longer reach its callbacks. Calling it again is a no-op.
    pub fn unsubscribe(&mut self) {
        for token in self.tokens.drain(..) {
            self.emitter.remove_listener(token);
        }
    }
}
