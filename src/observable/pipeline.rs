use std::cell::RefCell;
use std::rc::Rc;

use crate::emitter::{EventEmitter, Notification};

use super::{
    CompleteCallback, ErrorCallback, Observer, Operator, Subscribable, ValueCallback,
};

/// Wraps an infallible transformation as a pipeline operator.
pub fn map<T: 'static>(f: impl Fn(T) -> T + 'static) -> Operator<T> {
    Rc::new(move |value| Ok(f(value)))
}

/// A composable pipeline stage bound to the dispatcher of the observable
/// it was piped from.
///
/// Each subscriber's value callback sees every raw value threaded through
/// the stage's operators left to right; error and complete signals pass
/// through untransformed. Stages hold no listeners of their own, so
/// composing them never re-wraps what is already registered.
pub struct PipedObservable<T: Clone + 'static> {
    emitter: EventEmitter<T>,
    operators: Vec<Operator<T>>,
}

impl<T: Clone + 'static> PipedObservable<T> {
    pub(crate) fn new(emitter: EventEmitter<T>, operators: Vec<Operator<T>>) -> Self {
        PipedObservable { emitter, operators }
    }
}

impl<T: Clone + 'static> Subscribable<T> for PipedObservable<T> {
    fn subscribe(
        &self,
        on_value: Option<ValueCallback<T>>,
        on_error: Option<ErrorCallback>,
        on_complete: Option<CompleteCallback>,
    ) -> Observer<T> {
        // the error callback serves both upstream faults and operator
        // failures, so it is shared between the two registrations
        let shared_error = on_error.map(|callback| Rc::new(RefCell::new(callback)));
        let wrapped_value = on_value.map(|mut callback| {
            let operators = self.operators.clone();
            let on_fault = shared_error.clone();
            Box::new(move |value: T| {
                let mut current = value;
                for operator in &operators {
                    match operator(current) {
                        Ok(next) => current = next,
                        Err(error) => {
                            if let Some(on_fault) = &on_fault {
                                (on_fault.borrow_mut())(Rc::from(error));
                            }
                            return;
                        }
                    }
                }
                callback(current)
            }) as ValueCallback<T>
        });
        let passthrough_error = shared_error.map(|shared| {
            Box::new(move |fault| (shared.borrow_mut())(fault)) as ErrorCallback
        });

        let observer = Observer::attach(
            self.emitter.clone(),
            wrapped_value,
            passthrough_error,
            on_complete,
        );
        self.emitter.emit(Notification::Subscribe);
        observer
    }

    fn pipe(&self, operators: Vec<Operator<T>>) -> PipedObservable<T> {
        let mut combined = self.operators.clone();
        combined.extend(operators);
        PipedObservable::new(self.emitter.clone(), combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::tests::{bad_payload, observe, Record};
    use crate::observable::{Item, Observable};

    fn double() -> Operator<i32> {
        map(|value| value * 2)
    }

    fn reject_even() -> Operator<i32> {
        Rc::new(|value| {
            if value % 2 == 0 {
                Err(format!("rejected {value}").into())
            } else {
                Ok(value * 10)
            }
        })
    }

    #[test]
    fn stages_apply_in_order_and_complete_passes_through() {
        let record = Rc::new(RefCell::new(Record::default()));
        let stream = Observable::new([1, 2, 3]);

        observe(&stream.pipe(vec![double(), map(|value| value + 1)]), &record);

        let record = record.borrow();
        assert_eq!(record.values, vec![3, 5, 7]);
        assert_eq!(record.completions, 1);
        assert!(record.faults.is_empty());
    }

    #[test]
    fn doubling_pipe_yields_doubled_values() {
        let record = Rc::new(RefCell::new(Record::default()));
        let stream = Observable::new([1, 2, 3]);

        observe(&stream.pipe(vec![double()]), &record);

        assert_eq!(record.borrow().values, vec![2, 4, 6]);
    }

    #[test]
    fn piping_a_stage_appends_operators() {
        let record = Rc::new(RefCell::new(Record::default()));
        let stream = Observable::new([1, 2, 3]);

        let stage = stream.pipe(vec![double()]).pipe(vec![map(|value| value + 1)]);
        observe(&stage, &record);

        assert_eq!(record.borrow().values, vec![3, 5, 7]);
    }

    #[test]
    fn failing_operator_routes_that_value_to_the_error_callback() {
        let record = Rc::new(RefCell::new(Record::default()));
        let stream = Observable::new([1, 2, 3]);

        observe(&stream.pipe(vec![reject_even()]), &record);

        // the upstream drain keeps going past a per-subscriber failure
        let record = record.borrow();
        assert_eq!(record.values, vec![10, 30]);
        assert_eq!(record.faults, vec!["rejected 2"]);
        assert_eq!(record.completions, 1);
    }

    #[test]
    fn operator_failure_does_not_disturb_co_subscribers() -> Result<(), anyhow::Error> {
        let piped = Rc::new(RefCell::new(Record::default()));
        let plain = Rc::new(RefCell::new(Record::default()));
        let subject = Observable::create(Vec::<i32>::new());

        // register the piped subscriber first so its failure happens while
        // the plain subscriber is still due the same value
        let stage = subject.observable().pipe(vec![reject_even()]);
        observe(&stage, &piped);
        observe(subject.observable(), &plain);
        subject.next(1)?;
        subject.next(2)?;

        assert_eq!(piped.borrow().values, vec![10]);
        assert_eq!(piped.borrow().faults, vec!["rejected 2"]);
        assert_eq!(plain.borrow().values, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn upstream_faults_pass_through_untransformed() {
        let record = Rc::new(RefCell::new(Record::default()));
        let stream = Observable::from_items(vec![Item::Value(1), Item::Fault(bad_payload())]);

        observe(&stream.pipe(vec![double()]), &record);

        let record = record.borrow();
        assert_eq!(record.values, vec![2]);
        assert_eq!(record.faults, vec!["bad payload"]);
        assert_eq!(record.completions, 0);
    }
}
