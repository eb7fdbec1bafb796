//! Synchronous publish/subscribe channels connecting node outputs to node inputs.

use crate::error::StageResult;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// A subscriber callback.
pub type Slot<A> = Arc<dyn Fn(&A) -> StageResult + Send + Sync>;

/// An ordered list of subscribers for one event kind.
///
/// `emit` calls every subscriber on the caller's thread, in the order they
/// were connected, and stops at the first one that fails. Subscribers are
/// never disconnected.
pub struct Signal<A: ?Sized + 'static> {
    name: &'static str,
    slots: Mutex<Vec<Slot<A>>>,
}

impl<A: ?Sized + 'static> Signal<A> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Connects a free callback.
    pub fn connect<F>(&self, slot: F)
    where
        F: Fn(&A) -> StageResult + Send + Sync + 'static,
    {
        self.lock().push(Arc::new(slot));
    }

    /// Connects `method` on `target`. Only a weak reference to the target is
    /// held; once it is dropped the subscription becomes a no-op.
    pub fn connect_method<T, F>(&self, target: &Arc<T>, method: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&T, &A) -> StageResult + Send + Sync + 'static,
    {
        let target: Weak<T> = Arc::downgrade(target);
        self.connect(move |arg: &A| match target.upgrade() {
            Some(target) => method(&*target, arg),
            None => Ok(()),
        });
    }

    pub fn emit(&self, arg: &A) -> StageResult {
        // Snapshot so subscribers may connect further slots while we deliver.
        let slots: Vec<Slot<A>> = self.lock().clone();
        for slot in slots {
            slot(arg)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Slot<A>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: ?Sized + 'static> std::fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;

    #[test]
    fn test_emit_in_connection_order() {
        let signal: Signal<u32> = Signal::new("on_value");
        let seen = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            let seen = seen.clone();
            signal.connect(move |v: &u32| {
                seen.lock().unwrap().push((id, *v));
                Ok(())
            });
        }

        signal.emit(&7).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(0, 7), (1, 7), (2, 7)]);
        assert_eq!(signal.len(), 3);
    }

    #[test]
    fn test_emit_stops_at_first_error() {
        let signal: Signal<()> = Signal::new("on_first_input_set");
        let calls = Arc::new(Mutex::new(0));
        let c = calls.clone();
        signal.connect(move |_| {
            *c.lock().unwrap() += 1;
            Err(StageError::NotReady("first".into()))
        });
        let c = calls.clone();
        signal.connect(move |_| {
            *c.lock().unwrap() += 1;
            Ok(())
        });

        assert_eq!(signal.emit(&()), Err(StageError::NotReady("first".into())));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    struct Counter(Mutex<u32>);

    impl Counter {
        fn bump(&self, by: &u32) -> StageResult {
            *self.0.lock().unwrap() += by;
            Ok(())
        }
    }

    #[test]
    fn test_method_subscription_holds_weak_target() {
        let signal: Signal<u32> = Signal::new("on_value");
        let counter = Arc::new(Counter(Mutex::new(0)));
        signal.connect_method(&counter, Counter::bump);

        signal.emit(&2).unwrap();
        signal.emit(&3).unwrap();
        assert_eq!(*counter.0.lock().unwrap(), 5);

        drop(counter);
        assert!(signal.emit(&1).is_ok());
    }

    #[test]
    fn test_slot_may_connect_during_emit() {
        let signal: Arc<Signal<u32>> = Arc::new(Signal::new("on_value"));
        let s = signal.clone();
        signal.connect(move |_| {
            s.connect(|_| Ok(()));
            Ok(())
        });
        signal.emit(&0).unwrap();
        assert_eq!(signal.len(), 2);
    }
}
