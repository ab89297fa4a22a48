//! One in-flight construction shared by every caller waiting on the same key.

use crate::error::SetupResult;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

pub(crate) struct Flight<V> {
    outcome: Mutex<Option<SetupResult<Arc<V>>>>,
    done: Condvar,
}

impl<V> Flight<V> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        })
    }

    /// Publish the outcome and wake every waiter. Only the first call counts.
    pub(crate) fn complete(&self, outcome: SetupResult<Arc<V>>) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
            self.done.notify_all();
        }
    }

    /// Block until the outcome is published
    pub(crate) fn wait(&self) -> SetupResult<Arc<V>> {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SetupError;
    use std::thread;

    #[test]
    fn test_waiters_share_outcome() {
        let flight = Flight::<u32>::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let flight = Arc::clone(&flight);
                thread::spawn(move || flight.wait())
            })
            .collect();

        let value = Arc::new(42);
        flight.complete(Ok(Arc::clone(&value)));

        for waiter in waiters {
            let received = waiter.join().unwrap().unwrap();
            assert!(Arc::ptr_eq(&received, &value));
        }
    }

    #[test]
    fn test_first_outcome_wins() {
        let flight = Flight::<u32>::new();
        flight.complete(Err(SetupError::section_not_found("A")));
        flight.complete(Ok(Arc::new(1)));
        assert_eq!(flight.wait().err(), Some(SetupError::section_not_found("A")));
    }
}
