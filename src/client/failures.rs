//! One-shot failure subscriptions.
//!
//! Each issued call owns a [`FailureHub`]. Subscriptions registered on the
//! hub fire at most once; a single failure drains them all together, and
//! registrations arriving after the failure never fire.

use std::sync::Mutex;

use uuid::Uuid;

use crate::error::ApiError;

/// Identifier handed back when a failure subscription is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) type FailureCallback = Box<dyn FnOnce(&ApiError) + Send>;

struct HubState {
    fired: bool,
    subscribers: Vec<(SubscriptionId, FailureCallback)>,
}

/// Failure fan-out for a single call.
pub(crate) struct FailureHub {
    state: Mutex<HubState>,
}

impl FailureHub {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(HubState {
                fired: false,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Register a one-shot callback. After the call has already failed the
    /// callback is dropped unfired; the id is still returned.
    pub(crate) fn subscribe(&self, callback: FailureCallback) -> SubscriptionId {
        let id = SubscriptionId::new();
        let mut state = self.state.lock().unwrap();
        if !state.fired {
            state.subscribers.push((id, callback));
        }
        id
    }

    /// Fire and remove every subscription. Later reports find nothing.
    pub(crate) fn report(&self, error: &ApiError) {
        let drained = {
            let mut state = self.state.lock().unwrap();
            state.fired = true;
            std::mem::take(&mut state.subscribers)
        };
        for (_, callback) in drained {
            callback(error);
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap().subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::error::TransportError;

    fn error() -> ApiError {
        ApiError::Other {
            source: TransportError::ConnectionFailed {
                message: "down".to_string(),
            },
        }
    }

    #[test]
    fn every_subscriber_fires_exactly_once() {
        let hub = FailureHub::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let fired = Arc::clone(&fired);
            hub.subscribe(Box::new(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            }));
        }

        hub.report(&error());
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(hub.subscriber_count(), 0);

        // A second report finds nothing to fire.
        hub.report(&error());
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn late_registration_never_fires() {
        let hub = FailureHub::new();
        hub.report(&error());

        let fired = Arc::new(AtomicUsize::new(0));
        let late = Arc::clone(&fired);
        hub.subscribe(Box::new(move |_| {
            late.fetch_add(1, Ordering::SeqCst);
        }));

        hub.report(&error());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ids_are_unique() {
        let hub = FailureHub::new();
        let a = hub.subscribe(Box::new(|_| {}));
        let b = hub.subscribe(Box::new(|_| {}));
        assert_ne!(a, b);
    }

    #[test]
    fn callbacks_see_the_reported_error() {
        let hub = FailureHub::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        hub.subscribe(Box::new(move |error| {
            *sink.lock().unwrap() = Some(error.clone());
        }));

        hub.report(&error());
        assert_eq!(seen.lock().unwrap().clone(), Some(error()));
    }
}
