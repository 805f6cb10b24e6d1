// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Single-flight coalescing of concurrent identical async requests.
//!
//! [`FlightGroup`] deduplicates work by key. While a call for a key is running, further
//! calls for the same key do not start their own work: they wait for the running one and
//! receive a clone of its output. As soon as the work finishes the key is released, so
//! nothing outlives the flight. In particular an error returned by the work is handed to the
//! callers that were waiting and then forgotten; the next caller runs the work again.
//!
//! # Cancellation
//!
//! If the caller running the work is dropped, the work is dropped with it and the next
//! waiting caller runs its own closure instead. Waiting callers can be dropped at any time.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use bucketeer_flight::FlightGroup;
//!
//! # futures::executor::block_on(async {
//! let group = FlightGroup::new();
//! let calls = AtomicUsize::new(0);
//!
//! let lookup = || async {
//!     calls.fetch_add(1, Ordering::Relaxed);
//!     vec!["rule-1".to_string()]
//! };
//!
//! let (a, b) = futures::join!(
//!     group.work("env-1", lookup),
//!     group.work("env-1", lookup),
//! );
//!
//! assert_eq!(a, b);
//! assert_eq!(calls.load(Ordering::Relaxed), 1);
//! # });
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Flights<K, T> = Arc<Mutex<HashMap<K, Weak<Flight<T>>>>>;

/// The shared state of one in-flight call.
///
/// Whoever holds `output` runs the work; everyone queued on it reads the stored output
/// once they get their turn.
struct Flight<T> {
    output: tokio::sync::Mutex<Option<T>>,
}

/// Deduplicates concurrent async work by key.
///
/// Cloning a group is cheap and the clones share in-flight calls.
pub struct FlightGroup<K, T> {
    flights: Flights<K, T>,
}

impl<K, T> Default for FlightGroup<K, T> {
    fn default() -> Self {
        Self {
            flights: Arc::default(),
        }
    }
}

impl<K, T> Clone for FlightGroup<K, T> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<K: Debug, T> Debug for FlightGroup<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightGroup")
            .field("in_flight", &self.flights.lock().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K, T> FlightGroup<K, T>
where
    K: Hash + Eq + Clone,
{
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys with a call in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.flights.lock().values().filter(|flight| flight.strong_count() > 0).count()
    }

    /// Runs `func` for `key` unless a call for `key` is already in flight, in which case
    /// the output of that call is returned instead.
    ///
    /// The call joins the flight when this method is invoked, not when the future is first
    /// polled.
    pub fn work<F, Fut>(&self, key: K, func: F) -> impl Future<Output = T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
        T: Clone,
    {
        let ticket = self.join(key);
        async move { ticket.run(func).await }
    }

    fn join(&self, key: K) -> Ticket<K, T> {
        let mut flights = self.flights.lock();
        let flight = match flights.get(&key).and_then(Weak::upgrade) {
            Some(flight) => flight,
            None => {
                let flight = Arc::new(Flight {
                    output: tokio::sync::Mutex::new(None),
                });
                flights.insert(key.clone(), Arc::downgrade(&flight));
                flight
            }
        };

        Ticket {
            flight,
            key,
            flights: Arc::clone(&self.flights),
        }
    }
}

/// One caller's membership in a flight.
///
/// Dropping the last ticket of an unfinished flight releases its key.
struct Ticket<K: Hash + Eq, T> {
    flight: Arc<Flight<T>>,
    key: K,
    flights: Flights<K, T>,
}

impl<K: Hash + Eq, T: Clone> Ticket<K, T> {
    async fn run<F, Fut>(self, func: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut output = self.flight.output.lock().await;
        if let Some(value) = output.as_ref() {
            return value.clone();
        }

        let value = func().await;
        *output = Some(value.clone());
        drop(output);

        self.release();
        value
    }

    /// Removes the key if it still maps to this ticket's flight.
    fn release(&self) {
        let mut flights = self.flights.lock();
        if flights
            .get(&self.key)
            .is_some_and(|flight| Weak::ptr_eq(flight, &Arc::downgrade(&self.flight)))
        {
            flights.remove(&self.key);
        }
    }
}

impl<K: Hash + Eq, T> Drop for Ticket<K, T> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock();
        // Other callers only obtain the flight under this lock, so the count is stable here.
        if Arc::strong_count(&self.flight) == 1
            && flights
                .get(&self.key)
                .is_some_and(|flight| Weak::ptr_eq(flight, &Arc::downgrade(&self.flight)))
        {
            flights.remove(&self.key);
        }
    }
}
