//! Single-flight resolution
//!
//! The first caller for a key starts the computation on a background task;
//! every caller arriving before it settles joins the same
//! [`Shared`] future. Slot bookkeeping happens under one mutex, and the
//! caller's `start` closure is never invoked while that mutex is held.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::debug;
use tokio::sync::oneshot;

use crate::utils::{EngageError, Result};

/// Pending or settled resolution handed to callers
pub type Flight<T> = BoxFuture<'static, Result<T>>;

type SharedFlight<T> = Shared<BoxFuture<'static, Result<T>>>;

/// What happens to a key once its computation settles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Successful values are kept and served to every later caller.
    /// Failures are delivered to the joined callers only.
    KeepValue,
    /// The slot is dropped; the next caller starts afresh.
    Forget,
}

enum Slot<T> {
    InFlight {
        generation: u64,
        flight: SharedFlight<T>,
    },
    Settled(T),
}

struct FlightTable<K, T> {
    slots: HashMap<K, Slot<T>>,
    next_generation: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keyed at-most-once computation
pub struct SingleFlight<K, T> {
    table: Arc<Mutex<FlightTable<K, T>>>,
    retention: Retention,
}

impl<K, T> Clone for SingleFlight<K, T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            retention: self.retention,
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(retention: Retention) -> Self {
        Self {
            table: Arc::new(Mutex::new(FlightTable {
                slots: HashMap::new(),
                next_generation: 0,
            })),
            retention,
        }
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// Resolve `key`, starting `start` only if nothing is settled or in flight.
    ///
    /// Must be called from within a Tokio runtime. The computation runs to
    /// completion even if every caller drops its [`Flight`].
    pub fn resolve<F, Fut>(&self, key: K, start: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (generation, sender, flight) = {
            let mut table = lock(&self.table);
            match table.slots.get(&key) {
                Some(Slot::Settled(value)) => {
                    let value = value.clone();
                    return async move { Ok(value) }.boxed();
                }
                Some(Slot::InFlight { flight, .. }) => {
                    debug!("joining in-flight computation");
                    return flight.clone().boxed();
                }
                None => {}
            }

            let generation = table.next_generation;
            table.next_generation += 1;

            let (sender, receiver) = oneshot::channel::<Result<T>>();
            let flight = async move {
                receiver.await.unwrap_or_else(|_| {
                    Err(EngageError::TaskFailed(
                        "computation ended without settling".into(),
                    ))
                })
            }
            .boxed()
            .shared();

            table.slots.insert(
                key.clone(),
                Slot::InFlight {
                    generation,
                    flight: flight.clone(),
                },
            );
            (generation, sender, flight)
        };

        let computation = start();
        let mut guard = SettleGuard {
            table: Arc::clone(&self.table),
            key: Some(key),
            generation,
        };
        let retention = self.retention;

        tokio::spawn(async move {
            let result = computation.await;
            // Slot first, then waiters: anyone arriving after this point
            // sees the settled state instead of a finished flight.
            guard.settle(&result, retention);
            let _ = sender.send(result);
        });

        flight.boxed()
    }

    /// Settled value for `key`, if any
    pub fn peek(&self, key: &K) -> Option<T> {
        match lock(&self.table).slots.get(key) {
            Some(Slot::Settled(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Replace whatever `key` holds with a settled value.
    ///
    /// An in-flight computation for `key` still answers its joined callers
    /// but no longer writes the slot.
    pub fn set(&self, key: K, value: T) {
        lock(&self.table).slots.insert(key, Slot::Settled(value));
    }

    /// Edit the settled value for `key` in place, under the table lock.
    ///
    /// `edit` runs with the table locked and must not touch this flight.
    /// It returns whether it changed anything; the result is `false` when
    /// nothing is settled for `key`.
    pub fn update(&self, key: &K, edit: impl FnOnce(&mut T) -> bool) -> bool {
        match lock(&self.table).slots.get_mut(key) {
            Some(Slot::Settled(value)) => edit(value),
            _ => false,
        }
    }

    /// Drop the slot for `key`, settled or not
    pub fn forget(&self, key: &K) {
        lock(&self.table).slots.remove(key);
    }

    /// Drop every slot
    pub fn clear(&self) {
        lock(&self.table).slots.clear();
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        matches!(
            lock(&self.table).slots.get(key),
            Some(Slot::InFlight { .. })
        )
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.table)
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::InFlight { .. }))
            .count()
    }
}

/// Clears the owning slot even if the computation panics
struct SettleGuard<K: Eq + Hash, T> {
    table: Arc<Mutex<FlightTable<K, T>>>,
    key: Option<K>,
    generation: u64,
}

impl<K: Eq + Hash, T: Clone> SettleGuard<K, T> {
    fn settle(&mut self, result: &Result<T>, retention: Retention) {
        let Some(key) = self.key.take() else { return };
        let mut table = lock(&self.table);
        if !owns_slot(&table, &key, self.generation) {
            return;
        }
        match (retention, result) {
            (Retention::KeepValue, Ok(value)) => {
                table.slots.insert(key, Slot::Settled(value.clone()));
            }
            _ => {
                table.slots.remove(&key);
            }
        }
    }
}

impl<K: Eq + Hash, T> Drop for SettleGuard<K, T> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let mut table = lock(&self.table);
            if owns_slot(&table, &key, self.generation) {
                table.slots.remove(&key);
            }
        }
    }
}

fn owns_slot<K: Eq + Hash, T>(table: &FlightTable<K, T>, key: &K, generation: u64) -> bool {
    matches!(
        table.slots.get(key),
        Some(Slot::InFlight { generation: g, .. }) if *g == generation
    )
}

/// A single value resolved at most once and then kept
///
/// Thin wrapper over a one-slot [`SingleFlight`] with
/// [`Retention::KeepValue`].
pub struct AsyncValue<T> {
    flight: SingleFlight<(), T>,
}

impl<T> Clone for AsyncValue<T> {
    fn clone(&self) -> Self {
        Self {
            flight: self.flight.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> AsyncValue<T> {
    pub fn new() -> Self {
        Self {
            flight: SingleFlight::new(Retention::KeepValue),
        }
    }

    /// Resolved value, or join/start its computation
    pub fn get_or_resolve<F, Fut>(&self, start: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.flight.resolve((), start)
    }

    pub fn peek(&self) -> Option<T> {
        self.flight.peek(&())
    }

    pub fn set(&self, value: T) {
        self.flight.set((), value);
    }

    /// Edit the resolved value in place; see [`SingleFlight::update`]
    pub fn update(&self, edit: impl FnOnce(&mut T) -> bool) -> bool {
        self.flight.update(&(), edit)
    }

    /// Forget the value so the next caller resolves again
    pub fn reset(&self) {
        self.flight.forget(&());
    }

    pub fn is_resolving(&self) -> bool {
        self.flight.is_in_flight(&())
    }
}

impl<T: Clone + Send + Sync + 'static> Default for AsyncValue<T> {
    fn default() -> Self {
        Self::new()
    }
}
