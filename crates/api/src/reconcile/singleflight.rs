//! Sharing one in-flight computation among concurrent callers of the same key.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

type InFlight<K, T> = Arc<Mutex<HashMap<K, Shared<BoxFuture<'static, Option<T>>>>>>;

/// Keyed de-duplication of concurrent async work.
///
/// The first caller for a key spawns its future onto the runtime; callers
/// arriving while it runs await the same [`Shared`] handle and receive a
/// clone of its output. The spawned task removes the key itself when it
/// ends, so the map stays clean even if every caller has gone away.
pub struct SingleFlight<K, T> {
    in_flight: InFlight<K, T>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or join the run already in progress.
    ///
    /// When joining, `work` is dropped without being polled. Returns `None`
    /// when the work panicked.
    pub async fn run<F>(&self, key: K, work: F) -> Option<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&key) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight resolution");
                    existing.clone()
                }
                None => {
                    let completion = Completion {
                        in_flight: Arc::clone(&self.in_flight),
                        key: key.clone(),
                    };
                    let handle = tokio::spawn(async move {
                        let _completion = completion;
                        work.await
                    });
                    let shared = handle.map(|joined| joined.ok()).boxed().shared();
                    // Inserted before the lock is released, so the spawned
                    // task cannot remove the key ahead of this insert.
                    in_flight.insert(key, shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of keys with work in progress.
    pub fn len(&self) -> usize {
        lock(&self.in_flight).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its key when the spawned work finishes or unwinds.
struct Completion<K, T>
where
    K: Eq + Hash,
{
    in_flight: InFlight<K, T>,
    key: K,
}

impl<K, T> Drop for Completion<K, T>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.key);
    }
}

/// The map holds no invariant a panicking holder could break.
fn lock<K, V>(map: &Mutex<HashMap<K, V>>) -> MutexGuard<'_, HashMap<K, V>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}
