//! The local task set behavior continuations run on.
//!
//! Behaviors are spawned onto a [`LocalSet`] owned by the runtime, so
//! connecting never depends on the caller having entered one. Spawned tasks
//! make progress while the set is driven through [`BehaviorTasks::run_until`];
//! nested calls just await, so the set is never driven twice at once.

use std::cell::Cell;
use std::future::Future;
use tokio::task::{JoinHandle, LocalSet};

#[derive(Default)]
pub struct BehaviorTasks {
    set: LocalSet,
    driving: Cell<bool>,
}

struct Driving<'a>(&'a Cell<bool>);

impl Drop for Driving<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl BehaviorTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `future`. It first runs the next time the set is driven.
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) -> JoinHandle<()> {
        self.set.spawn_local(future)
    }

    /// Whether a [`BehaviorTasks::run_until`] call is in progress.
    pub fn is_driving(&self) -> bool {
        self.driving.get()
    }

    /// Drive queued behaviors until `future` completes.
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        if self.driving.get() {
            return future.await;
        }
        self.driving.set(true);
        let _driving = Driving(&self.driving);
        self.set.run_until(future).await
    }
}

impl std::fmt::Debug for BehaviorTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTasks")
            .field("driving", &self.driving.get())
            .finish()
    }
}
