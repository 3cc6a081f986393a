// Detached background work (broadcast deliveries, the account event loop)

use std::cell::RefCell;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

/// Runs a task to completion without the caller waiting on it
pub trait Spawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// In-process executor. Spawned tasks only make progress when
/// `run_until_stalled` is called.
pub struct LocalTasks {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl LocalTasks {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: RefCell::new(pool),
            spawner,
        }
    }

    /// Poll every spawned task until none can make progress. Tasks that are
    /// still pending stay queued.
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }
}

impl Default for LocalTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner for LocalTasks {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.spawner.spawn_local(task) {
            log::warn!("Dropping task, executor shut down: {}", e);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserTasks;

#[cfg(target_arch = "wasm32")]
mod browser {
    use futures::future::LocalBoxFuture;

    use super::Spawner;

    /// The page's microtask queue
    #[derive(Default)]
    pub struct BrowserTasks;

    impl Spawner for BrowserTasks {
        fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
            wasm_bindgen_futures::spawn_local(task);
        }
    }
}
