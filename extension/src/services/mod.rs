// Collaborators the cashback core talks to
// Each has a trait, an in-process implementation and a chrome.* one (wasm32)

pub mod accounts;
pub mod storage;
pub mod surfaces;
pub mod tabs;
pub mod tasks;

pub use accounts::{Account, AccountEvent, AccountSource, MemoryAccounts};
pub use storage::{KeyValueStore, MemoryStore};
pub use surfaces::{OpenedSurface, RecordingSurfaces, SurfaceOpener};
pub use tabs::{ContextBroadcaster, ContextId, LocalContexts};
pub use tasks::{LocalTasks, Spawner};
