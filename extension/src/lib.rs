// Cashback wallet address handling for the wallet extension
//
// One cashback address is kept in sync across the background service worker,
// content scripts and the selection popup, and reconciled against the
// wallet's accounts as they come and go.

pub mod background;
pub mod cashback;
pub mod config;
mod content_script;
pub mod error;
pub mod messaging;
pub mod selection;
pub mod services;

#[cfg(target_arch = "wasm32")]
mod chrome;

pub use background::Background;
pub use config::ExtensionConfig;
pub use error::{CashbackError, Result};
