// Cashback address reconciliation
//
// state      - owns the saved address and pending flag
// notifier   - broadcasts address changes to every open context
// listener   - reacts to account create/delete
// dispatcher - picks the wallet-creation or selection surface

pub mod dispatcher;
pub mod listener;
pub mod notifier;
pub mod state;

pub use dispatcher::{SelectionDispatcher, SelectionSurface};
pub use listener::{AccountChangeListener, ListenerOutcome};
pub use notifier::Notifier;
pub use state::AddressStateManager;
