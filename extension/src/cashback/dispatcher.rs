// Decides which surface a "prompt login" opens

use std::rc::Rc;

use crate::cashback::state::AddressStateManager;
use crate::error::Result;
use crate::services::accounts::AccountSource;
use crate::services::surfaces::SurfaceOpener;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionSurface {
    /// No accounts yet; the pending flag is armed
    WalletCreation,
    AccountPicker,
}

/// Callers resolve with `get_cashback_address` first and only come here on
/// `None`, so a single account never reaches this point.
pub struct SelectionDispatcher {
    state: Rc<AddressStateManager>,
    accounts: Rc<dyn AccountSource>,
    surfaces: Rc<dyn SurfaceOpener>,
}

impl SelectionDispatcher {
    pub fn new(
        state: Rc<AddressStateManager>,
        accounts: Rc<dyn AccountSource>,
        surfaces: Rc<dyn SurfaceOpener>,
    ) -> Self {
        Self {
            state,
            accounts,
            surfaces,
        }
    }

    pub async fn open_selection(&self) -> Result<SelectionSurface> {
        let accounts = self.accounts.accounts().await?;

        if accounts.is_empty() {
            // Flag first: the account-created event may fire before the tab settles
            self.state.mark_pending_selection().await?;
            self.surfaces.open_wallet_creation().await?;
            return Ok(SelectionSurface::WalletCreation);
        }

        self.surfaces.open_selection().await?;
        Ok(SelectionSurface::AccountPicker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cashback::notifier::Notifier;
    use crate::config::StorageConfig;
    use crate::services::accounts::MemoryAccounts;
    use crate::services::storage::MemoryStore;
    use crate::services::surfaces::{OpenedSurface, RecordingSurfaces};
    use crate::services::tabs::LocalContexts;
    use crate::services::tasks::LocalTasks;
    use serde_json::json;

    fn dispatcher(
        addresses: &[&str],
    ) -> (SelectionDispatcher, Rc<MemoryStore>, Rc<RecordingSurfaces>) {
        let store = Rc::new(MemoryStore::new());
        let accounts = Rc::new(MemoryAccounts::with_addresses(addresses.iter().copied()));
        let surfaces = Rc::new(RecordingSurfaces::new());
        let state = Rc::new(AddressStateManager::new(
            store.clone(),
            accounts.clone(),
            Notifier::new(Rc::new(LocalContexts::new()), Rc::new(LocalTasks::new())),
            StorageConfig::default(),
        ));
        (
            SelectionDispatcher::new(state, accounts, surfaces.clone()),
            store,
            surfaces,
        )
    }

    #[tokio::test]
    async fn test_no_accounts_arms_flag_and_opens_creation() {
        let (dispatcher, store, surfaces) = dispatcher(&[]);

        let surface = dispatcher.open_selection().await.unwrap();

        assert_eq!(surface, SelectionSurface::WalletCreation);
        assert_eq!(store.peek("bring_pending_cashback"), Some(json!(true)));
        assert_eq!(surfaces.opened(), vec![OpenedSurface::WalletCreation]);
    }

    #[tokio::test]
    async fn test_accounts_open_picker_without_flag() {
        for addresses in [&["0xAAA"][..], &["0xAAA", "0xBBB"][..]] {
            let (dispatcher, store, surfaces) = dispatcher(addresses);

            let surface = dispatcher.open_selection().await.unwrap();

            assert_eq!(surface, SelectionSurface::AccountPicker);
            assert_eq!(store.peek("bring_pending_cashback"), None);
            assert_eq!(surfaces.opened(), vec![OpenedSurface::Selection]);
        }
    }

    #[tokio::test]
    async fn test_surface_failure_propagates() {
        let (dispatcher, _store, surfaces) = dispatcher(&["0xAAA", "0xBBB"]);
        surfaces.fail_with("no window");

        assert!(dispatcher.open_selection().await.is_err());
    }
}
