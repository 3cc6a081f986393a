// Address State Manager
// Owns the current cashback address and the pending-selection flag

use std::rc::Rc;

use serde_json::Value;

use crate::cashback::notifier::Notifier;
use crate::config::StorageConfig;
use crate::error::{CashbackError, Result};
use crate::services::accounts::AccountSource;
use crate::services::storage::KeyValueStore;

/// Single owner of the persisted cashback address.
///
/// Constructed once per background lifetime. Every write of either key goes
/// through here; other components hold an `Rc` to it.
///
/// Invariants:
/// - a saved address always names an existing account, otherwise the next read
///   clears it and broadcasts `null`
/// - an address is only picked automatically when exactly one account exists
///   and nothing is saved
/// - every write is followed by a broadcast of the new value
pub struct AddressStateManager {
    store: Rc<dyn KeyValueStore>,
    accounts: Rc<dyn AccountSource>,
    notifier: Notifier,
    keys: StorageConfig,
}

impl AddressStateManager {
    pub fn new(
        store: Rc<dyn KeyValueStore>,
        accounts: Rc<dyn AccountSource>,
        notifier: Notifier,
        keys: StorageConfig,
    ) -> Self {
        Self {
            store,
            accounts,
            notifier,
            keys,
        }
    }

    /// Resolve the cashback address.
    ///
    /// Reads the saved value, then the account set. A saved address that still
    /// exists is returned as is. A stale one is cleared (and `null` broadcast)
    /// before falling through to auto-assignment, which only happens with
    /// exactly one account. `None` means the caller has to prompt.
    pub async fn get_cashback_address(&self) -> Result<Option<String>> {
        let saved = self.saved_address().await?;
        let accounts = self.accounts.accounts().await?;

        if let Some(saved) = saved {
            if accounts.iter().any(|a| a.address == saved) {
                return Ok(Some(saved));
            }
            log::info!("Saved cashback address {} no longer exists, clearing", saved);
            self.delete_cashback_address().await?;
        }

        match accounts.as_slice() {
            [only] => {
                log::info!("Single account, assigning {} as cashback address", only.address);
                self.set_cashback_address(Some(only.address.as_str())).await?;
                Ok(Some(only.address.clone()))
            }
            _ => Ok(None),
        }
    }

    /// Persist `address` and broadcast it. An empty or missing address is a
    /// validation failure and leaves the saved value untouched.
    pub async fn set_cashback_address(&self, address: Option<&str>) -> Result<()> {
        let address = match address {
            Some(a) if !a.is_empty() => a,
            _ => return Err(CashbackError::MissingAddress),
        };

        self.store
            .set(&self.keys.address_key, Value::String(address.to_string()))
            .await?;
        log::info!("💰 Cashback address set to {}", address);

        self.notifier.address_changed(Some(address)).await;
        Ok(())
    }

    /// Remove the saved address and broadcast `null`. Succeeds when nothing
    /// was saved.
    pub async fn delete_cashback_address(&self) -> Result<()> {
        self.store.remove(&self.keys.address_key).await?;
        log::info!("Cashback address cleared");

        self.notifier.address_changed(None).await;
        Ok(())
    }

    /// Saved address without reconciling against accounts. Empty strings and
    /// non-string values count as nothing saved.
    pub async fn saved_address(&self) -> Result<Option<String>> {
        let value = self.store.get(&self.keys.address_key).await?;
        Ok(match value {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(Value::String(_)) | Some(Value::Null) | None => None,
            Some(other) => {
                log::warn!("Ignoring non-string cashback address {}", other);
                None
            }
        })
    }

    /// Arm the "owe the user an address once an account exists" flag
    pub async fn mark_pending_selection(&self) -> Result<()> {
        self.store
            .set(&self.keys.pending_key, Value::Bool(true))
            .await?;
        log::info!("Pending cashback selection armed");
        Ok(())
    }

    /// Read-and-clear the pending flag. Only a stored `true` counts.
    pub async fn take_pending_selection(&self) -> Result<bool> {
        let value = self.store.take(&self.keys.pending_key).await?;
        Ok(matches!(value, Some(Value::Bool(true))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::accounts::MemoryAccounts;
    use crate::services::storage::MemoryStore;
    use crate::services::tabs::LocalContexts;
    use crate::services::tasks::LocalTasks;
    use serde_json::json;

    const ADDRESS_KEY: &str = "bring_cashback_wallet_address";
    const PENDING_KEY: &str = "bring_pending_cashback";

    struct Fixture {
        store: Rc<MemoryStore>,
        accounts: Rc<MemoryAccounts>,
        contexts: Rc<LocalContexts>,
        tasks: Rc<LocalTasks>,
        manager: AddressStateManager,
    }

    fn fixture(addresses: &[&str]) -> Fixture {
        let store = Rc::new(MemoryStore::new());
        let accounts = Rc::new(MemoryAccounts::with_addresses(addresses.iter().copied()));
        let contexts = Rc::new(LocalContexts::new());
        contexts.open(1, true);
        let tasks = Rc::new(LocalTasks::new());
        let manager = AddressStateManager::new(
            store.clone(),
            accounts.clone(),
            Notifier::new(contexts.clone(), tasks.clone()),
            StorageConfig::default(),
        );
        Fixture {
            store,
            accounts,
            contexts,
            tasks,
            manager,
        }
    }

    fn updates(f: &Fixture) -> Vec<Option<String>> {
        f.tasks.run_until_stalled();
        f.contexts
            .inbox(1)
            .iter()
            .map(|m| m["address"].as_str().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_saved_address_still_valid() {
        let f = fixture(&["0xAAA", "0xBBB"]);
        f.store.insert(ADDRESS_KEY, json!("0xBBB"));

        let address = f.manager.get_cashback_address().await.unwrap();

        assert_eq!(address.as_deref(), Some("0xBBB"));
        assert_eq!(f.store.write_count(), 0);
        assert!(updates(&f).is_empty());
    }

    #[tokio::test]
    async fn test_stale_address_healed() {
        let f = fixture(&["0xAAA", "0xBBB"]);
        f.store.insert(ADDRESS_KEY, json!("0xDEAD"));

        let address = f.manager.get_cashback_address().await.unwrap();

        assert_eq!(address, None);
        assert_eq!(f.store.peek(ADDRESS_KEY), None);
        assert_eq!(updates(&f), vec![None]);

        // Second read finds nothing saved and stays silent
        assert_eq!(f.manager.get_cashback_address().await.unwrap(), None);
        assert_eq!(updates(&f), vec![None]);
    }

    #[tokio::test]
    async fn test_stale_address_falls_through_to_single_account() {
        let f = fixture(&["0xAAA"]);
        f.store.insert(ADDRESS_KEY, json!("0xDEAD"));

        let address = f.manager.get_cashback_address().await.unwrap();

        assert_eq!(address.as_deref(), Some("0xAAA"));
        assert_eq!(f.store.peek(ADDRESS_KEY), Some(json!("0xAAA")));
        assert_eq!(updates(&f), vec![None, Some("0xAAA".to_string())]);
    }

    #[tokio::test]
    async fn test_single_account_auto_assigned_once() {
        let f = fixture(&["0xAAA"]);

        let first = f.manager.get_cashback_address().await.unwrap();
        let second = f.manager.get_cashback_address().await.unwrap();

        assert_eq!(first.as_deref(), Some("0xAAA"));
        assert_eq!(second, first);
        assert_eq!(f.store.write_count(), 1);
        assert_eq!(updates(&f), vec![Some("0xAAA".to_string())]);
    }

    #[tokio::test]
    async fn test_ambiguous_account_sets_return_none() {
        for addresses in [&[][..], &["0xAAA", "0xBBB"][..]] {
            let f = fixture(addresses);
            assert_eq!(f.manager.get_cashback_address().await.unwrap(), None);
            assert_eq!(f.store.write_count(), 0);
            assert!(updates(&f).is_empty());
        }
    }

    #[tokio::test]
    async fn test_empty_saved_string_is_nothing() {
        let f = fixture(&["0xAAA", "0xBBB"]);
        f.store.insert(ADDRESS_KEY, json!(""));

        assert_eq!(f.manager.saved_address().await.unwrap(), None);
        assert_eq!(f.manager.get_cashback_address().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_rejects_missing_address() {
        let f = fixture(&["0xAAA"]);
        f.store.insert(ADDRESS_KEY, json!("0xAAA"));

        for bad in [None, Some("")] {
            let err = f.manager.set_cashback_address(bad).await.unwrap_err();
            assert!(matches!(err, CashbackError::MissingAddress));
        }
        assert_eq!(f.store.peek(ADDRESS_KEY), Some(json!("0xAAA")));
        assert!(updates(&f).is_empty());
    }

    #[tokio::test]
    async fn test_delete_notifies_even_when_nothing_saved() {
        let f = fixture(&[]);
        f.manager.delete_cashback_address().await.unwrap();
        assert_eq!(updates(&f), vec![None]);
    }

    #[tokio::test]
    async fn test_account_query_failure_propagates() {
        let f = fixture(&["0xAAA"]);
        f.accounts.set_unavailable(true);

        assert!(f.manager.get_cashback_address().await.is_err());
        assert_eq!(f.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_flag_taken_once() {
        let f = fixture(&[]);
        assert!(!f.manager.take_pending_selection().await.unwrap());

        f.manager.mark_pending_selection().await.unwrap();
        assert_eq!(f.store.peek(PENDING_KEY), Some(json!(true)));

        assert!(f.manager.take_pending_selection().await.unwrap());
        assert!(!f.manager.take_pending_selection().await.unwrap());
    }

    #[tokio::test]
    async fn test_non_bool_pending_value_cleared_but_not_pending() {
        let f = fixture(&[]);
        f.store.insert(PENDING_KEY, json!("yes"));

        assert!(!f.manager.take_pending_selection().await.unwrap());
        assert_eq!(f.store.peek(PENDING_KEY), None);
    }

    #[tokio::test]
    async fn test_concurrent_reads_converge() {
        let f = fixture(&["0xAAA"]);

        let (a, b) = futures::join!(
            f.manager.get_cashback_address(),
            f.manager.get_cashback_address()
        );

        assert_eq!(a.unwrap().as_deref(), Some("0xAAA"));
        assert_eq!(b.unwrap().as_deref(), Some("0xAAA"));
        assert_eq!(f.store.peek(ADDRESS_KEY), Some(json!("0xAAA")));
    }
}
