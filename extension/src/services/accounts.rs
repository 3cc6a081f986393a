// Wallet accounts, owned by the wallet's account service
// The cashback core only queries them and reacts to create/delete events

use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CashbackError, Result};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }
}

/// Lifecycle events emitted by the account service
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountEvent {
    Created(Account),
    Deleted(Account),
}

#[async_trait(?Send)]
pub trait AccountSource {
    /// Current account set, in the service's order
    async fn accounts(&self) -> Result<Vec<Account>>;
}

/// In-process account set
#[derive(Default)]
pub struct MemoryAccounts {
    accounts: RefCell<Vec<Account>>,
    unavailable: Cell<bool>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accounts = Self::new();
        for address in addresses {
            accounts.add(Account::new(address));
        }
        accounts
    }

    pub fn add(&self, account: Account) {
        self.accounts.borrow_mut().push(account);
    }

    /// Remove by address, returning the removed account
    pub fn remove(&self, address: &str) -> Option<Account> {
        let mut accounts = self.accounts.borrow_mut();
        let idx = accounts.iter().position(|a| a.address == address)?;
        Some(accounts.remove(idx))
    }

    /// Make subsequent queries fail (simulates the account database rejecting)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }
}

#[async_trait(?Send)]
impl AccountSource for MemoryAccounts {
    async fn accounts(&self) -> Result<Vec<Account>> {
        if self.unavailable.get() {
            return Err(CashbackError::Accounts("account store unavailable".into()));
        }
        Ok(self.accounts.borrow().clone())
    }
}

#[cfg(target_arch = "wasm32")]
pub use js_source::JsAccountSource;

#[cfg(target_arch = "wasm32")]
mod js_source {
    use async_trait::async_trait;
    use wasm_bindgen::JsValue;
    use wasm_bindgen_futures::JsFuture;

    use super::{Account, AccountSource};
    use crate::chrome::{from_js, js_error};
    use crate::error::{CashbackError, Result};

    /// Wraps the wallet's `getAccounts(): Promise<Account[]>` handed over by the glue
    pub struct JsAccountSource {
        get_accounts: js_sys::Function,
    }

    impl JsAccountSource {
        pub fn new(get_accounts: js_sys::Function) -> Self {
            Self { get_accounts }
        }
    }

    #[async_trait(?Send)]
    impl AccountSource for JsAccountSource {
        async fn accounts(&self) -> Result<Vec<Account>> {
            let to_err = |e: JsValue| CashbackError::Accounts(js_error(&e));

            let returned = self.get_accounts.call0(&JsValue::NULL).map_err(to_err)?;
            let resolved = JsFuture::from(js_sys::Promise::resolve(&returned))
                .await
                .map_err(to_err)?;

            Ok(serde_json::from_value(from_js(&resolved)?)?)
        }
    }
}
