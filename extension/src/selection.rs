// Selection popup controller
// Rendering lives in the popup; this holds what the popup shows and does

use crate::messaging::proxy::RemoteProxy;
use crate::services::accounts::{Account, AccountSource};

/// What the popup does after a user action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageAction {
    StayOpen,
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Nothing selected, nothing sent
    NothingSelected,
    Saved(String),
    /// SET was rejected or never answered
    Failed(String),
}

impl ConfirmOutcome {
    /// The popup closes once SET has been sent, whatever came back
    pub fn action(&self) -> PageAction {
        match self {
            ConfirmOutcome::NothingSelected => PageAction::StayOpen,
            ConfirmOutcome::Saved(_) | ConfirmOutcome::Failed(_) => PageAction::Close,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SelectionPage {
    accounts: Vec<Account>,
    selected: Option<String>,
}

impl SelectionPage {
    /// Load the account list and preselect the current cashback address.
    /// An account-query failure leaves the list empty.
    pub async fn load(accounts: &dyn AccountSource, proxy: &RemoteProxy) -> Self {
        let accounts = accounts.accounts().await.unwrap_or_else(|e| {
            log::error!("Error loading accounts: {}", e);
            Vec::new()
        });
        let selected = proxy.get_wallet_address().await;

        Self { accounts, selected }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_selected(&self, address: &str) -> bool {
        self.selected() == Some(address)
    }

    /// Only listed accounts can be picked
    pub fn select(&mut self, address: &str) -> bool {
        if !self.accounts.iter().any(|a| a.address == address) {
            return false;
        }
        self.selected = Some(address.to_string());
        true
    }

    pub fn can_confirm(&self) -> bool {
        self.selected.is_some()
    }

    pub async fn confirm(&self, proxy: &RemoteProxy) -> ConfirmOutcome {
        let Some(address) = self.selected.clone() else {
            return ConfirmOutcome::NothingSelected;
        };
        match proxy.set_address(&address).await {
            Ok(()) => ConfirmOutcome::Saved(address),
            Err(e) => {
                log::error!("Error saving cashback address: {}", e);
                ConfirmOutcome::Failed(e.to_string())
            }
        }
    }

    /// Close without writing anything
    pub fn cancel(&self) -> PageAction {
        PageAction::Close
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::future_to_promise;

    use super::{PageAction, SelectionPage};
    use crate::chrome::to_js;
    use crate::messaging::proxy::{RemoteProxy, RuntimeTransport};
    use crate::services::accounts::JsAccountSource;

    thread_local! {
        static PAGE: RefCell<SelectionPage> = RefCell::new(SelectionPage::default());
        static PROXY: Rc<RemoteProxy> = Rc::new(RemoteProxy::new(Rc::new(RuntimeTransport::new())));
    }

    fn proxy() -> Rc<RemoteProxy> {
        PROXY.with(Rc::clone)
    }

    fn closes(action: PageAction) -> bool {
        action == PageAction::Close
    }

    /// Load accounts through the wallet's `getAccounts` and the saved address
    /// through the background. Resolves to `{ accounts, selected }`.
    #[wasm_bindgen]
    pub fn load_selection_page(get_accounts: js_sys::Function) -> js_sys::Promise {
        let proxy = proxy();
        future_to_promise(async move {
            let accounts = JsAccountSource::new(get_accounts);
            let page = SelectionPage::load(&accounts, &proxy).await;
            let view = json!({
                "accounts": page.accounts(),
                "selected": page.selected(),
            });
            PAGE.with(|p| *p.borrow_mut() = page);
            to_js(&view).map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }

    /// Returns false when `address` isn't one of the listed accounts
    #[wasm_bindgen]
    pub fn select_cashback_account(address: String) -> bool {
        PAGE.with(|p| p.borrow_mut().select(&address))
    }

    /// Resolves to whether the popup should close
    #[wasm_bindgen]
    pub fn confirm_selection() -> js_sys::Promise {
        let proxy = proxy();
        let page = PAGE.with(|p| p.borrow().clone());
        future_to_promise(async move {
            let outcome = page.confirm(&proxy).await;
            Ok(JsValue::from_bool(closes(outcome.action())))
        })
    }

    /// Returns whether the popup should close
    #[wasm_bindgen]
    pub fn cancel_selection() -> bool {
        PAGE.with(|p| closes(p.borrow().cancel()))
    }
}
