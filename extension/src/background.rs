// Background service worker for cashback address handling
// All logic in Rust; the JavaScript side just forwards chrome events here

use std::rc::Rc;

use futures::channel::mpsc;
use serde_json::Value;

use crate::cashback::{
    AccountChangeListener, AddressStateManager, Notifier, SelectionDispatcher,
};
use crate::config::ExtensionConfig;
use crate::messaging::MessageRouter;
use crate::services::{
    AccountEvent, AccountSource, ContextBroadcaster, KeyValueStore, Spawner, SurfaceOpener,
};

/// Everything the background owns, built once per service-worker lifetime
pub struct Background {
    pub config: ExtensionConfig,
    pub state: Rc<AddressStateManager>,
    pub listener: Rc<AccountChangeListener>,
    pub dispatcher: Rc<SelectionDispatcher>,
    pub router: Rc<MessageRouter>,
    events: mpsc::UnboundedSender<AccountEvent>,
}

impl Background {
    /// Wires the cashback core and starts the account event loop on `tasks`
    pub fn new(
        config: ExtensionConfig,
        store: Rc<dyn KeyValueStore>,
        accounts: Rc<dyn AccountSource>,
        contexts: Rc<dyn ContextBroadcaster>,
        surfaces: Rc<dyn SurfaceOpener>,
        tasks: Rc<dyn Spawner>,
    ) -> Self {
        let state = Rc::new(AddressStateManager::new(
            store,
            accounts.clone(),
            Notifier::new(contexts, tasks.clone()),
            config.storage.clone(),
        ));
        let dispatcher = Rc::new(SelectionDispatcher::new(state.clone(), accounts, surfaces));
        let router = Rc::new(MessageRouter::new(state.clone(), dispatcher.clone()));
        let listener = Rc::new(AccountChangeListener::new(state.clone()));

        let (events, received) = mpsc::unbounded();
        let event_loop = listener.clone();
        tasks.spawn(Box::pin(async move { event_loop.run(received).await }));

        Self {
            config,
            state,
            listener,
            dispatcher,
            router,
            events,
        }
    }

    /// Queue an account event. Events are handled one at a time in the order
    /// they were queued.
    pub fn account_event(&self, event: AccountEvent) {
        if self.events.unbounded_send(event).is_err() {
            log::warn!("Account event loop has stopped, dropping event");
        }
    }

    /// Options for the cashback SDK's background initialiser
    pub fn sdk_options(&self) -> Value {
        self.config.background_init_options()
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;

    use super::Background;
    use crate::chrome::{from_js, js_error, to_js};
    use crate::config::ExtensionConfig;
    use crate::services::accounts::{Account, AccountEvent, JsAccountSource};
    use crate::services::storage::ChromeStorage;
    use crate::services::surfaces::ChromeSurfaces;
    use crate::services::tabs::ChromeTabs;
    use crate::services::tasks::BrowserTasks;

    thread_local! {
        static BACKGROUND: RefCell<Option<Rc<Background>>> = const { RefCell::new(None) };
    }

    fn background() -> Result<Rc<Background>, JsValue> {
        BACKGROUND
            .with(|b| b.borrow().clone())
            .ok_or_else(|| JsValue::from_str("background not initialised"))
    }

    /// Initialize the background service worker.
    /// `get_accounts` is the wallet's `() => Promise<Account[]>`. Returns the
    /// SDK background init options.
    #[wasm_bindgen]
    pub fn init_background(
        get_accounts: js_sys::Function,
        config_toml: Option<String>,
    ) -> Result<JsValue, JsValue> {
        wasm_logger::init(wasm_logger::Config::default());

        let config = match config_toml {
            Some(text) => ExtensionConfig::from_toml_str(&text)
                .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?,
            None => ExtensionConfig::default(),
        };

        let background = Background::new(
            config.clone(),
            Rc::new(ChromeStorage::new()),
            Rc::new(JsAccountSource::new(get_accounts)),
            Rc::new(ChromeTabs::new()),
            Rc::new(ChromeSurfaces::new(config.surfaces.clone())),
            Rc::new(BrowserTasks),
        );
        let options = background.sdk_options();
        BACKGROUND.with(|b| *b.borrow_mut() = Some(Rc::new(background)));

        log::info!("🚀 Cashback background initialized");
        to_js(&options).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// chrome.runtime.onMessage handler. Returns true when the response will
    /// be sent asynchronously through `send_response`.
    #[wasm_bindgen]
    pub fn handle_message(message: JsValue, send_response: js_sys::Function) -> bool {
        let Ok(background) = background() else {
            return false;
        };
        let Ok(message) = from_js(&message) else {
            return false;
        };

        let sink = move |reply: serde_json::Value| {
            let reply = to_js(&reply).unwrap_or(JsValue::NULL);
            if let Err(e) = send_response.call1(&JsValue::NULL, &reply) {
                // Caller's port already closed
                log::debug!("sendResponse failed: {}", js_error(&e));
            }
        };

        match background.router.route(&message, sink) {
            Some(task) => {
                wasm_bindgen_futures::spawn_local(task);
                true
            }
            None => false,
        }
    }

    fn account_event(obj: &JsValue) -> Result<Account, JsValue> {
        let value = from_js(obj).map_err(|e| JsValue::from_str(&e.to_string()))?;
        serde_json::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// `accounts:create` from the wallet database observer
    #[wasm_bindgen]
    pub fn handle_account_created(account: JsValue) -> Result<(), JsValue> {
        background()?.account_event(AccountEvent::Created(account_event(&account)?));
        Ok(())
    }

    /// `accounts:delete` from the wallet database observer
    #[wasm_bindgen]
    pub fn handle_account_deleted(account: JsValue) -> Result<(), JsValue> {
        background()?.account_event(AccountEvent::Deleted(account_event(&account)?));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        Account, LocalContexts, LocalTasks, MemoryAccounts, MemoryStore, RecordingSurfaces,
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_wiring_shares_one_state() {
        let store = Rc::new(MemoryStore::new());
        let background = Background::new(
            ExtensionConfig::default(),
            store.clone(),
            Rc::new(MemoryAccounts::with_addresses(["0xAAA"])),
            Rc::new(LocalContexts::new()),
            Rc::new(RecordingSurfaces::new()),
            Rc::new(LocalTasks::new()),
        );

        let reply = background
            .router
            .handle(crate::messaging::Request::GetCashbackAddress)
            .await;

        assert_eq!(reply.to_message(), json!({"address": "0xAAA"}));
        assert_eq!(
            background.state.saved_address().await.unwrap().as_deref(),
            Some("0xAAA")
        );
        assert_eq!(store.peek("bring_cashback_wallet_address"), Some(json!("0xAAA")));
    }

    #[tokio::test]
    async fn test_custom_storage_keys_apply() {
        let mut config = ExtensionConfig::default();
        config.storage.address_key = "cashback_address".into();
        let store = Rc::new(MemoryStore::new());
        let background = Background::new(
            config,
            store.clone(),
            Rc::new(MemoryAccounts::with_addresses(["0xAAA"])),
            Rc::new(LocalContexts::new()),
            Rc::new(RecordingSurfaces::new()),
            Rc::new(LocalTasks::new()),
        );

        background.state.get_cashback_address().await.unwrap();

        assert_eq!(store.peek("cashback_address"), Some(json!("0xAAA")));
        assert_eq!(store.peek("bring_cashback_wallet_address"), None);
    }

    #[test]
    fn test_sdk_options() {
        let background = Background::new(
            ExtensionConfig::default(),
            Rc::new(MemoryStore::new()),
            Rc::new(MemoryAccounts::new()),
            Rc::new(LocalContexts::new()),
            Rc::new(RecordingSurfaces::new()),
            Rc::new(LocalTasks::new()),
        );
        let options = background.sdk_options();
        assert_eq!(options["apiEndpoint"], "prod");
        assert_eq!(options["isEnabledByDefault"], true);
    }

    #[tokio::test]
    async fn test_account_events_handled_in_queue_order() {
        let store = Rc::new(MemoryStore::new());
        store.insert("bring_pending_cashback", json!(true));
        let contexts = Rc::new(LocalContexts::new());
        contexts.open(1, true);
        let tasks = Rc::new(LocalTasks::new());
        let background = Background::new(
            ExtensionConfig::default(),
            store.clone(),
            Rc::new(MemoryAccounts::new()),
            contexts.clone(),
            Rc::new(RecordingSurfaces::new()),
            tasks.clone(),
        );

        background.account_event(AccountEvent::Created(Account::new("0xAAA")));
        background.account_event(AccountEvent::Deleted(Account::new("0xAAA")));
        assert_eq!(store.peek("bring_cashback_wallet_address"), None);
        assert_eq!(store.peek("bring_pending_cashback"), Some(json!(true)));

        tasks.run_until_stalled();

        assert_eq!(store.peek("bring_pending_cashback"), None);
        assert_eq!(store.peek("bring_cashback_wallet_address"), None);
        let addresses: Vec<_> = contexts.inbox(1).iter().map(|m| m["address"].clone()).collect();
        assert_eq!(addresses, vec![json!("0xAAA"), json!(null)]);
    }
}
