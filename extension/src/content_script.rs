// Content script host for the cashback SDK
// Exposes the three entry points the SDK expects: get wallet address,
// prompt login, and the wallet-address update callback

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::future_to_promise;

    use crate::chrome::{from_js, js_error, to_js};
    use crate::config::ExtensionConfig;
    use crate::messaging::proxy::{RemoteProxy, RuntimeTransport};

    thread_local! {
        static PROXY: RefCell<Option<Rc<RemoteProxy>>> = const { RefCell::new(None) };
    }

    fn proxy() -> Rc<RemoteProxy> {
        PROXY.with(|p| {
            p.borrow_mut()
                .get_or_insert_with(|| Rc::new(RemoteProxy::new(Rc::new(RuntimeTransport::new()))))
                .clone()
        })
    }

    /// Returns the SDK content-script options (theme, text, switchWallet)
    #[wasm_bindgen]
    pub fn init_content_script(config_toml: Option<String>) -> Result<JsValue, JsValue> {
        wasm_logger::init(wasm_logger::Config::default());

        let config = match config_toml {
            Some(text) => ExtensionConfig::from_toml_str(&text)
                .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?,
            None => ExtensionConfig::default(),
        };
        proxy();

        log::info!("Cashback content script ready");
        to_js(&config.content_script_options()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// SDK `getWalletAddress`: resolves to the address string or null
    #[wasm_bindgen]
    pub fn get_wallet_address() -> js_sys::Promise {
        let proxy = proxy();
        future_to_promise(async move {
            Ok(match proxy.get_wallet_address().await {
                Some(address) => JsValue::from_str(&address),
                None => JsValue::NULL,
            })
        })
    }

    /// SDK `promptLogin`
    #[wasm_bindgen]
    pub fn prompt_login() -> js_sys::Promise {
        let proxy = proxy();
        future_to_promise(async move {
            proxy.prompt_login().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// SDK `walletAddressUpdateCallback`: `callback` fires on every update
    #[wasm_bindgen]
    pub fn wallet_address_update_callback(callback: js_sys::Function) {
        proxy().on_wallet_update(move |_address| {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                log::warn!("Wallet update callback threw: {}", js_error(&e));
            }
        });
    }

    /// chrome.runtime.onMessage handler for this tab. Updates are one-way, so
    /// this never holds the sender's response channel open.
    #[wasm_bindgen]
    pub fn handle_runtime_message(message: JsValue) {
        if let Ok(message) = from_js(&message) {
            proxy().handle_incoming(&message);
        }
    }
}
