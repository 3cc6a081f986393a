// Content-script side of the cashback protocol
// Turns the cashback SDK's callback interface into router requests

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CashbackError, Result};
use crate::messaging::protocol::{Notification, Request};

/// Fire-and-forget-with-callback transport to the background.
///
/// `None` is a legitimate terminal outcome (background torn down, no
/// listener) and is never retried.
#[async_trait(?Send)]
pub trait Transport {
    async fn request(&self, message: Value) -> Option<Value>;
}

type UpdateCallback = Box<dyn Fn(Option<&str>)>;

pub struct RemoteProxy {
    transport: Rc<dyn Transport>,
    callbacks: RefCell<Vec<UpdateCallback>>,
}

impl RemoteProxy {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self {
            transport,
            callbacks: RefCell::new(Vec::new()),
        }
    }

    async fn call(&self, request: Request) -> Option<Value> {
        let reply = self.transport.request(request.to_message()).await;
        if reply.is_none() {
            log::debug!("{:?} got no reply", request.kind());
        }
        reply
    }

    /// SDK "get wallet address". Only a non-empty string counts.
    pub async fn get_wallet_address(&self) -> Option<String> {
        let reply = self.call(Request::GetCashbackAddress).await?;
        reply
            .get("address")
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
    }

    /// SDK "prompt login". Completes when the background answers, whatever
    /// the answer (or when it never will).
    pub async fn prompt_login(&self) {
        self.call(Request::OpenCashbackSelection).await;
    }

    pub async fn set_address(&self, address: &str) -> Result<()> {
        let reply = self
            .call(Request::SetCashbackAddress {
                address: Some(address.to_string()),
            })
            .await;
        status(reply)
    }

    pub async fn delete_address(&self) -> Result<()> {
        status(self.call(Request::DeleteCashbackAddress).await)
    }

    /// SDK "wallet address update callback"
    pub fn on_wallet_update(&self, callback: impl Fn(Option<&str>) + 'static) {
        self.callbacks.borrow_mut().push(Box::new(callback));
    }

    /// Feed a runtime message received by this context. Returns whether it
    /// was an address update.
    pub fn handle_incoming(&self, message: &Value) -> bool {
        let Some(notification) = Notification::from_message(message) else {
            return false;
        };
        for callback in self.callbacks.borrow().iter() {
            callback(notification.address());
        }
        true
    }
}

fn status(reply: Option<Value>) -> Result<()> {
    let reply = reply.ok_or_else(|| CashbackError::Delivery("no reply from background".into()))?;
    if reply.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    match reply.get("error").and_then(Value::as_str) {
        Some(e) if e == CashbackError::MissingAddress.to_string() => {
            Err(CashbackError::MissingAddress)
        }
        Some(e) => Err(CashbackError::Delivery(e.to_string())),
        None => Err(CashbackError::Delivery("request failed".into())),
    }
}

#[cfg(target_arch = "wasm32")]
pub use runtime::RuntimeTransport;

#[cfg(target_arch = "wasm32")]
mod runtime {
    use async_trait::async_trait;
    use serde_json::Value;
    use wasm_bindgen_futures::JsFuture;

    use super::Transport;
    use crate::chrome::{self, js_error};

    /// chrome.runtime.sendMessage to the service worker
    pub struct RuntimeTransport;

    impl RuntimeTransport {
        pub fn new() -> Self {
            Self
        }
    }

    impl Default for RuntimeTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait(?Send)]
    impl Transport for RuntimeTransport {
        async fn request(&self, message: Value) -> Option<Value> {
            let js_message = chrome::to_js(&message).ok()?;
            let promise = match chrome::runtime_send_message(js_message) {
                Ok(p) => p,
                Err(e) => {
                    log::debug!("sendMessage threw: {}", js_error(&e));
                    return None;
                }
            };
            match JsFuture::from(promise).await {
                Ok(reply) if !reply.is_undefined() => chrome::from_js(&reply).ok(),
                Ok(_) => None,
                Err(e) => {
                    log::debug!("sendMessage rejected: {}", js_error(&e));
                    None
                }
            }
        }
    }
}
