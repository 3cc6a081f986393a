// Open extension contexts (browser tabs with content scripts)

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CashbackError, Result};

pub type ContextId = u32;

#[async_trait(?Send)]
pub trait ContextBroadcaster {
    /// Every context currently open
    async fn contexts(&self) -> Result<Vec<ContextId>>;

    /// Deliver one message to one context. A context without a listener is an
    /// error here; broadcasting decides what that means.
    async fn deliver(&self, context: ContextId, message: &Value) -> Result<()>;
}

/// In-process contexts. Each context either listens (and keeps an inbox) or not.
#[derive(Default)]
pub struct LocalContexts {
    contexts: RefCell<BTreeMap<ContextId, Option<Vec<Value>>>>,
    unavailable: Cell<bool>,
}

impl LocalContexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, id: ContextId, listening: bool) {
        let inbox = listening.then(Vec::new);
        self.contexts.borrow_mut().insert(id, inbox);
    }

    pub fn close(&self, id: ContextId) {
        self.contexts.borrow_mut().remove(&id);
    }

    /// Messages received by a listening context
    pub fn inbox(&self, id: ContextId) -> Vec<Value> {
        self.contexts
            .borrow()
            .get(&id)
            .and_then(|inbox| inbox.clone())
            .unwrap_or_default()
    }

    /// Make enumeration fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }
}

#[async_trait(?Send)]
impl ContextBroadcaster for LocalContexts {
    async fn contexts(&self) -> Result<Vec<ContextId>> {
        if self.unavailable.get() {
            return Err(CashbackError::Delivery("cannot enumerate contexts".into()));
        }
        Ok(self.contexts.borrow().keys().copied().collect())
    }

    async fn deliver(&self, context: ContextId, message: &Value) -> Result<()> {
        match self.contexts.borrow_mut().get_mut(&context) {
            Some(Some(inbox)) => {
                inbox.push(message.clone());
                Ok(())
            }
            Some(None) => Err(CashbackError::Delivery(format!(
                "context {} has no receiving end",
                context
            ))),
            None => Err(CashbackError::Delivery(format!(
                "context {} is closed",
                context
            ))),
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use chrome_tabs::ChromeTabs;

#[cfg(target_arch = "wasm32")]
mod chrome_tabs {
    use async_trait::async_trait;
    use serde_json::Value;
    use wasm_bindgen::JsValue;
    use wasm_bindgen_futures::JsFuture;

    use super::{ContextBroadcaster, ContextId};
    use crate::chrome::{self, js_error};
    use crate::error::{CashbackError, Result};

    /// chrome.tabs backend
    pub struct ChromeTabs;

    impl ChromeTabs {
        pub fn new() -> Self {
            Self
        }
    }

    impl Default for ChromeTabs {
        fn default() -> Self {
            Self::new()
        }
    }

    fn delivery_error(err: JsValue) -> CashbackError {
        CashbackError::Delivery(js_error(&err))
    }

    #[async_trait(?Send)]
    impl ContextBroadcaster for ChromeTabs {
        async fn contexts(&self) -> Result<Vec<ContextId>> {
            let promise =
                chrome::tabs_query(js_sys::Object::new().into()).map_err(delivery_error)?;
            let tabs = JsFuture::from(promise).await.map_err(delivery_error)?;

            // Tabs without an id (devtools, some prerendered pages) can't be messaged
            let ids = chrome::from_js(&tabs)?
                .as_array()
                .map(|tabs| {
                    tabs.iter()
                        .filter_map(|tab| tab.get("id").and_then(Value::as_u64))
                        .filter_map(|id| ContextId::try_from(id).ok())
                        .collect()
                })
                .unwrap_or_default();
            Ok(ids)
        }

        async fn deliver(&self, context: ContextId, message: &Value) -> Result<()> {
            let promise = chrome::tabs_send_message(context, chrome::to_js(message)?)
                .map_err(delivery_error)?;
            JsFuture::from(promise).await.map_err(delivery_error)?;
            Ok(())
        }
    }
}
