// Persistent key/value storage
// chrome.storage.local in the browser, an in-process map everywhere else

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Async key/value store scoped to the extension install.
///
/// Every `set` and `remove` is a single atomic key operation at the storage
/// layer, so readers never observe a torn value.
#[async_trait(?Send)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Read a key and unconditionally remove it.
    ///
    /// The default is a get followed by a remove, two separate storage calls.
    /// Stores that can do better override it.
    async fn take(&self, key: &str) -> Result<Option<Value>> {
        let value = self.get(key).await?;
        self.remove(key).await?;
        Ok(value)
    }
}

/// In-process store. `take` is atomic here.
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, Value>>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set`/`remove`/`take` calls that changed or cleared a key
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn peek(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.entries.borrow_mut().insert(key.to_string(), value);
    }

    fn bump(&self) {
        self.writes.set(self.writes.get() + 1);
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.bump();
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.bump();
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<Value>> {
        let value = self.entries.borrow_mut().remove(key);
        if value.is_some() {
            self.bump();
        }
        Ok(value)
    }
}

#[cfg(target_arch = "wasm32")]
pub use chrome_storage::ChromeStorage;

#[cfg(target_arch = "wasm32")]
mod chrome_storage {
    use async_trait::async_trait;
    use serde_json::Value;
    use wasm_bindgen_futures::JsFuture;

    use super::KeyValueStore;
    use crate::chrome::{self, js_error};
    use crate::error::{CashbackError, Result};

    /// chrome.storage.local backend. `take` keeps the default get-then-remove.
    pub struct ChromeStorage;

    impl ChromeStorage {
        pub fn new() -> Self {
            Self
        }
    }

    impl Default for ChromeStorage {
        fn default() -> Self {
            Self::new()
        }
    }

    fn storage_error(err: wasm_bindgen::JsValue) -> CashbackError {
        CashbackError::Storage(js_error(&err))
    }

    #[async_trait(?Send)]
    impl KeyValueStore for ChromeStorage {
        async fn get(&self, key: &str) -> Result<Option<Value>> {
            let keys = js_sys::Array::new();
            keys.push(&key.into());

            let promise = chrome::storage_get(keys.into()).map_err(storage_error)?;
            let result = JsFuture::from(promise).await.map_err(storage_error)?;
            let item = js_sys::Reflect::get(&result, &key.into()).map_err(storage_error)?;

            if item.is_undefined() || item.is_null() {
                return Ok(None);
            }
            chrome::from_js(&item).map(Some)
        }

        async fn set(&self, key: &str, value: Value) -> Result<()> {
            let obj = js_sys::Object::new();
            js_sys::Reflect::set(&obj, &key.into(), &chrome::to_js(&value)?)
                .map_err(storage_error)?;

            let promise = chrome::storage_set(obj.into()).map_err(storage_error)?;
            JsFuture::from(promise).await.map_err(storage_error)?;
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            let keys = js_sys::Array::new();
            keys.push(&key.into());

            let promise = chrome::storage_remove(keys.into()).map_err(storage_error)?;
            JsFuture::from(promise).await.map_err(storage_error)?;
            Ok(())
        }
    }
}
