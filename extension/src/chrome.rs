// Raw chrome.* bindings for the wasm32 build
// JavaScript stays glue: every call returns a Promise the Rust side awaits

use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::error::{CashbackError, Result};

#[wasm_bindgen]
extern "C" {
    // chrome.storage.local
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    pub fn storage_get(keys: JsValue) -> std::result::Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    pub fn storage_set(items: JsValue) -> std::result::Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = remove)]
    pub fn storage_remove(keys: JsValue) -> std::result::Result<js_sys::Promise, JsValue>;

    // chrome.tabs
    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = query)]
    pub fn tabs_query(query: JsValue) -> std::result::Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = sendMessage)]
    pub fn tabs_send_message(
        tab_id: u32,
        message: JsValue,
    ) -> std::result::Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = create)]
    pub fn tabs_create(properties: JsValue) -> std::result::Result<js_sys::Promise, JsValue>;

    // chrome.windows
    #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = create)]
    pub fn windows_create(properties: JsValue) -> std::result::Result<js_sys::Promise, JsValue>;

    // chrome.runtime
    #[wasm_bindgen(js_namespace = ["chrome", "runtime"], js_name = getURL)]
    pub fn runtime_get_url(path: &str) -> String;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    pub fn runtime_send_message(message: JsValue) -> std::result::Result<js_sys::Promise, JsValue>;
}

/// serde_json value -> plain JS object
pub fn to_js(value: &Value) -> Result<JsValue> {
    let text = serde_json::to_string(value)?;
    js_sys::JSON::parse(&text).map_err(|e| CashbackError::Codec(serde_err(&e)))
}

/// Plain JS object -> serde_json value. `undefined` maps to null.
pub fn from_js(value: &JsValue) -> Result<Value> {
    if value.is_undefined() {
        return Ok(Value::Null);
    }
    let text = js_sys::JSON::stringify(value)
        .map_err(|e| CashbackError::Codec(serde_err(&e)))?
        .as_string()
        .unwrap_or_else(|| "null".to_string());
    Ok(serde_json::from_str(&text)?)
}

/// Best-effort message out of a rejected promise or thrown value
pub fn js_error(err: &JsValue) -> String {
    if let Some(s) = err.as_string() {
        return s;
    }
    js_sys::Reflect::get(err, &"message".into())
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", err))
}

fn serde_err(err: &JsValue) -> serde_json::Error {
    serde::de::Error::custom(js_error(err))
}
