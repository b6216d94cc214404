//! Browser `localStorage` substrate.

use super::{KeyValueStore, KvError, KvResult};
use wasm_bindgen::JsValue;
use web_sys::Storage;

/// Substrate over `window.localStorage`.
pub struct LocalStorageKv {
    storage: Storage,
}

fn js_error(e: JsValue) -> KvError {
    KvError::Io(format!("{:?}", e))
}

impl LocalStorageKv {
    pub fn new() -> KvResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| KvError::Unavailable("No window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| KvError::Unavailable("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorageKv {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.storage.get_item(key).map_err(js_error)
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.storage.set_item(key, value).map_err(js_error)
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        self.storage.remove_item(key).map_err(js_error)
    }
}
