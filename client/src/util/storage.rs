//! Browser web storage behind the core `KeyValueStore` seam.
//!
//! SYSTEM CONTEXT
//! ==============
//! The post-login redirect target lives in `sessionStorage` (per tab); the
//! admin flag and the access token live in `localStorage`. Outside the browser
//! (SSR, tests) every read misses and writes are dropped.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use encore::store::KeyValueStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageArea {
    /// `localStorage`: survives reloads and new tabs.
    Local,
    /// `sessionStorage`: scoped to the tab.
    Session,
}

#[derive(Clone, Copy, Debug)]
pub struct BrowserStore {
    area: StorageArea,
}

impl BrowserStore {
    pub fn local() -> Self {
        Self { area: StorageArea::Local }
    }

    pub fn session() -> Self {
        Self { area: StorageArea::Session }
    }

    pub fn area(&self) -> StorageArea {
        self.area
    }

    #[cfg(feature = "hydrate")]
    fn storage(&self) -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        match self.area {
            StorageArea::Local => window.local_storage().ok().flatten(),
            StorageArea::Session => window.session_storage().ok().flatten(),
        }
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Option<String> {
        #[cfg(feature = "hydrate")]
        {
            self.storage()?.get_item(key).ok().flatten()
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = key;
            None
        }
    }

    fn set(&self, key: &str, value: &str) {
        #[cfg(feature = "hydrate")]
        {
            let Some(storage) = self.storage() else {
                return;
            };
            if storage.set_item(key, value).is_err() {
                log::warn!("storage write failed for {key}");
            }
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (key, value);
        }
    }

    fn remove(&self, key: &str) {
        #[cfg(feature = "hydrate")]
        {
            if let Some(storage) = self.storage() {
                let _ = storage.remove_item(key);
            }
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = key;
        }
    }
}
