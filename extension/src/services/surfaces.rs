// User-facing surfaces the background can open: the wallet-creation tab and
// the cashback selection popup

use std::cell::RefCell;

use async_trait::async_trait;

use crate::error::{CashbackError, Result};

#[async_trait(?Send)]
pub trait SurfaceOpener {
    async fn open_wallet_creation(&self) -> Result<()>;

    async fn open_selection(&self) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenedSurface {
    WalletCreation,
    Selection,
}

/// Records what was opened instead of opening it
#[derive(Default)]
pub struct RecordingSurfaces {
    opened: RefCell<Vec<OpenedSurface>>,
    failing: RefCell<Option<String>>,
}

impl RecordingSurfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<OpenedSurface> {
        self.opened.borrow().clone()
    }

    /// Make every subsequent open fail with `reason`
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failing.borrow_mut() = Some(reason.into());
    }

    fn record(&self, surface: OpenedSurface, name: &'static str) -> Result<()> {
        if let Some(reason) = self.failing.borrow().clone() {
            return Err(CashbackError::Surface {
                surface: name,
                reason,
            });
        }
        self.opened.borrow_mut().push(surface);
        Ok(())
    }
}

#[async_trait(?Send)]
impl SurfaceOpener for RecordingSurfaces {
    async fn open_wallet_creation(&self) -> Result<()> {
        self.record(OpenedSurface::WalletCreation, "wallet creation")
    }

    async fn open_selection(&self) -> Result<()> {
        self.record(OpenedSurface::Selection, "selection popup")
    }
}

#[cfg(target_arch = "wasm32")]
pub use chrome_surfaces::ChromeSurfaces;

#[cfg(target_arch = "wasm32")]
mod chrome_surfaces {
    use async_trait::async_trait;
    use serde_json::json;
    use wasm_bindgen::JsValue;
    use wasm_bindgen_futures::JsFuture;

    use super::SurfaceOpener;
    use crate::chrome::{self, js_error};
    use crate::config::SurfaceConfig;
    use crate::error::{CashbackError, Result};

    /// Opens extension pages through chrome.tabs / chrome.windows
    pub struct ChromeSurfaces {
        config: SurfaceConfig,
    }

    impl ChromeSurfaces {
        pub fn new(config: SurfaceConfig) -> Self {
            Self { config }
        }
    }

    fn surface_error(surface: &'static str) -> impl Fn(JsValue) -> CashbackError {
        move |err| CashbackError::Surface {
            surface,
            reason: js_error(&err),
        }
    }

    #[async_trait(?Send)]
    impl SurfaceOpener for ChromeSurfaces {
        async fn open_wallet_creation(&self) -> Result<()> {
            let url = chrome::runtime_get_url(&self.config.welcome_path);
            log::info!("Opening wallet creation at {}", url);

            let props = chrome::to_js(&json!({ "url": url }))?;
            let promise = chrome::tabs_create(props).map_err(surface_error("wallet creation"))?;
            JsFuture::from(promise)
                .await
                .map_err(surface_error("wallet creation"))?;
            Ok(())
        }

        async fn open_selection(&self) -> Result<()> {
            let url = chrome::runtime_get_url(&self.config.selection_path);
            log::info!("Opening cashback selection popup at {}", url);

            let props = chrome::to_js(&json!({
                "url": url,
                "type": "popup",
                "width": self.config.popup_width,
                "height": self.config.popup_height,
                "focused": true,
            }))?;
            let promise =
                chrome::windows_create(props).map_err(surface_error("selection popup"))?;
            JsFuture::from(promise)
                .await
                .map_err(surface_error("selection popup"))?;
            Ok(())
        }
    }
}
