use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtensionConfig {
    pub storage: StorageConfig,
    pub surfaces: SurfaceConfig,
    pub sdk: SdkConfig,
}

/// Storage keys private to the cashback core
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub address_key: String,
    pub pending_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            address_key: "bring_cashback_wallet_address".to_string(),
            pending_key: "bring_pending_cashback".to_string(),
        }
    }
}

/// Extension-relative pages, resolved with chrome.runtime.getURL
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub welcome_path: String,
    pub selection_path: String,
    pub popup_width: u32,
    pub popup_height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            welcome_path: "index.html#/sign-up/welcome".to_string(),
            selection_path: "popup.html#/select-cashback-address".to_string(),
            popup_width: 350,
            popup_height: 609,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkEnvironment {
    Sandbox,
    #[default]
    Prod,
}

impl SdkEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            SdkEnvironment::Sandbox => "sandbox",
            SdkEnvironment::Prod => "prod",
        }
    }
}

/// Init options for the embedded cashback SDK
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SdkConfig {
    pub identifier: String,
    pub environment: SdkEnvironment,
    pub enabled_by_default: bool,
    pub theme: String, // "dark" or "light"
    pub text: String,  // "upper" or "lower"
    pub switch_wallet: bool,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            identifier: "9FaJTDcBCb48wkWKveRBg61jxfhvtg0V2iazjnA5".to_string(),
            environment: SdkEnvironment::Prod,
            enabled_by_default: true,
            theme: "dark".to_string(),
            text: "upper".to_string(),
            switch_wallet: true,
        }
    }
}

impl ExtensionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn validate(&self) -> Result<()> {
        let storage = &self.storage;
        if storage.address_key.is_empty() || storage.pending_key.is_empty() {
            anyhow::bail!("[storage] keys must not be empty");
        }
        if storage.address_key == storage.pending_key {
            anyhow::bail!(
                "[storage] address_key and pending_key must differ (both '{}')",
                storage.address_key
            );
        }

        let surfaces = &self.surfaces;
        if surfaces.welcome_path.is_empty() || surfaces.selection_path.is_empty() {
            anyhow::bail!("[surfaces] paths must not be empty");
        }
        if surfaces.popup_width == 0 || surfaces.popup_height == 0 {
            anyhow::bail!("[surfaces] popup geometry must be positive");
        }

        if self.sdk.identifier.is_empty() {
            anyhow::bail!("[sdk] identifier is required");
        }
        Ok(())
    }

    /// Options object for the SDK's background initialiser
    pub fn background_init_options(&self) -> Value {
        json!({
            "identifier": self.sdk.identifier,
            "apiEndpoint": self.sdk.environment.as_str(),
            "isEnabledByDefault": self.sdk.enabled_by_default,
        })
    }

    /// Options merged into the SDK's content-script initialiser (alongside the
    /// three callbacks the glue binds)
    pub fn content_script_options(&self) -> Value {
        json!({
            "theme": self.sdk.theme,
            "text": self.sdk.text,
            "switchWallet": self.sdk.switch_wallet,
        })
    }
}
