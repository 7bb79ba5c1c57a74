use std::{fs, path::PathBuf};

use chrono::Duration;
use common::blobs::{BlobStoreError, FsBlobStore};
use common::cache::{CacheError, FileStore, SignatureCache, DEFAULT_CACHE_TTL_HOURS};
use common::crypto::{KeyVersion, DEFAULT_DOMAIN};
use common::session::{SessionConfig, DEFAULT_CHAIN_ID};
use common::wallet::LocalWallet;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "securedag";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const WALLET_FILE_NAME: &str = "wallet.pem";
pub const BLOBS_DIR_NAME: &str = "blobs";
pub const CACHE_DIR_NAME: &str = "cache";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chain id embedded in the derivation message
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Domain embedded in the derivation message
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Key version to derive
    #[serde(default = "default_key_version")]
    pub key_version: u32,
    /// How long a cached wallet signature stays usable
    #[serde(default = "default_signature_cache_ttl_hours")]
    pub signature_cache_ttl_hours: i64,
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_key_version() -> u32 {
    KeyVersion::CURRENT.get()
}

fn default_signature_cache_ttl_hours() -> i64 {
    DEFAULT_CACHE_TTL_HOURS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            domain: default_domain(),
            key_version: default_key_version(),
            signature_cache_ttl_hours: default_signature_cache_ttl_hours(),
        }
    }
}

impl AppConfig {
    /// Check the user-editable values and build the settings keys are unlocked with
    pub fn session_config(&self) -> Result<SessionConfig, StateError> {
        let key_version = KeyVersion::new(self.key_version)
            .map_err(|e| StateError::InvalidConfig(e.to_string()))?;

        let hours = self.signature_cache_ttl_hours;
        if hours <= 0 {
            return Err(StateError::InvalidConfig(format!(
                "signature_cache_ttl_hours must be positive, got {}",
                hours
            )));
        }
        let cache_ttl = Duration::try_hours(hours).ok_or_else(|| {
            StateError::InvalidConfig(format!(
                "signature_cache_ttl_hours is out of range: {}",
                hours
            ))
        })?;

        Ok(SessionConfig {
            chain_id: self.chain_id,
            domain: self.domain.clone(),
            key_version,
            cache_ttl,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the securedag directory (~/.securedag)
    pub securedag_dir: PathBuf,
    /// Path to the wallet key PEM file
    pub wallet_path: PathBuf,
    /// Path to the encrypted blob directory
    pub blobs_path: PathBuf,
    /// Path to the signature cache directory
    pub cache_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the securedag directory path (custom or default ~/.securedag)
    pub fn securedag_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new securedag state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let securedag_dir = Self::securedag_dir(custom_path)?;

        if securedag_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        // Validate before touching the filesystem
        let config = config.unwrap_or_default();
        config.session_config()?;

        fs::create_dir_all(&securedag_dir)?;

        let blobs_path = securedag_dir.join(BLOBS_DIR_NAME);
        fs::create_dir_all(&blobs_path)?;
        let cache_path = securedag_dir.join(CACHE_DIR_NAME);
        fs::create_dir_all(&cache_path)?;

        // Generate and save the wallet key
        let wallet = LocalWallet::generate().map_err(|e| StateError::InvalidKey(e.to_string()))?;
        let wallet_path = securedag_dir.join(WALLET_FILE_NAME);
        fs::write(&wallet_path, wallet.to_pem())?;

        let config_path = securedag_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        tracing::debug!(dir = %securedag_dir.display(), "initialized state directory");
        Ok(Self {
            securedag_dir,
            wallet_path,
            blobs_path,
            cache_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the securedag directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let securedag_dir = Self::securedag_dir(custom_path)?;

        if !securedag_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let wallet_path = securedag_dir.join(WALLET_FILE_NAME);
        let blobs_path = securedag_dir.join(BLOBS_DIR_NAME);
        let cache_path = securedag_dir.join(CACHE_DIR_NAME);
        let config_path = securedag_dir.join(CONFIG_FILE_NAME);

        if !wallet_path.exists() {
            return Err(StateError::MissingFile(WALLET_FILE_NAME.to_string()));
        }
        if !blobs_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", BLOBS_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;
        config.session_config()?;

        Ok(Self {
            securedag_dir,
            wallet_path,
            blobs_path,
            cache_path,
            config_path,
            config,
        })
    }

    /// Load the wallet from the key file
    pub fn load_wallet(&self) -> Result<LocalWallet, StateError> {
        let pem = fs::read_to_string(&self.wallet_path)?;
        LocalWallet::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))
    }

    pub fn session_config(&self) -> Result<SessionConfig, StateError> {
        self.config.session_config()
    }

    /// File-backed signature cache under `cache/`
    pub fn signature_cache(&self) -> Result<SignatureCache<FileStore>, StateError> {
        Ok(SignatureCache::with_ttl(
            FileStore::open(&self.cache_path)?,
            self.session_config()?.cache_ttl,
        ))
    }

    pub async fn blob_store(&self) -> Result<FsBlobStore, StateError> {
        Ok(FsBlobStore::open(&self.blobs_path).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("securedag directory not initialized. Run 'securedag init' first")]
    NotInitialized,

    #[error("securedag directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid wallet key: {0}")]
    InvalidKey(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("blob store error: {0}")]
    Blobs(#[from] BlobStoreError),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
