//! Engine and store configuration
//!
//! The engine is wired entirely from explicit paths and an instantiated
//! blob store; nothing here reads configuration files. [`StoreConfig`] is
//! the tagged provider description that out-of-tree adapter crates consume
//! to construct a concrete [`crate::ports::BlobStore`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the configuration directory under the user's home
pub const CONFIG_DIR_NAME: &str = ".claude-sync";

/// State file name inside the configuration directory
pub const STATE_FILE_NAME: &str = "state.json";

/// Encryption identity file name inside the configuration directory
pub const KEY_FILE_NAME: &str = "age-key.txt";

/// Default sync-path set: the top-level names synchronized out of the
/// working tree when the host does not supply its own list.
pub const DEFAULT_SYNC_PATHS: &[&str] = &[
    "CLAUDE.md",
    "settings.json",
    "settings.local.json",
    "agents",
    "skills",
    "plugins",
    "projects",
    "history.jsonl",
    "rules",
];

/// Platform default for the configuration directory (`~/.claude-sync`)
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME))
}

// ============================================================================
// EngineConfig
// ============================================================================

/// Host-provided wiring for one engine instance
///
/// Everything the engine needs beyond the blob store handle: where the
/// working tree lives, which top-level names to consider, and where the
/// identity and state files are.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Absolute path of the working tree root
    pub tree_root: PathBuf,
    /// Ordered list of top-level names under the tree root to synchronize
    pub sync_paths: Vec<String>,
    /// Path to the encryption identity file
    pub key_path: PathBuf,
    /// Path to the persistent state file
    pub state_path: PathBuf,
}

impl EngineConfig {
    /// Create a config from explicit parts
    #[must_use]
    pub fn new(
        tree_root: PathBuf,
        sync_paths: Vec<String>,
        key_path: PathBuf,
        state_path: PathBuf,
    ) -> Self {
        Self {
            tree_root,
            sync_paths,
            key_path,
            state_path,
        }
    }

    /// Config using the default sync-path set and the `~/.claude-sync`
    /// key/state layout. Returns `None` when the home directory cannot be
    /// determined.
    #[must_use]
    pub fn with_default_layout(tree_root: PathBuf) -> Option<Self> {
        let config_dir = default_config_dir()?;
        Some(Self {
            tree_root,
            sync_paths: DEFAULT_SYNC_PATHS.iter().map(ToString::to_string).collect(),
            key_path: config_dir.join(KEY_FILE_NAME),
            state_path: config_dir.join(STATE_FILE_NAME),
        })
    }
}

// ============================================================================
// StoreConfig
// ============================================================================

/// Store configuration validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("bucket is required")]
    MissingBucket,

    #[error("{field} is required for {provider}")]
    MissingField {
        field: &'static str,
        provider: &'static str,
    },
}

/// Provider-specific store settings
///
/// The tagged variant an adapter factory matches on; the match is
/// exhaustive and checked at compile time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum StoreProvider {
    /// Cloudflare R2
    R2 {
        account_id: String,
        access_key_id: String,
        secret_access_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
    /// Amazon S3 (or any S3-compatible endpoint)
    S3 {
        access_key_id: String,
        secret_access_key: String,
        region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
    /// Google Cloud Storage
    Gcs {
        project_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        credentials_file: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        credentials_json: Option<String>,
        #[serde(default)]
        use_default_credentials: bool,
    },
}

impl StoreProvider {
    /// Short provider name, matching the serialized tag
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::R2 { .. } => "r2",
            Self::S3 { .. } => "s3",
            Self::Gcs { .. } => "gcs",
        }
    }
}

/// Full store configuration: a bucket plus provider settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    pub bucket: String,
    #[serde(flatten)]
    pub provider: StoreProvider,
}

impl StoreConfig {
    /// Check that every field the selected provider requires is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.is_empty() {
            return Err(ConfigError::MissingBucket);
        }

        let (provider, required): (&'static str, Vec<(&'static str, &str)>) = match &self.provider
        {
            StoreProvider::R2 {
                account_id,
                access_key_id,
                secret_access_key,
                ..
            } => (
                "R2",
                vec![
                    ("account_id", account_id.as_str()),
                    ("access_key_id", access_key_id.as_str()),
                    ("secret_access_key", secret_access_key.as_str()),
                ],
            ),
            StoreProvider::S3 {
                access_key_id,
                secret_access_key,
                region,
                ..
            } => (
                "S3",
                vec![
                    ("access_key_id", access_key_id.as_str()),
                    ("secret_access_key", secret_access_key.as_str()),
                    ("region", region.as_str()),
                ],
            ),
            StoreProvider::Gcs { project_id, .. } => {
                ("GCS", vec![("project_id", project_id.as_str())])
            }
        };

        for (field, value) in required {
            if value.is_empty() {
                return Err(ConfigError::MissingField { field, provider });
            }
        }

        Ok(())
    }

    /// Endpoint URL for the provider, applying the provider default when
    /// no explicit endpoint is configured. GCS has no endpoint concept
    /// here and returns `None`.
    #[must_use]
    pub fn endpoint(&self) -> Option<String> {
        match &self.provider {
            StoreProvider::R2 {
                account_id,
                endpoint,
                ..
            } => endpoint.clone().or_else(|| {
                (!account_id.is_empty())
                    .then(|| format!("https://{account_id}.r2.cloudflarestorage.com"))
            }),
            StoreProvider::S3 {
                region, endpoint, ..
            } => endpoint
                .clone()
                .or_else(|| (!region.is_empty()).then(|| format!("https://s3.{region}.amazonaws.com"))),
            StoreProvider::Gcs { .. } => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
