use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::Argon2Params;
use crate::errors::{Result, VaultError};
use crate::session::GateOptions;
use crate::vault::StoreOptions;

/// Project-level configuration, loaded from `.securevault.toml`.
///
/// Every field has a default, so SecureVault works without any config
/// file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to the project root) holding vault blobs and
    /// the local account directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Upper bound on a single vault read or write.
    #[serde(default = "default_storage_timeout_ms")]
    pub storage_timeout_ms: u64,

    /// Upper bound on a single identity-provider call.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_data_dir() -> String {
    ".securevault".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_storage_timeout_ms() -> u64 {
    5_000
}

fn default_provider_timeout_ms() -> u64 {
    10_000
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            storage_timeout_ms: default_storage_timeout_ms(),
            provider_timeout_ms: default_provider_timeout_ms(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".securevault.toml";

    /// Load settings from `<project_dir>/.securevault.toml`.
    ///
    /// A missing file yields defaults. A file that cannot be parsed, or
    /// that asks for KDF parameters below the enforced minimum, is an error.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.argon2_params().check().map_err(|e| {
            VaultError::ConfigError(format!("{}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Directory holding the per-principal vault blobs.
    ///
    /// `data_dir` may be overridden (e.g. by `--data-dir`); an absolute
    /// path is used as-is.
    pub fn data_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.data_dir)
    }

    /// Path of the local account directory.
    ///
    /// Example: `project_dir/.securevault/accounts.json`
    pub fn accounts_path(&self, project_dir: &Path) -> PathBuf {
        self.data_path(project_dir).join("accounts.json")
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// Options for the session gate and the vaults it opens.
    pub fn gate_options(&self) -> GateOptions {
        GateOptions {
            store: StoreOptions {
                argon2_params: self.argon2_params(),
                io_timeout: Duration::from_millis(self.storage_timeout_ms),
            },
            provider_timeout: Duration::from_millis(self.provider_timeout_ms),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
