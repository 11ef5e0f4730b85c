//! Configuration for the LMS server
//!
//! Centralized configuration with sensible defaults. Values can come from the
//! builder, from a TOML file, or both (CLI flags are applied on top of the file
//! by the server binary).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{LmsError, Result};
use crate::store::Role;
use crate::transfer::TransferLimits;

/// Main configuration for an LMS server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all stored files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── submissions/     (assignment uploads)
    ///     └── videos/          (lecture videos)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Line-protocol TCP listen address
    pub listen_addr: String,

    /// HTTP video streaming listen address
    pub http_listen_addr: String,

    /// Max concurrent client connections (per server)
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Limits
    // -------------------------------------------------------------------------
    /// Longest accepted header line, excluding the terminator
    pub max_header_bytes: usize,

    /// Largest declared upload size
    pub max_upload_bytes: u64,

    /// Chunk size used for every file transfer read/write
    pub chunk_size: usize,

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------
    /// Accounts loaded into the in-process metadata store at startup
    pub users: Vec<UserSeed>,

    /// Default log filter directive
    pub log_level: String,
}

/// An account seeded into the metadata store
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UserSeed {
    pub id: String,
    pub password: String,
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub contact: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./lms_data"),
            listen_addr: "0.0.0.0:5051".to_string(),
            http_listen_addr: "0.0.0.0:8081".to_string(),
            max_connections: 1024,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            max_header_bytes: 64 * 1024,          // 64 KB
            max_upload_bytes: 50 * 1024 * 1024,   // 50 MB
            chunk_size: 64 * 1024,                // 64 KB
            users: Vec::new(),
            log_level: "info,lms=debug".to_string(),
        }
    }
}

impl Config {
    const SUBMISSION_DIR: &'static str = "submissions";
    const VIDEO_DIR: &'static str = "videos";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Directory holding assignment submissions
    pub fn submissions_dir(&self) -> PathBuf {
        self.data_dir.join(Self::SUBMISSION_DIR)
    }

    /// Directory holding uploaded videos
    pub fn videos_dir(&self) -> PathBuf {
        self.data_dir.join(Self::VIDEO_DIR)
    }

    /// Transfer limits derived from this config
    pub fn transfer_limits(&self) -> TransferLimits {
        TransferLimits {
            max_upload_bytes: self.max_upload_bytes,
            chunk_size: self.chunk_size,
        }
    }

    /// Load a config from a TOML file, starting from the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            LmsError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse a config from TOML text, starting from the defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| LmsError::Config(e.to_string()))?;
        let config = file.apply(Config::default());
        config.validate()?;
        Ok(config)
    }

    /// Reject values the servers cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(LmsError::Config("max_connections must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(LmsError::Config("chunk_size must be at least 1".into()));
        }
        if self.max_header_bytes == 0 {
            return Err(LmsError::Config("max_header_bytes must be at least 1".into()));
        }
        Ok(())
    }
}

// =============================================================================
// TOML File Structure
// =============================================================================

/// TOML configuration file structure
///
/// Every key is optional; missing keys keep the default value.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub users: Vec<UserSeed>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub listen: Option<String>,
    pub max_connections: Option<usize>,
    pub read_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    pub listen: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    pub max_header_bytes: Option<usize>,
    pub max_upload_bytes: Option<u64>,
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
}

impl FileConfig {
    /// Overlay the values present in the file onto `base`
    fn apply(self, mut base: Config) -> Config {
        if let Some(listen) = self.server.listen {
            base.listen_addr = listen;
        }
        if let Some(max) = self.server.max_connections {
            base.max_connections = max;
        }
        if let Some(ms) = self.server.read_timeout_ms {
            base.read_timeout_ms = ms;
        }
        if let Some(ms) = self.server.write_timeout_ms {
            base.write_timeout_ms = ms;
        }
        if let Some(listen) = self.http.listen {
            base.http_listen_addr = listen;
        }
        if let Some(bytes) = self.limits.max_header_bytes {
            base.max_header_bytes = bytes;
        }
        if let Some(bytes) = self.limits.max_upload_bytes {
            base.max_upload_bytes = bytes;
        }
        if let Some(bytes) = self.limits.chunk_size {
            base.chunk_size = bytes;
        }
        if let Some(dir) = self.storage.data_dir {
            base.data_dir = dir;
        }
        if let Some(level) = self.logging.level {
            base.log_level = level;
        }
        if !self.users.is_empty() {
            base.users = self.users;
        }
        base
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an existing config (e.g. one loaded from a file)
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the data directory (root for all stored files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the line-protocol listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the HTTP listen address
    pub fn http_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the header line cap (in bytes)
    pub fn max_header_bytes(mut self, bytes: usize) -> Self {
        self.config.max_header_bytes = bytes;
        self
    }

    /// Set the upload size cap (in bytes)
    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Set the transfer chunk size (in bytes)
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.config.chunk_size = bytes;
        self
    }

    /// Add a seeded account
    pub fn user(mut self, seed: UserSeed) -> Self {
        self.config.users.push(seed);
        self
    }

    /// Set the default log filter
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
