//! Runtime configuration.

use serde::{Deserialize, Serialize};

use smab_core::DEFAULT_KDF_ITERATIONS;
use smab_format::DEFAULT_MAX_SECTION_LEN;

use crate::error::{Result, SmabError};

const DAY_SECS: u64 = 24 * 60 * 60;

/// Configuration for [`Smab`](crate::Smab).
///
/// Loadable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmabConfig {
    /// PBKDF2 iteration count. Not stored in files, so it must match between
    /// the process that creates a file and the one that opens it.
    pub kdf_iterations: u32,
    /// Token lifetime when the caller does not give one.
    pub default_token_ttl_secs: u64,
    /// Longest lifetime a token may be issued with.
    pub max_token_ttl_secs: u64,
    /// Bound on the header and ciphertext sections of a container.
    pub max_payload_len: usize,
}

impl Default for SmabConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            default_token_ttl_secs: 7 * DAY_SECS,
            max_token_ttl_secs: 90 * DAY_SECS,
            max_payload_len: DEFAULT_MAX_SECTION_LEN,
        }
    }
}

impl SmabConfig {
    /// Parse from JSON and validate.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| SmabError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kdf_iterations == 0 {
            return Err(SmabError::InvalidConfig("kdf_iterations must be > 0".into()));
        }
        if self.max_token_ttl_secs == 0 {
            return Err(SmabError::InvalidConfig("max_token_ttl_secs must be > 0".into()));
        }
        if self.default_token_ttl_secs == 0 || self.default_token_ttl_secs > self.max_token_ttl_secs {
            return Err(SmabError::InvalidConfig(format!(
                "default_token_ttl_secs must be in 1..={}",
                self.max_token_ttl_secs
            )));
        }
        if self.max_payload_len == 0 || self.max_payload_len > u32::MAX as usize {
            return Err(SmabError::InvalidConfig(
                "max_payload_len must fit a u32 length prefix".into(),
            ));
        }
        Ok(())
    }
}
