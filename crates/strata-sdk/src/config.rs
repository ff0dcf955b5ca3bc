// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runtime configuration loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_control::{KernelConfig, KernelError};
use strata_core::Affinity;

/// Errors raised while loading or validating a [`RuntimeConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file '{path}'")]
    Read {
        /// The file that was requested.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse runtime config")]
    Parse(#[from] toml::de::Error),
    /// A kernel section holds out-of-range values.
    #[error("invalid [{section}] settings")]
    Invalid {
        /// The offending section.
        section: &'static str,
        /// What is wrong with it.
        #[source]
        source: KernelError,
    },
}

/// Settings for a whole runtime session.
///
/// ```toml
/// log_filter = "info,strata::kernel=debug"
///
/// [kernel]
/// fixed_update_hz = 60
///
/// [render]
/// frame_rate_cap = 144
/// ```
///
/// `[kernel]` applies to every affinity; `[main]`, `[game]` and `[render]`
/// replace it for one kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// `env_logger` filter used when `RUST_LOG` is not set.
    pub log_filter: Option<String>,
    /// Defaults for every kernel.
    pub kernel: KernelConfig,
    /// Main kernel override.
    pub main: Option<KernelConfig>,
    /// Game kernel override.
    pub game: Option<KernelConfig>,
    /// Render kernel override.
    pub render: Option<KernelConfig>,
}

impl RuntimeConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        log::info!("Loaded runtime config from '{}'.", path.display());
        Ok(config)
    }

    /// Checks every kernel section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sections = [
            ("kernel", Some(&self.kernel)),
            ("main", self.main.as_ref()),
            ("game", self.game.as_ref()),
            ("render", self.render.as_ref()),
        ];
        for (section, config) in sections {
            if let Some(config) = config {
                config
                    .validate()
                    .map_err(|source| ConfigError::Invalid { section, source })?;
            }
        }
        Ok(())
    }

    /// The effective settings for the kernel on `affinity`.
    pub fn kernel_config(&self, affinity: Affinity) -> KernelConfig {
        let specific = match affinity {
            Affinity::MAIN => self.main.as_ref(),
            Affinity::GAME => self.game.as_ref(),
            Affinity::RENDER => self.render.as_ref(),
            _ => None,
        };
        specific.unwrap_or(&self.kernel).clone()
    }
}
