// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use config::Config;
use duration_string::DurationString;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ConfigError;
use crate::{engine::process::DEFAULT_PROCESS_TIMEOUT, render::FailurePolicy, signal::DEFAULT_BLOCK_SIZE};

const DEFAULT_RESAMPLERS_PATH: &str = "Resamplers";
const DEFAULT_LIBS_PATH: &str = "libs";

/// A YAML representation of the render settings.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct RenderConfig {
    /// The directory searched for engines (default: Resamplers).
    #[serde(skip_serializing_if = "Option::is_none")]
    resamplers_path: Option<PathBuf>,

    /// The directory holding the built-in engine's library (default: libs).
    #[serde(skip_serializing_if = "Option::is_none")]
    libs_path: Option<PathBuf>,

    /// The preferred engine for items that don't name one.
    #[serde(skip_serializing_if = "Option::is_none")]
    resampler: Option<String>,

    /// How long an engine process may run, e.g. "60s" (default: 60s).
    #[serde(skip_serializing_if = "Option::is_none")]
    process_timeout: Option<String>,

    /// Number of render worker threads (default: number of CPUs).
    #[serde(skip_serializing_if = "Option::is_none")]
    render_threads: Option<usize>,

    /// What to do when a segment fails to render (default: silence).
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_policy: Option<FailurePolicy>,

    /// Samples pulled per read when exporting (default: 1024).
    #[serde(skip_serializing_if = "Option::is_none")]
    block_size: Option<usize>,
}

impl RenderConfig {
    /// Loads the settings from a YAML file.
    pub fn load(path: &Path) -> Result<RenderConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize::<RenderConfig>()?)
    }

    /// Writes the settings back out as YAML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yml::to_string(self)?;
        fs::write(path, yaml)?;
        info!(path = ?path, "Saved render settings");
        Ok(())
    }

    pub fn resamplers_path(&self) -> PathBuf {
        self.resamplers_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESAMPLERS_PATH))
    }

    pub fn set_resamplers_path(&mut self, path: impl Into<PathBuf>) {
        self.resamplers_path = Some(path.into());
    }

    pub fn libs_path(&self) -> PathBuf {
        self.libs_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBS_PATH))
    }

    pub fn set_libs_path(&mut self, path: impl Into<PathBuf>) {
        self.libs_path = Some(path.into());
    }

    pub fn resampler(&self) -> Option<&str> {
        self.resampler.as_deref()
    }

    pub fn set_resampler(&mut self, name: &str) {
        self.resampler = Some(name.to_string());
    }

    /// Returns the engine process timeout.
    pub fn process_timeout(&self) -> Result<Duration, ConfigError> {
        match &self.process_timeout {
            Some(timeout) => Ok(DurationString::from_string(timeout.clone())
                .map_err(|_| ConfigError::InvalidDuration(timeout.clone()))?
                .into()),
            None => Ok(DEFAULT_PROCESS_TIMEOUT),
        }
    }

    pub fn render_threads(&self) -> usize {
        self.render_threads.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy.unwrap_or_default()
    }

    pub fn block_size(&self) -> usize {
        self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE).max(1)
    }

    /// Resolves relative directories against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.resamplers_path, &mut self.libs_path]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
