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
use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::error;

use super::error::EngineError;

/// Describes the expressions (flags) an engine understands. Read from a YAML
/// file next to the engine with the same stem, e.g. `moresampler.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineManifest {
    /// When set, only the listed expressions are passed to the engine.
    #[serde(alias = "expressionFilter")]
    pub expression_filter: bool,
    pub expressions: HashMap<String, ExpressionDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionDescriptor {
    pub name: String,
    pub min: f32,
    pub max: f32,
    #[serde(alias = "defaultValue")]
    pub default_value: f32,
    /// The flag letters written to the engine, if different from the abbreviation.
    pub flag: Option<String>,
}

impl EngineManifest {
    /// Loads a manifest from the given YAML file.
    pub fn load(path: &Path) -> Result<EngineManifest, EngineError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Loads the manifest that sits beside an engine. A missing or broken
    /// manifest yields the permissive default.
    pub fn for_engine(engine_path: &Path) -> EngineManifest {
        let manifest_path = engine_path.with_extension("yaml");
        if !manifest_path.is_file() {
            return EngineManifest::default();
        }
        match EngineManifest::load(&manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!(
                    path = ?manifest_path,
                    err = e.to_string(),
                    "Failed to load engine manifest"
                );
                EngineManifest::default()
            }
        }
    }

    pub fn supports_flag(&self, abbr: &str) -> bool {
        !self.expression_filter || self.expressions.contains_key(abbr)
    }
}
