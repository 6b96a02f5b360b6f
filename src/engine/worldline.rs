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
    env::consts::{DLL_PREFIX, DLL_SUFFIX},
    path::{Path, PathBuf},
};

use super::{
    error::EngineError, native::NativeResampler, params::ResamplerParams, traits::Resampler,
    BUILTIN_ENGINE,
};

/// The built-in engine, backed by the worldline library shipped in the libs directory.
#[derive(Debug)]
pub struct WorldlineResampler {
    native: NativeResampler,
}

impl WorldlineResampler {
    /// Creates the built-in engine. The library is loaded on first use.
    pub fn new(libs_path: &Path) -> WorldlineResampler {
        WorldlineResampler {
            native: NativeResampler::new(BUILTIN_ENGINE, WorldlineResampler::library_path(libs_path)),
        }
    }

    /// The platform-specific library file inside the libs directory.
    pub fn library_path(libs_path: &Path) -> PathBuf {
        libs_path.join(format!("{DLL_PREFIX}{BUILTIN_ENGINE}{DLL_SUFFIX}"))
    }
}

impl Resampler for WorldlineResampler {
    fn name(&self) -> &str {
        BUILTIN_ENGINE
    }

    fn file_path(&self) -> Option<&Path> {
        self.native.file_path()
    }

    fn resample(&self, params: &ResamplerParams) -> Result<Vec<f32>, EngineError> {
        self.native.resample(params)
    }

    fn probe(&self) -> Result<(), EngineError> {
        self.native.probe()
    }
}
