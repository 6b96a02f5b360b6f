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
use std::path::Path;

use super::{error::EngineError, params::ResamplerParams};

/// A synthesis engine that turns a source recording and note parameters into PCM samples.
///
/// Engines are shared across render workers and may be called concurrently for
/// different segments.
pub trait Resampler: Send + Sync {
    /// A stable identifier used for lookup.
    fn name(&self) -> &str;

    /// The file backing this engine, if any.
    fn file_path(&self) -> Option<&Path> {
        None
    }

    /// Renders one segment. Returns mono samples at the reference rate.
    fn resample(&self, params: &ResamplerParams) -> Result<Vec<f32>, EngineError>;

    /// Whether the engine understands the given flag abbreviation.
    fn supports_flag(&self, _flag: &str) -> bool {
        true
    }

    /// Checks the engine can be used, loading it if needed.
    fn probe(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
