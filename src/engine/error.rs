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
use std::{path::PathBuf, time::Duration};

use crate::signal::SignalError;

/// Error types for resampler engines
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine {0} is not available")]
    Unavailable(String),

    #[error("Failed to launch {engine}: {source}")]
    Launch {
        engine: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{engine} timed out after {timeout:?}")]
    Timeout { engine: String, timeout: Duration },

    #[error("{engine} exited with {status} and produced no output")]
    Failed { engine: String, status: String },

    #[error("{engine} produced no output")]
    NoOutput { engine: String },

    #[error("{engine} panicked: {message}")]
    Panicked { engine: String, message: String },

    #[error("Failed to load library {path:?}: {reason}")]
    LibraryLoad { path: PathBuf, reason: String },

    #[error("{engine} returned error code {code}")]
    NativeCall { engine: String, code: i32 },

    #[error("Invalid request for {engine}: {reason}")]
    InvalidRequest { engine: String, reason: String },

    #[error("Audio error: {0}")]
    Signal(#[from] SignalError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_yml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
