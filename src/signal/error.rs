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
use std::path::PathBuf;

/// Error types for signal chain operations
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("All sources must be ready when exporting (position {position}, count {count})")]
    NotReady { position: usize, count: usize },

    #[error("Unsupported sample rate {actual}Hz, expected {expected}Hz")]
    UnsupportedSampleRate { actual: u32, expected: u32 },

    #[error("Unsupported sample format: {bits} bits, {format:?}")]
    UnsupportedFormat {
        bits: u16,
        format: hound::SampleFormat,
    },

    #[error("Unsupported channel count {0}")]
    UnsupportedChannels(u16),

    #[error("Buffer too small: need {needed} samples, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("WAV error in {path:?}: {source}")]
    WavFile {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("WAV error: {0}")]
    WavError(#[from] hound::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
