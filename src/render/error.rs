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
use crate::{engine::EngineError, signal::SignalError};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Render aborted, segment {index} failed: {source}")]
    Aborted { index: usize, source: EngineError },

    #[error("Render cancelled with {cancelled} segments unrendered")]
    Cancelled { cancelled: usize },

    #[error("Render workers stopped with {missing} segments unreported")]
    Incomplete { missing: usize },

    #[error("Unable to start render workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),
}
