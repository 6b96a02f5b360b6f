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
pub mod error;
pub mod ffi;
pub mod manifest;
pub mod native;
pub mod params;
pub mod pitch;
pub mod process;
pub mod registry;
pub mod startup;
pub mod traits;
pub mod worldline;


pub use error::EngineError;
pub use manifest::EngineManifest;
pub use native::NativeResampler;
pub use params::{InputAudio, ResamplerParams};
pub use process::ProcessResampler;
pub use registry::{Engine, EngineDescriptor, EngineKind, EngineRegistry};
pub use startup::{RetryPolicy, Startup, StartupOutcome, StartupState};
pub use traits::Resampler;
pub use worldline::WorldlineResampler;

/// The name of the built-in engine. Any engine name starting with it resolves to the built-in.
pub const BUILTIN_ENGINE: &str = "worldline";
