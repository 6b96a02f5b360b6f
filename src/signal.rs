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
pub mod adapter;
pub mod decode;
pub mod envelope;
pub mod error;
pub mod fader;
pub mod mixer;
pub mod tone;
pub mod traits;
pub mod wave;


pub use adapter::{ExportAdapter, MasterAdapter, SampleReader, DEFAULT_BLOCK_SIZE};
pub use envelope::{Envelope, EnvelopePoint};
pub use error::SignalError;
pub use fader::Fader;
pub use mixer::SignalMixer;
pub use tone::ToneGenerator;
pub use traits::SignalSource;
pub use wave::WaveSource;

/// The reference sample rate for every signal in the render chain.
pub const SAMPLE_RATE: u32 = 44100;
