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
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::info;

use super::{
    error::EngineError,
    ffi::{NativeFlags, NativeLibrary, NativeRequest},
    params::{InputAudio, ResamplerParams},
    traits::Resampler,
};
use crate::signal::{decode::read_wav_file, SAMPLE_RATE};

/// An engine implemented by a shared library. The library is loaded on first
/// use and kept for the life of the engine.
#[derive(Debug)]
pub struct NativeResampler {
    name: String,
    path: PathBuf,
    library: Mutex<Option<Arc<NativeLibrary>>>,
}

impl NativeResampler {
    /// Creates an engine without loading the library yet.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> NativeResampler {
        NativeResampler {
            name: name.into(),
            path: path.into(),
            library: Mutex::new(None),
        }
    }

    /// Loads the library at `path` and keeps it if it exports the render entry point.
    pub fn probe_path(path: &Path, base: &Path) -> Result<NativeResampler, EngineError> {
        let library = NativeLibrary::open(path)?;
        let name = path
            .strip_prefix(base)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        Ok(NativeResampler {
            name,
            path: path.to_path_buf(),
            library: Mutex::new(Some(Arc::new(library))),
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.library.lock().is_some()
    }

    fn library(&self) -> Result<Arc<NativeLibrary>, EngineError> {
        let mut library = self.library.lock();
        if let Some(library) = library.as_ref() {
            return Ok(library.clone());
        }
        info!(engine = %self.name, path = ?self.path, "Loading engine library");
        let loaded = Arc::new(NativeLibrary::open(&self.path)?);
        *library = Some(loaded.clone());
        Ok(loaded)
    }

    /// Builds the native request for the given parameters.
    pub fn request(params: &ResamplerParams) -> Result<NativeRequest, EngineError> {
        let samples: Vec<f64> = match params.input_audio() {
            InputAudio::File(path) => read_wav_file(path)?
                .into_iter()
                .map(f64::from)
                .collect(),
            InputAudio::Samples(samples) => samples.iter().copied().map(f64::from).collect(),
        };
        Ok(NativeRequest {
            sample_rate: SAMPLE_RATE,
            samples,
            tone: params.tone,
            velocity: params.velocity,
            offset: params.offset,
            required_length: params.required_length,
            consonant: params.consonant,
            cutoff: params.cutoff,
            volume: params.volume,
            modulation: params.modulation,
            tempo: params.tempo,
            pitch_bend: params.pitch_bend.clone(),
            flags: NativeFlags::parse(&params.flags),
        })
    }
}

impl Resampler for NativeResampler {
    fn name(&self) -> &str {
        &self.name
    }

    fn file_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn resample(&self, params: &ResamplerParams) -> Result<Vec<f32>, EngineError> {
        let request = NativeResampler::request(params)?;
        self.library()?.resample(&request)
    }

    fn probe(&self) -> Result<(), EngineError> {
        self.library().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_samples() {
        let params = ResamplerParams {
            input_samples: Some(Arc::new(vec![0.5, -0.25])),
            tone: 62,
            flags: "g20P40".to_string(),
            pitch_bend: vec![1, 2, 3],
            ..Default::default()
        };
        let request = NativeResampler::request(&params).unwrap();
        assert_eq!(SAMPLE_RATE, request.sample_rate);
        assert_eq!(vec![0.5, -0.25], request.samples);
        assert_eq!(62, request.tone);
        assert_eq!(vec![1, 2, 3], request.pitch_bend);
        assert_eq!(20, request.flags.g);
        assert_eq!(40, request.flags.p);
    }

    #[test]
    fn test_lazy_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = NativeResampler::new("missing", dir.path().join("missing.so"));
        assert!(!engine.is_loaded());
        assert!(engine.probe().is_err());
        assert!(!engine.is_loaded());

        let params = ResamplerParams {
            input_samples: Some(Arc::new(vec![0.0; 4])),
            ..Default::default()
        };
        assert!(matches!(
            engine.resample(&params),
            Err(EngineError::LibraryLoad { .. })
        ));
    }
}
