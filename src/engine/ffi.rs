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
//! The boundary to native resampler libraries. All unsafe code for calling
//! into an engine library lives here. Callers pass owned buffers in and get
//! owned samples back.

use std::{
    os::raw::c_int,
    path::{Path, PathBuf},
    ptr, slice,
};

use libloading::{Library, Symbol};
use tracing::{debug, warn};

use super::{error::EngineError, pitch::flag_value};

/// The render entry point every native engine exports:
/// `int Resample(const SynthRequest* request, float** y)`.
pub const RESAMPLE_SYMBOL: &[u8] = b"Resample\0";

/// Optional deallocator for buffers returned by `Resample`: `void FreeSamples(float* y)`.
pub const FREE_SYMBOL: &[u8] = b"FreeSamples\0";

type ResampleFn = unsafe extern "C" fn(*const SynthRequest, *mut *mut f32) -> c_int;
type FreeFn = unsafe extern "C" fn(*mut f32);

/// The request record, laid out exactly as engines expect it.
#[repr(C)]
#[allow(non_snake_case, dead_code)]
struct SynthRequest {
    sample_fs: c_int,
    sample_length: c_int,
    sample: *const f64,
    tone: c_int,
    con_vel: f64,
    offset: f64,
    required_length: f64,
    consonant: f64,
    cut_off: f64,
    volume: f64,
    modulation: f64,
    tempo: f64,
    pitch_bend_length: c_int,
    pitch_bend: *const c_int,
    flag_g: c_int,
    flag_Mt: c_int,
    flag_O: c_int,
    flag_P: c_int,
}

/// The classic flags native engines read directly from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeFlags {
    /// Gender, -100 to 100.
    pub g: i32,
    /// Tension, -100 to 100.
    pub mt: i32,
    /// Brightness.
    pub o: i32,
    /// Peak compression, 0 to 100.
    pub p: i32,
}

impl Default for NativeFlags {
    fn default() -> Self {
        NativeFlags {
            g: 0,
            mt: 0,
            o: 0,
            p: 86,
        }
    }
}

impl NativeFlags {
    /// Parses a classic flag string such as `g-10P50Mt5`.
    pub fn parse(flags: &str) -> NativeFlags {
        let defaults = NativeFlags::default();
        NativeFlags {
            g: flag_value(flags, "g").unwrap_or(defaults.g).clamp(-100, 100),
            mt: flag_value(flags, "Mt")
                .unwrap_or(defaults.mt)
                .clamp(-100, 100),
            o: flag_value(flags, "O").unwrap_or(defaults.o),
            p: flag_value(flags, "P").unwrap_or(defaults.p).clamp(0, 100),
        }
    }
}

/// An owned render request for a native engine.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeRequest {
    pub sample_rate: u32,
    pub samples: Vec<f64>,
    pub tone: i32,
    pub velocity: f64,
    pub offset: f64,
    pub required_length: f64,
    pub consonant: f64,
    pub cutoff: f64,
    pub volume: f64,
    pub modulation: f64,
    pub tempo: f64,
    pub pitch_bend: Vec<i32>,
    pub flags: NativeFlags,
}

/// A loaded engine library that exports the render entry point.
#[derive(Debug)]
pub struct NativeLibrary {
    path: PathBuf,
    library: Library,
    can_free: bool,
}

impl NativeLibrary {
    /// Loads the library and checks it exports `Resample`.
    pub fn open(path: &Path) -> Result<NativeLibrary, EngineError> {
        let load_error = |reason: String| EngineError::LibraryLoad {
            path: path.to_path_buf(),
            reason,
        };

        // SAFETY: loading runs the library's initializers. Engine libraries are
        // installed by the user into the engine directory and trusted as such.
        let library = unsafe { Library::new(path) }.map_err(|e| load_error(e.to_string()))?;

        // SAFETY: the symbol is only looked up here, the type is checked on call.
        unsafe { library.get::<ResampleFn>(RESAMPLE_SYMBOL) }
            .map_err(|e| load_error(e.to_string()))?;
        // SAFETY: as above.
        let can_free = unsafe { library.get::<FreeFn>(FREE_SYMBOL) }.is_ok();
        if !can_free {
            warn!(
                path = ?path,
                "Engine library has no FreeSamples export, its output buffers will not be released"
            );
        }

        debug!(path = ?path, "Loaded engine library");
        Ok(NativeLibrary {
            path: path.to_path_buf(),
            library,
            can_free,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs one render through the library and copies the result out.
    pub fn resample(&self, request: &NativeRequest) -> Result<Vec<f32>, EngineError> {
        let lookup_error = |e: libloading::Error| EngineError::LibraryLoad {
            path: self.path.clone(),
            reason: e.to_string(),
        };
        // SAFETY: the symbol was verified in `open` and has the documented signature.
        let resample: Symbol<ResampleFn> =
            unsafe { self.library.get(RESAMPLE_SYMBOL) }.map_err(lookup_error)?;
        let free = if self.can_free {
            // SAFETY: as above.
            match unsafe { self.library.get::<FreeFn>(FREE_SYMBOL) } {
                Ok(free) => Some(*free),
                Err(e) => {
                    warn!(path = ?self.path, err = e.to_string(), "Unable to find FreeSamples");
                    None
                }
            }
        } else {
            None
        };

        let engine = self.path.to_string_lossy();
        // SAFETY: both pointers come from `self.library`, which outlives the call.
        unsafe { call_resample(&engine, *resample, free, request) }
    }
}

/// Calls `resample` with the request, copies its output and hands the buffer
/// back to `free`. Without `free` the buffer is left to the engine.
///
/// # Safety
///
/// `resample` and `free` must follow the engine calling convention: `resample`
/// writes either null or a pointer to at least its returned count of floats,
/// and `free` accepts exactly the pointers `resample` hands out.
unsafe fn call_resample(
    engine: &str,
    resample: ResampleFn,
    free: Option<FreeFn>,
    request: &NativeRequest,
) -> Result<Vec<f32>, EngineError> {
    let invalid = |reason: &str| EngineError::InvalidRequest {
        engine: engine.to_string(),
        reason: reason.to_string(),
    };
    let sample_fs =
        c_int::try_from(request.sample_rate).map_err(|_| invalid("sample rate too large"))?;
    let sample_length =
        c_int::try_from(request.samples.len()).map_err(|_| invalid("too many samples"))?;
    let pitch_bend_length =
        c_int::try_from(request.pitch_bend.len()).map_err(|_| invalid("pitch bend too long"))?;

    // Borrows the request's buffers, which outlive the call below.
    let raw = SynthRequest {
        sample_fs,
        sample_length,
        sample: request.samples.as_ptr(),
        tone: request.tone,
        con_vel: request.velocity,
        offset: request.offset,
        required_length: request.required_length,
        consonant: request.consonant,
        cut_off: request.cutoff,
        volume: request.volume,
        modulation: request.modulation,
        tempo: request.tempo,
        pitch_bend_length,
        pitch_bend: request.pitch_bend.as_ptr(),
        flag_g: request.flags.g,
        flag_Mt: request.flags.mt,
        flag_O: request.flags.o,
        flag_P: request.flags.p,
    };

    let mut output: *mut f32 = ptr::null_mut();
    // SAFETY: `raw` and the buffers it points into are alive for the call,
    // and `output` is a valid location for the engine to write a pointer to.
    let size = unsafe { resample(&raw, &mut output) };

    let result = if size < 0 {
        Err(EngineError::NativeCall {
            engine: engine.to_string(),
            code: size,
        })
    } else if output.is_null() || size == 0 {
        Ok(Vec::new())
    } else {
        // SAFETY: the engine returned `size` initialized floats at `output`,
        // which stay valid until released below.
        Ok(unsafe { slice::from_raw_parts(output, size as usize) }.to_vec())
    };

    if !output.is_null() {
        match free {
            // SAFETY: `output` came from `resample` and is released exactly once.
            Some(free) => unsafe { free(output) },
            None => debug!(engine, "Leaving engine output buffer unreleased"),
        }
    }
    result
}
