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
    error::Error,
    f32::consts::PI,
    fs::File,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::{Duration, Instant},
};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{
    engine::{EngineError, Resampler, ResamplerParams},
    signal::SAMPLE_RATE,
    util::ms_to_samples,
};

pub fn write_wav_with_bits<S: hound::Sample + Copy + 'static>(
    path: PathBuf,
    samples: Vec<Vec<S>>,
    sample_rate: u32,
    bits_per_sample: u16,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;

    let sample_format = if std::any::TypeId::of::<S>() == std::any::TypeId::of::<f32>() {
        SampleFormat::Float
    } else if std::any::TypeId::of::<S>() == std::any::TypeId::of::<i32>()
        || std::any::TypeId::of::<S>() == std::any::TypeId::of::<i16>()
    {
        SampleFormat::Int
    } else {
        return Err("Unsupported sample format".into());
    };

    let num_channels = samples.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let mut writer = WavWriter::new(
        file,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample,
            sample_format,
        },
    )?;

    for channel_samples in &samples {
        for sample in channel_samples {
            writer.write_sample(*sample)?;
        }
    }
    writer.finalize()?;

    Ok(())
}

/// A 440Hz sine at the reference rate.
pub fn sine(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

/// Encodes samples as an in-memory 32-bit float mono WAV.
pub fn wav_bytes(samples: &[f32]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(
            &mut cursor,
            WavSpec {
                channels: 1,
                sample_rate: SAMPLE_RATE,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
        )
        .expect("wav writer");
        for sample in samples {
            writer.write_sample(*sample).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

/// Wait for the given predicate to return true or fail.
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(5);

    loop {
        if start.elapsed() > timeout {
            panic!("{}", error_msg);
        }
        if predicate() {
            return;
        }
        thread::sleep(tick);
    }
}

/// An in-process engine that renders `required_length` ms of a constant value.
pub struct ConstResampler {
    name: String,
    value: f32,
    delay: Duration,
    calls: AtomicUsize,
}

impl ConstResampler {
    pub fn new(name: &str, value: f32) -> ConstResampler {
        ConstResampler {
            name: name.to_string(),
            value,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleeps this long in every call.
    pub fn with_delay(mut self, delay: Duration) -> ConstResampler {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Resampler for ConstResampler {
    fn name(&self) -> &str {
        &self.name
    }

    fn resample(&self, params: &ResamplerParams) -> Result<Vec<f32>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(vec![
            self.value;
            ms_to_samples(params.required_length, SAMPLE_RATE)
        ])
    }
}

/// An in-process engine that never produces output.
pub struct FailingResampler {
    name: String,
}

impl FailingResampler {
    pub fn new(name: &str) -> FailingResampler {
        FailingResampler {
            name: name.to_string(),
        }
    }
}

impl Resampler for FailingResampler {
    fn name(&self) -> &str {
        &self.name
    }

    fn resample(&self, _params: &ResamplerParams) -> Result<Vec<f32>, EngineError> {
        Err(EngineError::NoOutput {
            engine: self.name.clone(),
        })
    }

    fn probe(&self) -> Result<(), EngineError> {
        Err(EngineError::Unavailable(self.name.clone()))
    }
}

/// An in-process engine that panics mid-render.
pub struct PanickingResampler {
    name: String,
}

impl PanickingResampler {
    pub fn new(name: &str) -> PanickingResampler {
        PanickingResampler {
            name: name.to_string(),
        }
    }
}

impl Resampler for PanickingResampler {
    fn name(&self) -> &str {
        &self.name
    }

    fn resample(&self, _params: &ResamplerParams) -> Result<Vec<f32>, EngineError> {
        panic!("{} lost its voicebank", self.name);
    }
}
