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
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read},
    path::Path,
};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::{error::SignalError, SAMPLE_RATE};

/// Decodes in-memory PCM WAV data into mono samples at the reference rate.
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<Vec<f32>, SignalError> {
    decode(WavReader::new(Cursor::new(bytes))?)
}

/// Reads a PCM WAV file into mono samples at the reference rate.
pub fn read_wav_file(path: &Path) -> Result<Vec<f32>, SignalError> {
    let reader = WavReader::open(path).map_err(|source| SignalError::WavFile {
        path: path.to_path_buf(),
        source,
    })?;
    decode(reader)
}

/// Writes mono samples as a 16-bit PCM WAV file at the reference rate.
pub fn write_wav_file(path: &Path, samples: &[f32]) -> Result<(), SignalError> {
    let file = File::create(path)?;
    let mut writer = WavWriter::new(
        BufWriter::new(file),
        WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;
    for sample in samples {
        writer.write_sample(to_i16(*sample))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Converts a float sample to 16-bit PCM, clipping out-of-range values.
pub(crate) fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Validates the format, then decodes. Stereo input keeps the left channel.
fn decode<R: Read>(mut reader: WavReader<R>) -> Result<Vec<f32>, SignalError> {
    let spec = reader.spec();
    if spec.sample_rate != SAMPLE_RATE {
        return Err(SignalError::UnsupportedSampleRate {
            actual: spec.sample_rate,
            expected: SAMPLE_RATE,
        });
    }
    if spec.channels == 0 || spec.channels > 2 {
        return Err(SignalError::UnsupportedChannels(spec.channels));
    }
    let supported = match spec.sample_format {
        SampleFormat::Float => spec.bits_per_sample == 32,
        SampleFormat::Int => matches!(spec.bits_per_sample, 8 | 16 | 24 | 32),
    };
    if !supported {
        return Err(SignalError::UnsupportedFormat {
            bits: spec.bits_per_sample,
            format: spec.sample_format,
        });
    }

    let channels = usize::from(spec.channels);
    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            // i64 keeps the shift from overflowing for 32-bit samples.
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|sample| sample as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(interleaved.into_iter().step_by(channels).collect())
}
