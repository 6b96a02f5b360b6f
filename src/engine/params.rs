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

use serde::{Deserialize, Serialize};

use super::pitch::{encode_pitch_bend, tone_name};

const DEFAULT_TONE: i32 = 60;
const DEFAULT_VELOCITY: f64 = 100.0;
const DEFAULT_VOLUME: f64 = 100.0;
const DEFAULT_TEMPO: f64 = 120.0;

/// Where a resampler reads its source recording from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAudio<'a> {
    File(&'a Path),
    Samples(&'a [f32]),
}

/// One resampler invocation: the source recording and the classic UTAU parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplerParams {
    /// The source recording on disk.
    pub input: PathBuf,

    /// Decoded source audio. When present it is used instead of `input`.
    #[serde(skip)]
    pub input_samples: Option<Arc<Vec<f32>>>,

    /// Target tone, C4 = 60.
    pub tone: i32,
    /// Consonant velocity in percent.
    pub velocity: f64,
    pub flags: String,
    /// Offset into the source recording in milliseconds.
    pub offset: f64,
    /// Requested output length in milliseconds.
    pub required_length: f64,
    /// Fixed (unstretched) consonant length in milliseconds.
    pub consonant: f64,
    /// Cutoff in milliseconds. Negative values are measured from the offset.
    pub cutoff: f64,
    /// Output volume in percent.
    pub volume: f64,
    /// Pitch modulation in percent.
    pub modulation: f64,
    pub tempo: f64,
    /// Pitch bend curve in cents.
    pub pitch_bend: Vec<i32>,
}

impl Default for ResamplerParams {
    fn default() -> Self {
        ResamplerParams {
            input: PathBuf::new(),
            input_samples: None,
            tone: DEFAULT_TONE,
            velocity: DEFAULT_VELOCITY,
            flags: String::new(),
            offset: 0.0,
            required_length: 0.0,
            consonant: 0.0,
            cutoff: 0.0,
            volume: DEFAULT_VOLUME,
            modulation: 0.0,
            tempo: DEFAULT_TEMPO,
            pitch_bend: Vec::new(),
        }
    }
}

impl ResamplerParams {
    pub fn input_audio(&self) -> InputAudio<'_> {
        match &self.input_samples {
            Some(samples) => InputAudio::Samples(samples),
            None => InputAudio::File(&self.input),
        }
    }

    pub fn tone_name(&self) -> String {
        tone_name(self.tone)
    }

    /// The classic positional arguments, one entry per argument:
    /// `<in> <out> <tone> <velocity> <flags> <offset> <length> <consonant> <cutoff> <volume> <modulation> !<tempo> <pitch>`.
    pub fn process_args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            input.to_string_lossy().into_owned(),
            output.to_string_lossy().into_owned(),
            self.tone_name(),
            self.velocity.to_string(),
            self.flags.clone(),
            self.offset.to_string(),
            self.required_length.to_string(),
            self.consonant.to_string(),
            self.cutoff.to_string(),
            self.volume.to_string(),
            self.modulation.to_string(),
            format!("!{}", self.tempo),
            encode_pitch_bend(&self.pitch_bend),
        ]
    }

    /// The arguments as a single command line, with paths and flags quoted.
    pub fn process_args_line(&self, input: &Path, output: &Path) -> String {
        let args = self.process_args(input, output);
        args.iter()
            .enumerate()
            .map(|(i, arg)| match i {
                0 | 1 | 4 => format!("\"{arg}\""),
                _ => arg.clone(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ResamplerParams {
        ResamplerParams {
            input: PathBuf::from("voice/_ka.wav"),
            tone: 61,
            velocity: 100.0,
            flags: "g-5B0".to_string(),
            offset: 123.5,
            required_length: 650.0,
            consonant: 80.0,
            cutoff: -240.0,
            volume: 100.0,
            modulation: 0.0,
            tempo: 125.5,
            pitch_bend: vec![0, 0, 0, 0, 5, -1],
            ..Default::default()
        }
    }

    #[test]
    fn test_args_line() {
        let line = params().process_args_line(Path::new("in.wav"), Path::new("out.wav"));
        assert_eq!(
            "\"in.wav\" \"out.wav\" C#4 100 \"g-5B0\" 123.5 650 80 -240 100 0 !125.5 AA#3#AF//",
            line
        );
    }

    #[test]
    fn test_args_keep_empty_flags_position() {
        let params = ResamplerParams {
            flags: String::new(),
            ..params()
        };
        let args = params.process_args(Path::new("in.wav"), Path::new("out.wav"));
        assert_eq!(13, args.len());
        assert_eq!("", args[4]);
        assert_eq!("!125.5", args[11]);
    }

    #[test]
    fn test_input_audio() {
        let mut params = params();
        assert_eq!(
            InputAudio::File(Path::new("voice/_ka.wav")),
            params.input_audio()
        );
        params.input_samples = Some(Arc::new(vec![0.5, 0.25]));
        assert_eq!(InputAudio::Samples(&[0.5, 0.25]), params.input_audio());
    }

    #[test]
    fn test_deserialize_defaults() {
        let params: ResamplerParams =
            serde_yml::from_str("input: a.wav\ntone: 69\npitch_bend: [1, 2]\n").unwrap();
        assert_eq!(PathBuf::from("a.wav"), params.input);
        assert_eq!("A4", params.tone_name());
        assert_eq!(100.0, params.velocity);
        assert_eq!(120.0, params.tempo);
        assert_eq!(vec![1, 2], params.pitch_bend);
        assert!(params.input_samples.is_none());
    }
}
