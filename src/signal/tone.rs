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
use std::f64::consts::PI;

use parking_lot::Mutex;

use super::{traits::SignalSource, SAMPLE_RATE};

const DEFAULT_GAIN: f32 = 0.4;
const ATTACK_MS: f64 = 25.0;
const RELEASE_MS: f64 = 25.0;

/// One sine tone with a linear attack and release.
#[derive(Debug)]
struct SineTone {
    frequency: f64,
    gain: f32,
    position: usize,
    released_at: Option<usize>,
    playing: bool,
}

impl SineTone {
    fn new(frequency: f64, gain: f32) -> SineTone {
        SineTone {
            frequency,
            gain,
            position: 0,
            released_at: None,
            playing: true,
        }
    }

    fn next_sample(&mut self) -> f32 {
        let rate = f64::from(SAMPLE_RATE);
        let attack = ATTACK_MS / 1000.0 * rate;
        let release = RELEASE_MS / 1000.0 * rate;

        let delta = 2.0 * PI * self.frequency / rate;
        let mut sample = (self.position as f64 * delta).sin();
        sample *= (self.position as f64 / attack).clamp(0.0, 1.0);

        if let Some(released_at) = self.released_at {
            let fade = (1.0 - (self.position - released_at) as f64 / release).clamp(0.0, 1.0);
            sample *= fade;
            if fade < f64::EPSILON {
                self.playing = false;
            }
        }

        self.position += 1;
        sample as f32 * self.gain
    }

    fn release(&mut self) {
        if self.released_at.is_none() {
            self.released_at = Some(self.position);
        }
    }
}

#[derive(Debug, Default)]
struct Tones {
    held: Vec<SineTone>,
    releasing: Vec<SineTone>,
}

/// An always-ready source of preview tones, e.g. for auditioning notes while editing.
#[derive(Debug)]
pub struct ToneGenerator {
    gain: f32,
    tones: Mutex<Tones>,
}

impl Default for ToneGenerator {
    fn default() -> Self {
        ToneGenerator::new(DEFAULT_GAIN)
    }
}

impl ToneGenerator {
    pub fn new(gain: f32) -> ToneGenerator {
        ToneGenerator {
            gain,
            tones: Mutex::new(Tones::default()),
        }
    }

    /// Starts a tone. A frequency that is already held keeps playing uninterrupted.
    pub fn start_tone(&self, frequency: f64) {
        let mut tones = self.tones.lock();
        if tones.held.iter().any(|tone| tone.frequency == frequency) {
            return;
        }
        tones.held.push(SineTone::new(frequency, self.gain));
    }

    /// Releases a held tone. It fades out over the release time.
    pub fn end_tone(&self, frequency: f64) {
        let mut tones = self.tones.lock();
        if let Some(index) = tones.held.iter().position(|tone| tone.frequency == frequency) {
            let mut tone = tones.held.swap_remove(index);
            tone.release();
            tones.releasing.push(tone);
        }
        tones.releasing.retain(|tone| tone.playing);
    }

    pub fn end_all_tones(&self) {
        let mut tones = self.tones.lock();
        let held: Vec<SineTone> = tones.held.drain(..).collect();
        for mut tone in held {
            tone.release();
            tones.releasing.push(tone);
        }
        tones.releasing.retain(|tone| tone.playing);
    }

    /// The number of tones still producing sound.
    pub fn active_tones(&self) -> usize {
        let tones = self.tones.lock();
        tones.held.len() + tones.releasing.iter().filter(|tone| tone.playing).count()
    }
}

impl SignalSource for ToneGenerator {
    fn is_ready(&self, _position: usize, _count: usize) -> bool {
        true
    }

    fn mix(&self, position: usize, buffer: &mut [f32], index: usize, count: usize) -> usize {
        let mut tones = self.tones.lock();
        let Tones { held, releasing } = &mut *tones;
        for tone in held.iter_mut().chain(releasing.iter_mut()) {
            if !tone.playing {
                continue;
            }
            for sample in &mut buffer[index..index + count] {
                *sample += tone.next_sample();
            }
        }
        releasing.retain(|tone| tone.playing);
        position + count
    }
}
