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
use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

use parking_lot::Mutex;

use super::traits::SignalSource;

/// The lowest volume in decibels. Anything at or below it is silent.
pub const MIN_VOLUME_DB: f64 = -24.0;
pub const MAX_VOLUME_DB: f64 = 12.0;

/// Converts a volume in decibels to a linear gain, clamped to the fader range.
pub fn db_to_gain(db: f64) -> f32 {
    if db <= MIN_VOLUME_DB {
        return 0.0;
    }
    10f64.powf(db.min(MAX_VOLUME_DB) / 20.0) as f32
}

/// Applies a gain and a mute switch to a wrapped source, typically one per track.
pub struct Fader {
    source: Arc<dyn SignalSource>,
    gain: AtomicU32,
    muted: AtomicBool,
    scratch: Mutex<Vec<f32>>,
}

impl Fader {
    pub fn new(source: Arc<dyn SignalSource>) -> Fader {
        Fader {
            source,
            gain: AtomicU32::new(1.0f32.to_bits()),
            muted: AtomicBool::new(false),
            scratch: Mutex::new(Vec::new()),
        }
    }

    pub fn set_volume_db(&self, db: f64) {
        self.gain.store(db_to_gain(db).to_bits(), Ordering::Release);
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Acquire))
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }
}

impl SignalSource for Fader {
    fn is_ready(&self, position: usize, count: usize) -> bool {
        self.source.is_ready(position, count)
    }

    fn mix(&self, position: usize, buffer: &mut [f32], index: usize, count: usize) -> usize {
        let mut scratch = self.scratch.lock();
        scratch.clear();
        scratch.resize(count, 0.0);
        let end = self.source.mix(position, &mut scratch, 0, count);

        let gain = if self.is_muted() { 0.0 } else { self.gain() };
        for (out, sample) in buffer[index..index + count].iter_mut().zip(scratch.iter()) {
            *out += sample * gain;
        }
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Envelope, WaveSource};

    fn fader() -> Fader {
        let source = Arc::new(WaveSource::new(0, 4, 0, Envelope::new(vec![(0.0, 1.0)])));
        source.set_samples(vec![0.5; 4]);
        Fader::new(source)
    }

    #[test]
    fn test_db_to_gain() {
        assert_eq!(1.0, db_to_gain(0.0));
        assert_eq!(0.0, db_to_gain(-24.0));
        assert_eq!(0.0, db_to_gain(-100.0));
        assert!((db_to_gain(-6.0) - 0.501).abs() < 1e-3);
        assert_eq!(db_to_gain(12.0), db_to_gain(40.0));
    }

    #[test]
    fn test_gain_applied_to_source_only() {
        let fader = fader();
        fader.set_volume_db(-6.0);
        let mut buffer = vec![1.0; 6];
        assert_eq!(4, fader.mix(0, &mut buffer, 1, 5));
        assert_eq!(1.0, buffer[0]);
        assert!((buffer[1] - (1.0 + 0.5 * db_to_gain(-6.0))).abs() < 1e-6);
        assert_eq!(1.0, buffer[5]);
    }

    #[test]
    fn test_mute() {
        let fader = fader();
        fader.set_muted(true);
        let mut buffer = vec![0.0; 4];
        assert_eq!(4, fader.mix(0, &mut buffer, 0, 4));
        assert_eq!(vec![0.0; 4], buffer);
        assert!(fader.is_ready(0, 4));
    }
}
