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
use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use tracing::warn;

use super::{
    decode, envelope::EnvelopePoint, error::SignalError, traits::SignalSource, Envelope,
};
use crate::util::ms_to_samples;

/// A single synthesized segment placed on the output timeline.
///
/// The source starts empty and is filled exactly once, usually from a render
/// worker. Until then it reports ready only for ranges outside its estimated
/// window, which lets the mix proceed around segments that are still rendering.
pub struct WaveSource {
    offset: usize,
    estimated_length: usize,
    skip_over: usize,
    envelope: Envelope,
    data: RwLock<Option<Arc<[f32]>>>,
}

impl WaveSource {
    /// Creates an empty source. All positions and lengths are in samples.
    pub fn new(
        offset: usize,
        estimated_length: usize,
        skip_over: usize,
        envelope: Envelope,
    ) -> WaveSource {
        WaveSource {
            offset,
            estimated_length,
            skip_over,
            envelope,
            data: RwLock::new(None),
        }
    }

    /// Creates an empty source from millisecond metadata. Without envelope
    /// points the source uses a flat unity envelope over its duration. A
    /// negative offset places the source at zero and drops its early part.
    pub fn from_ms(
        offset_ms: f64,
        estimated_length_ms: f64,
        skip_over_ms: f64,
        envelope: Option<&[EnvelopePoint]>,
        sample_rate: u32,
    ) -> WaveSource {
        let envelope = match envelope {
            Some(points) if !points.is_empty() => {
                Envelope::from_ms(points, skip_over_ms, sample_rate)
            }
            _ => Envelope::flat(estimated_length_ms + skip_over_ms.max(0.0), sample_rate),
        };
        // Anything placed before the start of the timeline is cut off the front.
        let early = ms_to_samples(-offset_ms, sample_rate);
        WaveSource::new(
            ms_to_samples(offset_ms, sample_rate),
            ms_to_samples(estimated_length_ms, sample_rate).saturating_sub(early),
            ms_to_samples(skip_over_ms, sample_rate) + early,
            envelope,
        )
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn estimated_length(&self) -> usize {
        self.estimated_length
    }

    pub fn skip_over(&self) -> usize {
        self.skip_over
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn is_filled(&self) -> bool {
        self.data.read().is_some()
    }

    /// The number of samples placed on the timeline, if filled.
    pub fn len(&self) -> Option<usize> {
        self.data.read().as_ref().map(|data| data.len())
    }

    /// Fills the source with raw engine output. The envelope is applied here,
    /// then the skip-over lead-in is trimmed. Later fills are ignored.
    pub fn set_samples(&self, mut samples: Vec<f32>) {
        if self.is_filled() {
            warn!(offset = self.offset, "Wave source already filled, ignoring new samples");
            return;
        }
        self.envelope.apply(&mut samples);
        let skip = self.skip_over.min(samples.len());
        let trimmed: Arc<[f32]> = Arc::from(&samples[skip..]);

        let mut data = self.data.write();
        if data.is_none() {
            *data = Some(trimmed);
        }
    }

    /// Decodes PCM WAV bytes and fills the source with them.
    pub fn set_wave_data(&self, bytes: &[u8]) -> Result<(), SignalError> {
        let samples = decode::decode_wav_bytes(bytes)?;
        self.set_samples(samples);
        Ok(())
    }
}

impl SignalSource for WaveSource {
    fn is_ready(&self, position: usize, count: usize) -> bool {
        position + count <= self.offset
            || self.offset + self.estimated_length <= position
            || self.is_filled()
    }

    fn mix(&self, position: usize, buffer: &mut [f32], index: usize, count: usize) -> usize {
        let data = self.data.read().clone();
        let Some(data) = data else {
            // Still rendering. Report the estimated extent so the mix keeps moving.
            return (position + count).min(self.offset + self.estimated_length);
        };

        let start = position.max(self.offset);
        let end = (position + count).min(self.offset + data.len());
        for i in start..end {
            buffer[index + i - position] += data[i - self.offset];
        }
        end
    }
}

impl fmt::Debug for WaveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveSource")
            .field("offset", &self.offset)
            .field("estimated_length", &self.estimated_length)
            .field("skip_over", &self.skip_over)
            .field("filled", &self.is_filled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unity() -> Envelope {
        Envelope::new(vec![(0.0, 1.0)])
    }

    #[test]
    fn test_is_ready_window() {
        let source = WaveSource::new(50, 50, 0, unity());
        assert!(source.is_ready(0, 50));
        assert!(source.is_ready(10, 40));
        assert!(!source.is_ready(1, 50));
        assert!(!source.is_ready(60, 10));
        assert!(!source.is_ready(99, 10));
        assert!(source.is_ready(100, 10));
        assert!(source.is_ready(500, 100));

        source.set_samples(vec![1.0; 50]);
        assert!(source.is_ready(1, 50));
        assert!(source.is_ready(60, 10));
        assert!(source.is_ready(99, 10));
    }

    #[test]
    fn test_mix_places_samples() {
        let source = WaveSource::new(10, 5, 0, unity());
        source.set_samples(vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        let mut buffer = vec![0.0; 20];
        let end = source.mix(0, &mut buffer, 0, 20);
        assert_eq!(15, end);
        assert_eq!(&[0.0; 10], &buffer[..10]);
        assert_eq!(&[1.0, 2.0, 3.0, 4.0, 5.0], &buffer[10..15]);
        assert_eq!(&[0.0; 5], &buffer[15..]);
    }

    #[test]
    fn test_mix_is_additive_and_windowed() {
        let source = WaveSource::new(2, 4, 0, unity());
        source.set_samples(vec![1.0; 4]);

        let mut buffer = vec![0.5; 6];
        // Request [4, 8) written at buffer index 1.
        let end = source.mix(4, &mut buffer, 1, 4);
        assert_eq!(6, end);
        assert_eq!(vec![0.5, 1.5, 1.5, 0.5, 0.5, 0.5], buffer);
    }

    #[test]
    fn test_mix_past_end_returns_data_end() {
        let source = WaveSource::new(0, 4, 0, unity());
        source.set_samples(vec![1.0; 4]);
        let mut buffer = vec![0.0; 4];
        assert_eq!(4, source.mix(10, &mut buffer, 0, 4));
        assert_eq!(vec![0.0; 4], buffer);
    }

    #[test]
    fn test_empty_source_reports_estimate() {
        let source = WaveSource::new(10, 10, 0, unity());
        let mut buffer = vec![0.0; 8];
        assert_eq!(8, source.mix(0, &mut buffer, 0, 8));
        assert_eq!(20, source.mix(16, &mut buffer, 0, 8));
        assert_eq!(vec![0.0; 8], buffer);
    }

    #[test]
    fn test_skip_over_trimmed_after_envelope() {
        // Fade from 1.0 to 0.0 over samples [2, 6], then trim 2 samples.
        let source = WaveSource::new(0, 4, 2, Envelope::new(vec![(2.0, 1.0), (6.0, 0.0)]));
        source.set_samples(vec![1.0; 6]);
        assert_eq!(Some(4), source.len());

        let mut buffer = vec![0.0; 4];
        source.mix(0, &mut buffer, 0, 4);
        assert_eq!(vec![1.0, 0.75, 0.5, 0.25], buffer);
    }

    #[test]
    fn test_skip_over_longer_than_data() {
        let source = WaveSource::new(0, 4, 10, unity());
        source.set_samples(vec![1.0; 4]);
        assert!(source.is_filled());
        assert_eq!(Some(0), source.len());
    }

    #[test]
    fn test_fill_once() {
        let source = WaveSource::new(0, 2, 0, unity());
        source.set_samples(vec![1.0, 1.0]);
        source.set_samples(vec![9.0, 9.0, 9.0]);
        assert_eq!(Some(2), source.len());
    }

    #[test]
    fn test_from_ms_default_envelope() {
        let source = WaveSource::from_ms(10.0, 20.0, 0.0, None, 44100);
        assert_eq!(441, source.offset());
        assert_eq!(882, source.estimated_length());
        assert_eq!(&[(0.0, 1.0), (882.0, 1.0)], source.envelope().points());
    }
}
