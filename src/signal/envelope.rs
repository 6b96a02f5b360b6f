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
use serde::{Deserialize, Serialize};

/// A single envelope control point as authored: time in milliseconds and gain in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    pub time: f64,
    pub gain: f64,
}

impl EnvelopePoint {
    pub fn new(time: f64, gain: f64) -> EnvelopePoint {
        EnvelopePoint { time, gain }
    }
}

/// A piecewise-linear gain curve in the sample domain.
///
/// Before the first point the curve holds the first point's gain, after the last
/// point it holds the last point's gain.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// (sample position, linear gain) pairs in authored order.
    points: Vec<(f64, f32)>,
}

impl Envelope {
    /// Builds an envelope from sample-domain points. An empty list is treated as unity gain.
    pub fn new(points: Vec<(f64, f32)>) -> Envelope {
        if points.is_empty() {
            return Envelope {
                points: vec![(0.0, 1.0)],
            };
        }
        Envelope { points }
    }

    /// Converts authored millisecond points into the sample domain.
    ///
    /// The first point lands at the skip-over position so that the trimmed
    /// lead-in keeps its alignment with the curve.
    pub fn from_ms(points: &[EnvelopePoint], skip_over_ms: f64, sample_rate: u32) -> Envelope {
        let Some(first) = points.first() else {
            return Envelope::new(Vec::new());
        };
        let rate = f64::from(sample_rate);
        let skip_samples = (skip_over_ms * rate / 1000.0).trunc();
        let shift = -first.time;
        Envelope::new(
            points
                .iter()
                .map(|point| {
                    let x = ((point.time + shift) * rate / 1000.0).trunc() + skip_samples;
                    (x, (point.gain / 100.0) as f32)
                })
                .collect(),
        )
    }

    /// A two point envelope at unity gain covering `[0, duration_ms]`.
    pub fn flat(duration_ms: f64, sample_rate: u32) -> Envelope {
        let end = (duration_ms * f64::from(sample_rate) / 1000.0).trunc();
        Envelope::new(vec![(0.0, 1.0), (end, 1.0)])
    }

    pub fn points(&self) -> &[(f64, f32)] {
        &self.points
    }

    /// Returns the gain at the given sample position.
    pub fn sample(&self, position: usize) -> f32 {
        let position = position as f64;
        let next = self
            .points
            .iter()
            .position(|(x, _)| position <= *x)
            .unwrap_or(self.points.len());
        self.gain_between(next, position)
    }

    /// Multiplies the samples in place by the curve, starting at sample 0.
    pub fn apply(&self, data: &mut [f32]) {
        let mut next = 0;
        for (i, sample) in data.iter_mut().enumerate() {
            let position = i as f64;
            while next < self.points.len() && position > self.points[next].0 {
                next += 1;
            }
            *sample *= self.gain_between(next, position);
        }
    }

    /// `next` is the index of the first point not yet passed by `position`.
    fn gain_between(&self, next: usize, position: f64) -> f32 {
        let last = self.points.len() - 1;
        if next == 0 {
            return self.points[0].1;
        }
        if next > last {
            return self.points[last].1;
        }
        let (x0, g0) = self.points[next - 1];
        let (x1, g1) = self.points[next];
        if x0 >= x1 {
            return g0;
        }
        let t = (position - x0) / (x1 - x0);
        g0 + (g1 - g0) * t as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(expected: f32, actual: f32) {
        assert!(
            (expected - actual).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_interpolation() {
        let envelope = Envelope::new(vec![(0.0, 0.0), (10.0, 1.0)]);
        assert_close(0.0, envelope.sample(0));
        assert_close(0.5, envelope.sample(5));
        assert_close(0.3, envelope.sample(3));
        assert_close(1.0, envelope.sample(10));
    }

    #[test]
    fn test_holds_outside_points() {
        let envelope = Envelope::new(vec![(100.0, 0.25), (200.0, 0.75)]);
        assert_close(0.25, envelope.sample(0));
        assert_close(0.25, envelope.sample(99));
        assert_close(0.75, envelope.sample(201));
        assert_close(0.75, envelope.sample(100_000));
    }

    #[test]
    fn test_single_point() {
        let envelope = Envelope::new(vec![(50.0, 0.4)]);
        assert_close(0.4, envelope.sample(0));
        assert_close(0.4, envelope.sample(50));
        assert_close(0.4, envelope.sample(5000));
    }

    #[test]
    fn test_empty_is_unity() {
        let envelope = Envelope::new(Vec::new());
        assert_close(1.0, envelope.sample(0));
        assert_close(1.0, envelope.sample(1234));
        assert_eq!(envelope, Envelope::from_ms(&[], 10.0, 44100));
    }

    #[test]
    fn test_non_monotonic_points() {
        let envelope = Envelope::new(vec![(0.0, 1.0), (10.0, 0.0), (10.0, 0.5), (20.0, 0.5)]);
        assert_close(0.0, envelope.sample(10));
        assert_close(0.5, envelope.sample(15));

        let envelope = Envelope::new(vec![(10.0, 0.2), (5.0, 0.8)]);
        for position in 0..20 {
            assert!(envelope.sample(position).is_finite());
        }
        let mut data = vec![1.0; 20];
        envelope.apply(&mut data);
        assert!(data.iter().all(|sample| sample.is_finite()));
    }

    #[test]
    fn test_from_ms_with_skip_over() {
        let envelope = Envelope::from_ms(
            &[EnvelopePoint::new(0.0, 100.0), EnvelopePoint::new(25.0, 0.0)],
            2.0,
            44100,
        );
        let points = envelope.points();
        assert_eq!(88.0, points[0].0);
        assert_close(1.0, points[0].1);
        assert_eq!(1102.0 + 88.0, points[1].0);
        assert_close(0.0, points[1].1);
        assert_close(0.5, envelope.sample(88 + 551));
        assert_close(1.0, envelope.sample(10));
    }

    #[test]
    fn test_from_ms_shifts_to_first_point() {
        let envelope = Envelope::from_ms(
            &[
                EnvelopePoint::new(-10.0, 0.0),
                EnvelopePoint::new(0.0, 100.0),
                EnvelopePoint::new(10.0, 50.0),
            ],
            0.0,
            44100,
        );
        let xs: Vec<f64> = envelope.points().iter().map(|(x, _)| *x).collect();
        assert_eq!(vec![0.0, 441.0, 882.0], xs);
    }

    #[test]
    fn test_flat() {
        let envelope = Envelope::flat(100.0, 44100);
        assert_eq!(&[(0.0, 1.0), (4410.0, 1.0)], envelope.points());
    }

    #[test]
    fn test_apply_matches_sample() {
        let envelope = Envelope::new(vec![(2.0, 1.0), (6.0, 0.0), (8.0, 0.5)]);
        let mut data = vec![2.0; 12];
        envelope.apply(&mut data);
        for (i, sample) in data.iter().enumerate() {
            assert_close(2.0 * envelope.sample(i), *sample);
        }
    }
}
