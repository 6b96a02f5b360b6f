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

use crate::{
    engine::ResamplerParams,
    signal::{EnvelopePoint, WaveSource, SAMPLE_RATE},
    util::filename_display,
};

/// One segment to synthesize and place on the timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderItem {
    /// Absolute timeline position in milliseconds.
    pub position_ms: f64,
    /// Expected length of the placed audio in milliseconds.
    pub duration_ms: f64,
    /// Lead-in trimmed from the start of the engine output, in milliseconds.
    pub skip_over_ms: f64,
    /// Gain curve in milliseconds from the segment start. None means flat unity gain.
    pub envelope: Option<Vec<EnvelopePoint>>,
    /// The engine to use. None means the renderer's default engine.
    pub resampler: Option<String>,
    /// A label for logs.
    pub phoneme: String,
    pub params: ResamplerParams,
}

impl RenderItem {
    pub fn new(position_ms: f64, duration_ms: f64, params: ResamplerParams) -> RenderItem {
        RenderItem {
            position_ms,
            duration_ms,
            params,
            ..Default::default()
        }
    }

    /// Creates the empty wave source this item will fill.
    pub fn wave_source(&self) -> WaveSource {
        WaveSource::from_ms(
            self.position_ms,
            self.duration_ms,
            self.skip_over_ms,
            self.envelope.as_deref(),
            SAMPLE_RATE,
        )
    }

    /// The phoneme, or the input file name if there is none.
    pub fn label(&self) -> &str {
        if self.phoneme.is_empty() {
            filename_display(&self.params.input)
        } else {
            &self.phoneme
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::signal::SignalSource;

    #[test]
    fn test_wave_source_placement() {
        let mut item = RenderItem::new(1000.0, 500.0, ResamplerParams::default());
        item.skip_over_ms = 2.0;
        item.envelope = Some(vec![
            EnvelopePoint::new(0.0, 100.0),
            EnvelopePoint::new(25.0, 0.0),
        ]);

        let source = item.wave_source();
        assert_eq!(44100, source.offset());
        assert_eq!(22050, source.estimated_length());
        assert_eq!(88, source.skip_over());
        assert!(!source.is_filled());
        assert!((source.envelope().sample(88 + 551) - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_negative_position_is_trimmed() {
        let mut item = RenderItem::new(-10.0, 20.0, ResamplerParams::default());
        item.skip_over_ms = 1.0;
        let source = item.wave_source();
        assert_eq!(0, source.offset());
        assert_eq!(441, source.estimated_length());
        assert_eq!(44 + 441, source.skip_over());

        source.set_samples((0..926).map(|i| i as f32).collect());
        assert_eq!(Some(441), source.len());

        let mut buffer = vec![0.0; 882];
        assert_eq!(441, source.mix(0, &mut buffer, 0, 882));
        assert_eq!(485.0, buffer[0]);
        assert_eq!(925.0, buffer[440]);
        assert_eq!(0.0, buffer[441]);
    }

    #[test]
    fn test_default_envelope_is_flat() {
        let item = RenderItem::new(0.0, 100.0, ResamplerParams::default());
        let source = item.wave_source();
        assert_eq!(1.0, source.envelope().sample(0));
        assert_eq!(1.0, source.envelope().sample(4410));
    }

    #[test]
    fn test_label() {
        let mut item = RenderItem::new(0.0, 100.0, ResamplerParams::default());
        item.params.input = PathBuf::from("/voice/_ka.wav");
        assert_eq!("_ka.wav", item.label());
        item.phoneme = "ka".to_string();
        assert_eq!("ka", item.label());
    }
}
