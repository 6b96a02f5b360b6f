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
    io::BufWriter,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, info};

use super::{decode::to_i16, error::SignalError, traits::SignalSource, SAMPLE_RATE};

/// The default number of samples pulled per read when exporting.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Pulls blocks of mixed samples from a source while tracking a cursor.
pub trait SampleReader {
    /// Fills `buffer[offset..offset + count]` with the next block of the mix.
    /// Returns the number of samples produced. Zero means the mix has ended.
    fn read(&mut self, buffer: &mut [f32], offset: usize, count: usize)
        -> Result<usize, SignalError>;

    /// The current cursor in samples.
    fn position(&self) -> usize;

    /// Moves the cursor. Only call this while nothing else is reading.
    fn set_position(&mut self, position: usize);
}

fn check_buffer(buffer: &[f32], offset: usize, count: usize) -> Result<(), SignalError> {
    if offset + count > buffer.len() {
        return Err(SignalError::BufferTooSmall {
            needed: offset + count,
            available: buffer.len(),
        });
    }
    Ok(())
}

/// The playback side of the signal chain. It never blocks or fails on
/// unrendered audio: it reports silence and counts how long it waited.
pub struct MasterAdapter {
    source: Arc<dyn SignalSource>,
    position: AtomicUsize,
    waited: AtomicUsize,
    waiting: AtomicBool,
}

impl MasterAdapter {
    pub fn new(source: Arc<dyn SignalSource>) -> MasterAdapter {
        MasterAdapter {
            source,
            position: AtomicUsize::new(0),
            waited: AtomicUsize::new(0),
            waiting: AtomicBool::new(false),
        }
    }

    /// Reads the next block. When the source isn't ready the block is silence,
    /// `count` is returned and the cursor stays where it is.
    pub fn read(&self, buffer: &mut [f32], offset: usize, count: usize) -> usize {
        let end = (offset + count).min(buffer.len());
        let count = end.saturating_sub(offset);
        let block = &mut buffer[offset.min(end)..end];
        block.fill(0.0);

        let position = self.position.load(Ordering::Acquire);
        if !self.source.is_ready(position, count) {
            self.waiting.store(true, Ordering::Release);
            self.waited.fetch_add(count, Ordering::AcqRel);
            return count;
        }
        self.waiting.store(false, Ordering::Release);

        let advanced = self
            .source
            .mix(position, block, 0, count)
            .saturating_sub(position);
        self.position.fetch_add(advanced, Ordering::AcqRel);
        advanced
    }

    /// True while the last read hit unrendered audio.
    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::Acquire)
    }

    /// The total number of silent samples produced while waiting since the last seek.
    pub fn waited_samples(&self) -> usize {
        self.waited.load(Ordering::Acquire)
    }

    pub fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    /// Seeks the cursor and clears the waiting counters.
    pub fn set_position(&self, position: usize) {
        self.position.store(position, Ordering::Release);
        self.waited.store(0, Ordering::Release);
        self.waiting.store(false, Ordering::Release);
    }
}

impl SampleReader for MasterAdapter {
    fn read(
        &mut self,
        buffer: &mut [f32],
        offset: usize,
        count: usize,
    ) -> Result<usize, SignalError> {
        check_buffer(buffer, offset, count)?;
        Ok(MasterAdapter::read(self, buffer, offset, count))
    }

    fn position(&self) -> usize {
        MasterAdapter::position(self)
    }

    fn set_position(&mut self, position: usize) {
        MasterAdapter::set_position(self, position)
    }
}

/// The export side of the signal chain. Every block must be fully rendered.
pub struct ExportAdapter {
    source: Arc<dyn SignalSource>,
    position: usize,
}

impl ExportAdapter {
    pub fn new(source: Arc<dyn SignalSource>) -> ExportAdapter {
        ExportAdapter {
            source,
            position: 0,
        }
    }

    /// Reads blocks of `block_size` until the mix ends and returns every sample.
    pub fn read_all(&mut self, block_size: usize) -> Result<Vec<f32>, SignalError> {
        let block_size = block_size.max(1);
        let mut samples = Vec::new();
        let mut buffer = vec![0.0; block_size];
        loop {
            let read = self.read(&mut buffer, 0, block_size)?;
            if read == 0 {
                break;
            }
            samples.extend_from_slice(&buffer[..read]);
        }
        debug!(samples = samples.len(), "Export finished");
        Ok(samples)
    }

    /// Streams the mix into a 16-bit mono WAV file. Returns the number of samples written.
    pub fn write_wav(&mut self, path: &Path, block_size: usize) -> Result<usize, SignalError> {
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

        let block_size = block_size.max(1);
        let mut buffer = vec![0.0; block_size];
        let mut written = 0;
        loop {
            let read = self.read(&mut buffer, 0, block_size)?;
            if read == 0 {
                break;
            }
            for sample in &buffer[..read] {
                writer.write_sample(to_i16(*sample))?;
            }
            written += read;
        }
        writer.finalize()?;

        info!(path = ?path, samples = written, "Wrote WAV file");
        Ok(written)
    }
}

impl SampleReader for ExportAdapter {
    fn read(
        &mut self,
        buffer: &mut [f32],
        offset: usize,
        count: usize,
    ) -> Result<usize, SignalError> {
        check_buffer(buffer, offset, count)?;
        let block = &mut buffer[offset..offset + count];
        block.fill(0.0);

        if !self.source.is_ready(self.position, count) {
            return Err(SignalError::NotReady {
                position: self.position,
                count,
            });
        }

        let advanced = self
            .source
            .mix(self.position, block, 0, count)
            .saturating_sub(self.position);
        self.position += advanced;
        Ok(advanced)
    }

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) {
        self.position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Envelope, SignalMixer, WaveSource};

    fn source(offset: usize, samples: Option<Vec<f32>>, length: usize) -> Arc<WaveSource> {
        let source = Arc::new(WaveSource::new(
            offset,
            length,
            0,
            Envelope::new(vec![(0.0, 1.0)]),
        ));
        if let Some(samples) = samples {
            source.set_samples(samples);
        }
        source
    }

    #[test]
    fn test_master_underrun_reports_silence() {
        let adapter = MasterAdapter::new(source(0, None, 100));
        let mut buffer = vec![0.7; 32];
        assert_eq!(32, adapter.read(&mut buffer, 0, 32));
        assert_eq!(vec![0.0; 32], buffer);
        assert!(adapter.is_waiting());
        assert_eq!(32, adapter.waited_samples());
        assert_eq!(0, adapter.position());

        assert_eq!(32, adapter.read(&mut buffer, 0, 32));
        assert_eq!(64, adapter.waited_samples());
        assert_eq!(0, adapter.position());
    }

    #[test]
    fn test_master_resumes_after_fill() {
        let wave = source(0, None, 8);
        let adapter = MasterAdapter::new(wave.clone());
        let mut buffer = vec![0.0; 4];
        adapter.read(&mut buffer, 0, 4);
        assert!(adapter.is_waiting());

        wave.set_samples(vec![0.5; 8]);
        assert_eq!(4, adapter.read(&mut buffer, 0, 4));
        assert!(!adapter.is_waiting());
        assert_eq!(vec![0.5; 4], buffer);
        assert_eq!(4, adapter.position());
        assert_eq!(4, adapter.read(&mut buffer, 0, 4));
        assert_eq!(0, adapter.read(&mut buffer, 0, 4));
        assert_eq!(8, adapter.position());
    }

    #[test]
    fn test_master_set_position_resets_waited() {
        let adapter = MasterAdapter::new(source(0, None, 100));
        let mut buffer = vec![0.0; 16];
        adapter.read(&mut buffer, 0, 16);
        assert_eq!(16, adapter.waited_samples());
        adapter.set_position(200);
        assert_eq!(0, adapter.waited_samples());
        assert!(!adapter.is_waiting());
        assert_eq!(200, adapter.position());
        // Past the pending window, so reads no longer wait.
        adapter.read(&mut buffer, 0, 16);
        assert!(!adapter.is_waiting());
    }

    #[test]
    fn test_master_reads_at_offset() {
        let adapter = MasterAdapter::new(source(0, Some(vec![1.0; 4]), 4));
        let mut buffer = vec![0.3; 8];
        assert_eq!(4, adapter.read(&mut buffer, 2, 4));
        assert_eq!(vec![0.3, 0.3, 1.0, 1.0, 1.0, 1.0, 0.3, 0.3], buffer);
    }

    #[test]
    fn test_export_underrun_fails() {
        let mut adapter = ExportAdapter::new(source(0, None, 100));
        let mut buffer = vec![0.0; 16];
        let result = adapter.read(&mut buffer, 0, 16);
        assert!(matches!(
            result,
            Err(SignalError::NotReady {
                position: 0,
                count: 16
            })
        ));
    }

    #[test]
    fn test_export_read_all() {
        let mixer = Arc::new(SignalMixer::new(vec![
            source(2, Some(vec![0.5; 3]), 3),
            source(4, Some(vec![0.25; 3]), 3),
        ]));
        let mut adapter = ExportAdapter::new(mixer);
        let samples = adapter.read_all(2).unwrap();
        assert_eq!(vec![0.0, 0.0, 0.5, 0.5, 0.75, 0.25, 0.25], samples);
        assert_eq!(7, adapter.position());
    }

    #[test]
    fn test_export_buffer_too_small() {
        let mut adapter = ExportAdapter::new(source(0, Some(vec![1.0]), 1));
        let mut buffer = vec![0.0; 4];
        assert!(matches!(
            adapter.read(&mut buffer, 2, 4),
            Err(SignalError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_export_write_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut adapter = ExportAdapter::new(source(0, Some(vec![0.5, -0.5, 1.5, 0.0]), 4));
        assert_eq!(4, adapter.write_wav(&path, 3).unwrap());

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(1, reader.spec().channels);
        assert_eq!(16, reader.spec().bits_per_sample);
        assert_eq!(SAMPLE_RATE, reader.spec().sample_rate);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(vec![16383, -16383, 32767, 0], samples);
    }
}
