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

use std::path::Path;
use std::thread;

/// Extracts a displayable file name from a path, returning a fallback if the name is unreadable.
pub fn filename_display(path: &Path) -> &str {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unreadable file name")
}

/// Converts milliseconds to a sample count, truncating. Negative times clamp to zero.
pub fn ms_to_samples(ms: f64, sample_rate: u32) -> usize {
    let samples = (ms * f64::from(sample_rate) / 1000.0).trunc();
    if samples <= 0.0 {
        0
    } else {
        samples as usize
    }
}

/// Converts a sample count to milliseconds.
pub fn samples_to_ms(samples: usize, sample_rate: u32) -> f64 {
    samples as f64 * 1000.0 / f64::from(sample_rate)
}

/// A short tag for the current thread, used to tell interleaved log lines apart.
pub fn thread_tag() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => format!("{}:{:?}", name, current.id()),
        None => format!("{:?}", current.id()),
    }
}
