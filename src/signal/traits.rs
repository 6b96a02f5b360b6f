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
use std::sync::Arc;

/// A positional source of mono samples that can be summed into a shared buffer.
///
/// Positions are absolute sample indices in the output timeline. Sources are
/// shared between the thread that fills them and the thread that mixes them,
/// so every method takes `&self`.
pub trait SignalSource: Send + Sync {
    /// Returns true if the source can produce its contribution to the range
    /// `[position, position + count)` without waiting.
    fn is_ready(&self, position: usize, count: usize) -> bool;

    /// Adds this source's samples for `[position, position + count)` into
    /// `buffer[index..index + count]`. Samples already in the buffer are kept.
    ///
    /// Returns the absolute index just past the last sample this source covers
    /// within the requested range. A value at or below `position` means the
    /// source has nothing left to contribute there.
    fn mix(&self, position: usize, buffer: &mut [f32], index: usize, count: usize) -> usize;
}

impl<T: SignalSource + ?Sized> SignalSource for Arc<T> {
    fn is_ready(&self, position: usize, count: usize) -> bool {
        (**self).is_ready(position, count)
    }

    fn mix(&self, position: usize, buffer: &mut [f32], index: usize, count: usize) -> usize {
        (**self).mix(position, buffer, index, count)
    }
}

impl<T: SignalSource + ?Sized> SignalSource for Box<T> {
    fn is_ready(&self, position: usize, count: usize) -> bool {
        (**self).is_ready(position, count)
    }

    fn mix(&self, position: usize, buffer: &mut [f32], index: usize, count: usize) -> usize {
        (**self).mix(position, buffer, index, count)
    }
}
