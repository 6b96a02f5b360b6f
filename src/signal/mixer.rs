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

use parking_lot::RwLock;

use super::traits::SignalSource;

/// Sums any number of child sources into one.
///
/// The mixer holds shared references to its children. Whoever builds the mix
/// decides how long the children live.
#[derive(Default)]
pub struct SignalMixer {
    sources: RwLock<Vec<Arc<dyn SignalSource>>>,
}

impl SignalMixer {
    /// Creates a new mixer over the given sources, mixed in insertion order.
    pub fn new(sources: Vec<Arc<dyn SignalSource>>) -> SignalMixer {
        SignalMixer {
            sources: RwLock::new(sources),
        }
    }

    /// Appends a source to the mix.
    pub fn add_source(&self, source: Arc<dyn SignalSource>) {
        self.sources.write().push(source);
    }

    /// Removes every source from the mix.
    pub fn clear(&self) {
        self.sources.write().clear();
    }

    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }
}

impl SignalSource for SignalMixer {
    fn is_ready(&self, position: usize, count: usize) -> bool {
        self.sources
            .read()
            .iter()
            .all(|source| source.is_ready(position, count))
    }

    fn mix(&self, position: usize, buffer: &mut [f32], index: usize, count: usize) -> usize {
        self.sources
            .read()
            .iter()
            .fold(position, |furthest, source| {
                furthest.max(source.mix(position, buffer, index, count))
            })
    }
}
