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
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::Path,
    sync::Arc,
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{error::RenderError, item::RenderItem};
use crate::{
    cancel::CancelHandle,
    config::RenderConfig,
    engine::{Engine, EngineError, EngineRegistry, Resampler},
    signal::{ExportAdapter, SignalMixer, WaveSource, DEFAULT_BLOCK_SIZE},
};

/// What happens to the rest of a job when one segment fails to render.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The segment is filled with silence and the job carries on.
    #[default]
    Silence,
    /// Remaining segments are cancelled and the job fails.
    Abort,
}

/// Reported once per segment, in completion order.
#[derive(Debug)]
pub enum RenderEvent {
    Rendered {
        index: usize,
        engine: String,
        samples: usize,
    },
    Failed {
        index: usize,
        engine: String,
        error: EngineError,
    },
    Cancelled {
        index: usize,
    },
}

impl RenderEvent {
    pub fn index(&self) -> usize {
        match self {
            RenderEvent::Rendered { index, .. }
            | RenderEvent::Failed { index, .. }
            | RenderEvent::Cancelled { index } => *index,
        }
    }
}

/// Segment counts for a finished job.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    pub rendered: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl RenderSummary {
    /// Fails if any segment was skipped by cancellation.
    pub fn check(self) -> Result<RenderSummary, RenderError> {
        if self.cancelled > 0 {
            return Err(RenderError::Cancelled {
                cancelled: self.cancelled,
            });
        }
        Ok(self)
    }
}

/// Renders segments on a pool of worker threads.
pub struct Renderer {
    pool: rayon::ThreadPool,
    registry: Arc<EngineRegistry>,
    default_engine: Engine,
    policy: FailurePolicy,
    block_size: usize,
}

impl Renderer {
    pub fn new(
        registry: Arc<EngineRegistry>,
        default_engine: Engine,
        threads: usize,
        policy: FailurePolicy,
    ) -> Result<Renderer, RenderError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("utau-render-{i}"))
            .build()?;
        Ok(Renderer {
            pool,
            registry,
            default_engine,
            policy,
            block_size: DEFAULT_BLOCK_SIZE,
        })
    }

    /// Creates a renderer from the settings, resolving the preferred engine.
    /// A missing preferred engine falls back to the built-in and is saved to `persist_to`.
    pub fn from_config(
        registry: Arc<EngineRegistry>,
        config: &mut RenderConfig,
        persist_to: Option<&Path>,
    ) -> Result<Renderer, RenderError> {
        let default_engine = registry.resolve_preferred(config, persist_to);
        info!(
            engine = default_engine.name(),
            threads = config.render_threads(),
            policy = ?config.failure_policy(),
            "Starting renderer"
        );
        let renderer = Renderer::new(
            registry,
            default_engine,
            config.render_threads(),
            config.failure_policy(),
        )?;
        Ok(renderer.with_block_size(config.block_size()))
    }

    pub fn with_block_size(mut self, block_size: usize) -> Renderer {
        self.block_size = block_size.max(1);
        self
    }

    pub fn default_engine(&self) -> &Engine {
        &self.default_engine
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// The engine an item renders with. Unknown names fall back to the default engine.
    pub fn engine_for(&self, item: &RenderItem) -> Engine {
        match item.resampler.as_deref() {
            Some(name) => self.registry.get(name).unwrap_or_else(|| {
                warn!(
                    engine = name,
                    fallback = self.default_engine.name(),
                    "Unknown engine for segment, using default"
                );
                self.default_engine.clone()
            }),
            None => self.default_engine.clone(),
        }
    }

    /// Starts rendering. Every segment is in the returned job's mixer right
    /// away, empty until its worker fills it.
    pub fn render(&self, items: Vec<RenderItem>) -> RenderJob {
        let (sender, receiver) = unbounded();
        let cancel = CancelHandle::new();
        let mixer = Arc::new(SignalMixer::default());
        let mut sources = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            let source = Arc::new(item.wave_source());
            mixer.add_source(source.clone());
            sources.push(source.clone());

            let segment = Segment {
                index,
                engine: self.engine_for(&item),
                item,
                source,
                policy: self.policy,
                cancel: cancel.clone(),
                events: sender.clone(),
            };
            self.pool.spawn(move || segment.render());
        }
        info!(segments = sources.len(), "Render started");

        RenderJob {
            mixer,
            sources,
            events: receiver,
            cancel,
            policy: self.policy,
            block_size: self.block_size,
        }
    }

    /// Renders everything and returns the mixed samples.
    pub fn render_to_samples(&self, items: Vec<RenderItem>) -> Result<Vec<f32>, RenderError> {
        let job = self.render(items);
        let mixer = job.mixer();
        let block_size = job.block_size;
        job.wait()?.check()?;
        Ok(ExportAdapter::new(mixer).read_all(block_size)?)
    }

    /// Renders everything and writes the mix to a 16-bit WAV file. Returns the sample count.
    pub fn render_to_wav(&self, items: Vec<RenderItem>, path: &Path) -> Result<usize, RenderError> {
        let job = self.render(items);
        let mixer = job.mixer();
        let block_size = job.block_size;
        job.wait()?.check()?;
        Ok(ExportAdapter::new(mixer).write_wav(path, block_size)?)
    }
}

struct Segment {
    index: usize,
    item: RenderItem,
    engine: Engine,
    source: Arc<WaveSource>,
    policy: FailurePolicy,
    cancel: CancelHandle,
    events: Sender<RenderEvent>,
}

impl Segment {
    fn render(self) {
        let event = if self.cancel.is_cancelled() {
            // Filled so playback doesn't wait on a segment that will never come.
            self.source.set_samples(Vec::new());
            RenderEvent::Cancelled { index: self.index }
        } else {
            self.resample()
        };
        if self.events.send(event).is_err() {
            debug!(index = self.index, "Render job dropped before segment finished");
        }
    }

    fn resample(&self) -> RenderEvent {
        let engine = self.engine.name().to_string();
        debug!(
            index = self.index,
            engine = %engine,
            segment = self.item.label(),
            "Rendering segment"
        );
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine.resample(&self.item.params)
        }))
        .unwrap_or_else(|payload| {
            Err(EngineError::Panicked {
                engine: engine.clone(),
                message: panic_message(payload.as_ref()),
            })
        });
        match result {
            Ok(samples) => {
                let len = samples.len();
                self.source.set_samples(samples);
                RenderEvent::Rendered {
                    index: self.index,
                    engine,
                    samples: len,
                }
            }
            Err(e) => {
                error!(
                    index = self.index,
                    engine = %engine,
                    segment = self.item.label(),
                    err = e.to_string(),
                    "Segment failed to render"
                );
                self.source.set_samples(Vec::new());
                if self.policy == FailurePolicy::Abort {
                    self.cancel.cancel();
                }
                RenderEvent::Failed {
                    index: self.index,
                    engine,
                    error: e,
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A running render. Dropping it doesn't stop the workers; use `cancel`.
pub struct RenderJob {
    mixer: Arc<SignalMixer>,
    sources: Vec<Arc<WaveSource>>,
    events: Receiver<RenderEvent>,
    cancel: CancelHandle,
    policy: FailurePolicy,
    block_size: usize,
}

impl RenderJob {
    /// The mix of every segment, for playback or export.
    pub fn mixer(&self) -> Arc<SignalMixer> {
        self.mixer.clone()
    }

    pub fn sources(&self) -> &[Arc<WaveSource>] {
        &self.sources
    }

    pub fn events(&self) -> &Receiver<RenderEvent> {
        &self.events
    }

    /// Stops segments that haven't started. Running engine calls finish normally.
    pub fn cancel(&self) {
        info!("Cancelling render");
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// True once every segment is filled.
    pub fn is_complete(&self) -> bool {
        self.sources.iter().all(|source| source.is_filled())
    }

    /// Waits for every segment to report. Under the abort policy the first
    /// failure becomes the job's error.
    pub fn wait(self) -> Result<RenderSummary, RenderError> {
        let mut summary = RenderSummary::default();
        let mut aborted = None;
        let expected = self.sources.len();

        for _ in 0..expected {
            let Ok(event) = self.events.recv() else {
                let missing = expected - summary.rendered - summary.failed - summary.cancelled;
                error!(missing, "Render workers disconnected");
                return Err(RenderError::Incomplete { missing });
            };
            match event {
                RenderEvent::Rendered { .. } => summary.rendered += 1,
                RenderEvent::Failed { index, error, .. } => {
                    summary.failed += 1;
                    if self.policy == FailurePolicy::Abort && aborted.is_none() {
                        aborted = Some((index, error));
                    }
                }
                RenderEvent::Cancelled { .. } => summary.cancelled += 1,
            }
        }

        info!(
            rendered = summary.rendered,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Render finished"
        );
        match aborted {
            Some((index, source)) => Err(RenderError::Aborted { index, source }),
            None => Ok(summary),
        }
    }
}
