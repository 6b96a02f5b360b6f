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
    collections::HashMap,
    env::consts::DLL_EXTENSION,
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::{
    error::EngineError,
    native::NativeResampler,
    params::ResamplerParams,
    process::ProcessResampler,
    startup::{RetryPolicy, Startup, StartupOutcome},
    traits::Resampler,
    worldline::WorldlineResampler,
    BUILTIN_ENGINE,
};
use crate::{
    cancel::CancelHandle,
    config::{ConfigError, RenderConfig},
};

/// The kinds of engine backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Builtin,
    Process,
    Native,
    InProcess,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            EngineKind::Builtin => "built-in",
            EngineKind::Process => "process",
            EngineKind::Native => "native",
            EngineKind::InProcess => "in-process",
        };
        f.write_str(kind)
    }
}

/// A registered engine. Cheap to clone.
#[derive(Clone)]
pub enum Engine {
    Builtin(Arc<WorldlineResampler>),
    Process(Arc<ProcessResampler>),
    Native(Arc<NativeResampler>),
    InProcess(Arc<dyn Resampler>),
}

impl Engine {
    pub fn kind(&self) -> EngineKind {
        match self {
            Engine::Builtin(_) => EngineKind::Builtin,
            Engine::Process(_) => EngineKind::Process,
            Engine::Native(_) => EngineKind::Native,
            Engine::InProcess(_) => EngineKind::InProcess,
        }
    }

    fn resampler(&self) -> &dyn Resampler {
        match self {
            Engine::Builtin(engine) => &**engine,
            Engine::Process(engine) => &**engine,
            Engine::Native(engine) => &**engine,
            Engine::InProcess(engine) => &**engine,
        }
    }

    pub fn descriptor(&self) -> EngineDescriptor {
        EngineDescriptor {
            name: self.name().to_string(),
            kind: self.kind(),
            path: self.file_path().map(Path::to_path_buf),
        }
    }
}

impl Resampler for Engine {
    fn name(&self) -> &str {
        self.resampler().name()
    }

    fn file_path(&self) -> Option<&Path> {
        self.resampler().file_path()
    }

    fn resample(&self, params: &ResamplerParams) -> Result<Vec<f32>, EngineError> {
        self.resampler().resample(params)
    }

    fn supports_flag(&self, flag: &str) -> bool {
        self.resampler().supports_flag(flag)
    }

    fn probe(&self) -> Result<(), EngineError> {
        self.resampler().probe()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// A summary of a registered engine for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDescriptor {
    pub name: String,
    pub kind: EngineKind,
    pub path: Option<PathBuf>,
}

/// Discovers engines on disk and hands them out by name.
///
/// The built-in engine is always present. Discovery may be rerun at any time,
/// including while render workers are looking engines up.
pub struct EngineRegistry {
    builtin: Engine,
    process_timeout: Duration,
    in_process: RwLock<Vec<Arc<dyn Resampler>>>,
    engines: RwLock<HashMap<String, Engine>>,
}

impl EngineRegistry {
    /// Creates a registry holding only the built-in engine.
    pub fn new(builtin: Engine, process_timeout: Duration) -> EngineRegistry {
        let registry = EngineRegistry {
            builtin,
            process_timeout,
            in_process: RwLock::new(Vec::new()),
            engines: RwLock::new(HashMap::new()),
        };
        *registry.engines.write() = registry.defaults(&[]);
        registry
    }

    /// Creates a registry with the worldline built-in from the configured libs directory.
    pub fn from_config(config: &RenderConfig) -> Result<EngineRegistry, ConfigError> {
        let builtin = Engine::Builtin(Arc::new(WorldlineResampler::new(
            &config.libs_path(),
        )));
        Ok(EngineRegistry::new(builtin, config.process_timeout()?))
    }

    pub fn builtin(&self) -> Engine {
        self.builtin.clone()
    }

    /// Registers an engine implemented in this process. It survives later searches.
    pub fn register_in_process(&self, engine: Arc<dyn Resampler>) {
        info!(engine = engine.name(), "Registering in-process engine");
        // Lock order: in_process, then engines.
        let mut in_process = self.in_process.write();
        self.engines
            .write()
            .insert(engine.name().to_string(), Engine::InProcess(engine.clone()));
        in_process.push(engine);
    }

    /// Classifies a file as an engine, or returns None if it isn't one.
    pub fn load(&self, path: &Path, base: &Path) -> Option<Engine> {
        if !path.is_file() {
            return None;
        }
        let file_name = path.file_name()?.to_str()?;
        if file_name.starts_with('.') {
            return None;
        }
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());

        let executable = if cfg!(windows) {
            matches!(ext.as_deref(), Some("exe") | Some("bat"))
        } else {
            matches!(ext.as_deref(), None | Some("sh"))
        };
        if executable {
            return ProcessResampler::new(path, base, self.process_timeout)
                .map(|engine| Engine::Process(Arc::new(engine)));
        }

        if ext.as_deref() == Some(DLL_EXTENSION) {
            return match NativeResampler::probe_path(path, base) {
                Ok(engine) => Some(Engine::Native(Arc::new(engine))),
                Err(e) => {
                    debug!(path = ?path, err = e.to_string(), "Not a native engine");
                    None
                }
            };
        }
        None
    }

    /// Rescans `base` recursively, replacing every discovered engine.
    /// The directory is created if missing. On a filesystem error only the
    /// built-in and in-process engines remain. Returns the number of engines.
    pub fn search(&self, base: &Path) -> usize {
        let mut discovered = HashMap::new();
        if let Err(e) = self.discover(base, base, &mut discovered) {
            error!(
                path = ?base,
                err = e.to_string(),
                "Engine search failed, keeping only built-in and in-process engines"
            );
            discovered.clear();
        }

        let in_process = self.in_process.read();
        let mut engines = self.defaults(&in_process);
        engines.extend(discovered);
        let count = engines.len();
        *self.engines.write() = engines;
        info!(path = ?base, engines = count, "Engine search finished");
        count
    }

    fn discover(
        &self,
        base: &Path,
        dir: &Path,
        engines: &mut HashMap<String, Engine>,
    ) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let mut entries = fs::read_dir(dir)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<io::Result<Vec<PathBuf>>>()?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                self.discover(base, &path, engines)?;
                continue;
            }
            if let Some(engine) = self.load(&path, base) {
                if let Engine::Process(process) = &engine {
                    process.check_permissions();
                }
                debug!(engine = engine.name(), kind = %engine.kind(), "Found engine");
                engines.insert(engine.name().to_string(), engine);
            }
        }
        Ok(())
    }

    fn defaults(&self, in_process: &[Arc<dyn Resampler>]) -> HashMap<String, Engine> {
        let mut engines = HashMap::new();
        engines.insert(BUILTIN_ENGINE.to_string(), self.builtin.clone());
        for engine in in_process {
            engines.insert(engine.name().to_string(), Engine::InProcess(engine.clone()));
        }
        engines
    }

    /// Looks an engine up by name. Names starting with the built-in engine's
    /// name always resolve to the built-in.
    pub fn get(&self, name: &str) -> Option<Engine> {
        if name.starts_with(BUILTIN_ENGINE) {
            return Some(self.builtin.clone());
        }
        self.engines.read().get(name).cloned()
    }

    /// Every registered engine, sorted by name.
    pub fn list(&self) -> Vec<EngineDescriptor> {
        let mut engines: Vec<EngineDescriptor> = self
            .engines
            .read()
            .values()
            .map(Engine::descriptor)
            .collect();
        engines.sort_by(|a, b| a.name.cmp(&b.name));
        engines
    }

    pub fn len(&self) -> usize {
        self.engines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.read().is_empty()
    }

    /// Resolves the configured engine. No preference means the built-in. When
    /// the preferred engine is missing, the built-in is used and recorded as the
    /// new preference, saved to `persist_to` if given.
    pub fn resolve_preferred(
        &self,
        config: &mut RenderConfig,
        persist_to: Option<&Path>,
    ) -> Engine {
        let Some(preferred) = config.resampler() else {
            return self.builtin.clone();
        };
        if let Some(engine) = self.get(preferred) {
            return engine;
        }

        warn!(
            preferred,
            fallback = BUILTIN_ENGINE,
            "Preferred engine not found, falling back"
        );
        config.set_resampler(BUILTIN_ENGINE);
        if let Some(path) = persist_to {
            if let Err(e) = config.save(path) {
                error!(path = ?path, err = e.to_string(), "Unable to save engine preference");
            }
        }
        self.builtin.clone()
    }

    /// Probes an engine in the background with retries. Returns None if the name is unknown.
    pub fn warm_up(
        &self,
        name: &str,
        policy: RetryPolicy,
        cancel: CancelHandle,
    ) -> Option<Receiver<StartupOutcome>> {
        let engine = self.get(name)?;
        let startup = Startup::new(engine.name(), policy);
        Some(startup.spawn(move || engine.probe(), cancel))
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.list())
            .finish()
    }
}
