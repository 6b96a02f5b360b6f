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
use std::path::{Path, PathBuf};

use config::Config;
use serde::Deserialize;

use super::{error::ConfigError, render::RenderConfig};
use crate::render::RenderItem;

/// A YAML description of one offline render.
#[derive(Deserialize, Clone, Debug)]
pub struct JobFile {
    /// Where to write the mix.
    output: Option<PathBuf>,

    /// Render settings, relative to the job file.
    config: Option<PathBuf>,

    /// The segments to render.
    #[serde(default)]
    items: Vec<RenderItem>,
}

impl JobFile {
    /// Loads a job. Relative input and output paths are resolved against the job's directory.
    pub fn load(path: &Path) -> Result<JobFile, ConfigError> {
        let mut job = Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize::<JobFile>()?;

        let base = path.parent().unwrap_or(Path::new("."));
        job.resolve_paths(base);
        Ok(job)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() && !path.as_os_str().is_empty() {
                *path = base.join(&*path);
            }
        };
        if let Some(output) = self.output.as_mut() {
            resolve(output);
        }
        if let Some(config) = self.config.as_mut() {
            resolve(config);
        }
        for item in self.items.iter_mut() {
            resolve(&mut item.params.input);
        }
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Loads the referenced render settings, or the defaults if the job names none.
    /// Relative directories in the settings are resolved against the settings file.
    pub fn render_config(&self) -> Result<RenderConfig, ConfigError> {
        match &self.config {
            Some(path) => {
                let mut config = RenderConfig::load(path)?;
                config.resolve_paths(path.parent().unwrap_or(Path::new(".")));
                Ok(config)
            }
            None => Ok(RenderConfig::default()),
        }
    }

    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<RenderItem> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_load_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.yaml");
        fs::write(
            &path,
            r#"
output: mix.wav
items:
  - position_ms: 0
    duration_ms: 500
    resampler: worldline
    params:
      input: voice/a.wav
      tone: 62
      flags: g-5
      pitch_bend: [0, 10, 20]
  - position_ms: 480
    duration_ms: 300
    skip_over_ms: 20
    envelope:
      - { time: 0, gain: 0 }
      - { time: 20, gain: 100 }
    params:
      input: /abs/b.wav
"#,
        )
        .unwrap();

        let job = JobFile::load(&path).unwrap();
        assert_eq!(Some(dir.path().join("mix.wav").as_path()), job.output());
        assert_eq!(None, job.config_path());
        assert_eq!(2, job.items().len());

        let first = &job.items()[0];
        assert_eq!(Some("worldline"), first.resampler.as_deref());
        assert_eq!(dir.path().join("voice/a.wav"), first.params.input);
        assert_eq!(62, first.params.tone);
        assert_eq!("g-5", first.params.flags);
        assert_eq!(vec![0, 10, 20], first.params.pitch_bend);
        assert_eq!(100.0, first.params.velocity);

        let second = &job.items()[1];
        assert_eq!(PathBuf::from("/abs/b.wav"), second.params.input);
        assert_eq!(20.0, second.skip_over_ms);
        assert_eq!(2, second.envelope.as_ref().unwrap().len());
        assert_eq!(None, second.resampler);

        assert_eq!(RenderConfig::default(), job.render_config().unwrap());
    }

    #[test]
    fn test_job_with_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("render.yaml"),
            "resamplers_path: engines\nresampler: worldline\n",
        )
        .unwrap();
        let path = dir.path().join("job.yaml");
        fs::write(&path, "config: render.yaml\nitems: []\n").unwrap();

        let job = JobFile::load(&path).unwrap();
        let config = job.render_config().unwrap();
        assert_eq!(dir.path().join("engines"), config.resamplers_path());
        assert_eq!(Some("worldline"), config.resampler());
        assert!(job.items().is_empty());
    }

    #[test]
    fn test_missing_job() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            JobFile::load(&dir.path().join("missing.yaml")),
            Err(ConfigError::Load(_))
        ));
    }
}
