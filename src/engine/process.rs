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
    fs,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, error, info, warn};

use super::{
    error::EngineError,
    manifest::EngineManifest,
    params::{InputAudio, ResamplerParams},
    traits::Resampler,
};
use crate::{
    signal::decode::{read_wav_file, write_wav_file},
    util::thread_tag,
};

/// The default time an engine process may run before it is killed.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

const MORESAMPLER_STEM: &str = "moresampler";
const MORESAMPLER_CONFIG: &str = "moreconfig.txt";
const MORESAMPLER_COMPAT: &str = "resampler-compatibility on";

/// An engine that runs as an external executable, one process per segment.
#[derive(Debug)]
pub struct ProcessResampler {
    name: String,
    path: PathBuf,
    manifest: EngineManifest,
    timeout: Duration,
}

impl ProcessResampler {
    /// Creates an engine for the executable at `path`, named by its path relative to `base`.
    /// Returns None if the file doesn't exist.
    pub fn new(path: &Path, base: &Path, timeout: Duration) -> Option<ProcessResampler> {
        if !path.is_file() {
            return None;
        }
        let name = path
            .strip_prefix(base)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();

        if path.file_stem().and_then(|stem| stem.to_str()) == Some(MORESAMPLER_STEM) {
            if let Some(dir) = path.parent() {
                if let Err(e) = fix_moresampler_config(&dir.join(MORESAMPLER_CONFIG)) {
                    error!(path = ?path, err = e.to_string(), "Failed to update moreconfig.txt");
                }
            }
        }

        Some(ProcessResampler {
            name,
            path: path.to_path_buf(),
            manifest: EngineManifest::for_engine(path),
            timeout,
        })
    }

    pub fn manifest(&self) -> &EngineManifest {
        &self.manifest
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Makes the executable runnable by everyone (0755). Does nothing on Windows.
    pub fn check_permissions(&self) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            if let Err(e) = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o755)) {
                warn!(
                    engine = %self.name,
                    err = e.to_string(),
                    "Unable to make engine executable"
                );
            }
        }
    }

    /// Runs the engine once and waits for it, up to the timeout.
    /// Returns the exit status, or None if the process had to be killed.
    fn run(&self, args: &[String], tag: &str) -> Result<Option<ExitStatus>, EngineError> {
        let mut child = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Launch {
                engine: self.name.clone(),
                source,
            })?;

        let loggers: Vec<JoinHandle<()>> = [
            child
                .stdout
                .take()
                .and_then(|out| spawn_line_logger(out, tag, OutputStream::Stdout)),
            child
                .stderr
                .take()
                .and_then(|err| spawn_line_logger(err, tag, OutputStream::Stderr)),
        ]
        .into_iter()
        .flatten()
        .collect();

        let status = self.wait_with_timeout(&mut child, tag)?;
        // A killed process may leave its pipes open through grandchildren, so
        // only wait for the loggers after a clean exit.
        if status.is_some() {
            for logger in loggers {
                if logger.join().is_err() {
                    warn!("[{tag}] Output logger panicked");
                }
            }
        }
        Ok(status)
    }

    fn wait_with_timeout(
        &self,
        child: &mut Child,
        tag: &str,
    ) -> Result<Option<ExitStatus>, EngineError> {
        let deadline = Instant::now() + self.timeout;
        let polled = poll_until(deadline, || child.try_wait());
        let failure = match polled {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {
                warn!("[{tag}] Timeout, killing {}", self.name);
                None
            }
            Err(e) => {
                error!("[{tag}] Unable to poll {}, killing it: {e}", self.name);
                Some(e)
            }
        };
        match child.kill() {
            Ok(()) => {
                warn!("[{tag}] Killed.");
                if let Err(e) = child.wait() {
                    error!("[{tag}] Failed to reap killed process: {e}");
                }
            }
            Err(e) => error!("[{tag}] Failed to kill: {e}"),
        }
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(None),
        }
    }
}

/// Polls until a value turns up or the deadline passes. An error ends the wait early.
fn poll_until<T>(
    deadline: Instant,
    mut poll: impl FnMut() -> std::io::Result<Option<T>>,
) -> std::io::Result<Option<T>> {
    loop {
        if let Some(value) = poll()? {
            return Ok(Some(value));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl Resampler for ProcessResampler {
    fn name(&self) -> &str {
        &self.name
    }

    fn file_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn resample(&self, params: &ResamplerParams) -> Result<Vec<f32>, EngineError> {
        let tag = thread_tag();

        // Engines read the source from disk, so in-memory input goes to a temp file first.
        let input_temp;
        let input = match params.input_audio() {
            InputAudio::File(path) => path,
            InputAudio::Samples(samples) => {
                let temp = tempfile::Builder::new()
                    .prefix("utau-render-in-")
                    .suffix(".wav")
                    .tempfile()?
                    .into_temp_path();
                write_wav_file(&temp, samples)?;
                input_temp = temp;
                &*input_temp
            }
        };
        let output = tempfile::Builder::new()
            .prefix("utau-render-out-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        info!(
            "[{tag}] > {} {}",
            self.path.display(),
            params.process_args_line(input, &output)
        );
        let status = self.run(&params.process_args(input, &output), &tag)?;

        let written = fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(match status {
                None => EngineError::Timeout {
                    engine: self.name.clone(),
                    timeout: self.timeout,
                },
                Some(status) if !status.success() => EngineError::Failed {
                    engine: self.name.clone(),
                    status: status.to_string(),
                },
                Some(_) => EngineError::NoOutput {
                    engine: self.name.clone(),
                },
            });
        }
        if status.is_none() {
            warn!("[{tag}] {} was killed but left output, using it", self.name);
        }

        let samples = read_wav_file(&output)?;
        debug!(engine = %self.name, samples = samples.len(), "Resampled");
        Ok(samples)
    }

    fn supports_flag(&self, flag: &str) -> bool {
        self.manifest.supports_flag(flag)
    }

    fn probe(&self) -> Result<(), EngineError> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(EngineError::Unavailable(self.name.clone()))
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Logs every line of a child's output on its own thread, tagged with the invoking thread.
fn spawn_line_logger<R: Read + Send + 'static>(
    reader: R,
    tag: &str,
    stream: OutputStream,
) -> Option<JoinHandle<()>> {
    let tag = tag.to_string();
    let spawned = thread::Builder::new()
        .name("resampler-output".to_string())
        .spawn(move || {
            for line in BufReader::new(reader).lines().map_while(Result::ok) {
                match stream {
                    OutputStream::Stdout => info!("[{tag}] >>> {line}"),
                    OutputStream::Stderr => warn!("[{tag}] >>> {line}"),
                }
            }
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(err = e.to_string(), "Unable to capture engine output");
            None
        }
    }
}

/// moresampler only accepts classic arguments with compatibility mode on.
fn fix_moresampler_config(path: &Path) -> std::io::Result<()> {
    let mut lines: Vec<String> = if path.exists() {
        fs::read_to_string(path)?.lines().map(str::to_string).collect()
    } else {
        Vec::new()
    };
    match lines
        .iter()
        .position(|line| line.starts_with("resampler-compatibility"))
    {
        Some(index) if lines[index] == MORESAMPLER_COMPAT => return Ok(()),
        Some(index) => lines[index] = MORESAMPLER_COMPAT.to_string(),
        None => lines.push(MORESAMPLER_COMPAT.to_string()),
    }
    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_poll_until() {
        let mut polls = 0;
        let found = poll_until(Instant::now() + Duration::from_secs(5), || {
            polls += 1;
            Ok((polls == 3).then_some(polls))
        });
        assert_eq!(Some(3), found.unwrap());

        let expired: io::Result<Option<()>> = poll_until(Instant::now(), || Ok(None));
        assert!(expired.unwrap().is_none());
    }

    #[test]
    fn test_poll_until_stops_on_error() {
        let mut polls = 0;
        let started = Instant::now();
        let result: io::Result<Option<()>> =
            poll_until(started + Duration::from_secs(30), || {
                polls += 1;
                Err(io::Error::other("no such process"))
            });
        assert!(result.is_err());
        assert_eq!(1, polls);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProcessResampler::new(
            &dir.path().join("nope.sh"),
            dir.path(),
            DEFAULT_PROCESS_TIMEOUT
        )
        .is_none());
    }

    #[test]
    fn test_name_is_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        let path = dir.path().join("sub").join("engine.sh");
        fs::write(&path, "#!/bin/sh\n").unwrap();

        let engine = ProcessResampler::new(&path, dir.path(), DEFAULT_PROCESS_TIMEOUT).unwrap();
        assert_eq!(
            Path::new("sub").join("engine.sh").to_string_lossy(),
            engine.name()
        );
        assert_eq!(Some(path.as_path()), engine.file_path());
        assert!(engine.probe().is_ok());
    }

    #[test]
    fn test_moresampler_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join(MORESAMPLER_CONFIG);
        fs::write(&config, "foo bar\nresampler-compatibility off\n").unwrap();
        let path = dir.path().join("moresampler");
        fs::write(&path, "").unwrap();

        ProcessResampler::new(&path, dir.path(), DEFAULT_PROCESS_TIMEOUT).unwrap();
        assert_eq!(
            "foo bar\nresampler-compatibility on\n",
            fs::read_to_string(&config).unwrap()
        );

        fs::remove_file(&config).unwrap();
        fix_moresampler_config(&config).unwrap();
        assert_eq!(
            "resampler-compatibility on\n",
            fs::read_to_string(&config).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_check_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let engine = ProcessResampler::new(&path, dir.path(), DEFAULT_PROCESS_TIMEOUT).unwrap();
        engine.check_permissions();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(0o755, mode & 0o777);
    }
}
