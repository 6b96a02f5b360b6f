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
use std::{thread, time::Duration};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{error, info, warn};

use super::error::EngineError;
use crate::cancel::CancelHandle;

/// Bounds how hard engine startup tries before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// The delay after the given failed attempt, doubling each time up to the maximum.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupState {
    Idle,
    Probing { attempt: u32 },
    Backoff { attempt: u32, delay: Duration },
    Ready { attempts: u32 },
    Failed { attempts: u32, error: String },
    Cancelled,
}

impl StartupState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StartupState::Ready { .. } | StartupState::Failed { .. } | StartupState::Cancelled
        )
    }
}

/// The final state of one engine's startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupOutcome {
    pub engine: String,
    pub state: StartupState,
}

/// Brings an engine up by probing it, retrying with backoff on failure.
///
/// `Idle -> Probing -> Ready`, or `Probing -> Backoff -> Probing ...` until the
/// attempts run out and the machine ends in `Failed`.
#[derive(Debug)]
pub struct Startup {
    engine: String,
    policy: RetryPolicy,
    state: StartupState,
}

impl Startup {
    pub fn new(engine: impl Into<String>, policy: RetryPolicy) -> Startup {
        Startup {
            engine: engine.into(),
            policy,
            state: StartupState::Idle,
        }
    }

    pub fn state(&self) -> &StartupState {
        &self.state
    }

    /// Makes one transition. The probe runs only in the `Probing` state.
    pub fn step<F>(&mut self, probe: &mut F) -> &StartupState
    where
        F: FnMut() -> Result<(), EngineError>,
    {
        self.state = match &self.state {
            StartupState::Idle => StartupState::Probing { attempt: 1 },
            StartupState::Probing { attempt } => {
                let attempt = *attempt;
                match probe() {
                    Ok(()) => StartupState::Ready { attempts: attempt },
                    Err(e) if attempt >= self.policy.max_attempts => StartupState::Failed {
                        attempts: attempt,
                        error: e.to_string(),
                    },
                    Err(e) => {
                        let delay = self.policy.backoff(attempt);
                        warn!(
                            engine = %self.engine,
                            attempt,
                            err = e.to_string(),
                            "Engine probe failed, retrying in {delay:?}"
                        );
                        StartupState::Backoff { attempt, delay }
                    }
                }
            }
            StartupState::Backoff { attempt, .. } => StartupState::Probing {
                attempt: attempt + 1,
            },
            terminal => terminal.clone(),
        };
        &self.state
    }

    /// Drives the machine to a terminal state, sleeping through backoff unless cancelled.
    pub fn run<F>(mut self, mut probe: F, cancel: &CancelHandle) -> StartupOutcome
    where
        F: FnMut() -> Result<(), EngineError>,
    {
        while !self.state.is_terminal() {
            if cancel.is_cancelled() {
                self.state = StartupState::Cancelled;
                break;
            }
            if let StartupState::Backoff { delay, .. } = self.step(&mut probe) {
                let delay = *delay;
                if cancel.sleep(delay) {
                    self.state = StartupState::Cancelled;
                }
            }
        }

        match &self.state {
            StartupState::Ready { attempts } => {
                info!(engine = %self.engine, attempts, "Engine ready")
            }
            StartupState::Failed { error, .. } => {
                error!(engine = %self.engine, err = %error, "Engine failed to start")
            }
            _ => info!(engine = %self.engine, "Engine startup cancelled"),
        }
        StartupOutcome {
            engine: self.engine,
            state: self.state,
        }
    }

    /// Runs the machine on a background thread. The outcome arrives on the returned channel.
    pub fn spawn<F>(self, probe: F, cancel: CancelHandle) -> Receiver<StartupOutcome>
    where
        F: FnMut() -> Result<(), EngineError> + Send + 'static,
    {
        let (sender, receiver) = bounded(1);
        let engine = self.engine.clone();
        let failed_sender = sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("startup-{engine}"))
            .spawn(move || {
                deliver(&sender, self.run(probe, &cancel));
            });
        if let Err(e) = spawned {
            error!(engine = %engine, err = e.to_string(), "Unable to start engine startup thread");
            deliver(
                &failed_sender,
                StartupOutcome {
                    engine,
                    state: StartupState::Failed {
                        attempts: 0,
                        error: e.to_string(),
                    },
                },
            );
        }
        receiver
    }
}

/// Sends the outcome, logging when nobody is listening. Returns whether it was delivered.
fn deliver(sender: &Sender<StartupOutcome>, outcome: StartupOutcome) -> bool {
    match sender.send(outcome) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                engine = %e.into_inner().engine,
                "Nobody is listening for the engine startup outcome"
            );
            false
        }
    }
}
