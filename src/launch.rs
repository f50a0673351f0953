//! Runs games as child processes and notices when they exit.
//!
//! The supervisor never blocks: [`LaunchSupervisor::poll`] is called once per frame and checks
//! whether the child is still alive, moving through `Idle -> Launching -> Exited`.
//! [`LaunchSupervisor::finish`] collects the outcome and returns to `Idle`.

use std::{
    process::{Child, ExitStatus},
    time::{Duration, Instant},
};

use crate::{
    config::LaunchConfig,
    data::GameRecord,
    error::{LauncherError, LauncherResult},
    utils::get_launch_command_for_executable,
};

const COMPONENT: &str = "Launch";

/// How a launched game ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub id: String,
    /// `None` if the process could no longer be waited on
    pub status: Option<ExitStatus>,
    pub started: Instant,
    pub ended: Instant,
}

impl LaunchOutcome {
    pub fn success(&self) -> bool {
        self.status.is_some_and(|status| status.success())
    }

    pub fn duration(&self) -> Duration {
        self.ended.saturating_duration_since(self.started)
    }
}

#[derive(Debug, Default)]
pub enum LaunchState {
    #[default]
    Idle,
    Launching {
        id: String,
        child: Child,
        started: Instant,
    },
    Exited(LaunchOutcome),
}

#[derive(Debug, Default)]
pub struct LaunchSupervisor {
    /// Command prefix for executables, e.g. `wine`
    wrapper: Vec<String>,
    state: LaunchState,
}

impl LaunchSupervisor {
    pub fn new(wrapper: Vec<String>) -> Self {
        Self {
            wrapper,
            state: LaunchState::Idle,
        }
    }

    pub fn from_config(config: &LaunchConfig) -> Self {
        Self::new(config.wrapper_command())
    }

    pub fn state(&self) -> &LaunchState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LaunchState::Launching { .. })
    }

    /// Id of the game currently running
    pub fn running_id(&self) -> Option<&str> {
        match &self.state {
            LaunchState::Launching { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Spawns the game's executable with its containing folder as working directory
    #[tracing::instrument(level = "trace", skip(self), fields(id = %record.id))]
    pub fn launch(&mut self, record: &GameRecord) -> LauncherResult<()> {
        let path = &record.executable_path;

        let fail = |reason: String| {
            tracing::error!("{COMPONENT} - Could not launch {:?}: {reason}", record.name);
            LauncherError::LaunchFailed {
                path: path.clone(),
                reason,
            }
        };

        if let Some(running) = self.running_id() {
            return Err(fail(format!("game {running} is still running")));
        }
        if !path.is_file() {
            return Err(fail("executable not found".into()));
        }

        let mut command = get_launch_command_for_executable(path, &self.wrapper);
        let child = command.spawn().map_err(|e| fail(e.to_string()))?;

        tracing::info!(
            "{COMPONENT} - Launched {:?} (pid {}) from {path:?}",
            record.name,
            child.id()
        );

        self.state = LaunchState::Launching {
            id: record.id.clone(),
            child,
            started: Instant::now(),
        };

        Ok(())
    }

    /// Checks whether the running game has exited, without waiting for it
    pub fn poll(&mut self) -> &LaunchState {
        let exited = match &mut self.state {
            LaunchState::Launching { id, child, started } => match child.try_wait() {
                Ok(None) => None,
                Ok(status) => Some((id.clone(), status, *started)),
                Err(e) => {
                    tracing::error!("{COMPONENT} - Lost track of game {id}: {e}");
                    Some((id.clone(), None, *started))
                }
            },
            _ => None,
        };

        if let Some((id, status, started)) = exited {
            let outcome = LaunchOutcome {
                id,
                status,
                started,
                ended: Instant::now(),
            };
            tracing::info!(
                "{COMPONENT} - Game {} exited with {:?} after {:?}",
                outcome.id,
                outcome.status,
                outcome.duration()
            );

            self.state = LaunchState::Exited(outcome);
        }

        &self.state
    }

    /// Takes the outcome of an exited game, returning to idle
    pub fn finish(&mut self) -> Option<LaunchOutcome> {
        match std::mem::take(&mut self.state) {
            LaunchState::Exited(outcome) => Some(outcome),
            other => {
                self.state = other;
                None
            }
        }
    }
}
