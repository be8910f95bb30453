//! External engine invocation.
//!
//! The engine contract is `<executable> <input-path>`: on success it exits 0
//! and writes its report to the input path plus the configured suffix. Engine
//! options travel as environment variables so the argument list stays fixed.
//!
//! On unix the engine leads its own process group, and that group is killed
//! when the run ends, so nothing the engine started outlives its job.

use cerberus_core::{CerberusError, Result};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::EngineConfig;
use crate::stages::workspace::StagedInput;

/// What a successful engine run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    /// Executable that was run
    pub executable: PathBuf,
    /// Input it was given
    pub input: PathBuf,
    /// Where its report should be
    pub output: PathBuf,
    /// Exit code (always 0 for a returned invocation)
    pub exit_code: i32,
    /// Wall-clock run time
    pub elapsed: Duration,
}

/// Runs the analysis engine as a child process
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create an engine adapter
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Engine configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Verify the executable exists and can be run
    pub async fn check(&self) -> Result<()> {
        let path = &self.config.executable;
        let unavailable = |reason: String| CerberusError::EngineUnavailable {
            path: path.display().to_string(),
            reason,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if !metadata.is_file() {
            return Err(unavailable("not a regular file".to_string()));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 == 0 {
                return Err(unavailable("not executable".to_string()));
            }
        }

        Ok(())
    }

    /// Run the engine on a staged input and wait for it
    ///
    /// The engine and everything it spawned are killed if the configured
    /// time budget runs out or if this future is dropped. A zero exit says
    /// nothing about the report; the extractor checks that separately.
    pub async fn run(&self, staged: &StagedInput) -> Result<EngineInvocation> {
        self.run_until(staged, Instant::now() + self.config.timeout)
            .await
    }

    /// Like [`Engine::run`], but give up at `deadline`
    ///
    /// Used when the engine only gets what is left of a larger budget.
    #[instrument(skip_all, fields(input = %staged.path().display()))]
    pub async fn run_until(&self, staged: &StagedInput, deadline: Instant) -> Result<EngineInvocation> {
        self.check().await?;

        let input = staged.path();
        let output = self.config.output_path_for(input);

        let mut command = Command::new(&self.config.executable);
        command
            .arg(input)
            .envs(self.config.options.to_env())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        if self.config.inherit_stdio {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let started = Instant::now();
        let mut child = command
            .spawn()
            .map_err(|e| CerberusError::EngineUnavailable {
                path: self.config.executable.display().to_string(),
                reason: e.to_string(),
            })?;
        let mut group = ProcessGroup::of(&child);
        debug!(pid = ?child.id(), engine = %self.config.executable.display(), "engine started");

        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => status.map_err(|e| CerberusError::io(&self.config.executable, e))?,
            Err(_) => {
                warn!(timeout = ?self.config.timeout, "engine timed out, killing it");
                group.kill();
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill engine");
                }
                return Err(CerberusError::Timeout(self.config.timeout));
            }
        };
        // Stragglers the engine left running in its group.
        group.kill();

        let elapsed = started.elapsed();
        let exit_code = exit_code(status);
        if exit_code != 0 {
            warn!(exit_code, elapsed_ms = elapsed.as_millis(), "engine failed");
            return Err(CerberusError::EngineExecutionFailed { code: exit_code });
        }

        debug!(elapsed_ms = elapsed.as_millis(), "engine finished");
        Ok(EngineInvocation {
            executable: self.config.executable.clone(),
            input: input.to_path_buf(),
            output,
            exit_code,
            elapsed,
        })
    }

    /// Report path for `input`
    #[must_use]
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        self.config.output_path_for(input)
    }
}

/// The engine's process group, killed on [`ProcessGroup::kill`] or drop
struct ProcessGroup {
    #[cfg(unix)]
    leader: Option<nix::unistd::Pid>,
}

impl ProcessGroup {
    #[cfg_attr(not(unix), allow(unused_variables))]
    fn of(child: &Child) -> Self {
        Self {
            #[cfg(unix)]
            leader: child
                .id()
                .and_then(|id| i32::try_from(id).ok())
                .map(nix::unistd::Pid::from_raw),
        }
    }

    #[allow(clippy::unused_self)]
    fn kill(&mut self) {
        #[cfg(unix)]
        if let Some(leader) = self.leader.take() {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};

            match killpg(leader, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => warn!(pgid = leader.as_raw(), error = %e, "failed to kill engine process group"),
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Exit code, or `128 + signal` for a child killed by a signal
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
