//! Local model server lifecycle
//!
//! Relaunching follows stop → wait for port release → start. Stopping tries
//! every supervision mechanism the server might be running under and ignores
//! their failures; only the port being free afterwards matters.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::Command;

use crate::config::{DEFAULT_OLLAMA_PORT, OllamaConfig};
use crate::env_file::EnvRecord;
use crate::{Error, Result};

/// Timeout for a single port probe connect
const PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// Bounded polling: fixed interval, fixed number of attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of checks
    pub attempts: u32,
    /// Delay between checks
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            interval: Duration::from_millis(500),
        }
    }
}

/// One way of stopping the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopStrategy {
    /// Short name for logs
    pub label: &'static str,
    /// Program to run
    pub program: &'static str,
    /// Its arguments
    pub args: &'static [&'static str],
}

/// Stop strategies for this platform, in the order they are tried
#[must_use]
pub fn default_stop_strategies() -> Vec<StopStrategy> {
    let mut strategies = Vec::new();

    #[cfg(target_os = "linux")]
    strategies.extend([
        StopStrategy {
            label: "systemd",
            program: "systemctl",
            args: &["stop", "ollama"],
        },
        StopStrategy {
            label: "systemd-user",
            program: "systemctl",
            args: &["--user", "stop", "ollama"],
        },
    ]);

    #[cfg(target_os = "macos")]
    strategies.extend([
        StopStrategy {
            label: "brew-services",
            program: "brew",
            args: &["services", "stop", "ollama"],
        },
        StopStrategy {
            label: "launchd",
            program: "launchctl",
            args: &["remove", "com.ollama.ollama"],
        },
    ]);

    #[cfg(unix)]
    strategies.push(StopStrategy {
        label: "pkill",
        program: "pkill",
        args: &["-f", "ollama serve"],
    });

    #[cfg(windows)]
    strategies.push(StopStrategy {
        label: "taskkill",
        program: "taskkill",
        args: &["/IM", "ollama.exe", "/F"],
    });

    strategies
}

/// Run every strategy, discarding individual failures
///
/// Returns how many strategies exited successfully, for logging only.
pub async fn stop_best_effort(strategies: &[StopStrategy]) -> usize {
    let mut succeeded = 0;

    for strategy in strategies {
        match Command::new(strategy.program)
            .args(strategy.args)
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                tracing::debug!(strategy = strategy.label, "stop strategy succeeded");
                succeeded += 1;
            }
            Ok(output) => {
                tracing::debug!(
                    strategy = strategy.label,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "stop strategy failed"
                );
            }
            Err(e) => {
                tracing::debug!(strategy = strategy.label, error = %e, "stop strategy unavailable");
            }
        }
    }

    succeeded
}

/// Whether something is accepting connections on localhost `port`
pub async fn port_in_use(port: u16) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

/// Outcome of waiting for a port to free up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRelease {
    /// The port was free after this many checks
    Released { checks: u32 },
    /// The port was still bound when attempts ran out
    StillBound { checks: u32 },
}

impl PortRelease {
    /// Whether the port ended up free
    #[must_use]
    pub const fn is_released(self) -> bool {
        matches!(self, Self::Released { .. })
    }
}

/// Poll `in_use` until it reports the port free or the policy is exhausted
///
/// Never blocks longer than `attempts` checks plus the sleeps between them.
pub async fn wait_for_release<F, Fut>(mut in_use: F, policy: PollPolicy) -> PortRelease
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for check in 1..=policy.attempts {
        if !in_use().await {
            return PortRelease::Released { checks: check };
        }
        if check < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    PortRelease::StillBound {
        checks: policy.attempts,
    }
}

/// Wait for localhost `port` to be released
pub async fn wait_for_port_release(port: u16, policy: PollPolicy) -> PortRelease {
    wait_for_release(|| port_in_use(port), policy).await
}

/// The foreground serving command
#[derive(Debug, Clone)]
pub struct ServerCommand {
    /// Resolved executable
    pub program: PathBuf,
    /// Arguments
    pub args: Vec<String>,
}

impl ServerCommand {
    /// Locate `ollama` on `PATH` and build `ollama serve`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelServer`] if `ollama` is not installed
    pub fn ollama() -> Result<Self> {
        let program = which::which("ollama")
            .map_err(|e| Error::ModelServer(format!("ollama not found on PATH: {e}")))?;
        Ok(Self {
            program,
            args: vec!["serve".to_string()],
        })
    }

    /// Build the process, with the env record and port applied
    #[must_use]
    pub fn command(&self, env: &EnvRecord, port: u16) -> std::process::Command {
        let mut command = std::process::Command::new(&self.program);
        command.args(&self.args);
        env.apply_to(&mut command);

        // Ollama reads its bind address from OLLAMA_HOST
        if port != DEFAULT_OLLAMA_PORT && env.get_non_empty("OLLAMA_HOST").is_none() {
            command.env("OLLAMA_HOST", format!("127.0.0.1:{port}"));
        }
        command
    }
}

/// Knobs for [`relaunch`]
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Port-release polling
    pub poll: PollPolicy,
    /// Skip the stop step entirely
    pub skip_stop: bool,
    /// Stop strategies to try
    pub strategies: Vec<StopStrategy>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            skip_stop: false,
            strategies: default_stop_strategies(),
        }
    }
}

/// Stop any running server and wait for its port
///
/// Exhausting the wait is a warning, not an error: the new server will
/// either bind anyway or fail visibly on its own.
pub async fn prepare_port(port: u16, options: &LaunchOptions) -> PortRelease {
    if options.skip_stop {
        tracing::info!("skipping stop of existing server");
    } else {
        let stopped = stop_best_effort(&options.strategies).await;
        tracing::info!(stopped, tried = options.strategies.len(), "stopped existing server");
    }

    let release = wait_for_port_release(port, options.poll).await;
    match release {
        PortRelease::Released { checks } => {
            tracing::debug!(port, checks, "port is free");
        }
        PortRelease::StillBound { checks } => {
            tracing::warn!(port, checks, "port still in use, starting anyway");
        }
    }
    release
}

/// Stop, wait, then run the server in the foreground
///
/// On Unix the current process is replaced by the server, so signals and
/// output go straight to it and this only returns on failure. Elsewhere the
/// server is spawned and awaited, with Ctrl-C forwarded as a kill.
///
/// # Errors
///
/// Returns [`Error::ModelServer`] if the server cannot be started
pub async fn relaunch(
    server: &ServerCommand,
    ollama: &OllamaConfig,
    env: &EnvRecord,
    options: &LaunchOptions,
) -> Result<ExitStatus> {
    prepare_port(ollama.port, options).await;

    tracing::info!(
        program = %server.program.display(),
        port = ollama.port,
        model = %ollama.model,
        "starting model server in foreground"
    );
    serve_foreground(server.command(env, ollama.port)).await
}

#[cfg(unix)]
#[allow(clippy::unused_async)]
async fn serve_foreground(mut command: std::process::Command) -> Result<ExitStatus> {
    use std::os::unix::process::CommandExt;

    let err = command.exec();
    Err(Error::ModelServer(format!("failed to exec server: {err}")))
}

#[cfg(not(unix))]
async fn serve_foreground(command: std::process::Command) -> Result<ExitStatus> {
    let mut child = Command::from(command)
        .spawn()
        .map_err(|e| Error::ModelServer(format!("failed to start server: {e}")))?;

    tokio::select! {
        status = child.wait() => Ok(status?),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, stopping server");
            child.kill().await?;
            Ok(child.wait().await?)
        }
    }
}
