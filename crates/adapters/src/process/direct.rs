// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct process backend: spawns, monitors and restarts child processes.
//!
//! Each started process gets a PID file, optional line-by-line output
//! capture into a 1000-line ring buffer (plus an append-only log file), and
//! a lifecycle monitor that applies the configured restart policy when the
//! child exits. Stop is graceful: SIGTERM, wait up to 10s, then SIGKILL.

use super::{ProcessError, ProcessManager};
use async_trait::async_trait;
use dix_core::{ProcessConfig, ProcessState, ProcessStatus, RestartPolicy, RingBuffer};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Grace period between SIGTERM and SIGKILL.
const STOP_GRACE: Duration = Duration::from_secs(10);

/// Poll interval while waiting for a child to exit.
const STOP_POLL: Duration = Duration::from_millis(100);

struct ProcState {
    state: ProcessState,
    pid: Option<u32>,
    exit_code: Option<i32>,
    restart_count: u32,
    /// Set during an explicit stop so the monitor skips the restart policy.
    stopping: bool,
}

struct ManagedProcess {
    config: ProcessConfig,
    state: Mutex<ProcState>,
    /// Fan-in from the two reader tasks, fan-out to query callers.
    output: Mutex<RingBuffer>,
    log_file: Mutex<Option<std::fs::File>>,
}

struct Inner {
    /// One lock for the process table; per-process state has its own.
    table: Mutex<HashMap<String, Arc<ManagedProcess>>>,
    pid_dir: PathBuf,
    log_dir: PathBuf,
    /// Budget applied to configs that enable restarts without one.
    default_max_restarts: u32,
}

/// Process manager that owns its children directly.
#[derive(Clone)]
pub struct DirectManager {
    inner: Arc<Inner>,
}

impl DirectManager {
    pub fn new(pid_dir: &Path, log_dir: &Path) -> Result<Self, ProcessError> {
        Self::with_default_max_restarts(pid_dir, log_dir, 3)
    }

    pub fn with_default_max_restarts(
        pid_dir: &Path,
        log_dir: &Path,
        default_max_restarts: u32,
    ) -> Result<Self, ProcessError> {
        std::fs::create_dir_all(pid_dir)?;
        std::fs::create_dir_all(log_dir)?;
        Ok(Self {
            inner: Arc::new(Inner {
                table: Mutex::new(HashMap::new()),
                pid_dir: pid_dir.to_owned(),
                log_dir: log_dir.to_owned(),
                default_max_restarts,
            }),
        })
    }

    fn pid_path(&self, name: &str) -> PathBuf {
        self.inner.pid_dir.join(format!("{name}.pid"))
    }

    fn get(&self, name: &str) -> Result<Arc<ManagedProcess>, ProcessError> {
        self.inner
            .table
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| ProcessError::NotFound(name.to_string()))
    }

    /// Spawn the child and wire up capture + lifecycle monitoring.
    ///
    /// Returns a manually boxed future (rather than `async fn`) because this
    /// function and `monitor` call each other recursively across an `.await`;
    /// boxing breaks the self-referential opaque-type cycle that otherwise
    /// defeats the compiler's `Send` auto-trait inference.
    fn spawn<'a>(
        &'a self,
        proc: Arc<ManagedProcess>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), ProcessError>> + Send + 'a>> {
        Box::pin(async move {
        let config = proc.config.clone();

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::null())
            .kill_on_drop(false);
        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }
        #[cfg(unix)]
        {
            if let Some(uid) = config.uid {
                cmd.uid(uid);
            }
            if let Some(gid) = config.gid {
                cmd.gid(gid);
            }
        }
        if config.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ProcessError::SpawnFailed(format!("{}: {e}", config.command)))?;

        let pid = child
            .id()
            .ok_or_else(|| ProcessError::SpawnFailed("child exited before spawn returned".into()))?;

        write_pid_file(&self.pid_path(&config.name), pid)?;

        if let Some(log_path) = &config.log_file {
            match std::fs::OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(file) => *proc.log_file.lock() = Some(file),
                Err(e) => warn!(name = %config.name, error = %e, "failed to open log file"),
            }
        }

        {
            let mut state = proc.state.lock();
            state.state = ProcessState::Running;
            state.pid = Some(pid);
            state.exit_code = None;
        }
        info!(name = %config.name, pid, "process started");

        if config.capture_output {
            if let Some(stdout) = child.stdout.take() {
                tokio::spawn(capture_stream(Arc::clone(&proc), stdout, "stdout"));
            }
            if let Some(stderr) = child.stderr.take() {
                tokio::spawn(capture_stream(Arc::clone(&proc), stderr, "stderr"));
            }
        }

        let manager = self.clone();
        tokio::spawn(async move {
            manager.monitor(proc, child).await;
        });

        Ok(())
        })
    }

    /// Block on child exit, record the outcome, apply the restart policy.
    async fn monitor(&self, proc: Arc<ManagedProcess>, mut child: tokio::process::Child) {
        let name = proc.config.name.clone();
        let exit_code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                error!(name = %name, error = %e, "wait on child failed");
                None
            }
        };

        let (stopping, restart_count) = {
            let mut state = proc.state.lock();
            state.exit_code = exit_code;
            state.pid = None;
            state.state = if exit_code == Some(0) {
                ProcessState::Stopped
            } else {
                ProcessState::Failed
            };
            (state.stopping, state.restart_count)
        };
        info!(name = %name, ?exit_code, "process exited");

        *proc.log_file.lock() = None;
        let _ = std::fs::remove_file(self.pid_path(&name));

        if stopping {
            return;
        }

        let wants_restart = match proc.config.restart_policy {
            RestartPolicy::Never => false,
            RestartPolicy::OnFailure => exit_code != Some(0),
            RestartPolicy::Always => true,
        };
        if !wants_restart || restart_count >= proc.config.max_restarts {
            return;
        }

        proc.state.lock().restart_count += 1;
        debug!(name = %name, attempt = restart_count + 1, "scheduling restart");
        tokio::time::sleep(proc.config.restart_delay).await;

        if let Err(e) = self.spawn(proc).await {
            error!(name = %name, error = %e, "automatic restart failed");
        }
    }

    /// Terminate, wait for exit up to the grace period, escalate to kill.
    async fn stop_process(&self, proc: &Arc<ManagedProcess>) -> Result<(), ProcessError> {
        let pid = {
            let mut state = proc.state.lock();
            state.stopping = true;
            state.pid
        };
        let Some(pid) = pid else {
            return Ok(());
        };

        send_signal(pid, false)?;

        let deadline = tokio::time::Instant::now() + STOP_GRACE;
        loop {
            tokio::time::sleep(STOP_POLL).await;
            if proc.state.lock().pid.is_none() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(name = %proc.config.name, pid, "grace period elapsed, killing");
                send_signal(pid, true)?;
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl ProcessManager for DirectManager {
    async fn start(&self, config: &ProcessConfig) -> Result<(), ProcessError> {
        let proc = {
            let mut table = self.inner.table.lock();
            if let Some(existing) = table.get(&config.name) {
                if existing.state.lock().state == ProcessState::Running {
                    debug!(name = %config.name, "already running");
                    return Ok(());
                }
            }
            let mut log_file = config.log_file.clone();
            if config.capture_output && log_file.is_none() {
                log_file = Some(self.inner.log_dir.join(format!("{}.log", config.name)));
            }
            let mut max_restarts = config.max_restarts;
            if max_restarts == 0 && config.restart_policy != RestartPolicy::Never {
                max_restarts = self.inner.default_max_restarts;
            }
            let proc = Arc::new(ManagedProcess {
                config: ProcessConfig {
                    log_file,
                    max_restarts,
                    ..config.clone()
                },
                state: Mutex::new(ProcState {
                    state: ProcessState::Starting,
                    pid: None,
                    exit_code: None,
                    restart_count: 0,
                    stopping: false,
                }),
                output: Mutex::new(RingBuffer::default()),
                log_file: Mutex::new(None),
            });
            table.insert(config.name.clone(), Arc::clone(&proc));
            proc
        };
        self.spawn(proc).await
    }

    async fn stop(&self, name: &str) -> Result<(), ProcessError> {
        let proc = self.get(name)?;
        self.stop_process(&proc).await
    }

    async fn restart(&self, name: &str) -> Result<(), ProcessError> {
        let proc = self.get(name)?;
        self.stop_process(&proc).await?;
        // Wait for the monitor to observe the exit before respawning.
        for _ in 0..100 {
            if proc.state.lock().pid.is_none() {
                break;
            }
            tokio::time::sleep(STOP_POLL).await;
        }
        proc.state.lock().stopping = false;
        self.spawn(proc).await
    }

    async fn status(&self, name: &str) -> Result<ProcessStatus, ProcessError> {
        let proc = self.get(name)?;
        let state = proc.state.lock();
        Ok(ProcessStatus {
            name: name.to_string(),
            state: state.state,
            pid: state.pid,
            exit_code: state.exit_code,
            restart_count: state.restart_count,
        })
    }

    async fn output(&self, name: &str, lines: usize) -> Result<Vec<String>, ProcessError> {
        let proc = self.get(name)?;
        let buffer = proc.output.lock();
        Ok(buffer.get_lines(lines))
    }

    async fn kill(&self, name: &str) -> Result<(), ProcessError> {
        let proc = self.get(name)?;
        let pid = {
            let mut state = proc.state.lock();
            state.stopping = true;
            state.pid
        };
        if let Some(pid) = pid {
            send_signal(pid, true)?;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProcessStatus>, ProcessError> {
        let procs: Vec<Arc<ManagedProcess>> = self.inner.table.lock().values().cloned().collect();
        let mut out = Vec::with_capacity(procs.len());
        for proc in procs {
            let state = proc.state.lock();
            out.push(ProcessStatus {
                name: proc.config.name.clone(),
                state: state.state,
                pid: state.pid,
                exit_code: state.exit_code,
                restart_count: state.restart_count,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn close(&self) -> Result<(), ProcessError> {
        let procs: Vec<Arc<ManagedProcess>> = self.inner.table.lock().values().cloned().collect();
        for proc in procs {
            if let Err(e) = self.stop_process(&proc).await {
                warn!(name = %proc.config.name, error = %e, "stop during close failed");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

/// Read one stream line-by-line into the ring buffer and the log file.
async fn capture_stream(
    proc: Arc<ManagedProcess>,
    stream: impl tokio::io::AsyncRead + Unpin,
    label: &'static str,
) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let stamped = format!(
            "[{}] {}: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            label,
            line
        );
        proc.output.lock().push(stamped.clone());
        if let Some(file) = proc.log_file.lock().as_mut() {
            let _ = writeln!(file, "{stamped}");
        }
    }
}

/// Write `<pid>` as decimal ASCII, atomically (tmp + rename).
fn write_pid_file(path: &Path, pid: u32) -> Result<(), ProcessError> {
    let tmp = path.with_extension("pid.tmp");
    std::fs::write(&tmp, format!("{pid}\n"))?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(unix)]
fn send_signal(pid: u32, kill: bool) -> Result<(), ProcessError> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let sig = if kill { Signal::SIGKILL } else { Signal::SIGTERM };
    match signal::kill(Pid::from_raw(pid as i32), sig) {
        Ok(()) => Ok(()),
        // Already gone
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(ProcessError::OperationFailed(format!(
            "signal {sig} to {pid}: {e}"
        ))),
    }
}

#[cfg(not(unix))]
fn send_signal(_pid: u32, _kill: bool) -> Result<(), ProcessError> {
    Err(ProcessError::OperationFailed(
        "signals unsupported on this platform".to_string(),
    ))
}

#[cfg(test)]
#[path = "direct_tests.rs"]
mod tests;
