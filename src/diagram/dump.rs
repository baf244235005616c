use std::{fmt, io, process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
};

use crate::config::DumpConfig;

use super::engine::Engine;

const MAX_STDERR_BYTES: usize = 16 * 1024;
const READ_CHUNK_BYTES: usize = 8 * 1024;
const STDERR_GRACE: Duration = Duration::from_secs(2);
pub const REDACTED: &str = "***";

#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub engine: Engine,
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub database_name: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// Fully expanded dump invocation. The password only travels in `env`.
#[derive(Clone)]
pub struct DumpCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub(crate) password: String,
}

impl DumpCommand {
    pub fn redact(&self, text: &str) -> String {
        redact(text, &self.password)
    }
}

impl fmt::Debug for DumpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(key, _)| key.as_str()).collect();
        f.debug_struct("DumpCommand")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env_keys)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DumpError {
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("{program} did not finish within {timeout:?} and was terminated")]
    TimedOut { program: String, timeout: Duration },
    #[error("{program} produced more than {limit} bytes of output")]
    OutputTooLarge { program: String, limit: usize },
    #[error("{program} exited with {status}: {stderr}")]
    Exited {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("{program} produced output that is not valid UTF-8")]
    InvalidUtf8 { program: String },
    #[error("i/o error while running {program}: {reason}")]
    Io { program: String, reason: String },
}

/// Capability that turns a dump command into the dumped schema text.
#[async_trait]
pub trait DumpRunner: Send + Sync {
    async fn run(&self, command: &DumpCommand) -> Result<String, DumpError>;
}

/// Runs the dump tool as a child process with a wall-clock limit and an
/// output ceiling.
#[derive(Debug, Clone)]
pub struct ProcessDumpRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

impl ProcessDumpRunner {
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
        }
    }

    pub fn from_config(cfg: &DumpConfig) -> Self {
        Self::new(Duration::from_secs(cfg.timeout_secs), cfg.max_output_bytes)
    }
}

enum Outcome {
    Exited {
        status: std::process::ExitStatus,
        stdout: Vec<u8>,
    },
    Overflow,
}

#[async_trait]
impl DumpRunner for ProcessDumpRunner {
    async fn run(&self, command: &DumpCommand) -> Result<String, DumpError> {
        let program = command.program.clone();
        let io_error = |err: io::Error| DumpError::Io {
            program: program.clone(),
            reason: command.redact(&err.to_string()),
        };

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| DumpError::Spawn {
                program: program.clone(),
                reason: spawn_reason(&err),
            })?;
        tracing::debug!(program = %program, pid = ?child.id(), "dump process spawned");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io_error(io::Error::other("stdout was not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io_error(io::Error::other("stderr was not captured")))?;

        let stderr_task = tokio::spawn(read_capped(stderr, MAX_STDERR_BYTES, true));
        let limit = self.max_output_bytes;
        let run = async {
            let stdout = read_capped(stdout, limit, false).await?;
            if stdout.overflowed {
                return Ok(Outcome::Overflow);
            }
            let status = child.wait().await?;
            Ok::<_, io::Error>(Outcome::Exited {
                status,
                stdout: stdout.bytes,
            })
        };

        let outcome = tokio::time::timeout(self.timeout, run).await;
        let (status, stdout) = match outcome {
            Ok(Ok(Outcome::Exited { status, stdout })) => (status, stdout),
            Ok(Ok(Outcome::Overflow)) => {
                terminate(&mut child, &program).await;
                stderr_task.abort();
                return Err(DumpError::OutputTooLarge { program, limit });
            }
            Ok(Err(err)) => {
                terminate(&mut child, &program).await;
                stderr_task.abort();
                return Err(io_error(err));
            }
            Err(_) => {
                terminate(&mut child, &program).await;
                stderr_task.abort();
                return Err(DumpError::TimedOut {
                    program,
                    timeout: self.timeout,
                });
            }
        };

        let stderr = match tokio::time::timeout(STDERR_GRACE, stderr_task).await {
            Ok(Ok(Ok(captured))) => String::from_utf8_lossy(&captured.bytes).trim().to_string(),
            _ => String::new(),
        };

        if !status.success() {
            let status = match status.code() {
                Some(code) => format!("status {code}"),
                None => "a signal".to_string(),
            };
            let stderr = if stderr.is_empty() {
                "no diagnostic output".to_string()
            } else {
                command.redact(&stderr)
            };
            return Err(DumpError::Exited {
                program,
                status,
                stderr,
            });
        }

        if !stderr.is_empty() {
            tracing::debug!(program = %program, stderr = %command.redact(&stderr), "dump stderr");
        }

        String::from_utf8(stdout).map_err(|_| DumpError::InvalidUtf8 { program })
    }
}

struct Captured {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Reads up to `limit` bytes. With `drain` the remainder is read and
/// discarded so the writer never blocks on a full pipe.
async fn read_capped<R>(mut reader: R, limit: usize, drain: bool) -> io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    let mut overflowed = false;
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        let room = limit.saturating_sub(bytes.len());
        if read > room {
            bytes.extend_from_slice(&chunk[..room]);
            overflowed = true;
            if !drain {
                break;
            }
        } else {
            bytes.extend_from_slice(&chunk[..read]);
        }
    }
    Ok(Captured { bytes, overflowed })
}

async fn terminate(child: &mut Child, program: &str) {
    if let Err(err) = child.kill().await {
        tracing::warn!(program = %program, error = %err, "failed to kill dump process");
    }
}

fn spawn_reason(err: &io::Error) -> String {
    if err.kind() == io::ErrorKind::NotFound {
        "executable not found; is the client tool installed and on PATH?".to_string()
    } else {
        err.to_string()
    }
}

/// Replaces every occurrence of a non-empty password with `***`.
pub fn redact(text: &str, password: &str) -> String {
    if password.is_empty() {
        return text.to_string();
    }
    text.replace(password, REDACTED)
}
