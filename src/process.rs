// ABOUTME: Cancellable subprocess runner shared by the runtime, kind, helm and kubectl adapters.
// ABOUTME: Children are killed when the cancellation token fires or the future is dropped.

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Errors from launching or waiting on a subprocess.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("{program} not found on PATH")]
    NotFound { program: String },

    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} was cancelled")]
    Cancelled { program: String },
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Best human-readable failure text: stderr, else stdout, else the exit code.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout_lossy();
        if !stdout.trim().is_empty() {
            return stdout.trim().to_string();
        }
        match self.exit_code {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Builder for a single subprocess invocation.
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    stdin: Option<Vec<u8>>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Run to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is not an error here; callers inspect [`ProcessOutput::success`].
    pub async fn run(self, cancel: &CancellationToken) -> Result<ProcessOutput, ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled {
                program: self.program,
            });
        }

        tracing::debug!("running {} {}", self.program, self.args.join(" "));

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::NotFound {
                    program: self.program.clone(),
                }
            } else {
                ProcessError::Io {
                    program: self.program.clone(),
                    source: e,
                }
            }
        })?;

        if let (Some(input), Some(mut pipe)) = (self.stdin, child.stdin.take()) {
            tokio::spawn(async move {
                if let Err(e) = pipe.write_all(&input).await {
                    tracing::debug!("failed to write subprocess stdin: {}", e);
                }
            });
        }

        let output = tokio::select! {
            result = child.wait_with_output() => result.map_err(|e| ProcessError::Io {
                program: self.program.clone(),
                source: e,
            })?,
            _ = cancel.cancelled() => {
                return Err(ProcessError::Cancelled { program: self.program.clone() });
            }
        };

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let output = ProcessCommand::new("sh")
            .args(["-c", "echo hello; exit 3"])
            .run(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout_lossy().trim(), "hello");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn feeds_stdin() {
        let output = ProcessCommand::new("cat")
            .stdin("piped input")
            .run(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.stdout_lossy(), "piped input");
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let err = ProcessCommand::new("kindle-definitely-missing-binary")
            .run(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::NotFound { .. }));
    }

    #[tokio::test]
    async fn cancellation_aborts_running_child() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = ProcessCommand::new("sleep")
            .arg("30")
            .run(&cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn failure_message_prefers_stderr() {
        let output = ProcessOutput {
            exit_code: Some(1),
            stdout: b"out".to_vec(),
            stderr: "Error: boom\n".to_string(),
        };
        assert_eq!(output.failure_message(), "Error: boom");
    }
}
