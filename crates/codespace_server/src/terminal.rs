//! Allow-listed command runner backing the `terminal-command` event.
//!
//! Output is streamed back to the requesting connection only: stdout chunks
//! verbatim, stderr chunks prefixed with `ERROR: `, then an exit line.

use codespace_core::{CodespaceError, Result};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::TerminalConfig;

const READ_CHUNK: usize = 4096;

/// Launches allow-listed programs with a per-command timeout
#[derive(Debug, Clone)]
pub struct CommandRunner {
    allowed: Vec<String>,
    timeout: Duration,
}

/// A command that passed the allow-list check and is ready to run
#[derive(Debug, Clone)]
pub struct PreparedCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(config: &TerminalConfig) -> Self {
        Self {
            allowed: config.allowed_commands.clone(),
            timeout: config.timeout,
        }
    }

    pub fn is_allowed(&self, program: &str) -> bool {
        self.allowed.iter().any(|allowed| allowed == program)
    }

    /// Split a command line on whitespace and check its program against the allow-list.
    ///
    /// Nothing is executed here; a rejected command never reaches `spawn`.
    pub fn prepare(&self, command: &str) -> Result<PreparedCommand> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| CodespaceError::missing("command"))?;

        if !self.is_allowed(&program) {
            return Err(CodespaceError::DisallowedCommand(program));
        }

        Ok(PreparedCommand {
            program,
            args: parts.collect(),
            timeout: self.timeout,
        })
    }
}

impl PreparedCommand {
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run to completion, passing every output line to `emit`.
    pub async fn run<F>(self, emit: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let emit = Arc::new(emit);

        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start '{}': {}", self.program, e);
                emit(format!("Error: {}", e));
                return;
            }
        };
        info!("Started terminal command: {} {:?}", self.program, self.args);

        let readers: Vec<_> = [
            child
                .stdout
                .take()
                .map(|out| tokio::spawn(forward(out, "", Arc::clone(&emit)))),
            child
                .stderr
                .take()
                .map(|err| tokio::spawn(forward(err, "ERROR: ", Arc::clone(&emit)))),
        ]
        .into_iter()
        .flatten()
        .collect();

        // Output is drained only once the process is known to have ended
        let (exited, exit_code) = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => (true, status.code()),
            Ok(Err(e)) => {
                warn!("Failed to wait for '{}': {}", self.program, e);
                (false, None)
            }
            Err(_) => {
                warn!(
                    "Terminal command '{}' exceeded {:?}, killing",
                    self.program, self.timeout
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill '{}': {}", self.program, e);
                }
                (false, None)
            }
        };

        for reader in readers {
            if exited {
                let _ = reader.await;
            } else {
                reader.abort();
            }
        }

        debug!("Terminal command '{}' finished: {:?}", self.program, exit_code);
        emit(match exit_code {
            Some(code) => format!("Process exited with code {}", code),
            None => "Process terminated".to_string(),
        });
    }
}

async fn forward<R, F>(mut reader: R, prefix: &'static str, emit: Arc<F>)
where
    R: AsyncRead + Unpin,
    F: Fn(String) + Send + Sync + 'static,
{
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => emit(format!("{}{}", prefix, String::from_utf8_lossy(&buf[..n]))),
            Err(e) => {
                debug!("Terminal output stream closed: {}", e);
                break;
            }
        }
    }
}
