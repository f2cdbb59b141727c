//! Shell execution with a timeout

use super::{CommandOutput, ToolError};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

/// Run `command` through the platform shell in `cwd`
///
/// The whole process group is killed once `timeout` elapses, and output still
/// held open by a stray grandchild past the deadline also counts as a timeout.
pub fn run_command(cwd: &Path, command: &str, timeout: Duration) -> Result<CommandOutput, ToolError> {
    let mut cmd = shell_command(command);
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let spawn_error = |err: std::io::Error| ToolError::Spawn {
        command: command.to_string(),
        message: err.to_string(),
    };
    let timed_out = || {
        tracing::warn!(command, seconds = timeout.as_secs(), "command timed out");
        ToolError::Timeout {
            command: command.to_string(),
            seconds: timeout.as_secs(),
        }
    };

    let deadline = Instant::now() + timeout;
    let mut child = cmd.spawn().map_err(spawn_error)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| spawn_error(std::io::Error::other("missing stdout pipe")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| spawn_error(std::io::Error::other("missing stderr pipe")))?;

    let stdout_rx = spawn_reader(stdout);
    let stderr_rx = spawn_reader(stderr);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    kill_tree(&mut child);
                    return Err(timed_out());
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(err) => {
                kill_tree(&mut child);
                return Err(spawn_error(err));
            }
        }
    };

    // Readers finish when every holder of the pipes has exited.
    let (Some(stdout), Some(stderr)) = (drain(&stdout_rx, deadline), drain(&stderr_rx, deadline))
    else {
        kill_tree(&mut child);
        return Err(timed_out());
    };

    let output = CommandOutput {
        stdout,
        stderr,
        exit_code: status.code(),
    };
    tracing::debug!(command, exit_code = ?output.exit_code, "command finished");
    Ok(output)
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = source.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn drain(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
        .ok()
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // The shell leads its own group, so its id is the group id.
    if let Err(err) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
        tracing::debug!(error = %err, "killpg failed");
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    use std::os::unix::process::CommandExt;

    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]).process_group(0);
    cmd
}
