//! Child processes with a deadline.

use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wait_timeout::ChildExt;

/// How a timed command ended.
#[derive(Debug)]
pub enum CommandOutcome {
    /// The command exited on its own.
    Finished(Output),
    /// The deadline passed and the child was killed.
    TimedOut,
}

/// Runs `cmd` with captured output, killing it after `timeout`.
///
/// Spawn failures (missing binary, permissions) are returned as `Err`.
/// Output is read while the child runs, so a chatty command cannot stall on
/// a full pipe.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<CommandOutcome> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    match child.wait_timeout(timeout) {
        Ok(Some(status)) => Ok(CommandOutcome::Finished(Output {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })),
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            Ok(CommandOutcome::TimedOut)
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(e)
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Returns the trimmed stderr of a finished command, or its exit status when stderr is empty.
pub fn failure_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_output() {
        let outcome =
            run_with_timeout(Command::new("sh").args(["-c", "echo hi"]), Duration::from_secs(5))
                .unwrap();
        match outcome {
            CommandOutcome::Finished(output) => {
                assert!(output.status.success());
                assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hi");
            }
            CommandOutcome::TimedOut => panic!("unexpected timeout"),
        }
    }

    #[test]
    fn kills_on_timeout() {
        let started = std::time::Instant::now();
        let outcome =
            run_with_timeout(Command::new("sleep").arg("5"), Duration::from_millis(200)).unwrap();
        assert!(matches!(outcome, CommandOutcome::TimedOut));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_binary_is_an_error() {
        let err = run_with_timeout(
            &mut Command::new("trackpaper-no-such-binary"),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn large_output_does_not_block() {
        let outcome = run_with_timeout(
            Command::new("sh").args(["-c", "head -c 300000 /dev/zero; head -c 100000 /dev/zero >&2"]),
            Duration::from_secs(5),
        )
        .unwrap();
        let CommandOutcome::Finished(output) = outcome else {
            panic!("timed out on a full pipe");
        };
        assert!(output.status.success());
        assert_eq!(output.stdout.len(), 300_000);
        assert_eq!(output.stderr.len(), 100_000);
    }

    #[test]
    fn failure_reason_prefers_stderr() {
        let outcome = run_with_timeout(
            Command::new("sh").args(["-c", "echo boom >&2; exit 3"]),
            Duration::from_secs(5),
        )
        .unwrap();
        let CommandOutcome::Finished(output) = outcome else {
            panic!("unexpected timeout");
        };
        assert_eq!(failure_reason(&output), "boom");
    }
}
