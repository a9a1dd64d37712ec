//! Subprocess supervision with a hard deadline.
//!
//! The child runs in its own process group. Once the timeout expires the
//! group gets `SIGABRT` (so a Go runtime dumps its goroutines), and if it is
//! still alive after the grace period, `SIGTERM`. A group that outlives a
//! second grace period gets `SIGKILL`, so no child holds a worker longer than
//! `timeout + 2 * grace`. Whatever the child wrote before that is returned
//! either way.
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{DriverError, Result};

const POLL: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug)]
pub struct Supervisor {
    pub timeout: Duration,
    pub grace: Duration,
}

#[derive(Debug)]
pub struct Outcome {
    /// Standard output followed by standard error.
    pub output: String,
    /// `None` when the child could not be waited for.
    pub status: Option<ExitStatus>,
    pub timed_out: bool,
}

impl Outcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.is_some_and(|s| s.success())
    }
}

impl Supervisor {
    pub fn new(timeout: Duration, grace: Duration) -> Self {
        Self { timeout, grace }
    }

    pub fn run(&self, mut cmd: Command) -> Result<Outcome> {
        let program = cmd.get_program().to_string_lossy().into_owned();
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).process_group(0);
        let mut child = cmd.spawn().map_err(|source| DriverError::Spawn { program: program.clone(), source })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let (status, timed_out) = self.wait(&mut child, &program);

        let mut output = join(stdout);
        output.push_str(&join(stderr));
        Ok(Outcome { output, status, timed_out })
    }

    fn wait(&self, child: &mut Child, program: &str) -> (Option<ExitStatus>, bool) {
        let start = Instant::now();
        let group = child.id() as libc::pid_t;
        let mut aborted = false;
        let mut terminated = false;
        let mut killed = false;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return (Some(status), aborted),
                Ok(None) => {}
                Err(err) => {
                    debug!(program, %err, "wait failed");
                    return (None, aborted);
                }
            }
            let elapsed = start.elapsed();
            if !aborted && elapsed >= self.timeout {
                debug!(program, "timeout, sending SIGABRT");
                signal_group(group, libc::SIGABRT);
                aborted = true;
            } else if aborted && !terminated && elapsed >= self.timeout + self.grace {
                debug!(program, "still alive, sending SIGTERM");
                signal_group(group, libc::SIGTERM);
                terminated = true;
            } else if terminated && !killed && elapsed >= self.timeout + self.grace * 2 {
                debug!(program, "ignored SIGTERM, sending SIGKILL");
                signal_group(group, libc::SIGKILL);
                killed = true;
            }
            thread::sleep(POLL);
        }
    }
}

fn signal_group(group: libc::pid_t, sig: libc::c_int) {
    // SAFETY: kill(2) with a negative pid only signals that process group.
    unsafe {
        libc::kill(-group, sig);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<String>> {
    let mut pipe = pipe?;
    Some(thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }))
}

fn join(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_both_streams() {
        let sup = Supervisor::new(Duration::from_secs(5), Duration::from_secs(1));
        let out = sup.run(sh("echo out; echo err >&2; exit 3")).unwrap();
        assert_eq!(out.output, "out\nerr\n");
        assert_eq!(out.status.and_then(|s| s.code()), Some(3));
        assert!(!out.success());
        assert!(!out.timed_out);
    }

    #[test]
    fn hung_children_are_aborted() {
        let sup = Supervisor::new(Duration::from_millis(200), Duration::from_millis(200));
        let start = Instant::now();
        let out = sup.run(sh("echo started; sleep 30")).unwrap();
        assert!(out.timed_out);
        assert!(out.output.starts_with("started"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn ignoring_abort_still_ends_in_terminate() {
        let sup = Supervisor::new(Duration::from_millis(200), Duration::from_millis(200));
        let start = Instant::now();
        let out = sup.run(sh("trap '' ABRT; sleep 30")).unwrap();
        assert!(out.timed_out);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn ignoring_terminate_ends_in_kill() {
        let sup = Supervisor::new(Duration::from_millis(200), Duration::from_millis(200));
        let start = Instant::now();
        let out = sup.run(sh("trap '' TERM ABRT; echo stubborn; sleep 1000")).unwrap();
        assert!(out.timed_out);
        assert!(out.output.starts_with("stubborn"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn missing_programs_are_spawn_errors() {
        let sup = Supervisor::new(Duration::from_secs(1), Duration::from_secs(1));
        let err = sup.run(Command::new("/nonexistent/tool")).unwrap_err();
        assert!(matches!(err, DriverError::Spawn { .. }));
    }
}
