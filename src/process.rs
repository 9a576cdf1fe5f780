//! External process handles
//!
//! A [`ProcessHandle`] owns one launched child program with its output
//! captured. The child never outlives the handle: dropping it kills the
//! process if it is still running, and cleanup never raises. Blocking
//! waits are bounded by an explicit timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::time::Instant;

use crate::common::{Error, Result};

/// Interval between exit polls inside a settle window
const SETTLE_POLL: Duration = Duration::from_millis(10);

/// Handle to one external process with captured output
#[derive(Debug)]
pub struct ProcessHandle {
    program: PathBuf,
    args: Vec<String>,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    captured: Option<(Vec<u8>, Vec<u8>)>,
    exit: Option<i32>,
}

impl ProcessHandle {
    /// Launch `program` with `args`, stdin closed and both output streams
    /// piped rather than inherited
    pub fn start(program: impl AsRef<Path>, args: &[String]) -> Result<Self> {
        let program = program.as_ref().to_path_buf();
        let mut child = Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::launch(program.display().to_string(), source))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        Ok(Self {
            program,
            args: args.to_vec(),
            child,
            stdout,
            stderr,
            captured: None,
            exit: None,
        })
    }

    /// The launched program path
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The argument list the program was launched with
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// OS process id, while the process has not been reaped
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Exit code, if the process has been observed to terminate
    pub fn exit_code(&self) -> Option<i32> {
        self.exit
    }

    /// Non-blocking exit check: the exit code if the process has already
    /// terminated, `None` while it is still running
    pub fn poll(&mut self) -> Result<Option<i32>> {
        if self.exit.is_some() {
            return Ok(self.exit);
        }
        let status = self.child.try_wait()?;
        if let Some(status) = status {
            self.exit = Some(exit_code(status));
        }
        Ok(self.exit)
    }

    /// Wait for termination and return the fully captured output
    ///
    /// Both streams are drained concurrently while waiting, so the child
    /// cannot block on a full pipe. The capture is cached; repeated calls
    /// return the same data.
    pub async fn communicate(&mut self, timeout: Duration) -> Result<(Vec<u8>, Vec<u8>)> {
        if let Some((out, err)) = &self.captured {
            return Ok((out.clone(), err.clone()));
        }

        let mut stdout = self.stdout.take();
        let mut stderr = self.stderr.take();
        let child = &mut self.child;

        let drain = async {
            let (out, err) = tokio::join!(read_all(stdout.as_mut()), read_all(stderr.as_mut()));
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((out?, err?, status))
        };

        match tokio::time::timeout(timeout, drain).await {
            Ok(result) => {
                let (out, err, status) = result?;
                self.exit = Some(exit_code(status));
                self.captured = Some((out.clone(), err.clone()));
                Ok((out, err))
            }
            Err(_) => Err(Error::Timeout(timeout.as_secs())),
        }
    }

    /// Block until the process terminates and return its exit code
    pub async fn wait(&mut self, timeout: Duration) -> Result<i32> {
        if let Some(code) = self.exit {
            return Ok(code);
        }
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => {
                let code = exit_code(status?);
                self.exit = Some(code);
                Ok(code)
            }
            Err(_) => Err(Error::Timeout(timeout.as_secs())),
        }
    }

    /// Request graceful termination. No-op once the process has exited.
    pub fn terminate(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.start_kill();
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Poll `handle` across `window`, returning the exit code if the process
/// terminates before the window closes
pub async fn settle(handle: &mut ProcessHandle, window: Duration) -> Result<Option<i32>> {
    let deadline = Instant::now() + window;
    loop {
        if let Some(code) = handle.poll()? {
            return Ok(Some(code));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(SETTLE_POLL).await;
    }
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<&mut R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Map an exit status to a single code: signal death becomes `128 + signo`
fn exit_code(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    status.code().unwrap_or(-1)
}
