//! Spawns the platform traceroute executable with a hard time budget.

use std::env;
use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use hopmap_core::constants::SUDO_PASSWORD_ENV;
use hopmap_core::parse::ProbeFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read probe output: {0}")]
    Output(io::Error),
}

/// Password for privilege elevation, owned by one run and wiped on drop.
pub struct ProbeCredential {
    secret: String,
}

impl ProbeCredential {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Takes the password out of the environment; the variable is removed
    /// so child processes never inherit it.
    pub fn from_env() -> Option<Self> {
        let secret = env::var(SUDO_PASSWORD_ENV).ok();
        env::remove_var(SUDO_PASSWORD_ENV);
        secret.filter(|s| !s.is_empty()).map(Self::new)
    }
}

impl fmt::Debug for ProbeCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProbeCredential(<redacted>)")
    }
}

impl Drop for ProbeCredential {
    fn drop(&mut self) {
        let len = self.secret.len();
        self.secret.replace_range(.., &"\0".repeat(len));
        self.secret.clear();
    }
}

/// Program and arguments used to probe `target`.
pub fn probe_command(target: &str, format: ProbeFormat, elevate: bool) -> (String, Vec<String>) {
    let (program, mut args) = match format {
        ProbeFormat::Unix => ("traceroute", vec!["-I".to_string(), target.to_string()]),
        ProbeFormat::Windows => ("tracert", vec!["-d".to_string(), target.to_string()]),
    };
    if elevate && format == ProbeFormat::Unix {
        let mut sudo = vec!["-S".to_string(), "-p".to_string(), String::new(), program.to_string()];
        sudo.append(&mut args);
        return ("sudo".to_string(), sudo);
    }
    (program.to_string(), args)
}

#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

/// Runs one probe and returns its stdout. The child is killed once `timeout`
/// elapses; a non-zero exit status still yields whatever was printed.
pub fn run_probe(
    target: &str,
    format: ProbeFormat,
    timeout: Duration,
    credential: Option<&ProbeCredential>,
) -> Result<String, ProbeError> {
    let credential = credential.filter(|_| format == ProbeFormat::Unix && !is_root());
    let (program, args) = probe_command(target, format, credential.is_some());

    let mut command = Command::new(&program);
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut command, 0);
    let mut child = command
        .args(&args)
        .stdin(if credential.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ProbeError::Spawn {
            program: program.clone(),
            source,
        })?;

    if let (Some(cred), Some(mut stdin)) = (credential, child.stdin.take()) {
        if let Err(err) = writeln!(stdin, "{}", cred.secret) {
            log::warn!("failed to pass credential to {program}: {err}");
        }
    }

    let Some(mut stdout) = child.stdout.take() else {
        reap(&mut child);
        return Err(ProbeError::Output(io::Error::other("stdout not captured")));
    };
    let (tx, rx) = mpsc::channel();
    let reader = thread::spawn(move || {
        let mut buf = String::new();
        let res = stdout.read_to_string(&mut buf).map(|_| buf);
        let _ = tx.send(res);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) => {
            match child.wait() {
                Ok(status) if !status.success() => log::debug!("{program} for {target} exited with {status}"),
                Ok(_) => {}
                Err(err) => log::debug!("failed to reap {program}: {err}"),
            }
            let _ = reader.join();
            Ok(output)
        }
        Ok(Err(err)) => {
            reap(&mut child);
            Err(ProbeError::Output(err))
        }
        Err(_) => {
            reap(&mut child);
            if !reader.is_finished() {
                log::warn!("{program} for {target} left its output open after being killed; abandoning reader");
            }
            Err(ProbeError::Timeout(timeout))
        }
    }
}

// The child leads its own process group, so the signal also reaches the
// traceroute that sudo started.
fn reap(child: &mut Child) {
    #[cfg(unix)]
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only sends a signal; a stale group id yields ESRCH.
        unsafe {
            libc::killpg(pgid, libc::SIGTERM);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
