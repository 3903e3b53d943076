use crate::config::Config;
use crate::env::Environment;
use anyhow::{Context, Result, anyhow, bail};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// The external program that populates a freshly created environment
/// directory (by default `python3 -m venv <path>`).
#[derive(Debug)]
pub struct CreationCommand {
    program: PathBuf,
    args: Vec<OsString>,
    vars: Vec<(String, String)>,
    current_dir: PathBuf,
}

impl CreationCommand {
    /// Locate the configured program using the shell's `PATH`.
    pub fn resolve(config: &Config, env: &Environment) -> Result<Self> {
        let (name, args) = config
            .create_command
            .split_first()
            .ok_or_else(|| anyhow!("no creation command configured"))?;
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let program = find_command_path(OsStr::new(search_paths), &env.current_dir, Path::new(name))
            .ok_or_else(|| anyhow!("command not found: {name}"))?
            .into_owned();
        Ok(Self {
            program,
            args: args.iter().map(OsString::from).collect(),
            vars: env.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            current_dir: env.current_dir.clone(),
        })
    }

    /// Run the program against `target`, killing it once `timeout` elapses.
    ///
    /// The program's stdout is discarded: ours is reserved for statements the
    /// calling shell evaluates. Its stderr is captured and the last line is
    /// reported on failure.
    pub fn run(&self, target: &Path, timeout: Duration) -> Result<()> {
        tracing::debug!(
            program = %self.program.display(),
            target = %target.display(),
            "running creation command"
        );
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .envs(self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.current_dir)
            .spawn()
            .with_context(|| format!("cannot run {}", self.program.display()))?;

        let stderr = child.stderr.take();
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr {
                if let Err(e) = pipe.read_to_end(&mut buf) {
                    tracing::debug!(error = %e, "cannot read creation command stderr");
                }
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait().context("cannot wait for creation command")? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    bail!("timed out after {}s", timeout.as_secs_f32());
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let stderr = reader.join().unwrap_or_default();
        if status.success() {
            return Ok(());
        }
        let code = status.code().unwrap_or_else(|| terminated_by_signal(status));
        match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => bail!("exit status {code}: {}", line.trim()),
            None => bail!("exit status {code}"),
        }
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - `./foo` or a relative path with several components (e.g. `bin/python`):
///   resolved against `base` and returned if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    base: &Path,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        // Empty path -> not found
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => {
            let joined = base.join(path);
            find_by_path(&joined).map(|p| Cow::Owned(p.to_path_buf()))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| path.is_file())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
