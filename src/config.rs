use crate::env::Environment;
use crate::error::VenvError;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HOME_VAR: &str = "VIRTUAL_ENV_HOME";
pub const HOME_CREATE_VAR: &str = "VIRTUAL_ENV_HOME_CREATE";
pub const CREATE_COMMAND_VAR: &str = "VIRTUAL_ENV_CREATE";
pub const CREATE_TIMEOUT_VAR: &str = "VIRTUAL_ENV_CREATE_TIMEOUT";
pub const DEACTIVATE_DIR_VAR: &str = "VIRTUAL_ENV_DEACTIVATE_DIR";

const DEFAULT_CREATE_COMMAND: &str = "python3 -m venv";
const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings resolved from the calling shell's variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding every managed environment.
    pub root: PathBuf,
    /// Create `root` when it is missing instead of failing.
    pub create_root: bool,
    /// Program and leading arguments of the creation command. The environment
    /// path is appended as the last argument. Empty when the setting is blank;
    /// only `create` reports that.
    pub create_command: Vec<String>,
    pub create_timeout: Duration,
    /// Where `deactivate` goes when no previous directory was recorded.
    pub deactivate_dir: Option<PathBuf>,
}

impl Config {
    /// Resolve configuration. Fails with [`VenvError::RootUnavailable`] when
    /// `VIRTUAL_ENV_HOME` is unset.
    pub fn from_env(env: &Environment) -> Result<Self, VenvError> {
        let raw_root = env.get_var(HOME_VAR).ok_or_else(|| {
            VenvError::RootUnavailable(format!("{HOME_VAR} is not set"))
        })?;
        let root = resolve_path(raw_root, env);

        let create_command: Vec<String> = env
            .get_var(CREATE_COMMAND_VAR)
            .unwrap_or(DEFAULT_CREATE_COMMAND)
            .split_whitespace()
            .map(str::to_owned)
            .collect();

        let create_timeout = match env.get_var(CREATE_TIMEOUT_VAR) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = raw, "ignoring invalid {CREATE_TIMEOUT_VAR}");
                    DEFAULT_CREATE_TIMEOUT
                }
            },
            None => DEFAULT_CREATE_TIMEOUT,
        };

        Ok(Self {
            root,
            create_root: env.get_var(HOME_CREATE_VAR).is_some_and(is_truthy),
            create_command,
            create_timeout,
            deactivate_dir: env.get_var(DEACTIVATE_DIR_VAR).map(|d| resolve_path(d, env)),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Expand a leading `~/` against `HOME` and anchor relative paths at the
/// shell's working directory.
fn resolve_path(raw: &str, env: &Environment) -> PathBuf {
    let expanded = match (raw.strip_prefix("~/"), env.get_var("HOME")) {
        (Some(rest), Some(home)) => Path::new(home).join(rest),
        _ if raw == "~" => env.get_var("HOME").map_or_else(|| PathBuf::from(raw), PathBuf::from),
        _ => PathBuf::from(raw),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        env.current_dir.join(expanded)
    }
}
