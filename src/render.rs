use crate::activation::{Mutation, Recipe};
use crate::env::Environment;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Variable the shim sets to ask for evaluable output.
pub const SHELL_VAR: &str = "VENVER_SHELL";

/// Shell dialect used for emitted statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Posix,
    Fish,
}

impl Shell {
    /// The activation script an environment created by `venv` ships for this
    /// dialect.
    pub fn activation_script(self, env_path: &Path) -> PathBuf {
        match self {
            Shell::Posix => env_path.join("bin").join("activate"),
            Shell::Fish => env_path.join("bin").join("activate.fish"),
        }
    }

    pub fn quote(self, value: &str) -> String {
        match self {
            Shell::Posix => format!("'{}'", value.replace('\'', r"'\''")),
            Shell::Fish => format!("'{}'", value.replace('\\', r"\\").replace('\'', r"\'")),
        }
    }

    pub fn statement(self, mutation: &Mutation) -> String {
        match (self, mutation) {
            (Shell::Posix, Mutation::SetVar { name, value }) => {
                format!("export {name}={}", self.quote(value))
            }
            (Shell::Posix, Mutation::UnsetVar { name }) => format!("unset {name}"),
            (Shell::Posix, Mutation::ChangeDirectory { path }) => {
                format!("cd -- {}", self.quote(&path.to_string_lossy()))
            }
            (Shell::Posix, Mutation::Source { path }) => {
                format!(". {}", self.quote(&path.to_string_lossy()))
            }
            (Shell::Posix, Mutation::CallIfDefined { function }) => {
                format!("if command -v {function} >/dev/null 2>&1; then {function}; fi")
            }
            (Shell::Fish, Mutation::SetVar { name, value }) => {
                format!("set -gx {name} {}", self.quote(value))
            }
            (Shell::Fish, Mutation::UnsetVar { name }) => format!("set -e {name}"),
            (Shell::Fish, Mutation::ChangeDirectory { path }) => {
                format!("cd {}", self.quote(&path.to_string_lossy()))
            }
            (Shell::Fish, Mutation::Source { path }) => {
                format!("source {}", self.quote(&path.to_string_lossy()))
            }
            (Shell::Fish, Mutation::CallIfDefined { function }) => {
                format!("functions -q {function}; and {function}")
            }
        }
    }
}

/// How output reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Messages verbatim, recipes as POSIX statements. Used when the binary is
    /// run directly, e.g. `eval "$(venver activate web)"`. Commands that emit
    /// a recipe print no message next to it.
    Plain,
    /// Everything is a statement for `shell` to evaluate, messages included.
    Eval(Shell),
}

impl OutputMode {
    pub fn from_env(env: &Environment) -> Self {
        match env.get_var(SHELL_VAR) {
            None => OutputMode::Plain,
            Some("fish") => OutputMode::Eval(Shell::Fish),
            Some("sh" | "bash" | "zsh" | "ksh" | "dash" | "posix") => {
                OutputMode::Eval(Shell::Posix)
            }
            Some(other) => {
                tracing::warn!(shell = other, "unknown {SHELL_VAR}, using POSIX syntax");
                OutputMode::Eval(Shell::Posix)
            }
        }
    }

    pub fn shell(self) -> Shell {
        match self {
            OutputMode::Plain => Shell::Posix,
            OutputMode::Eval(shell) => shell,
        }
    }
}

/// Standard output of one invocation, rendered for an [`OutputMode`].
pub struct Output<'a> {
    mode: OutputMode,
    out: &'a mut dyn Write,
}

impl<'a> Output<'a> {
    pub fn new(mode: OutputMode, out: &'a mut dyn Write) -> Self {
        Self { mode, out }
    }

    pub fn shell(&self) -> Shell {
        self.mode.shell()
    }

    /// Whether messages are wrapped in statements too.
    pub fn is_eval(&self) -> bool {
        matches!(self.mode, OutputMode::Eval(_))
    }

    /// Write human-readable text, one output line per input line.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        let lines: Vec<&str> = if text.is_empty() {
            vec![""]
        } else {
            text.lines().collect()
        };
        for line in lines {
            match self.mode {
                OutputMode::Plain => writeln!(self.out, "{line}")?,
                OutputMode::Eval(shell) => {
                    writeln!(self.out, "printf '%s\\n' {}", shell.quote(line))?
                }
            }
        }
        Ok(())
    }

    pub fn recipe(&mut self, recipe: &Recipe) -> io::Result<()> {
        let shell = self.shell();
        for mutation in recipe.iter() {
            writeln!(self.out, "{}", shell.statement(mutation))?;
        }
        Ok(())
    }
}
