//! Entering and leaving environments.
//!
//! A child process cannot change its parent's working directory or exported
//! variables. The functions here therefore only *decide*: they take the
//! calling shell's session state as input and return a [`Recipe`] of
//! mutations. Turning the recipe into text and applying it is left to
//! [`crate::render`] and the shell shim.

use crate::env::Environment;
use std::path::{Path, PathBuf};

/// Name of the active environment, exported into the calling shell.
pub const MARKER_VAR: &str = "VIRTUAL_ENV_NAME";
/// Directory the shell was in before the first activation.
pub const PREV_DIR_VAR: &str = "VIRTUAL_ENV_PREV_DIR";
/// Function defined by an environment's own activation script.
const RUNTIME_DEACTIVATE: &str = "deactivate";

/// One change to the calling shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetVar { name: String, value: String },
    UnsetVar { name: String },
    ChangeDirectory { path: PathBuf },
    Source { path: PathBuf },
    CallIfDefined { function: String },
}

/// Ordered list of mutations. An empty recipe means "change nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipe {
    mutations: Vec<Mutation>,
}

impl Recipe {
    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mutation> {
        self.mutations.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl From<Vec<Mutation>> for Recipe {
    fn from(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }
}

/// Activation state of one shell session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Inactive,
    Active(String),
}

/// What the controller needs to know about the calling shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub activation: Activation,
    pub prev_dir: Option<PathBuf>,
    pub current_dir: PathBuf,
}

impl Session {
    /// Read the session markers from the shell snapshot.
    ///
    /// The shell's logical `PWD` is preferred over the process working
    /// directory so that symlinked paths are restored as the user typed them.
    pub fn from_env(env: &Environment) -> Self {
        let activation = match env.get_var(MARKER_VAR) {
            Some(name) => Activation::Active(name.to_owned()),
            None => Activation::Inactive,
        };
        let current_dir = env
            .get_var("PWD")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .unwrap_or_else(|| env.current_dir.clone());
        Self {
            activation,
            prev_dir: env.get_var(PREV_DIR_VAR).map(PathBuf::from),
            current_dir,
        }
    }
}

/// An existing environment to enter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub path: PathBuf,
    /// The environment's own activation script, when it has one.
    pub script: Option<PathBuf>,
}

/// Recipe for entering `target`.
///
/// Activating while another environment is active switches directly; the
/// previous environment is left first and the originally recorded directory
/// is kept, so activations never nest.
pub fn activate(session: &Session, target: &Target) -> Recipe {
    let mut recipe = Recipe::default();
    if let Activation::Active(current) = &session.activation {
        tracing::debug!(from = %current, to = %target.name, "switching environments");
        recipe.push(Mutation::CallIfDefined {
            function: RUNTIME_DEACTIVATE.to_owned(),
        });
    }
    if session.prev_dir.is_none() {
        recipe.push(set(PREV_DIR_VAR, &session.current_dir.to_string_lossy()));
    }
    recipe.push(set(MARKER_VAR, &target.name));
    recipe.push(Mutation::ChangeDirectory {
        path: target.path.clone(),
    });
    if let Some(script) = &target.script {
        recipe.push(Mutation::Source {
            path: script.clone(),
        });
    }
    recipe
}

/// Recipe for leaving the active environment. Empty when nothing is active.
///
/// The shell returns to the directory recorded at activation, or to
/// `fallback_dir` when none was recorded.
pub fn deactivate(session: &Session, fallback_dir: Option<&Path>) -> Recipe {
    if session.activation == Activation::Inactive {
        return Recipe::default();
    }
    let mut recipe = Recipe::default();
    recipe.push(Mutation::CallIfDefined {
        function: RUNTIME_DEACTIVATE.to_owned(),
    });
    if let Some(dir) = session.prev_dir.as_deref().or(fallback_dir) {
        recipe.push(Mutation::ChangeDirectory {
            path: dir.to_path_buf(),
        });
    }
    recipe.push(unset(MARKER_VAR));
    recipe.push(unset(PREV_DIR_VAR));
    recipe
}

fn set(name: &str, value: &str) -> Mutation {
    Mutation::SetVar {
        name: name.to_owned(),
        value: value.to_owned(),
    }
}

fn unset(name: &str) -> Mutation {
    Mutation::UnsetVar {
        name: name.to_owned(),
    }
}
