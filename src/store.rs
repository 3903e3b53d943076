use crate::config::Config;
use crate::error::VenvError;
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_+][A-Za-z0-9_.+-]*$").unwrap());

/// Reject names that could escape the root or confuse the shell.
pub fn validate_name(name: &str) -> Result<(), VenvError> {
    if !NAME_PATTERN.is_match(name) {
        return Err(VenvError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// Owns the on-disk layout `<root>/<name>/...`.
///
/// The store only ever looks at the first level below the root. What lives
/// inside an environment directory belongs to the creation command.
#[derive(Debug, Clone)]
pub struct EnvironmentStore {
    root: PathBuf,
    create_root: bool,
}

impl EnvironmentStore {
    pub fn new(root: impl Into<PathBuf>, create_root: bool) -> Self {
        Self {
            root: root.into(),
            create_root,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.root, config.create_root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.path(name).is_dir()
    }

    /// Create `<root>/<name>` and hand it to `populate`.
    ///
    /// The directory is created with a single `mkdir`, so of two racing
    /// creates exactly one wins. If `populate` fails the directory is removed
    /// again and [`VenvError::CreationFailed`] is returned.
    pub fn create<F>(&self, name: &str, populate: F) -> Result<PathBuf, VenvError>
    where
        F: FnOnce(&Path) -> anyhow::Result<()>,
    {
        validate_name(name)?;
        self.ensure_root()?;

        let path = self.path(name);
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(VenvError::AlreadyExists(name.to_owned()));
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(VenvError::RootUnavailable(format!(
                    "{} is not writable",
                    self.root.display()
                )));
            }
            Err(e) => return Err(VenvError::io("cannot create", path, e)),
        }
        tracing::debug!(path = %path.display(), "created environment directory");

        if let Err(e) = populate(&path) {
            if let Err(cleanup) = fs::remove_dir_all(&path) {
                tracing::warn!(
                    path = %path.display(),
                    error = %cleanup,
                    "cannot clean up after failed create"
                );
            }
            return Err(VenvError::CreationFailed {
                name: name.to_owned(),
                reason: format!("{e:#}"),
            });
        }
        Ok(path)
    }

    /// Recursively delete an environment. There is no confirmation step.
    pub fn remove(&self, name: &str) -> Result<(), VenvError> {
        validate_name(name)?;
        self.ensure_root()?;
        if !self.exists(name) {
            return Err(VenvError::NotFound(name.to_owned()));
        }
        let path = self.path(name);
        fs::remove_dir_all(&path).map_err(|e| VenvError::io("cannot remove", &path, e))?;
        tracing::debug!(path = %path.display(), "removed environment");
        Ok(())
    }

    /// Snapshot the environment names under the root.
    pub fn list(&self) -> Result<Listing, VenvError> {
        self.ensure_root()?;
        let entries =
            fs::read_dir(&self.root).map_err(|e| VenvError::io("cannot read", &self.root, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VenvError::io("cannot read", &self.root, e))?;
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(entry = ?entry.file_name(), "skipping non UTF-8 entry");
                continue;
            };
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(Listing { names })
    }

    /// Check that the root is a writable directory, creating it when
    /// configured to.
    pub(crate) fn ensure_root(&self) -> Result<(), VenvError> {
        let root = self.root.display();
        match fs::metadata(&self.root) {
            Ok(meta) if !meta.is_dir() => Err(VenvError::RootUnavailable(format!(
                "{root} is not a directory"
            ))),
            Ok(meta) if meta.permissions().readonly() => Err(VenvError::RootUnavailable(format!(
                "{root} is not writable"
            ))),
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound && self.create_root => {
                fs::create_dir_all(&self.root).map_err(|e| {
                    VenvError::RootUnavailable(format!("cannot create {root}: {e}"))
                })?;
                tracing::debug!(root = %root, "created environment root");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(VenvError::RootUnavailable(format!("{root} does not exist")))
            }
            Err(e) => Err(VenvError::RootUnavailable(format!("cannot access {root}: {e}"))),
        }
    }
}

/// Sorted environment names. Iterating does not consume the listing, so it
/// can be walked any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    names: Vec<String>,
}

impl Listing {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
