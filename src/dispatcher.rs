use crate::command::{self, ExitCode, USAGE};
use crate::env::Environment;
use crate::render::{Output, OutputMode};
use std::io::Write;

/// Entry point for one `venv` invocation.
///
/// The dispatcher owns the snapshot of the calling shell and turns an
/// argument vector into output plus an exit status. Every outcome is written
/// to the given stdout; nothing goes to stderr except logs.
///
/// Example
/// ```
/// use venver::{Dispatcher, Environment};
/// let dispatcher = Dispatcher::new(Environment::default());
/// let mut out = Vec::new();
/// let code = dispatcher.run(&["booboo"], &mut out);
/// assert_eq!(code, 1);
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "Usage: venv <command> [<args>]\nvenv: unsupported command booboo\n"
/// );
/// ```
pub struct Dispatcher {
    env: Environment,
}

impl Dispatcher {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Run one command and return its exit status, always 0 or 1.
    pub fn run<S: AsRef<str>>(&self, args: &[S], stdout: &mut dyn Write) -> ExitCode {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let mut out = Output::new(OutputMode::from_env(&self.env), stdout);
        match self.dispatch(&args, &mut out) {
            Ok(0) => 0,
            Ok(_) => 1,
            Err(e) => {
                tracing::error!(error = %e, "cannot write output");
                1
            }
        }
    }

    fn dispatch(&self, args: &[&str], out: &mut Output<'_>) -> anyhow::Result<ExitCode> {
        let Some((&verb, rest)) = args.split_first() else {
            out.line(USAGE)?;
            return Ok(1);
        };

        let Some(descriptor) = command::lookup(verb) else {
            tracing::debug!(verb, "unsupported command");
            out.line(USAGE)?;
            out.line(&format!("venv: unsupported command {verb}"))?;
            return Ok(1);
        };

        // Flags are left to argh; the table bounds positional arguments only.
        let wants_help = rest.iter().any(|a| *a == "--help");
        let positional = rest.iter().filter(|a| !a.starts_with('-')).count();
        if !wants_help && !descriptor.accepts(positional) {
            out.line(descriptor.usage)?;
            out.line(&format!("venv: {}", descriptor.arity_message(positional)))?;
            return Ok(1);
        }

        tracing::debug!(verb, args = ?rest, "dispatching");
        let cmd = descriptor.handler.parse(verb, descriptor.usage, rest);
        cmd.execute(&self.env, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::MARKER_VAR;
    use crate::config::HOME_VAR;
    use crate::render::SHELL_VAR;
    use std::fs;
    use tempfile::TempDir;

    fn dispatcher(vars: &[(&str, &str)]) -> (TempDir, Dispatcher) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_string_lossy().into_owned();
        let mut env = Environment::with_vars(vars.iter().copied(), tmp.path());
        env.set_var(HOME_VAR, root);
        (tmp, Dispatcher::new(env))
    }

    fn run(d: &Dispatcher, args: &[&str]) -> (ExitCode, String) {
        let mut buf = Vec::new();
        let code = d.run(args, &mut buf);
        (code, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_no_arguments_prints_usage() {
        let (_tmp, d) = dispatcher(&[]);
        assert_eq!(run(&d, &[]), (1, format!("{USAGE}\n")));
    }

    #[test]
    fn test_unknown_verb() {
        let (_tmp, d) = dispatcher(&[]);
        let (code, out) = run(&d, &["booboo"]);
        assert_eq!(code, 1);
        assert_eq!(out, format!("{USAGE}\nvenv: unsupported command booboo\n"));
    }

    #[test]
    fn test_unknown_verb_has_no_side_effects() {
        let (tmp, d) = dispatcher(&[]);
        let (code, _) = run(&d, &["CREATE", "web"]);
        assert_eq!(code, 1);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_verb_in_eval_mode() {
        let (_tmp, d) = dispatcher(&[(SHELL_VAR, "bash")]);
        let (code, out) = run(&d, &["booboo"]);
        assert_eq!(code, 1);
        assert_eq!(
            out,
            "printf '%s\\n' 'Usage: venv <command> [<args>]'\n\
             printf '%s\\n' 'venv: unsupported command booboo'\n"
        );
    }

    #[test]
    fn test_arity_violation_runs_nothing() {
        let (tmp, d) = dispatcher(&[]);
        let (code, out) = run(&d, &["create"]);
        assert_eq!(code, 1);
        assert_eq!(
            out,
            "Usage: venv create <name>\nvenv: create: expected 1 argument, got 0\n"
        );

        let (code, out) = run(&d, &["remove", "a", "b"]);
        assert_eq!(code, 1);
        assert!(out.ends_with("venv: remove: expected 1 argument, got 2\n"));

        let (code, _) = run(&d, &["list", "extra"]);
        assert_eq!(code, 1);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_verb_help_exits_zero() {
        let (_tmp, d) = dispatcher(&[]);
        let (code, out) = run(&d, &["create", "--help"]);
        assert_eq!(code, 0);
        assert!(out.contains("Usage: venv create <name>"), "{out}");
    }

    #[test]
    fn test_list_after_manual_layout() {
        let (tmp, d) = dispatcher(&[]);
        fs::create_dir(tmp.path().join("b")).unwrap();
        fs::create_dir(tmp.path().join("a")).unwrap();
        assert_eq!(run(&d, &["list"]), (0, "a\nb\n".to_owned()));
        assert_eq!(run(&d, &["list"]), (0, "a\nb\n".to_owned()));
    }

    #[test]
    fn test_remove_then_list() {
        let (tmp, d) = dispatcher(&[]);
        fs::create_dir(tmp.path().join("web")).unwrap();
        assert_eq!(run(&d, &["remove", "web"]).0, 0);
        assert_eq!(run(&d, &["list"]), (0, String::new()));
        assert_eq!(run(&d, &["remove", "web"]).0, 1);
    }

    #[test]
    fn test_workon_matches_activate() {
        let (tmp, d) = dispatcher(&[("PWD", "/home/me")]);
        fs::create_dir(tmp.path().join("web")).unwrap();
        let activate = run(&d, &["activate", "web"]);
        assert_eq!(activate.0, 0);
        assert!(activate.1.contains(&format!("export {MARKER_VAR}='web'\n")));
        assert_eq!(run(&d, &["workon", "web"]), activate);
    }

    #[test]
    fn test_deactivate_is_idempotent() {
        let (_tmp, d) = dispatcher(&[]);
        assert_eq!(run(&d, &["deactivate"]), (0, String::new()));
        assert_eq!(run(&d, &["deactivate"]), (0, String::new()));
    }

    #[test]
    fn test_missing_root_is_distinct_from_usage() {
        let (tmp, _) = dispatcher(&[]);
        let missing = tmp.path().join("absent");
        let d = Dispatcher::new(Environment::with_vars(
            [(HOME_VAR, missing.to_string_lossy().into_owned())],
            tmp.path(),
        ));
        let (code, out) = run(&d, &["list"]);
        assert_eq!(code, 1);
        assert_eq!(out, format!("venv: {} does not exist\n", missing.display()));
    }
}
