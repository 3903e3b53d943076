use crate::activation::{self, Activation, Recipe, Session, Target};
use crate::command::{self, COMMANDS, ExecutableCommand, ExitCode, Handler, USAGE};
use crate::config::Config;
use crate::env::Environment;
use crate::error::VenvError;
use crate::external::CreationCommand;
use crate::render::Output;
use crate::store::{EnvironmentStore, validate_name};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};

/// Verbs known to `venv` at compile time.
///
/// Arguments are parsed using the [`argh`] crate (`FromArgs`) once the
/// dispatcher has checked the verb and its arity against the command table.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Executes the command, writing messages and shell statements to `out`.
    ///
    /// Errors are rendered by the caller; see the [`ExecutableCommand`] impl.
    fn execute(self, env: &Environment, out: &mut Output<'_>) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, env: &Environment, out: &mut Output<'_>) -> Result<ExitCode> {
        match BuiltinCommand::execute(*self, env, out) {
            Ok(x) => Ok(x),
            Err(e) => {
                if let Some(usage) = e.downcast_ref::<VenvError>().and_then(VenvError::usage) {
                    out.line(usage)?;
                }
                tracing::debug!(error = ?e, "command failed");
                out.line(&format!("venv: {e}"))?;
                Ok(1)
            }
        }
    }
}

/// Arguments argh refused, or an argh `--help` request.
struct InvalidArgs {
    verb: String,
    usage: &'static str,
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, _env: &Environment, out: &mut Output<'_>) -> Result<ExitCode> {
        if !self.is_error {
            out.line(&self.output)?;
            return Ok(0);
        }
        out.line(self.usage)?;
        out.line(&format!("venv: {}: {}", self.verb, self.output.trim()))?;
        Ok(1)
    }
}

fn parse<T: BuiltinCommand + 'static>(
    verb: &str,
    usage: &'static str,
    args: &[&str],
) -> Box<dyn ExecutableCommand> {
    match T::from_args(&["venv", verb], args) {
        Ok(cmd) => Box::new(cmd),
        Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
            verb: verb.to_owned(),
            usage,
            output,
            is_error: status.is_err(),
        }),
    }
}

impl Handler {
    /// Parse `args` into the command this handler runs.
    pub(crate) fn parse(
        self,
        verb: &str,
        usage: &'static str,
        args: &[&str],
    ) -> Box<dyn ExecutableCommand> {
        match self {
            Handler::Create => parse::<Create>(verb, usage, args),
            Handler::Remove => parse::<Remove>(verb, usage, args),
            Handler::List => parse::<List>(verb, usage, args),
            Handler::Activate => parse::<Activate>(verb, usage, args),
            Handler::Deactivate => parse::<Deactivate>(verb, usage, args),
            Handler::Help => parse::<Help>(verb, usage, args),
        }
    }
}

fn open_store(env: &Environment) -> Result<(Config, EnvironmentStore), VenvError> {
    let config = Config::from_env(env)?;
    let store = EnvironmentStore::from_config(&config);
    Ok((config, store))
}

#[derive(FromArgs)]
/// Create a new environment under $VIRTUAL_ENV_HOME.
pub struct Create {
    #[argh(positional)]
    /// name of the environment to create.
    pub name: String,
}

impl BuiltinCommand for Create {
    fn execute(self, env: &Environment, out: &mut Output<'_>) -> Result<ExitCode> {
        let (config, store) = open_store(env)?;
        let path = store.create(&self.name, |path| {
            CreationCommand::resolve(&config, env)?.run(path, config.create_timeout)
        })?;
        tracing::info!(name = %self.name, path = %path.display(), "environment created");
        out.line(&format!("Created environment {} in {}", self.name, path.display()))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Delete an environment and everything in it.
pub struct Remove {
    #[argh(positional)]
    /// name of the environment to remove.
    pub name: String,
}

impl BuiltinCommand for Remove {
    fn execute(self, env: &Environment, out: &mut Output<'_>) -> Result<ExitCode> {
        let (config, store) = open_store(env)?;
        store.remove(&self.name)?;
        tracing::info!(name = %self.name, "environment removed");

        // The shell would otherwise be left inside a deleted directory.
        let session = Session::from_env(env);
        let recipe = if session.activation == Activation::Active(self.name.clone()) {
            activation::deactivate(&session, config.deactivate_dir.as_deref())
        } else {
            Recipe::default()
        };
        // Plain output carrying statements must stay evaluable as a whole.
        if recipe.is_empty() || out.is_eval() {
            out.line(&format!("Removed environment {}", self.name))?;
        }
        out.recipe(&recipe)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List environments, one per line, in lexicographic order.
pub struct List {}

impl BuiltinCommand for List {
    fn execute(self, env: &Environment, out: &mut Output<'_>) -> Result<ExitCode> {
        let (_, store) = open_store(env)?;
        for name in store.list()?.iter() {
            out.line(name)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Enter an environment: export VIRTUAL_ENV_NAME and change into its directory.
pub struct Activate {
    #[argh(positional)]
    /// name of the environment to enter.
    pub name: String,
}

impl BuiltinCommand for Activate {
    fn execute(self, env: &Environment, out: &mut Output<'_>) -> Result<ExitCode> {
        let (_, store) = open_store(env)?;
        validate_name(&self.name)?;
        store.ensure_root()?;
        if !store.exists(&self.name) {
            return Err(VenvError::NotFound(self.name).into());
        }

        let path = store.path(&self.name);
        let script = Some(out.shell().activation_script(&path)).filter(|s| s.is_file());
        let target = Target {
            name: self.name,
            path,
            script,
        };
        let recipe = activation::activate(&Session::from_env(env), &target);
        out.recipe(&recipe)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the active environment and return to the previous directory.
pub struct Deactivate {}

impl BuiltinCommand for Deactivate {
    fn execute(self, env: &Environment, out: &mut Output<'_>) -> Result<ExitCode> {
        let config = Config::from_env(env)?;
        let session = Session::from_env(env);
        let recipe = activation::deactivate(&session, config.deactivate_dir.as_deref());
        out.recipe(&recipe)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Describe the available commands.
pub struct Help {
    #[argh(positional)]
    /// command to describe.
    pub command: Option<String>,
}

impl BuiltinCommand for Help {
    fn execute(self, _env: &Environment, out: &mut Output<'_>) -> Result<ExitCode> {
        let Some(verb) = self.command else {
            out.line(USAGE)?;
            out.line("")?;
            out.line("Commands:")?;
            for d in COMMANDS {
                out.line(&format!("  {:<12}{}", d.name, d.summary))?;
            }
            return Ok(0);
        };

        let descriptor = command::lookup(&verb).ok_or_else(|| VenvError::Usage {
            usage: USAGE.to_owned(),
            message: format!("unsupported command {verb}"),
        })?;
        out.line(descriptor.usage)?;
        out.line(&format!("  {}", descriptor.summary))?;
        Ok(0)
    }
}
