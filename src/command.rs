use crate::env::Environment;
use crate::render::Output;
use anyhow::Result;

/// Conventional process exit code type used by this crate.
///
/// Every invocation ends with 0 (success) or 1 (any failure, including a bare
/// usage display).
pub type ExitCode = i32;

/// First line of every usage display.
pub const USAGE: &str = "Usage: venv <command> [<args>]";

/// Capability a verb maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Create,
    Remove,
    List,
    Activate,
    Deactivate,
    Help,
}

/// Static description of one supported verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: &'static str,
    /// Bounds on positional arguments, inclusive.
    pub min_args: usize,
    pub max_args: usize,
    pub usage: &'static str,
    pub summary: &'static str,
    pub handler: Handler,
}

impl CommandDescriptor {
    pub fn accepts(&self, count: usize) -> bool {
        (self.min_args..=self.max_args).contains(&count)
    }

    /// Diagnostic for a call with `count` positional arguments.
    pub fn arity_message(&self, count: usize) -> String {
        let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
        let expected = match (self.min_args, self.max_args) {
            (min, max) if min == max => format!("{min} {}", plural(min)),
            (0, max) => format!("at most {max} {}", plural(max)),
            (min, max) => format!("{min} to {max} arguments"),
        };
        format!("{}: expected {expected}, got {count}", self.name)
    }
}

/// Every verb `venv` understands, in display order.
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "create",
        min_args: 1,
        max_args: 1,
        usage: "Usage: venv create <name>",
        summary: "create a new environment",
        handler: Handler::Create,
    },
    CommandDescriptor {
        name: "remove",
        min_args: 1,
        max_args: 1,
        usage: "Usage: venv remove <name>",
        summary: "delete an environment and everything in it",
        handler: Handler::Remove,
    },
    CommandDescriptor {
        name: "list",
        min_args: 0,
        max_args: 0,
        usage: "Usage: venv list",
        summary: "list environments, one per line",
        handler: Handler::List,
    },
    CommandDescriptor {
        name: "activate",
        min_args: 1,
        max_args: 1,
        usage: "Usage: venv activate <name>",
        summary: "enter an environment",
        handler: Handler::Activate,
    },
    CommandDescriptor {
        name: "workon",
        min_args: 1,
        max_args: 1,
        usage: "Usage: venv workon <name>",
        summary: "same as activate",
        handler: Handler::Activate,
    },
    CommandDescriptor {
        name: "deactivate",
        min_args: 0,
        max_args: 0,
        usage: "Usage: venv deactivate",
        summary: "leave the active environment",
        handler: Handler::Deactivate,
    },
    CommandDescriptor {
        name: "help",
        min_args: 0,
        max_args: 1,
        usage: "Usage: venv help [<command>]",
        summary: "show this message or describe a command",
        handler: Handler::Help,
    },
];

/// Exact, case-sensitive lookup.
pub fn lookup(verb: &str) -> Option<&'static CommandDescriptor> {
    COMMANDS.iter().find(|d| d.name == verb)
}

pub fn is_supported(verb: &str) -> bool {
    lookup(verb).is_some()
}

/// Object-safe trait for a parsed, ready-to-run command.
pub trait ExecutableCommand {
    /// Executes the command against the caller's shell snapshot.
    ///
    /// Failures the user should see are rendered to `out` and reported as a
    /// non-zero exit code; `Err` is reserved for failing to write output.
    fn execute(self: Box<Self>, env: &Environment, out: &mut Output<'_>) -> Result<ExitCode>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact() {
        assert_eq!(lookup("create").map(|d| d.handler), Some(Handler::Create));
        assert!(lookup("Create").is_none());
        assert!(lookup("cre").is_none());
        assert!(lookup("").is_none());
        assert!(!is_supported("booboo"));
    }

    #[test]
    fn test_workon_is_activate() {
        assert_eq!(lookup("workon").unwrap().handler, lookup("activate").unwrap().handler);
    }

    #[test]
    fn test_names_are_unique() {
        for (i, d) in COMMANDS.iter().enumerate() {
            assert!(COMMANDS[i + 1..].iter().all(|o| o.name != d.name), "{}", d.name);
            assert!(d.min_args <= d.max_args);
            assert!(d.usage.starts_with(&format!("Usage: venv {}", d.name)));
        }
    }

    #[test]
    fn test_arity() {
        let create = lookup("create").unwrap();
        assert!(create.accepts(1));
        assert!(!create.accepts(0));
        assert!(!create.accepts(2));
        assert_eq!(create.arity_message(0), "create: expected 1 argument, got 0");

        let list = lookup("list").unwrap();
        assert_eq!(list.arity_message(2), "list: expected 0 arguments, got 2");

        let help = lookup("help").unwrap();
        assert!(help.accepts(0) && help.accepts(1));
        assert_eq!(help.arity_message(3), "help: expected at most 1 argument, got 3");
    }
}
