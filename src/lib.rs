//! A small manager for virtual environments kept under one root directory.
//!
//! `venver` creates, lists and removes environment directories below
//! `$VIRTUAL_ENV_HOME` and computes how the *calling* shell has to change to
//! enter or leave one of them. A child process cannot change its parent's
//! working directory or variables, so activation is split in two halves:
//! [`activation`] decides on a [`activation::Recipe`] of mutations and
//! [`render`] prints it as statements a shell function evaluates (see
//! `scripts/venver.sh` and `scripts/venver.fish`).
//!
//! The main entry point is [`Dispatcher`], which runs one verb from the
//! [`command::COMMANDS`] table against a snapshot of the shell
//! ([`Environment`]).

pub mod activation;
mod builtin;
pub mod command;
pub mod config;
mod dispatcher;
pub mod env;
pub mod error;
mod external;
pub mod render;
pub mod store;

pub use dispatcher::Dispatcher;
pub use env::Environment;
pub use error::VenvError;
