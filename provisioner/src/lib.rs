//! provisioner - install and configure software on local and remote machines
//!
//! Every command runs through the same pipeline: settle the run environment
//! (this machine or SSH-reachable nodes), collect credentials, compose shell
//! commands or playbook runs, execute them and report a summary.
//!
//! ## Layout
//!
//! - [`installer`]: the `install` pipeline and its local, remote and GitHub leaves
//! - [`utilities`]: the built-in utility registries
//! - [`remote`]: run environments, SSH endpoints and the remote connector
//! - [`ansible`]: embedded playbooks, inventory rendering and the playbook executor
//! - [`runners`]: single-board, example and system-info pipelines
//! - [`collaborators`]: per-run handles to every side-effecting component

pub mod ansible;
pub mod chain;
pub mod checks;
pub mod cli;
pub mod collaborators;
pub mod command_runner;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod fs;
pub mod installer;
pub mod output;
pub mod prompter;
pub mod remote;
pub mod runners;
pub mod summary;
pub mod testing;
pub mod utilities;

pub use cli::{Cli, Commands};
pub use context::{Context, OsArch};
pub use error::ProvisionerError;
