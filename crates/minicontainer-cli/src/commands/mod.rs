//! CLI command definitions and dispatch.

pub mod child;
pub mod init;
pub mod run;

use clap::{Parser, Subcommand};

/// Minimal container launcher.
#[derive(Parser, Debug)]
#[command(name = "minicontainer", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download and extract the root filesystem image.
    Init(init::InitArgs),
    /// Run a command inside an isolated container.
    Run(run::RunArgs),
    /// Container init, re-executed inside the new namespaces.
    #[command(hide = true)]
    Child(child::ChildArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(args) => init::execute(&args),
        Command::Run(args) => run::execute(args),
        Command::Child(args) => child::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unknown_verb_is_rejected() {
        let err = Cli::try_parse_from(["minicontainer", "explode"]).expect_err("unknown verb");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn child_verb_is_hidden_from_help() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("init"));
        assert!(help.contains("run"));
        assert!(!help.contains("child"));
    }
}
