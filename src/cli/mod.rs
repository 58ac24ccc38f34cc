//! Command-line interface for the SmarTanom backend.

pub mod commands;

use clap::{Parser, Subcommand};

/// SmarTanom - hydroponics monitoring backend
#[derive(Parser)]
#[command(name = "smartanom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "daemon")]
    Serve,

    /// Write a default config.toml to the working directory
    Init,

    /// Account maintenance
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Mark an account active and its email verified
    Activate {
        /// Account email
        email: String,
    },

    /// Clear the failed-login counter of an account
    Unlock {
        /// Account email
        email: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_user_unlock() {
        let cli = Cli::parse_from(["smartanom", "user", "unlock", "a@example.com"]);
        match cli.command {
            Some(Commands::User {
                command: UserCommands::Unlock { email },
            }) => assert_eq!(email, "a@example.com"),
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::parse_from(["smartanom"]);
        assert!(cli.command.is_none());
    }
}
