//! CLI argument parsing for the breakbulk-worker binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "breakbulk-worker", about = "Break-bulk master data worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Print an access token signed with JWT_SECRET
    IssueToken {
        /// Operator email address
        #[arg(long)]
        email: String,
        /// Role claim of the token
        #[arg(long, default_value = "operator")]
        role: String,
    },
}
