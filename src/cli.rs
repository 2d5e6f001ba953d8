use clap::{Parser, Subcommand};

/// InnoLink — session and realtime client for the InnoSistemas dashboard
#[derive(Parser)]
#[command(name = "innolink", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authenticate against the backend and persist the session
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },

    /// Show the current session, roles, and remaining validity
    Whoami,

    /// Clear the local session (best-effort backend notification)
    Logout,

    /// Print recorded access attempts
    Audit {
        /// Most-recent entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Follow a feedback thread's realtime channel
    Watch { delivery_id: String },

    /// Publish a comment event to a feedback thread's channel
    Post { delivery_id: String, text: String },
}
