//! CLI command definitions
//!
//! Defines the clap commands for the training bridge.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the training application: listen for the platform and read
    /// operator actions from stdin
    Run,

    /// Send one notification to the platform and exit
    #[command(subcommand)]
    Send(SendCommands),

    /// Call a running training application the way the platform does
    Call {
        /// Application endpoint (default: http://127.0.0.1:<listen port>/)
        #[arg(long)]
        url: Option<String>,

        #[command(subcommand)]
        method: CallCommands,
    },
}

#[derive(Subcommand)]
pub enum SendCommands {
    /// Send a free-text state message
    State {
        /// Message content
        text: String,
    },

    /// Signal that the training application is finished
    Finished,

    /// Call the platform's echo test method and print the reply
    Test {
        /// Text to echo
        text: String,
    },
}

#[derive(Subcommand)]
pub enum CallCommands {
    /// Load a scenario (enables the application's controls)
    Load {
        /// Scenario name
        scenario_name: String,
    },

    /// Deliver a free-text message
    Blob {
        /// Message content
        text: String,
    },

    /// Order the application to close
    #[command(alias = "close")]
    CloseApplication,
}
