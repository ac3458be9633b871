use clap::{ArgGroup, Parser, Subcommand};

pub const DEFAULT_SERVER: &str = "http://localhost:5000";

#[derive(Parser, Debug)]
#[command(name = "codespace")]
#[command(about = "Open and collaborate on shared code spaces", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Base URL of the codespace server
    #[arg(short, long, global = true, env = "CODESPACE_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open a space, creating it with a default file if it does not exist
    Open {
        /// Space name
        name: String,
    },

    /// Show whether a space is public or private
    Status {
        /// Space name
        name: String,
    },

    /// Join a space and edit it interactively
    Join {
        /// Space name
        name: String,

        /// Passcode for a private space (prompted for when omitted)
        #[arg(short, long)]
        passcode: Option<String>,
    },

    /// Make a space public, or private behind a passcode
    #[command(group(ArgGroup::new("mode").required(true).args(["public", "passcode"])))]
    Privacy {
        /// Space name
        name: String,

        /// Make the space public
        #[arg(long)]
        public: bool,

        /// Make the space private with this passcode
        #[arg(long)]
        passcode: Option<String>,

        /// Passcode the space is protected by now (prompted for when omitted)
        #[arg(long)]
        current_passcode: Option<String>,
    },

    /// Delete a file from a space
    Delete {
        /// Space name
        name: String,

        /// File to delete
        file: String,
    },
}
