use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "refmatch backend")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Start the backend server
    Serve {
        /// Port number (optional, defaults to 3000)
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Run one matching sweep over pending games and exit
    Sweep,
    /// Reset the database and load the demo dataset
    Seed,
}
