use clap::{Parser, Subcommand};

mod args;


pub use args::{ReportArgs, ServeArgs};

#[derive(Debug, Parser)]
#[command(name = "spapi")]
#[command(about = "Per-fight damage summaries from Warcraft Logs reports", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP service until Ctrl-C.
    Serve(ServeArgs),
    /// Build one report and print it as JSON.
    Report(ReportArgs),
}
