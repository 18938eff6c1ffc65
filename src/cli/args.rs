use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "koemo")]
#[command(about = "Voice memos: record, transcribe, store, speak", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Browse and manage stored memos
    Memos(MemosCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct MemosCliArgs {
    /// Search query to filter memos by text content
    #[arg(short, long)]
    pub query: Option<String>,
    /// Maximum number of results to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
    /// Show the full text of a specific memo
    #[arg(long)]
    pub show: Option<String>,
    /// Delete a specific memo (and its audio file)
    #[arg(long)]
    pub delete: Option<String>,
}
