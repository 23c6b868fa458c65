use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mdrun", version, about = "Run fenced Markdown code blocks in a terminal")]
pub struct Cli {
    /// Settings file (defaults to mdrun.json in the config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the runnable blocks of a document, one JSON object per line
    Lenses {
        file: PathBuf,
        /// Print them again whenever the document changes
        #[arg(long)]
        watch: bool,
    },
    /// Run the INDEX-th runnable block (as listed by `lenses`)
    Run {
        file: PathBuf,
        index: usize,
        /// Type the command without pressing Enter
        #[arg(long = "type")]
        type_only: bool,
    },
    /// Print the preview HTML for this session
    Render { file: PathBuf },
    /// Print the preview, then handle request URIs read from stdin
    Serve {
        file: PathBuf,
        /// Treat the workspace as untrusted; every request asks first
        #[arg(long)]
        untrusted: bool,
    },
}
