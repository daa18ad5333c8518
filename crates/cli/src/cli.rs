use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "eh",
    about = "Encrypt protected fields in HCL configuration files",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log debug diagnostics to stderr
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress all log output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to config file (default: ~/.eh/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Encrypt the protected fields of a document
    Encrypt(TransformArgs),

    /// Decrypt the protected fields of a document
    Decrypt(TransformArgs),

    /// Read and decrypt a document and merge all of its includes
    Read {
        /// File path, file://, http(s):// or s3:// URL; standard input when omitted or "-"
        location: Option<String>,
    },
}

#[derive(Args)]
pub struct TransformArgs {
    /// Document to transform; standard input when omitted or "-"
    pub file: Option<PathBuf>,

    /// Rewrite FILE instead of writing to standard output
    #[arg(long, short = 'i', requires = "file")]
    pub in_place: bool,
}
