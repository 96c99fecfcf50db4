use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "hafdev CLI for .haf Huffman archives", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pack inputs into <dest_dir>/<name>.haf
    Pack {
        dest_dir: PathBuf,
        name: String,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// include the files below directory inputs
        #[arg(long)]
        recursive: bool,

        /// zero all timestamps for reproducible output
        #[arg(long)]
        deterministic: bool,

        /// min fraction Huffman must save over STORE (0.0 - 1.0)
        #[arg(long, default_value_t = 0.0)]
        min_gain: f32,
    },

    /// List archive contents
    List { archive: PathBuf },

    /// Extract archive to destination
    Extract { archive: PathBuf, dest: PathBuf },

    /// Write one decoded file to stdout
    Cat { archive: PathBuf, name: String },

    /// Decode every body and check sizes and hashes
    Verify { archive: PathBuf },
}
