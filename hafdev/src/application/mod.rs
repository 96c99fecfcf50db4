pub mod handlers;

use crate::error::Result;
use crate::presentation::cli::{Cli, Commands};
use clap::Parser;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Pack {
            dest_dir,
            name,
            inputs,
            recursive,
            deterministic,
            min_gain,
        } => handlers::handle_pack(dest_dir, name, inputs, recursive, deterministic, min_gain),
        Commands::List { archive } => handlers::handle_list(archive),
        Commands::Extract { archive, dest } => handlers::handle_extract(archive, dest),
        Commands::Cat { archive, name } => handlers::handle_cat(archive, name),
        Commands::Verify { archive } => handlers::handle_verify(archive),
    }
}
