use crate::commands::weave::WeaveArgs;
use clap::{Parser, Subcommand};
use std::env;

#[derive(Parser)]
#[command(name = "weave")]
#[command(about = "Managed-assembly mixin weaver", version, author)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clone a source type's members into a target type in another assembly
    Weave(Box<WeaveArgs>),
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_from(env::args_os());

    match cli.command {
        Commands::Weave(args) => crate::commands::weave::execute(*args),
    }
}
