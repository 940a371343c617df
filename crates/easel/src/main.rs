//! # easel
//!
//! Easel - Web components from single-file documents.
//!
//! ## Name Origin
//!
//! An **easel** holds the canvas while the work takes shape. The `easel`
//! binary holds component documents up for inspection: it parses them and
//! renders instances to markup without a browser.

mod commands;
mod logging;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "easel")]
#[command(about = "Web components from single-file documents", long_about = None)]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Print version
    #[arg(short = 'v', short_alias = 'V', long, action = clap::ArgAction::Version)]
    version: (),
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a markup file and print the resulting tree
    #[command(visible_alias = "armature")]
    Parse(commands::parse::ParseArgs),

    /// Load a component document and render one instance
    #[command(visible_alias = "atelier")]
    Render(commands::render::RenderArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse(args) => commands::parse::run(args),
        Commands::Render(args) => commands::render::run(args),
    }
}
