mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{convert, init, layout, validate, ConvertArgs, InitArgs, LayoutArgs, Session, ValidateArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// tandem - keep a text document and its diagram in step
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: tandem.config.json in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create tandem.config.json and an example document
    Init(InitArgs),

    /// Convert a .flow file to its diagram model
    Convert(ConvertArgs),

    /// Report diagnostics for .flow files
    Validate(ValidateArgs),

    /// Run the layout engine on a .flow file
    Layout(LayoutArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let session = || Session::load(cli.config.as_deref(), &cwd);

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Convert(args) => convert(args, &session()?),
        Command::Validate(args) => validate(args, &session()?),
        Command::Layout(args) => layout(args, &session()?),
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
