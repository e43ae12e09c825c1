use super::Session;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use tandem_workspace::protocol::LoadModelResponse;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input .flow file
    pub input: PathBuf,

    /// Write the model here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Single-line JSON
    #[arg(long)]
    pub compact: bool,
}

/// Print the diagram model and its metadata as `loadModel` would return them.
pub fn convert(args: ConvertArgs, session: &Session) -> Result<()> {
    let doc = session.open(&args.input)?;
    if !doc.diagnostics.is_empty() {
        eprintln!(
            "{} {} parse diagnostic(s) in {}; run `tandem validate` for details",
            "⚠️".yellow(),
            doc.diagnostics.len(),
            args.input.display()
        );
    }

    let response = LoadModelResponse::of(&doc);
    let json = if args.compact {
        serde_json::to_string(&response)?
    } else {
        serde_json::to_string_pretty(&response)?
    };

    match &args.output {
        Some(path) => {
            fs::write(path, json)?;
            println!(
                "{} {} → {}",
                "✓".green(),
                args.input.display(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
