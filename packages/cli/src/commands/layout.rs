use super::Session;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tandem_editor::providers;
use tandem_editor::LayoutResult;
use tandem_workspace::LayoutStore;

#[derive(Args, Debug)]
pub struct LayoutArgs {
    /// Input .flow file
    pub input: PathBuf,

    /// Store the computed layout in the configured layout directory
    #[arg(short, long)]
    pub save: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn layout(args: LayoutArgs, session: &Session) -> Result<()> {
    let result = compute(&args, session)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("📐 {} {}", "Layout".green().bold(), args.input.display());
    for (id, position) in &result.positions {
        let size = result
            .sizes
            .get(id)
            .map(|s| format!("{} × {}", s.width, s.height))
            .unwrap_or_default();
        println!("   {:<24} ({}, {})  {}", id.as_str(), position.x, position.y, size.dimmed());
    }
    println!(
        "   Bounds: {} × {}",
        result.bounds.width, result.bounds.height
    );
    Ok(())
}

pub fn compute(args: &LayoutArgs, session: &Session) -> Result<LayoutResult> {
    let (engine, options) =
        providers::layout(&session.providers).context("The layout feature is disabled")?;
    let mut doc = session.open(&args.input)?;
    let result = engine.layout(&doc.model, options);

    if args.save {
        let store = session
            .store()
            .context("--save needs `layoutDir` in tandem.config.json")?;
        for (id, position) in &result.positions {
            doc.metadata.set_position(id.clone(), *position);
        }
        for (id, size) in &result.sizes {
            doc.metadata.set_size(id.clone(), *size);
        }
        store.save(&doc.capture())?;
        tracing::info!(path = %store.path_for(&doc.uri).display(), "saved layout");
    }
    Ok(result)
}
