use super::{find_flow_files, Session};
use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tandem_model::ValidationReport;
use tandem_parser::pretty::format_diagnostics;
use tandem_syntax::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Input .flow file or directory
    pub input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Also list files without findings and info-level diagnostics
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub files: usize,
    pub errors: usize,
    pub warnings: usize,
}

pub fn validate(args: ValidateArgs, session: &Session) -> Result<()> {
    let summary = run(&args, session)?;
    if args.format == OutputFormat::Json {
        return finish(&summary);
    }

    println!();
    println!(
        "✨ {} Validation complete!",
        if summary.errors > 0 {
            "Done".red().bold()
        } else {
            "Done".green().bold()
        }
    );
    println!("   Files checked: {}", summary.files);
    if summary.errors > 0 {
        println!("   {} {}", "Errors:".red(), summary.errors);
    }
    if summary.warnings > 0 {
        println!("   {} {}", "Warnings:".yellow(), summary.warnings);
    }
    if summary.errors == 0 && summary.warnings == 0 {
        println!("   {} No issues found!", "✓".green());
    }
    finish(&summary)
}

fn finish(summary: &Summary) -> Result<()> {
    if summary.errors > 0 {
        anyhow::bail!("{} error(s) found", summary.errors);
    }
    Ok(())
}

pub fn run(args: &ValidateArgs, session: &Session) -> Result<Summary> {
    let mut summary = Summary::default();
    for file in find_flow_files(&args.input)? {
        let (errors, warnings) = validate_file(&file, args, session)?;
        summary.files += 1;
        summary.errors += errors;
        summary.warnings += warnings;
    }
    Ok(summary)
}

fn validate_file(path: &Path, args: &ValidateArgs, session: &Session) -> Result<(usize, usize)> {
    let doc = session.open(path)?;
    let pipeline = session.pipeline();

    if args.format == OutputFormat::Json {
        let report: ValidationReport = doc.validate(&pipeline);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok((report.error_count, report.warning_count));
    }

    let diagnostics: Vec<_> = doc
        .check(&pipeline)
        .into_iter()
        .filter(|d| args.all || d.severity != Severity::Info)
        .collect();
    if diagnostics.is_empty() {
        if args.all {
            println!("{} {}", "✓".green(), path.display());
        }
        return Ok((0, 0));
    }

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    eprint!(
        "{}",
        format_diagnostics(&doc.source, &path.display().to_string(), &diagnostics)
    );
    Ok((errors, warnings))
}
