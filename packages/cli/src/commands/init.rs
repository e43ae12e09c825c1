use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tandem_workspace::{WorkspaceConfig, CONFIG_FILE_NAME};

const EXAMPLE: &str = r#"activity "Order handling" {
  task Receive
  task Ship {
    owner: "warehouse"
  }
  flow Receive -> Ship
}
event Done
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory for persisted layouts, relative to the project
    #[arg(short, long, default_value = ".tandem")]
    pub layout_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(CONFIG_FILE_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            CONFIG_FILE_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing tandem project...".bright_blue().bold());

    let example_file = cwd.join("example.flow");
    if !example_file.exists() {
        fs::write(&example_file, EXAMPLE)?;
        println!("  {} Created example.flow", "✓".green());
    }

    let config = WorkspaceConfig {
        layout_dir: Some(PathBuf::from(&args.layout_dir)),
        ..Default::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), CONFIG_FILE_NAME);

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: tandem validate .");
    println!("  2. Run: tandem layout example.flow --save");
    println!("  3. Run: tandem-server");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::validate::{run, OutputFormat, ValidateArgs};
    use crate::commands::Session;

    #[test]
    fn test_init_writes_loadable_project() {
        let dir = tempfile::tempdir().unwrap();
        init(
            InitArgs {
                layout_dir: ".tandem".to_string(),
                force: false,
            },
            dir.path(),
        )
        .unwrap();

        let session = Session::load(None, dir.path()).unwrap();
        assert_eq!(session.config.layout_dir, Some(dir.path().join(".tandem")));

        let summary = run(
            &ValidateArgs {
                input: dir.path().join("example.flow"),
                format: OutputFormat::Text,
                all: false,
            },
            &session,
        )
        .unwrap();
        assert_eq!(summary.errors, 0);
    }
}
